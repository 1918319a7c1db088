//! Stake allocation.
//!
//! Greedy, rank-order budgeting. Each candidate asks for its Kelly stake;
//! the first one that would push the running total past the budget, and
//! everything ranked below it, gets zero. Zero-stake candidates stay in
//! the output.

use rust_decimal::prelude::*;
use tracing::{debug, info};

use super::kelly::{round_cents, KellyCalculator, KellyConfig};
use crate::config::StakingConfig;
use crate::types::{Accumulator, Pick};

fn to_cents(amount: f64) -> Decimal {
    Decimal::from_f64(amount)
        .unwrap_or(Decimal::ZERO)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Running budget for one allocation pass. Totals are kept in exact cents.
#[derive(Debug, Clone)]
pub struct StakeAllocator {
    budget: Decimal,
    allocated: Decimal,
    exhausted: bool,
}

impl StakeAllocator {
    pub fn new(budget: f64) -> Self {
        Self {
            budget: to_cents(budget.max(0.0)),
            allocated: Decimal::ZERO,
            exhausted: false,
        }
    }

    /// Request a stake. Returns the amount granted: all of it, or zero.
    pub fn offer(&mut self, requested: f64) -> f64 {
        if self.exhausted || requested <= 0.0 {
            return 0.0;
        }
        let amount = to_cents(requested);
        if self.allocated + amount > self.budget {
            debug!(
                requested = %amount,
                allocated = %self.allocated,
                budget = %self.budget,
                "Budget reached, remaining candidates unstaked"
            );
            self.exhausted = true;
            return 0.0;
        }
        self.allocated += amount;
        amount.to_f64().unwrap_or(0.0)
    }

    pub fn allocated(&self) -> f64 {
        self.allocated.to_f64().unwrap_or(0.0)
    }

    pub fn remaining(&self) -> f64 {
        (self.budget - self.allocated).to_f64().unwrap_or(0.0)
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

/// Stake ranked picks against the single-pick budget.
///
/// Only picks whose best outcome is a value outcome ask for a stake.
pub fn allocate_picks(picks: &mut [Pick], staking: &StakingConfig, bankroll: f64) {
    let mut allocator = StakeAllocator::new(staking.max_pick_exposure(bankroll));
    let cap = staking.max_bet_percentage * bankroll;

    for pick in picks.iter_mut() {
        let requested = match &pick.best_outcome {
            Some(best) if pick.best_is_value() => best.kelly_stake.clamp(0.0, cap),
            _ => 0.0,
        };
        pick.suggested_stake = allocator.offer(requested);
    }

    info!(
        allocated = format!("{:.2}", allocator.allocated()),
        remaining = format!("{:.2}", allocator.remaining()),
        exhausted = allocator.is_exhausted(),
        "Pick stakes allocated"
    );
}

/// Size and stake ranked accumulators against the accumulator budget.
pub fn allocate_accumulators(accumulators: &mut [Accumulator], staking: &StakingConfig, bankroll: f64) {
    let kelly = KellyCalculator::new(KellyConfig {
        multiplier: staking.accumulator_kelly_fraction,
        max_bet_pct: staking.max_stake_percent,
    });
    let mut allocator = StakeAllocator::new(staking.max_stake_allocation(bankroll));

    for acc in accumulators.iter_mut() {
        let sized = kelly.size(acc.combined_probability, acc.combined_odds, bankroll);
        acc.suggested_stake = allocator.offer(sized.amount);
        acc.potential_return = round_cents(acc.suggested_stake * acc.combined_odds);
    }

    info!(
        allocated = format!("{:.2}", allocator.allocated()),
        remaining = format!("{:.2}", allocator.remaining()),
        exhausted = allocator.is_exhausted(),
        "Accumulator stakes allocated"
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
