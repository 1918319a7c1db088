//! Leg pool builder.
//!
//! Narrows value outcomes down to accumulator legs: stricter EV and
//! probability gates, one leg per fixture, best first.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::config::{EngineLimits, StakingConfig};
use crate::types::{Leg, Pick};

/// Better leg first: higher EV, then higher probability, then lower odds,
/// then fixture id.
pub fn compare_legs(a: &Leg, b: &Leg) -> Ordering {
    b.single_ev
        .total_cmp(&a.single_ev)
        .then_with(|| b.probability.total_cmp(&a.probability))
        .then_with(|| a.odds.total_cmp(&b.odds))
        .then_with(|| a.id().cmp(&b.id()))
}

pub struct LegPoolBuilder {
    min_leg_ev: f64,
    min_leg_probability: f64,
    max_pool_size: usize,
}

impl LegPoolBuilder {
    pub fn new(staking: &StakingConfig, limits: &EngineLimits) -> Self {
        Self {
            min_leg_ev: staking.min_leg_ev,
            min_leg_probability: staking.min_leg_probability,
            max_pool_size: limits.max_pool_size,
        }
    }

    /// Build the sorted leg pool from ranked picks.
    ///
    /// Each fixture contributes its best value outcome that clears both leg
    /// gates, or nothing. The pool never holds two legs from one fixture.
    pub fn build(&self, picks: &[Pick]) -> Vec<Leg> {
        let mut seen = BTreeSet::new();
        let mut pool = Vec::new();

        for pick in picks {
            if !seen.insert(pick.fixture.id) {
                continue;
            }
            // value_outcomes is already best first
            let qualifying = pick
                .value_outcomes
                .iter()
                .find(|o| o.ev_percent >= self.min_leg_ev && o.probability >= self.min_leg_probability);

            match qualifying {
                Some(outcome) => {
                    let leg = Leg::from_outcome(&pick.fixture, outcome);
                    debug!(leg = %leg, "Leg eligible");
                    pool.push(leg);
                }
                None if !pick.value_outcomes.is_empty() => {
                    debug!(fixture_id = %pick.fixture.id, "No value outcome clears leg gates");
                }
                None => {}
            }
        }

        pool.sort_by(compare_legs);

        if pool.len() > self.max_pool_size {
            warn!(
                eligible = pool.len(),
                kept = self.max_pool_size,
                "Leg pool truncated to strongest legs"
            );
            pool.truncate(self.max_pool_size);
        }

        info!(legs = pool.len(), "Leg pool built");
        pool
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
