//! Strategy engine: outcome evaluation, pick selection, leg pooling,
//! accumulator combination and stake allocation.

pub mod combiner;
pub mod edge;
pub mod kelly;
pub mod legs;
pub mod picker;
pub mod risk;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{EngineLimits, StakingConfig};
use crate::data::EvaluationInput;
use crate::types::{
    Accumulator, AccumulatorSummary, EngineError, FixtureId, Pick, PicksSummary, RejectedOutcome,
};
use combiner::{AccumulatorCombiner, CombinerConfig};
use kelly::round_cents;
use legs::LegPoolBuilder;
use picker::{PickerOutput, SingleMarketPicker};

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Ranked, staked picks with their summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickReport {
    pub picks: Vec<Pick>,
    pub summary: PicksSummary,
}

/// Ranked, staked accumulators with their summary and the config used.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccumulatorReport {
    pub accumulators: Vec<Accumulator>,
    pub summary: AccumulatorSummary,
    pub config: StakingConfig,
    pub generated_at: DateTime<Utc>,
}

/// Everything one evaluation produced, including what was rejected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub bankroll: f64,
    pub as_of: DateTime<Utc>,
    pub picks: PickReport,
    pub accumulators: AccumulatorReport,
    pub rejections: Vec<RejectedOutcome>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Pipelines picker → leg pool → combiner → allocator.
///
/// Holds only configuration. Every call builds its results from the given
/// input, so one engine can be shared across threads and identical inputs
/// always give identical reports.
pub struct Engine {
    staking: StakingConfig,
    limits: EngineLimits,
    picker: SingleMarketPicker,
    legs: LegPoolBuilder,
    combiner: AccumulatorCombiner,
}

impl Engine {
    /// Validate configuration and build the pipeline.
    pub fn new(staking: StakingConfig, limits: EngineLimits) -> Result<Self, EngineError> {
        limits.validate()?;
        staking.validate(&limits)?;

        if staking.allow_same_fixture {
            warn!("allow_same_fixture is set but ignored: legs never share a fixture");
        }

        Ok(Self {
            picker: SingleMarketPicker::new(&staking),
            legs: LegPoolBuilder::new(&staking, &limits),
            combiner: AccumulatorCombiner::new(CombinerConfig::from_config(&staking, &limits)),
            staking,
            limits,
        })
    }

    pub fn staking(&self) -> &StakingConfig {
        &self.staking
    }

    pub fn limits(&self) -> &EngineLimits {
        &self.limits
    }

    fn check_bankroll(bankroll: f64) -> Result<(), EngineError> {
        if !bankroll.is_finite() || bankroll < 0.0 {
            return Err(EngineError::InvalidBankroll(bankroll));
        }
        Ok(())
    }

    /// Evaluate, rank and stake every pick.
    fn run_picks(&self, input: &EvaluationInput) -> Result<PickerOutput, EngineError> {
        Self::check_bankroll(input.bankroll)?;
        let mut output = self.picker.pick_all(input);
        risk::allocate_picks(&mut output.picks, &self.staking, input.bankroll);
        Ok(output)
    }

    /// Build, rank and stake accumulators from already ranked picks.
    fn run_accumulators(
        &self,
        picks: &[Pick],
        input: &EvaluationInput,
        cancel: &CancellationToken,
    ) -> Result<AccumulatorReport, EngineError> {
        let pool = self.legs.build(picks);
        let mut accumulators = self.combiner.combine(&pool, input.as_of, cancel)?;
        risk::allocate_accumulators(&mut accumulators, &self.staking, input.bankroll);

        let summary = summarize_accumulators(
            &accumulators,
            input.bankroll,
            self.staking.max_stake_allocation(input.bankroll),
        );

        Ok(AccumulatorReport {
            accumulators,
            summary,
            config: self.staking.clone(),
            generated_at: input.as_of,
        })
    }

    /// Single-market picks only.
    pub fn evaluate_picks(&self, input: &EvaluationInput) -> Result<PickReport, EngineError> {
        let output = self.run_picks(input)?;
        let summary = summarize_picks(&output.picks, input.bankroll);
        Ok(PickReport {
            picks: output.picks,
            summary,
        })
    }

    /// One fixture's pick, staked as it would be in the full list.
    pub fn evaluate_fixture(
        &self,
        input: &EvaluationInput,
        fixture_id: FixtureId,
    ) -> Result<Option<Pick>, EngineError> {
        let output = self.run_picks(input)?;
        Ok(output.picks.into_iter().find(|p| p.fixture.id == fixture_id))
    }

    /// Accumulators only.
    pub fn evaluate_accumulators(
        &self,
        input: &EvaluationInput,
        cancel: &CancellationToken,
    ) -> Result<AccumulatorReport, EngineError> {
        let output = self.run_picks(input)?;
        self.run_accumulators(&output.picks, input, cancel)
    }

    /// Full evaluation: picks, accumulators and rejected outcomes.
    pub fn evaluate(
        &self,
        input: &EvaluationInput,
        cancel: &CancellationToken,
    ) -> Result<EvaluationReport, EngineError> {
        let output = self.run_picks(input)?;
        let accumulators = self.run_accumulators(&output.picks, input, cancel)?;
        let summary = summarize_picks(&output.picks, input.bankroll);

        info!(
            fixtures = input.fixtures.len(),
            picks = output.picks.len(),
            value_bets = summary.total_value_bets,
            accumulators = accumulators.accumulators.len(),
            rejected = output.rejections.len(),
            pick_stake = format!("{:.2}", summary.total_suggested_stake),
            accumulator_stake = format!("{:.2}", accumulators.summary.total_suggested_stake),
            "Evaluation complete"
        );

        Ok(EvaluationReport {
            bankroll: input.bankroll,
            as_of: input.as_of,
            picks: PickReport {
                picks: output.picks,
                summary,
            },
            accumulators,
            rejections: output.rejections,
        })
    }
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

pub fn summarize_picks(picks: &[Pick], bankroll: f64) -> PicksSummary {
    let mut picks_by_market: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_stake = 0.0;
    let mut total_expected_value = 0.0;
    let mut ev_sum = 0.0;
    let mut with_best = 0usize;

    for pick in picks {
        let Some(best) = &pick.best_outcome else {
            continue;
        };
        with_best += 1;
        ev_sum += best.ev;
        if pick.suggested_stake > 0.0 {
            *picks_by_market.entry(best.selection.kind().key().to_string()).or_default() += 1;
            total_stake += pick.suggested_stake;
            total_expected_value += best.ev * pick.suggested_stake;
        }
    }

    PicksSummary {
        total_picks: picks.len(),
        total_value_bets: picks.iter().map(|p| p.value_outcomes.len()).sum(),
        total_suggested_stake: round_cents(total_stake),
        total_expected_value: round_cents(total_expected_value),
        picks_by_market,
        average_ev: if with_best > 0 { ev_sum / with_best as f64 } else { 0.0 },
        bankroll,
    }
}

pub fn summarize_accumulators(
    accumulators: &[Accumulator],
    bankroll: f64,
    max_stake_allocation: f64,
) -> AccumulatorSummary {
    let count = accumulators.len();
    let ev_sum: f64 = accumulators.iter().map(|a| a.expected_value).sum();
    let best_ev = accumulators
        .iter()
        .map(|a| a.expected_value)
        .fold(None, |best: Option<f64>, ev| Some(best.map_or(ev, |b| b.max(ev))))
        .unwrap_or(0.0);

    AccumulatorSummary {
        total_accumulators: count,
        total_doubles: accumulators.iter().filter(|a| a.num_legs == 2).count(),
        total_trebles: accumulators.iter().filter(|a| a.num_legs == 3).count(),
        total_suggested_stake: round_cents(accumulators.iter().map(|a| a.suggested_stake).sum()),
        total_potential_return: round_cents(accumulators.iter().map(|a| a.potential_return).sum()),
        average_ev: if count > 0 { ev_sum / count as f64 } else { 0.0 },
        best_ev,
        bankroll,
        max_stake_allocation,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
