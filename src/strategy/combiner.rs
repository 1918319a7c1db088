//! Accumulator combiner.
//!
//! Enumerates leg combinations by iterative backtracking over the sorted
//! pool. The search is bounded by `max_legs`, a combination budget and a
//! cancellation token, and fails whole rather than returning a partial set.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::edge::{confidence_bucket, expected_value};
use crate::config::{EngineLimits, StakingConfig};
use crate::types::{Accumulator, EngineError, Leg, LegId};

/// Namespace for content-derived accumulator ids.
const ACCUMULATOR_NAMESPACE: Uuid = Uuid::from_u128(0x6f1d_2c3a_8b4e_4f0a_9d7c_5e2b_1a3c_0d9e);

/// Deterministic id for a set of legs, independent of leg order.
pub fn accumulator_id(leg_ids: &[LegId]) -> Uuid {
    let key = leg_ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join("|");
    Uuid::new_v5(&ACCUMULATOR_NAMESPACE, key.as_bytes())
}

/// Stronger accumulator first: higher EV%, then fewer legs, then higher
/// combined probability, then leg ids.
pub fn compare_accumulators(a: &Accumulator, b: &Accumulator) -> Ordering {
    b.ev_percent
        .total_cmp(&a.ev_percent)
        .then_with(|| a.num_legs.cmp(&b.num_legs))
        .then_with(|| b.combined_probability.total_cmp(&a.combined_probability))
        .then_with(|| a.leg_ids().cmp(&b.leg_ids()))
}

/// Combiner settings, resolved from staking config and engine limits.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinerConfig {
    pub min_legs: usize,
    pub max_legs: usize,
    pub allow_same_team: bool,
    /// Minimum accumulator EV in percent
    pub min_ev_percent: f64,
    pub max_combinations: u64,
    pub cancel_check_interval: u64,
}

impl CombinerConfig {
    pub fn from_config(staking: &StakingConfig, limits: &EngineLimits) -> Self {
        Self {
            min_legs: staking.min_legs,
            max_legs: staking.max_legs,
            allow_same_team: staking.allow_same_team,
            min_ev_percent: staking.accumulator_min_ev,
            max_combinations: limits.max_combinations,
            cancel_check_interval: limits.cancel_check_interval.max(1),
        }
    }
}

pub struct AccumulatorCombiner {
    config: CombinerConfig,
}

impl AccumulatorCombiner {
    pub fn new(config: CombinerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CombinerConfig {
        &self.config
    }

    /// Whether `candidate` may join the legs already chosen.
    fn compatible(&self, pool: &[Leg], chosen: &[usize], candidate: usize) -> bool {
        let leg = &pool[candidate];
        chosen.iter().all(|&i| {
            let other = &pool[i];
            if other.fixture_id == leg.fixture_id {
                return false;
            }
            self.config.allow_same_team || !other.fixture.shares_team_with(&leg.fixture)
        })
    }

    /// Enumerate and score every valid combination of the pool.
    ///
    /// `pool` is expected sorted best first with one leg per fixture.
    /// Unstaked accumulators are returned sorted best first.
    pub fn combine(
        &self,
        pool: &[Leg],
        as_of: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Accumulator>, EngineError> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let n = pool.len();
        let CombinerConfig {
            min_legs,
            max_legs,
            max_combinations,
            cancel_check_interval,
            ..
        } = self.config;

        if n < min_legs {
            debug!(pool = n, min_legs, "Not enough legs to combine");
            return Ok(Vec::new());
        }

        let mut accumulators = Vec::new();
        let mut seen: HashSet<Vec<LegId>> = HashSet::new();
        let mut chosen: Vec<usize> = Vec::with_capacity(max_legs);
        let mut next = 0usize;
        let mut steps: u64 = 0;
        let mut scored: u64 = 0;
        let mut rejected_correlated: u64 = 0;

        loop {
            // Extend while there is room and enough pool left to reach min_legs
            if chosen.len() < max_legs && next < n && chosen.len() + (n - next) >= min_legs {
                steps += 1;
                if steps % cancel_check_interval == 0 && cancel.is_cancelled() {
                    warn!(steps, "Accumulator search cancelled");
                    return Err(EngineError::Cancelled);
                }

                let candidate = next;
                next += 1;

                if !self.compatible(pool, &chosen, candidate) {
                    rejected_correlated += 1;
                    continue;
                }
                chosen.push(candidate);

                if chosen.len() >= min_legs {
                    scored += 1;
                    if scored > max_combinations {
                        warn!(limit = max_combinations, pool = n, max_legs, "Combination budget exceeded");
                        return Err(EngineError::CombinationBudgetExceeded {
                            limit: max_combinations,
                        });
                    }
                    if let Some(acc) = self.score(pool, &chosen, as_of) {
                        if seen.insert(acc.leg_ids()) {
                            accumulators.push(acc);
                        }
                    }
                }
                continue;
            }

            // Backtrack
            match chosen.pop() {
                Some(last) => next = last + 1,
                None => break,
            }
        }

        accumulators.sort_by(compare_accumulators);

        info!(
            pool = n,
            combinations = scored,
            correlated = rejected_correlated,
            kept = accumulators.len(),
            "Accumulators generated"
        );

        Ok(accumulators)
    }

    /// Score one combination; `None` if it misses the EV bar.
    fn score(&self, pool: &[Leg], chosen: &[usize], as_of: DateTime<Utc>) -> Option<Accumulator> {
        let legs: Vec<Leg> = chosen.iter().map(|&i| pool[i].clone()).collect();
        let combined_probability: f64 = legs.iter().map(|l| l.probability).product();
        let combined_odds: f64 = legs.iter().map(|l| l.odds).product();
        let ev = expected_value(combined_probability, combined_odds);
        let ev_percent = ev * 100.0;

        if ev_percent < self.config.min_ev_percent {
            return None;
        }

        let mut ids: Vec<LegId> = legs.iter().map(Leg::id).collect();
        ids.sort();

        Some(Accumulator {
            id: accumulator_id(&ids),
            num_legs: legs.len(),
            legs,
            combined_probability,
            combined_odds,
            expected_value: ev,
            ev_percent,
            suggested_stake: 0.0,
            potential_return: 0.0,
            confidence: confidence_bucket(ev_percent, combined_probability),
            generated_at: as_of,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
