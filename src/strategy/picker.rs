//! Single-market picker.
//!
//! Evaluates every priced and modelled outcome of each fixture, picks the
//! best one and filters the value subset. A fixture with nothing to
//! evaluate still yields a pick, just an empty one.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::{debug, info};

use super::edge::OutcomeEvaluator;
use super::kelly::KellyConfig;
use crate::config::StakingConfig;
use crate::data::EvaluationInput;
use crate::types::{Fixture, MarketKind, MarketOutcome, OutcomeRejection, Pick, RejectedOutcome, Selection};

/// Better outcome first: higher EV, then higher probability, then lower
/// odds, then selection order.
pub fn compare_outcomes(a: &MarketOutcome, b: &MarketOutcome) -> Ordering {
    b.ev.total_cmp(&a.ev)
        .then_with(|| b.probability.total_cmp(&a.probability))
        .then_with(|| a.best_odds.total_cmp(&b.best_odds))
        .then_with(|| a.selection.cmp(&b.selection))
}

/// Stronger pick first, by its best outcome. Picks without one go last.
pub fn compare_picks(a: &Pick, b: &Pick) -> Ordering {
    match (&a.best_outcome, &b.best_outcome) {
        (Some(x), Some(y)) => compare_outcomes(x, y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.fixture.id.cmp(&b.fixture.id))
}

/// Output of one picker pass.
#[derive(Debug, Clone, Default)]
pub struct PickerOutput {
    /// Ranked, best first
    pub picks: Vec<Pick>,
    pub rejections: Vec<RejectedOutcome>,
}

pub struct SingleMarketPicker {
    match_result: OutcomeEvaluator,
    totals: OutcomeEvaluator,
    btts: OutcomeEvaluator,
    min_ev_threshold: f64,
}

impl SingleMarketPicker {
    pub fn new(staking: &StakingConfig) -> Self {
        let evaluator = |kind| {
            OutcomeEvaluator::new(KellyConfig {
                multiplier: staking.kelly_fraction_for(kind),
                max_bet_pct: staking.max_bet_percentage,
            })
        };
        Self {
            match_result: evaluator(MarketKind::MatchResult),
            totals: evaluator(MarketKind::Totals),
            btts: evaluator(MarketKind::BothTeamsToScore),
            min_ev_threshold: staking.min_ev_threshold,
        }
    }

    fn evaluator(&self, kind: MarketKind) -> &OutcomeEvaluator {
        match kind {
            MarketKind::MatchResult => &self.match_result,
            MarketKind::Totals => &self.totals,
            MarketKind::BothTeamsToScore => &self.btts,
        }
    }

    /// Evaluate every fixture that has not kicked off, ranked best first.
    pub fn pick_all(&self, input: &EvaluationInput) -> PickerOutput {
        let mut output = PickerOutput::default();
        let mut seen = BTreeSet::new();

        for fixture in &input.fixtures {
            if fixture.has_kicked_off(input.as_of) {
                debug!(fixture_id = %fixture.id, kickoff = %fixture.kickoff, "Skipping fixture past kickoff");
                continue;
            }
            if !seen.insert(fixture.id) {
                debug!(fixture_id = %fixture.id, "Skipping duplicate fixture");
                continue;
            }
            let pick = self.pick_fixture(fixture, input, &mut output.rejections);
            output.picks.push(pick);
        }

        output.picks.sort_by(compare_picks);

        info!(
            picks = output.picks.len(),
            value_bets = output.picks.iter().map(|p| p.value_outcomes.len()).sum::<usize>(),
            rejected = output.rejections.len(),
            "Picks evaluated"
        );

        output
    }

    /// Evaluate one fixture. Rejected outcomes are appended to `rejections`.
    pub fn pick_fixture(
        &self,
        fixture: &Fixture,
        input: &EvaluationInput,
        rejections: &mut Vec<RejectedOutcome>,
    ) -> Pick {
        let mut all_outcomes = Vec::new();

        for selection in input.selections_for(fixture.id) {
            match self.evaluate_outcome(fixture, selection, input) {
                Ok(outcome) => all_outcomes.push(outcome),
                Err(reason) => {
                    debug!(fixture_id = %fixture.id, selection = %selection, reason = %reason, "Outcome rejected");
                    rejections.push(RejectedOutcome {
                        fixture_id: fixture.id,
                        selection,
                        reason,
                    });
                }
            }
        }

        let best_outcome = all_outcomes.iter().min_by(|a, b| compare_outcomes(a, b)).cloned();

        let mut value_outcomes: Vec<MarketOutcome> = all_outcomes
            .iter()
            .filter(|o| o.ev_percent >= self.min_ev_threshold)
            .cloned()
            .collect();
        value_outcomes.sort_by(compare_outcomes);

        let total_ev = value_outcomes.iter().map(|o| o.ev).sum();
        let suggested_stake = best_outcome.as_ref().map_or(0.0, |o| o.kelly_stake);

        if let Some(best) = &best_outcome {
            debug!(fixture_id = %fixture.id, best = %best, value = value_outcomes.len(), "Fixture evaluated");
        }

        Pick {
            fixture: fixture.clone(),
            all_outcomes,
            best_outcome,
            value_outcomes,
            suggested_stake,
            total_ev,
            evaluated_at: input.as_of,
        }
    }

    fn evaluate_outcome(
        &self,
        fixture: &Fixture,
        selection: Selection,
        input: &EvaluationInput,
    ) -> Result<MarketOutcome, OutcomeRejection> {
        let probability = input
            .probabilities
            .get(fixture.id, &selection)
            .ok_or(OutcomeRejection::MissingProbability)?;
        let price = input
            .odds
            .get(fixture.id, &selection)
            .ok_or(OutcomeRejection::MissingOdds)?;

        let evaluation = self
            .evaluator(selection.kind())
            .evaluate(probability, price.price, input.bankroll)?;

        Ok(MarketOutcome {
            selection,
            description: selection.description(),
            probability,
            best_odds: price.price,
            bookmaker: price.bookmaker.clone(),
            ev: evaluation.ev,
            ev_percent: evaluation.ev_percent,
            kelly_stake: evaluation.stake.amount,
            confidence_bucket: evaluation.confidence,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
