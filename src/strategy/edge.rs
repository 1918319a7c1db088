//! Outcome evaluation.
//!
//! Turns a (probability, decimal odds) pair into expected value, a
//! fractional-Kelly stake and a confidence label. Out-of-range inputs are
//! rejected per outcome and never abort a run.

use tracing::debug;

use super::kelly::{KellyCalculator, KellyConfig, SizedStake};
use crate::types::{Confidence, OutcomeRejection};

/// EV% at or above which an outcome can be labelled `high`.
pub const HIGH_CONFIDENCE_EV: f64 = 10.0;
/// Probability at or above which an outcome can be labelled `high`.
pub const HIGH_CONFIDENCE_PROBABILITY: f64 = 0.55;
/// EV% at or above which an outcome is labelled `medium`.
pub const MEDIUM_CONFIDENCE_EV: f64 = 5.0;

/// Expected value per unit staked: `p × odds − 1`.
pub fn expected_value(probability: f64, odds: f64) -> f64 {
    probability * odds - 1.0
}

/// Confidence label from EV% and win probability.
pub fn confidence_bucket(ev_percent: f64, probability: f64) -> Confidence {
    if ev_percent >= HIGH_CONFIDENCE_EV && probability >= HIGH_CONFIDENCE_PROBABILITY {
        Confidence::High
    } else if ev_percent >= MEDIUM_CONFIDENCE_EV {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

/// Check a (probability, odds) pair before any arithmetic.
pub fn validate(probability: f64, odds: f64) -> Result<(), OutcomeRejection> {
    if !(0.0..=1.0).contains(&probability) {
        return Err(OutcomeRejection::ProbabilityOutOfRange(probability));
    }
    if !odds.is_finite() || odds < 1.0 {
        return Err(OutcomeRejection::OddsBelowOne(odds));
    }
    Ok(())
}

/// Result of evaluating one proposition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub ev: f64,
    pub ev_percent: f64,
    pub stake: SizedStake,
    pub confidence: Confidence,
}

/// Evaluates propositions under one Kelly configuration.
pub struct OutcomeEvaluator {
    kelly: KellyCalculator,
}

impl OutcomeEvaluator {
    pub fn new(config: KellyConfig) -> Self {
        Self {
            kelly: KellyCalculator::new(config),
        }
    }

    pub fn config(&self) -> &KellyConfig {
        self.kelly.config()
    }

    /// Evaluate one proposition against the bankroll.
    ///
    /// EV drives filtering and ranking; the stake follows Kelly alone, so a
    /// positive-EV outcome with non-positive Kelly still stakes nothing.
    pub fn evaluate(&self, probability: f64, odds: f64, bankroll: f64) -> Result<Evaluation, OutcomeRejection> {
        validate(probability, odds)?;

        let ev = expected_value(probability, odds);
        let ev_percent = ev * 100.0;
        let stake = self.kelly.size(probability, odds, bankroll);
        let confidence = confidence_bucket(ev_percent, probability);

        debug!(
            probability = format!("{:.1}%", probability * 100.0),
            odds = format!("{:.2}", odds),
            ev = format!("{:+.1}%", ev_percent),
            stake = format!("{:.2}", stake.amount),
            confidence = %confidence,
            "Outcome evaluated"
        );

        Ok(Evaluation {
            ev,
            ev_percent,
            stake,
            confidence,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
