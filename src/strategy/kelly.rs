//! Kelly criterion stake sizing.
//!
//! Computes fractional-Kelly stakes from decimal odds with a per-bet cap.
//! Amounts are rounded to whole cents and never leave `[0, cap]`.

use rust_decimal::prelude::*;
use tracing::debug;

/// Raw Kelly fraction for decimal odds.
///
/// Kelly formula: f* = (bp - q) / b
/// where:
///   b = odds - 1 (net payout per unit staked)
///   p = win probability
///   q = 1 - p
///
/// The numerator is evaluated as `p × odds − 1`, the same expression as
/// expected value, so the fraction is never positive when `p × odds ≤ 1`.
/// Odds of 1.0 or less pay nothing, so the fraction is 0.
pub fn kelly_fraction(probability: f64, odds: f64) -> f64 {
    let b = odds - 1.0;
    if b <= 0.0 {
        return 0.0;
    }
    (probability * odds - 1.0) / b
}

/// Round a currency amount to cents, half away from zero.
pub fn round_cents(amount: f64) -> f64 {
    Decimal::from_f64(amount)
        .map(|d| d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_f64())
        .unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Kelly sizing configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KellyConfig {
    /// Fractional Kelly multiplier (0.25 = quarter-Kelly). Lower = more conservative.
    pub multiplier: f64,
    /// Maximum bet as a fraction of bankroll.
    pub max_bet_pct: f64,
}

impl Default for KellyConfig {
    fn default() -> Self {
        Self {
            multiplier: 0.25,
            max_bet_pct: 0.05,
        }
    }
}

// ---------------------------------------------------------------------------
// Kelly calculator
// ---------------------------------------------------------------------------

/// Sized stake for one proposition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizedStake {
    pub kelly_fraction: f64, // Raw Kelly fraction (may be negative)
    pub bet_fraction: f64,   // After multiplier + cap
    pub amount: f64,         // Currency amount, rounded to cents
}

impl SizedStake {
    pub fn zero(kelly_fraction: f64) -> Self {
        Self {
            kelly_fraction,
            bet_fraction: 0.0,
            amount: 0.0,
        }
    }
}

pub struct KellyCalculator {
    config: KellyConfig,
}

impl KellyCalculator {
    pub fn new(config: KellyConfig) -> Self {
        Self { config }
    }

    /// Access the Kelly configuration.
    pub fn config(&self) -> &KellyConfig {
        &self.config
    }

    /// Size a stake: `clamp(f* × multiplier, 0, max_bet_pct) × bankroll`.
    ///
    /// A non-positive Kelly fraction always yields a zero stake, whatever
    /// the EV says.
    pub fn size(&self, probability: f64, odds: f64, bankroll: f64) -> SizedStake {
        let kelly = kelly_fraction(probability, odds);

        if kelly <= 0.0 || bankroll <= 0.0 {
            return SizedStake::zero(kelly);
        }

        let fraction = (kelly * self.config.multiplier).clamp(0.0, self.config.max_bet_pct);
        let cap = self.config.max_bet_pct * bankroll;
        let amount = round_cents(fraction * bankroll).clamp(0.0, cap);

        debug!(
            raw_kelly = format!("{:.2}%", kelly * 100.0),
            fractional = format!("{:.2}%", fraction * 100.0),
            amount = format!("{:.2}", amount),
            "Stake sized"
        );

        SizedStake {
            kelly_fraction: kelly,
            bet_fraction: fraction,
            amount,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
