//! Configuration loading from TOML.
//!
//! Reads `config.toml` (or the file named by `ODDSIQ_CONFIG`) and
//! deserializes into strongly-typed structs. Every staking knob has a
//! default, so a config file only needs to name what it changes.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::types::{EngineError, MarketKind};

/// Default config file path, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Env var that overrides the config file path.
pub const CONFIG_PATH_ENV: &str = "ODDSIQ_CONFIG";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub app: AppSection,
    #[serde(default)]
    pub staking: StakingConfig,
    #[serde(default)]
    pub limits: EngineLimits,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSection {
    pub name: String,
    pub default_bankroll: f64,
    pub currency: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SnapshotConfig {
    /// JSON snapshot of fixtures, odds and probabilities
    pub path: String,
    /// Fixtures kicking off later than this are ignored
    pub lookahead_days: i64,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: "snapshot.json".to_string(),
            lookahead_days: 7,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub evaluation_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            evaluation_timeout_ms: 5_000,
        }
    }
}

// ---------------------------------------------------------------------------
// Staking
// ---------------------------------------------------------------------------

/// Per-market multipliers applied on top of `kelly_fraction` for single picks.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct MarketKellyScale {
    pub match_result: f64,
    pub totals: f64,
    pub btts: f64,
}

impl Default for MarketKellyScale {
    fn default() -> Self {
        Self {
            match_result: 1.0,
            totals: 0.8, // goal markets are noisier
            btts: 0.8,
        }
    }
}

impl MarketKellyScale {
    pub fn for_kind(&self, kind: MarketKind) -> f64 {
        match kind {
            MarketKind::MatchResult => self.match_result,
            MarketKind::Totals => self.totals,
            MarketKind::BothTeamsToScore => self.btts,
        }
    }
}

/// Staking and selection knobs. EV thresholds are in percent (5.0 = 5%);
/// probabilities and bankroll fractions are plain fractions.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct StakingConfig {
    /// Fractional Kelly multiplier for single picks (0.25 = quarter-Kelly).
    pub kelly_fraction: f64,
    /// Fractional Kelly multiplier for accumulators.
    pub accumulator_kelly_fraction: f64,
    /// Per-pick cap as a fraction of bankroll.
    pub max_bet_percentage: f64,
    /// Per-accumulator cap, and default aggregate accumulator cap, as a fraction of bankroll.
    pub max_stake_percent: f64,
    /// Explicit aggregate accumulator cap in currency units.
    pub max_stake_allocation: Option<f64>,
    /// Aggregate cap on single-pick stakes as a fraction of bankroll.
    pub max_pick_exposure_percent: f64,
    /// Minimum EV% for an outcome to count as a value bet.
    pub min_ev_threshold: f64,
    /// Minimum EV% for an accumulator to be kept.
    pub accumulator_min_ev: f64,
    /// Minimum EV% for a value outcome to become a leg.
    pub min_leg_ev: f64,
    /// Minimum probability for a value outcome to become a leg.
    pub min_leg_probability: f64,
    pub min_legs: usize,
    pub max_legs: usize,
    /// Allow two legs whose fixtures share a team.
    pub allow_same_team: bool,
    /// Accepted for compatibility; legs never share a fixture regardless.
    pub allow_same_fixture: bool,
    pub market_kelly_scale: MarketKellyScale,
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            kelly_fraction: 0.25,
            accumulator_kelly_fraction: 0.125,
            max_bet_percentage: 0.05,
            max_stake_percent: 0.20,
            max_stake_allocation: None,
            max_pick_exposure_percent: 0.30,
            min_ev_threshold: 3.0,
            accumulator_min_ev: 10.0,
            min_leg_ev: 5.0,
            min_leg_probability: 0.40,
            min_legs: 2,
            max_legs: 3,
            allow_same_team: false,
            allow_same_fixture: false,
            market_kelly_scale: MarketKellyScale::default(),
        }
    }
}

impl StakingConfig {
    /// Kelly multiplier for a single pick in the given market.
    pub fn kelly_fraction_for(&self, kind: MarketKind) -> f64 {
        self.kelly_fraction * self.market_kelly_scale.for_kind(kind)
    }

    /// Aggregate accumulator budget in currency units.
    pub fn max_stake_allocation(&self, bankroll: f64) -> f64 {
        self.max_stake_allocation
            .unwrap_or(self.max_stake_percent * bankroll)
    }

    /// Aggregate single-pick budget in currency units.
    pub fn max_pick_exposure(&self, bankroll: f64) -> f64 {
        self.max_pick_exposure_percent * bankroll
    }

    /// Reject inconsistent settings before any computation runs.
    pub fn validate(&self, limits: &EngineLimits) -> Result<(), EngineError> {
        let fraction = |name: &str, v: f64| -> Result<(), EngineError> {
            if !v.is_finite() || v <= 0.0 || v > 1.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} must be in (0, 1], got {v}"
                )));
            }
            Ok(())
        };

        fraction("kelly_fraction", self.kelly_fraction)?;
        fraction("accumulator_kelly_fraction", self.accumulator_kelly_fraction)?;
        fraction("max_bet_percentage", self.max_bet_percentage)?;
        fraction("max_stake_percent", self.max_stake_percent)?;
        fraction("max_pick_exposure_percent", self.max_pick_exposure_percent)?;

        for kind in MarketKind::ALL {
            let scale = self.market_kelly_scale.for_kind(*kind);
            if !scale.is_finite() || scale < 0.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "market_kelly_scale.{kind} must be non-negative, got {scale}"
                )));
            }
        }

        if let Some(cap) = self.max_stake_allocation {
            if !cap.is_finite() || cap < 0.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "max_stake_allocation must be non-negative, got {cap}"
                )));
            }
        }

        for (name, v) in [
            ("min_ev_threshold", self.min_ev_threshold),
            ("accumulator_min_ev", self.accumulator_min_ev),
            ("min_leg_ev", self.min_leg_ev),
        ] {
            if !v.is_finite() {
                return Err(EngineError::InvalidConfig(format!("{name} must be finite")));
            }
        }

        if !(0.0..=1.0).contains(&self.min_leg_probability) {
            return Err(EngineError::InvalidConfig(format!(
                "min_leg_probability must be in [0, 1], got {}",
                self.min_leg_probability
            )));
        }

        if self.min_legs < 2 {
            return Err(EngineError::InvalidConfig(format!(
                "min_legs must be at least 2, got {}",
                self.min_legs
            )));
        }
        if self.min_legs > self.max_legs {
            return Err(EngineError::InvalidConfig(format!(
                "min_legs ({}) > max_legs ({})",
                self.min_legs, self.max_legs
            )));
        }
        if self.max_legs > limits.max_legs_ceiling {
            return Err(EngineError::InvalidConfig(format!(
                "max_legs ({}) exceeds ceiling ({})",
                self.max_legs, limits.max_legs_ceiling
            )));
        }

        Ok(())
    }
}

/// Hard bounds on combinatorial work.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct EngineLimits {
    /// Legs beyond this many (lowest EV first) are dropped before combination.
    pub max_pool_size: usize,
    /// Highest `max_legs` a config may ask for.
    pub max_legs_ceiling: usize,
    /// Scored combinations allowed per evaluation before giving up.
    pub max_combinations: u64,
    /// Search steps between cancellation checks.
    pub cancel_check_interval: u64,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_pool_size: 40,
            max_legs_ceiling: 6,
            max_combinations: 2_000_000,
            cancel_check_interval: 4_096,
        }
    }
}

impl EngineLimits {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_pool_size == 0 {
            return Err(EngineError::InvalidConfig("max_pool_size must be positive".into()));
        }
        if self.max_legs_ceiling < 2 {
            return Err(EngineError::InvalidConfig("max_legs_ceiling must be at least 2".into()));
        }
        if self.cancel_check_interval == 0 {
            return Err(EngineError::InvalidConfig(
                "cancel_check_interval must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Config path from `ODDSIQ_CONFIG`, falling back to `config.toml`.
    pub fn resolve_path() -> String {
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
    }
}
