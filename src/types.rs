//! Shared types for the ODDSIQ engine.
//!
//! These types form the data model used across the strategy pipeline,
//! the input boundary and the HTTP layer. Markets and outcomes are a
//! closed set of variants: free-form strings from upstream providers are
//! parsed into them once, at the boundary, and never travel further.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Fixture identity as assigned by the fixtures store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FixtureId(pub i64);

impl fmt::Display for FixtureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Team identity as assigned by the teams store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub i64);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

/// A scheduled football match. Supplied externally; never mutated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub id: FixtureId,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub kickoff: DateTime<Utc>,
    pub season: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<String>,
}

impl fmt::Display for Fixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} team {} v team {} ({}, season {})",
            self.id,
            self.home_team_id,
            self.away_team_id,
            self.kickoff.format("%Y-%m-%d %H:%M"),
            self.season,
        )
    }
}

impl Fixture {
    /// Both team ids, home first.
    pub fn teams(&self) -> [TeamId; 2] {
        [self.home_team_id, self.away_team_id]
    }

    /// Whether any team plays in both fixtures.
    pub fn shares_team_with(&self, other: &Fixture) -> bool {
        self.teams().iter().any(|t| other.teams().contains(t))
    }

    /// Whether the match has started at `as_of`. Started fixtures are not evaluated.
    pub fn has_kicked_off(&self, as_of: DateTime<Utc>) -> bool {
        self.kickoff <= as_of
    }
}

// ---------------------------------------------------------------------------
// Markets and outcomes
// ---------------------------------------------------------------------------

/// A totals line, stored exactly in hundredths of a goal (250 = 2.5 goals).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct GoalLine(u16);

impl GoalLine {
    /// Highest line accepted at the boundary.
    pub const MAX_GOALS: f64 = 20.0;

    /// Build a line from a goal count such as `2.5` or `2.25`.
    /// Returns `None` for negative, non-finite, oversized or sub-hundredth values.
    pub fn from_goals(goals: f64) -> Option<Self> {
        if !goals.is_finite() || !(0.0..=Self::MAX_GOALS).contains(&goals) {
            return None;
        }
        let hundredths = (goals * 100.0).round();
        if (hundredths / 100.0 - goals).abs() > 1e-6 {
            return None;
        }
        Some(GoalLine(hundredths as u16))
    }

    pub fn hundredths(self) -> u16 {
        self.0
    }

    pub fn as_goals(self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl fmt::Display for GoalLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            write!(f, "{whole}")
        } else if frac % 10 == 0 {
            write!(f, "{whole}.{}", frac / 10)
        } else {
            write!(f, "{whole}.{frac:02}")
        }
    }
}

impl TryFrom<f64> for GoalLine {
    type Error = SelectionParseError;

    fn try_from(goals: f64) -> Result<Self, Self::Error> {
        GoalLine::from_goals(goals).ok_or_else(|| SelectionParseError::InvalidLine(goals.to_string()))
    }
}

impl From<GoalLine> for f64 {
    fn from(line: GoalLine) -> f64 {
        line.as_goals()
    }
}

/// Match result (1X2) outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultOutcome {
    Home,
    Draw,
    Away,
}

/// Totals (over/under) outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalsOutcome {
    Over,
    Under,
}

/// Both-teams-to-score outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BttsOutcome {
    Yes,
    No,
}

/// Market family, without the outcome. Used for per-market sizing and summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketKind {
    MatchResult,
    Totals,
    BothTeamsToScore,
}

impl MarketKind {
    pub const ALL: &'static [MarketKind] = &[
        MarketKind::MatchResult,
        MarketKind::Totals,
        MarketKind::BothTeamsToScore,
    ];

    /// Short key used in summaries and wire payloads.
    pub fn key(self) -> &'static str {
        match self {
            MarketKind::MatchResult => "1x2",
            MarketKind::Totals => "totals",
            MarketKind::BothTeamsToScore => "btts",
        }
    }
}

impl fmt::Display for MarketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A single wagerable proposition: market plus outcome (plus line for totals).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "market")]
pub enum Selection {
    #[serde(rename = "1x2")]
    MatchResult { outcome: ResultOutcome },
    #[serde(rename = "totals")]
    Totals { line: GoalLine, outcome: TotalsOutcome },
    #[serde(rename = "btts")]
    BothTeamsToScore { outcome: BttsOutcome },
}

impl Selection {
    pub fn home() -> Self {
        Selection::MatchResult { outcome: ResultOutcome::Home }
    }

    pub fn draw() -> Self {
        Selection::MatchResult { outcome: ResultOutcome::Draw }
    }

    pub fn away() -> Self {
        Selection::MatchResult { outcome: ResultOutcome::Away }
    }

    pub fn over(line: GoalLine) -> Self {
        Selection::Totals { line, outcome: TotalsOutcome::Over }
    }

    pub fn under(line: GoalLine) -> Self {
        Selection::Totals { line, outcome: TotalsOutcome::Under }
    }

    pub fn btts(yes: bool) -> Self {
        let outcome = if yes { BttsOutcome::Yes } else { BttsOutcome::No };
        Selection::BothTeamsToScore { outcome }
    }

    pub fn kind(&self) -> MarketKind {
        match self {
            Selection::MatchResult { .. } => MarketKind::MatchResult,
            Selection::Totals { .. } => MarketKind::Totals,
            Selection::BothTeamsToScore { .. } => MarketKind::BothTeamsToScore,
        }
    }

    /// Stable, compact key: `1x2:home`, `totals(2.5):over`, `btts:yes`.
    pub fn key(&self) -> String {
        match self {
            Selection::MatchResult { outcome } => {
                let o = match outcome {
                    ResultOutcome::Home => "home",
                    ResultOutcome::Draw => "draw",
                    ResultOutcome::Away => "away",
                };
                format!("1x2:{o}")
            }
            Selection::Totals { line, outcome } => {
                let o = match outcome {
                    TotalsOutcome::Over => "over",
                    TotalsOutcome::Under => "under",
                };
                format!("totals({line}):{o}")
            }
            Selection::BothTeamsToScore { outcome } => {
                let o = match outcome {
                    BttsOutcome::Yes => "yes",
                    BttsOutcome::No => "no",
                };
                format!("btts:{o}")
            }
        }
    }

    /// Human-readable description, e.g. "Home Win" or "Over 2.5 Goals".
    pub fn description(&self) -> String {
        match self {
            Selection::MatchResult { outcome } => match outcome {
                ResultOutcome::Home => "Home Win".to_string(),
                ResultOutcome::Draw => "Draw".to_string(),
                ResultOutcome::Away => "Away Win".to_string(),
            },
            Selection::Totals { line, outcome } => match outcome {
                TotalsOutcome::Over => format!("Over {line} Goals"),
                TotalsOutcome::Under => format!("Under {line} Goals"),
            },
            Selection::BothTeamsToScore { outcome } => match outcome {
                BttsOutcome::Yes => "BTTS Yes".to_string(),
                BttsOutcome::No => "BTTS No".to_string(),
            },
        }
    }

    /// Parse the loosely-typed market/outcome strings used by odds and
    /// probability providers. Matching is case-insensitive.
    ///
    /// Totals lines come from `line` when given, else from the outcome
    /// itself (`over_2_5`, `under 3.5`).
    pub fn parse(market: &str, outcome: &str, line: Option<f64>) -> Result<Self, SelectionParseError> {
        let market_lc = market.trim().to_lowercase();
        let outcome_lc = outcome.trim().to_lowercase();

        let kind = match market_lc.as_str() {
            "1x2" | "h2h" | "match_result" | "match_winner" => MarketKind::MatchResult,
            "totals" | "over_under" | "ou" | "total_goals" => MarketKind::Totals,
            "btts" | "both_teams_to_score" => MarketKind::BothTeamsToScore,
            _ => return Err(SelectionParseError::UnknownMarket(market.to_string())),
        };

        let unknown = || SelectionParseError::UnknownOutcome {
            market: market.to_string(),
            outcome: outcome.to_string(),
        };

        match kind {
            MarketKind::MatchResult => {
                let outcome = match outcome_lc.as_str() {
                    "home" | "home_win" | "1" => ResultOutcome::Home,
                    "draw" | "x" => ResultOutcome::Draw,
                    "away" | "away_win" | "2" => ResultOutcome::Away,
                    _ => return Err(unknown()),
                };
                Ok(Selection::MatchResult { outcome })
            }
            MarketKind::Totals => {
                let (side, rest) = if let Some(rest) = outcome_lc.strip_prefix("over") {
                    (TotalsOutcome::Over, rest)
                } else if let Some(rest) = outcome_lc.strip_prefix("under") {
                    (TotalsOutcome::Under, rest)
                } else {
                    return Err(unknown());
                };

                let embedded = rest.trim_matches(|c: char| c == '_' || c == ' ' || c == '-');
                let goals = match line {
                    Some(goals) => goals,
                    None if !embedded.is_empty() => embedded
                        .replace('_', ".")
                        .parse::<f64>()
                        .map_err(|_| SelectionParseError::InvalidLine(embedded.to_string()))?,
                    None => return Err(SelectionParseError::MissingLine(outcome.to_string())),
                };
                let line = GoalLine::try_from(goals)?;
                Ok(Selection::Totals { line, outcome: side })
            }
            MarketKind::BothTeamsToScore => {
                let outcome = match outcome_lc.as_str() {
                    "yes" | "btts_yes" => BttsOutcome::Yes,
                    "no" | "btts_no" => BttsOutcome::No,
                    _ => return Err(unknown()),
                };
                Ok(Selection::BothTeamsToScore { outcome })
            }
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

/// Failure to map a provider's market/outcome strings onto a `Selection`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SelectionParseError {
    #[error("unknown market: {0}")]
    UnknownMarket(String),

    #[error("unknown outcome {outcome:?} for market {market:?}")]
    UnknownOutcome { market: String, outcome: String },

    #[error("totals outcome {0:?} has no line")]
    MissingLine(String),

    #[error("invalid totals line: {0}")]
    InvalidLine(String),
}

// ---------------------------------------------------------------------------
// Evaluated outcomes
// ---------------------------------------------------------------------------

/// Confidence label derived from EV and probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Low => write!(f, "low"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::High => write!(f, "high"),
        }
    }
}

/// One evaluated proposition within a fixture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketOutcome {
    #[serde(flatten)]
    pub selection: Selection,
    pub description: String,
    /// Model probability (0.0–1.0)
    pub probability: f64,
    /// Best available decimal odds across bookmakers
    pub best_odds: f64,
    pub bookmaker: String,
    /// probability × odds − 1
    pub ev: f64,
    pub ev_percent: f64,
    /// Fractional-Kelly stake in currency units, before allocation caps
    pub kelly_stake: f64,
    pub confidence_bucket: Confidence,
}

impl fmt::Display for MarketOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {:.2} ({}) | p={:.1}% ev={:+.1}% kelly=${:.2} [{}]",
            self.description,
            self.best_odds,
            self.bookmaker,
            self.probability * 100.0,
            self.ev_percent,
            self.kelly_stake,
            self.confidence_bucket,
        )
    }
}

/// Per-fixture evaluation: every outcome, the best one, and the value subset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pick {
    pub fixture: Fixture,
    pub all_outcomes: Vec<MarketOutcome>,
    /// Maximum-EV outcome, `None` when nothing could be evaluated
    pub best_outcome: Option<MarketOutcome>,
    /// Outcomes at or above the EV threshold, best first
    pub value_outcomes: Vec<MarketOutcome>,
    pub suggested_stake: f64,
    /// Sum of EVs across value outcomes
    pub total_ev: f64,
    pub evaluated_at: DateTime<Utc>,
}

impl Pick {
    /// Whether the best outcome clears the value threshold.
    pub fn best_is_value(&self) -> bool {
        match &self.best_outcome {
            Some(best) => self.value_outcomes.iter().any(|o| o.selection == best.selection),
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Accumulators
// ---------------------------------------------------------------------------

/// Identity of a leg: fixture plus selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LegId {
    pub fixture_id: FixtureId,
    pub selection: Selection,
}

impl fmt::Display for LegId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.fixture_id, self.selection.key())
    }
}

/// A value outcome promoted into accumulator eligibility.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leg {
    pub fixture_id: FixtureId,
    pub fixture: Fixture,
    #[serde(flatten)]
    pub selection: Selection,
    pub description: String,
    pub probability: f64,
    pub odds: f64,
    pub bookmaker: String,
    pub single_ev: f64,
    pub ev_percent: f64,
}

impl Leg {
    pub fn from_outcome(fixture: &Fixture, outcome: &MarketOutcome) -> Self {
        Self {
            fixture_id: fixture.id,
            fixture: fixture.clone(),
            selection: outcome.selection,
            description: outcome.description.clone(),
            probability: outcome.probability,
            odds: outcome.best_odds,
            bookmaker: outcome.bookmaker.clone(),
            single_ev: outcome.ev,
            ev_percent: outcome.ev_percent,
        }
    }

    pub fn id(&self) -> LegId {
        LegId {
            fixture_id: self.fixture_id,
            selection: self.selection,
        }
    }

    pub fn teams(&self) -> [TeamId; 2] {
        self.fixture.teams()
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} @ {:.2} (p={:.1}% ev={:+.1}%)",
            self.fixture_id,
            self.description,
            self.odds,
            self.probability * 100.0,
            self.ev_percent,
        )
    }
}

/// A multi-leg bet; every leg must win.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Accumulator {
    /// Content-derived id: identical legs always give the same id
    pub id: Uuid,
    pub legs: Vec<Leg>,
    pub num_legs: usize,
    pub combined_probability: f64,
    pub combined_odds: f64,
    pub expected_value: f64,
    pub ev_percent: f64,
    pub suggested_stake: f64,
    pub potential_return: f64,
    pub confidence: Confidence,
    pub generated_at: DateTime<Utc>,
}

impl Accumulator {
    /// Leg ids in ascending order (the dedup key).
    pub fn leg_ids(&self) -> Vec<LegId> {
        let mut ids: Vec<LegId> = self.legs.iter().map(Leg::id).collect();
        ids.sort();
        ids
    }
}

impl fmt::Display for Accumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let legs: Vec<String> = self.legs.iter().map(|l| l.to_string()).collect();
        write!(
            f,
            "{}-fold @ {:.2} | p={:.2}% ev={:+.1}% stake=${:.2} [{}] :: {}",
            self.num_legs,
            self.combined_odds,
            self.combined_probability * 100.0,
            self.ev_percent,
            self.suggested_stake,
            self.confidence,
            legs.join(" + "),
        )
    }
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

/// Aggregate view over a pick list.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct PicksSummary {
    pub total_picks: usize,
    pub total_value_bets: usize,
    pub total_suggested_stake: f64,
    pub total_expected_value: f64,
    pub picks_by_market: std::collections::BTreeMap<String, usize>,
    pub average_ev: f64,
    pub bankroll: f64,
}

/// Aggregate view over an accumulator list.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct AccumulatorSummary {
    pub total_accumulators: usize,
    pub total_doubles: usize,
    pub total_trebles: usize,
    pub total_suggested_stake: f64,
    pub total_potential_return: f64,
    pub average_ev: f64,
    pub best_ev: f64,
    pub bankroll: f64,
    pub max_stake_allocation: f64,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that reject an evaluation call as a whole.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    #[error("Invalid bankroll: {0}")]
    InvalidBankroll(f64),

    #[error("Evaluation cancelled")]
    Cancelled,

    #[error("Combination budget exceeded ({limit} combinations)")]
    CombinationBudgetExceeded { limit: u64 },
}

/// Why a single outcome was excluded from evaluation. Never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum OutcomeRejection {
    #[error("probability {0} outside [0, 1]")]
    ProbabilityOutOfRange(f64),

    #[error("odds {0} below 1.0")]
    OddsBelowOne(f64),

    #[error("no odds quoted")]
    MissingOdds,

    #[error("no model probability")]
    MissingProbability,
}

/// A rejected outcome, kept in the report for transparency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedOutcome {
    pub fixture_id: FixtureId,
    #[serde(flatten)]
    pub selection: Selection,
    pub reason: OutcomeRejection,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
