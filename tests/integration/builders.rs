//! Snapshot builders shared by the integration tests.

use chrono::{DateTime, Duration, TimeZone, Utc};

use oddsiq::config::{EngineLimits, StakingConfig};
use oddsiq::data::{EvaluationInput, OddsQuote, ProbabilityQuote, Snapshot};
use oddsiq::strategy::Engine;
use oddsiq::types::{Fixture, FixtureId, TeamId};

pub fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

pub fn engine(staking: StakingConfig) -> Engine {
    Engine::new(staking, EngineLimits::default()).unwrap()
}

pub struct SnapshotBuilder {
    snapshot: Snapshot,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self {
            snapshot: Snapshot {
                as_of: Some(as_of()),
                bankroll: None,
                fixtures: Vec::new(),
                odds: Vec::new(),
                probabilities: Vec::new(),
            },
        }
    }

    pub fn fixture(mut self, id: i64, home: i64, away: i64) -> Self {
        self.snapshot.fixtures.push(Fixture {
            id: FixtureId(id),
            home_team_id: TeamId(home),
            away_team_id: TeamId(away),
            kickoff: as_of() + Duration::hours(24 + id),
            season: 2024,
            round: Some("Regular Season - 27".to_string()),
        });
        self
    }

    pub fn odds(mut self, id: i64, market: &str, outcome: &str, line: Option<f64>, price: f64, bookmaker: &str) -> Self {
        self.snapshot.odds.push(OddsQuote {
            fixture_id: FixtureId(id),
            market: market.to_string(),
            outcome: outcome.to_string(),
            line,
            price,
            bookmaker: bookmaker.to_string(),
        });
        self
    }

    pub fn probability(mut self, id: i64, market: &str, outcome: &str, line: Option<f64>, probability: f64) -> Self {
        self.snapshot.probabilities.push(ProbabilityQuote {
            fixture_id: FixtureId(id),
            market: market.to_string(),
            outcome: outcome.to_string(),
            line,
            probability,
        });
        self
    }

    /// Model probability and one bookmaker price for a single outcome.
    pub fn quote(self, id: i64, market: &str, outcome: &str, line: Option<f64>, probability: f64, price: f64) -> Self {
        self.probability(id, market, outcome, line, probability)
            .odds(id, market, outcome, line, price, "bet365")
    }

    pub fn home(self, id: i64, probability: f64, price: f64) -> Self {
        self.quote(id, "1x2", "home", None, probability, price)
    }

    pub fn build(self) -> Snapshot {
        self.snapshot
    }

    pub fn input(self, bankroll: f64) -> EvaluationInput {
        self.snapshot.into_input(bankroll, as_of(), Duration::days(7))
    }
}

/// A deterministic matchday with every market priced and a mix of value,
/// no-value and team-sharing fixtures.
pub fn matchday(fixtures: i64) -> SnapshotBuilder {
    let mut b = SnapshotBuilder::new();
    for i in 1..=fixtures {
        let home = i * 2;
        // Every fourth fixture reuses the previous fixture's home team
        let away = if i % 4 == 0 { (i - 1) * 2 } else { i * 2 + 1 };
        b = b.fixture(i, home, away);

        let p_home = 0.30 + ((i * 37) % 35) as f64 / 100.0;
        let p_draw = 0.25;
        let p_away = 1.0 - p_home - p_draw;
        let margin = 0.92 + ((i * 13) % 20) as f64 / 100.0;

        b = b
            .quote(i, "1x2", "home", None, p_home, round2(margin / p_home))
            .odds(i, "h2h", "1", None, round2(margin / p_home) - 0.05, "unibet")
            .quote(i, "1x2", "draw", None, p_draw, round2(4.0 * (0.95 + (i % 5) as f64 / 50.0)))
            .quote(i, "1x2", "away", None, p_away, round2(0.97 / p_away))
            .quote(i, "totals", "over", Some(2.5), 0.52, 1.90 + (i % 7) as f64 * 0.05)
            .quote(i, "totals", "under", Some(2.5), 0.48, 1.85)
            .quote(i, "btts", "yes", None, 0.55, 1.80 + (i % 4) as f64 * 0.10)
            .quote(i, "btts", "no", None, 0.45, 1.95);
    }
    b
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
