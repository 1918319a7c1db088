//! Input boundary.
//!
//! Odds and probability providers speak in loosely-typed payloads
//! (market/outcome strings, one quote per bookmaker). This module parses
//! them once into the engine's typed input: an `OddsBook` holding the best
//! price per outcome and a `ProbabilityTable`, both keyed by fixture and
//! `Selection`. Unparseable rows are logged and skipped.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::storage;
use crate::types::{Fixture, FixtureId, Selection};

// ---------------------------------------------------------------------------
// Typed engine input
// ---------------------------------------------------------------------------

/// Best available price for one outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Price {
    pub price: f64,
    pub bookmaker: String,
}

/// Best decimal odds per (fixture, selection) across all bookmakers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OddsBook {
    prices: BTreeMap<FixtureId, BTreeMap<Selection, Price>>,
}

impl OddsBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a quote, keeping it only if it beats the current best.
    /// Equal prices keep the alphabetically first bookmaker. A non-finite
    /// price only fills an empty slot and gives way to any finite one.
    /// Returns whether the quote is now the best.
    pub fn insert_best(&mut self, fixture_id: FixtureId, selection: Selection, price: f64, bookmaker: &str) -> bool {
        let slot = self.prices.entry(fixture_id).or_default();
        match slot.get(&selection) {
            Some(best) if !beats(price, bookmaker, best) => false,
            _ => {
                slot.insert(
                    selection,
                    Price {
                        price,
                        bookmaker: bookmaker.to_string(),
                    },
                );
                true
            }
        }
    }

    /// Build from raw bookmaker quotes, keeping the best price per outcome.
    /// Returns the book and the number of quotes that could not be parsed.
    pub fn from_quotes<'a>(quotes: impl IntoIterator<Item = &'a OddsQuote>) -> (Self, usize) {
        let mut book = Self::new();
        let mut skipped = 0usize;
        for q in quotes {
            match Selection::parse(&q.market, &q.outcome, q.line) {
                Ok(selection) => {
                    book.insert_best(q.fixture_id, selection, q.price, &q.bookmaker);
                }
                Err(e) => {
                    skipped += 1;
                    warn!(
                        fixture_id = %q.fixture_id,
                        market = %q.market,
                        outcome = %q.outcome,
                        error = %e,
                        "Skipping unparseable odds quote"
                    );
                }
            }
        }
        (book, skipped)
    }

    pub fn get(&self, fixture_id: FixtureId, selection: &Selection) -> Option<&Price> {
        self.prices.get(&fixture_id).and_then(|m| m.get(selection))
    }

    /// Every priced selection for a fixture, in `Selection` order.
    pub fn selections_for(&self, fixture_id: FixtureId) -> impl Iterator<Item = &Selection> {
        self.prices.get(&fixture_id).into_iter().flat_map(|m| m.keys())
    }

    pub fn len(&self) -> usize {
        self.prices.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn beats(price: f64, bookmaker: &str, best: &Price) -> bool {
    match (price.is_finite(), best.price.is_finite()) {
        (true, true) => price > best.price || (price == best.price && bookmaker < best.bookmaker.as_str()),
        (true, false) => true,
        (false, _) => false,
    }
}

/// Model probability per (fixture, selection).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbabilityTable {
    probabilities: BTreeMap<FixtureId, BTreeMap<Selection, f64>>,
}

impl ProbabilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a probability.
    pub fn insert(&mut self, fixture_id: FixtureId, selection: Selection, probability: f64) {
        self.probabilities
            .entry(fixture_id)
            .or_default()
            .insert(selection, probability);
    }

    pub fn get(&self, fixture_id: FixtureId, selection: &Selection) -> Option<f64> {
        self.probabilities
            .get(&fixture_id)
            .and_then(|m| m.get(selection))
            .copied()
    }

    pub fn selections_for(&self, fixture_id: FixtureId) -> impl Iterator<Item = &Selection> {
        self.probabilities.get(&fixture_id).into_iter().flat_map(|m| m.keys())
    }

    pub fn len(&self) -> usize {
        self.probabilities.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything one evaluation call needs. Built fresh per request.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationInput {
    pub bankroll: f64,
    /// Reference time for kickoff checks and every emitted timestamp
    pub as_of: DateTime<Utc>,
    pub fixtures: Vec<Fixture>,
    pub odds: OddsBook,
    pub probabilities: ProbabilityTable,
}

impl EvaluationInput {
    /// Union of selections that have odds or a probability for this fixture.
    pub fn selections_for(&self, fixture_id: FixtureId) -> BTreeSet<Selection> {
        self.odds
            .selections_for(fixture_id)
            .chain(self.probabilities.selections_for(fixture_id))
            .copied()
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Raw snapshot (provider payload)
// ---------------------------------------------------------------------------

/// One bookmaker's price for one outcome, as the odds provider sends it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsQuote {
    pub fixture_id: FixtureId,
    pub market: String,
    pub outcome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<f64>,
    #[serde(alias = "odds_value")]
    pub price: f64,
    pub bookmaker: String,
}

/// One model probability, as the probability service sends it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityQuote {
    pub fixture_id: FixtureId,
    pub market: String,
    pub outcome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<f64>,
    pub probability: f64,
}

/// Fixtures, raw odds and raw probabilities as gathered upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bankroll: Option<f64>,
    pub fixtures: Vec<Fixture>,
    #[serde(default)]
    pub odds: Vec<OddsQuote>,
    #[serde(default)]
    pub probabilities: Vec<ProbabilityQuote>,
}

impl Snapshot {
    /// Parse into typed engine input.
    ///
    /// Keeps fixtures kicking off in `(as_of, as_of + lookahead]`, drops
    /// duplicate fixture ids, and skips quotes whose market/outcome cannot
    /// be parsed.
    pub fn into_input(self, bankroll: f64, as_of: DateTime<Utc>, lookahead: Duration) -> EvaluationInput {
        let horizon = as_of + lookahead;
        let mut seen = BTreeSet::new();
        let mut fixtures = Vec::with_capacity(self.fixtures.len());

        for fixture in self.fixtures {
            if fixture.kickoff <= as_of || fixture.kickoff > horizon {
                debug!(fixture_id = %fixture.id, kickoff = %fixture.kickoff, "Fixture outside lookahead window");
                continue;
            }
            if !seen.insert(fixture.id) {
                warn!(fixture_id = %fixture.id, "Duplicate fixture in snapshot, keeping first");
                continue;
            }
            fixtures.push(fixture);
        }

        let (odds, skipped_odds) = OddsBook::from_quotes(&self.odds);

        let mut probabilities = ProbabilityTable::new();
        let mut skipped_probs = 0usize;
        for q in self.probabilities {
            match Selection::parse(&q.market, &q.outcome, q.line) {
                Ok(selection) => probabilities.insert(q.fixture_id, selection, q.probability),
                Err(e) => {
                    skipped_probs += 1;
                    warn!(
                        fixture_id = %q.fixture_id,
                        market = %q.market,
                        outcome = %q.outcome,
                        error = %e,
                        "Skipping unparseable probability"
                    );
                }
            }
        }

        info!(
            fixtures = fixtures.len(),
            priced_outcomes = odds.len(),
            probabilities = probabilities.len(),
            skipped_odds,
            skipped_probs,
            "Snapshot parsed"
        );

        EvaluationInput {
            bankroll,
            as_of,
            fixtures,
            odds,
            probabilities,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot sources
// ---------------------------------------------------------------------------

/// Abstraction over wherever fixtures, odds and probabilities come from.
///
/// Fetching happens before the engine runs; the engine only ever sees
/// the resulting `Snapshot`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch the latest snapshot.
    async fn load(&self) -> Result<Snapshot>;
}

/// Reads a snapshot from a JSON file on every call.
pub struct FileSnapshotSource {
    path: PathBuf,
}

impl FileSnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SnapshotSource for FileSnapshotSource {
    async fn load(&self) -> Result<Snapshot> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || storage::load_snapshot(&path))
            .await
            .context("Snapshot loader task failed")?
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
