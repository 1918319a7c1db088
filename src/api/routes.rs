//! API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<ApiState>`. Each
//! request loads a fresh snapshot and runs the engine on a blocking thread
//! under a timeout.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::config::StakingConfig;
use crate::data::{EvaluationInput, Snapshot, SnapshotSource};
use crate::strategy::{AccumulatorReport, Engine, EvaluationReport, PickReport};
use crate::types::{EngineError, FixtureId, Pick};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct ApiState {
    pub engine: Arc<Engine>,
    pub source: Arc<dyn SnapshotSource>,
    pub default_bankroll: f64,
    pub lookahead: chrono::Duration,
    pub evaluation_timeout: std::time::Duration,
}

pub type AppState = Arc<ApiState>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Snapshot unavailable: {0:#}")]
    Source(anyhow::Error),

    #[error("Evaluation timed out")]
    Timeout,

    #[error("Evaluation task failed: {0}")]
    Task(String),

    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Engine(EngineError::InvalidConfig(_) | EngineError::InvalidBankroll(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Engine(EngineError::Cancelled | EngineError::CombinationBudgetExceeded { .. })
            | ApiError::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Source(_) | ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = %status, error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct EvaluationQuery {
    pub bankroll: Option<f64>,
    /// Truncates the ranked pick list; summaries still cover every pick
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct AccumulatorConfigResponse {
    pub config: StakingConfig,
    pub description: BTreeMap<&'static str, &'static str>,
}

// ---------------------------------------------------------------------------
// Evaluation runner
// ---------------------------------------------------------------------------

impl ApiState {
    /// Run `job` against a snapshot on a blocking thread, cancelling it on timeout.
    async fn run<T, F>(&self, snapshot: Option<Snapshot>, bankroll: Option<f64>, job: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&Engine, &EvaluationInput, &CancellationToken) -> Result<T, EngineError> + Send + 'static,
    {
        let snapshot = match snapshot {
            Some(s) => s,
            None => self.source.load().await.map_err(ApiError::Source)?,
        };

        let bankroll = bankroll.or(snapshot.bankroll).unwrap_or(self.default_bankroll);
        let as_of = snapshot.as_of.unwrap_or_else(Utc::now);
        let lookahead = self.lookahead;
        let engine = Arc::clone(&self.engine);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::task::spawn_blocking(move || {
            let input = snapshot.into_input(bankroll, as_of, lookahead);
            job(&engine, &input, &token)
        });

        match tokio::time::timeout(self.evaluation_timeout, handle).await {
            Ok(Ok(result)) => result.map_err(ApiError::from),
            Ok(Err(e)) => Err(ApiError::Task(e.to_string())),
            Err(_) => {
                cancel.cancel();
                warn!(timeout_ms = self.evaluation_timeout.as_millis() as u64, "Evaluation timed out, cancelling");
                Err(ApiError::Timeout)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/picks
pub async fn get_picks(
    State(state): State<AppState>,
    Query(query): Query<EvaluationQuery>,
) -> Result<Json<PickReport>, ApiError> {
    let mut report = state
        .run(None, query.bankroll, |engine, input, _| engine.evaluate_picks(input))
        .await?;
    if let Some(limit) = query.limit {
        report.picks.truncate(limit);
    }
    Ok(Json(report))
}

/// GET /api/picks/fixture/:id
pub async fn get_fixture_pick(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<EvaluationQuery>,
) -> Result<Json<Pick>, ApiError> {
    let fixture_id = FixtureId(id);
    state
        .run(None, query.bankroll, move |engine, input, _| engine.evaluate_fixture(input, fixture_id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No upcoming fixture {fixture_id}")))
}

/// GET /api/accumulators
pub async fn get_accumulators(
    State(state): State<AppState>,
    Query(query): Query<EvaluationQuery>,
) -> Result<Json<AccumulatorReport>, ApiError> {
    let report = state
        .run(None, query.bankroll, |engine, input, cancel| {
            engine.evaluate_accumulators(input, cancel)
        })
        .await?;
    Ok(Json(report))
}

/// GET /api/accumulators/config
pub async fn get_accumulator_config(State(state): State<AppState>) -> Json<AccumulatorConfigResponse> {
    let description = BTreeMap::from([
        ("min_legs", "Minimum number of legs in an accumulator"),
        ("max_legs", "Maximum number of legs in an accumulator"),
        ("accumulator_min_ev", "Minimum EV% required for an accumulator (10.0 = 10%)"),
        ("min_leg_ev", "Minimum EV% per leg (5.0 = 5%)"),
        ("min_leg_probability", "Minimum probability per leg (0.40 = 40%)"),
        ("accumulator_kelly_fraction", "Kelly fraction for accumulator stakes (0.125 = 1/8)"),
        ("max_stake_percent", "Maximum share of bankroll per accumulator and in total (0.20 = 20%)"),
        ("max_stake_allocation", "Explicit total accumulator budget, overrides max_stake_percent"),
        ("allow_same_team", "Allow the same team in different fixtures"),
        ("allow_same_fixture", "Ignored: an accumulator never holds two legs from one fixture"),
    ]);

    Json(AccumulatorConfigResponse {
        config: state.engine.staking().clone(),
        description,
    })
}

/// POST /api/evaluate
pub async fn post_evaluate(
    State(state): State<AppState>,
    Query(query): Query<EvaluationQuery>,
    Json(snapshot): Json<Snapshot>,
) -> Result<Json<EvaluationReport>, ApiError> {
    let mut report = state
        .run(Some(snapshot), query.bankroll, |engine, input, cancel| engine.evaluate(input, cancel))
        .await?;
    if let Some(limit) = query.limit {
        report.picks.picks.truncate(limit);
    }
    Ok(Json(report))
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
