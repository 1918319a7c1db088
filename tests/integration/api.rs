//! HTTP layer driven end to end with an in-memory snapshot source.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use tower::ServiceExt;

use oddsiq::api::{build_router, ApiState};
use oddsiq::config::StakingConfig;

use crate::builders::{engine, matchday};
use crate::mock_source::StaticSnapshotSource;

fn make_state(source: Arc<StaticSnapshotSource>) -> Arc<ApiState> {
    Arc::new(ApiState {
        engine: Arc::new(engine(StakingConfig::default())),
        source,
        default_bankroll: 1000.0,
        lookahead: chrono::Duration::days(7),
        evaluation_timeout: std::time::Duration::from_secs(10),
    })
}

async fn get(state: Arc<ApiState>, uri: &str) -> (StatusCode, serde_json::Value) {
    let resp = build_router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), 10_000_000).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_picks_and_accumulators_agree_with_engine() {
    let source = Arc::new(StaticSnapshotSource::new(matchday(12).build()));
    let state = make_state(source.clone());

    let (status, picks) = get(state.clone(), "/api/picks").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(picks["summary"]["total_picks"], 12);

    let (status, accs) = get(state.clone(), "/api/accumulators").await;
    assert_eq!(status, StatusCode::OK);

    let direct = engine(StakingConfig::default())
        .evaluate_accumulators(
            &matchday(12).input(1000.0),
            &tokio_util::sync::CancellationToken::new(),
        )
        .unwrap();
    assert_eq!(
        accs["summary"]["total_accumulators"],
        direct.summary.total_accumulators
    );
    assert_eq!(accs["accumulators"][0]["id"], direct.accumulators[0].id.to_string());

    // Every request reloads the snapshot
    assert_eq!(source.load_count(), 2);
}

#[tokio::test]
async fn test_limit_truncates_after_ranking() {
    let source = Arc::new(StaticSnapshotSource::new(matchday(12).build()));
    let state = make_state(source);

    let (_, full) = get(state.clone(), "/api/picks").await;
    let (_, top) = get(state, "/api/picks?limit=3").await;

    let top_picks = top["picks"].as_array().unwrap();
    assert_eq!(top_picks.len(), 3);
    assert_eq!(top_picks[..], full["picks"].as_array().unwrap()[..3]);
    assert_eq!(top["summary"], full["summary"]);
}

#[tokio::test]
async fn test_source_error_surfaces_as_500() {
    let source = Arc::new(StaticSnapshotSource::new(matchday(2).build()));
    source.set_error("odds feed down");
    let (status, json) = get(make_state(source), "/api/accumulators").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"].as_str().unwrap().contains("odds feed down"));
}
