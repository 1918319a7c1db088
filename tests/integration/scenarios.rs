//! Worked examples, end to end from raw snapshot to report.

use tokio_util::sync::CancellationToken;

use oddsiq::config::{EngineLimits, StakingConfig};
use oddsiq::strategy::Engine;
use oddsiq::types::{EngineError, FixtureId, OutcomeRejection, Selection};

use crate::builders::{engine, matchday, SnapshotBuilder};

#[test]
fn test_evens_home_win_stakes_five_percent() {
    let input = SnapshotBuilder::new().fixture(1, 10, 11).home(1, 0.60, 2.00).input(1000.0);
    let report = engine(StakingConfig::default()).evaluate_picks(&input).unwrap();

    let pick = &report.picks[0];
    let best = pick.best_outcome.as_ref().unwrap();
    assert!((best.ev - 0.20).abs() < 1e-12);
    assert!((best.ev_percent - 20.0).abs() < 1e-9);
    assert_eq!(best.description, "Home Win");
    assert_eq!(pick.suggested_stake, 50.0);
}

#[test]
fn test_double_of_two_independent_legs() {
    let input = SnapshotBuilder::new()
        .fixture(1, 10, 11)
        .fixture(2, 20, 21)
        .home(1, 0.60, 2.00)
        .home(2, 0.55, 2.10)
        .input(1000.0);
    let report = engine(StakingConfig::default())
        .evaluate(&input, &CancellationToken::new())
        .unwrap();

    let accs = &report.accumulators.accumulators;
    assert_eq!(accs.len(), 1);
    let acc = &accs[0];
    assert_eq!(acc.num_legs, 2);
    assert!((acc.combined_probability - 0.33).abs() < 1e-9);
    assert!((acc.combined_odds - 4.20).abs() < 1e-9);
    assert!((acc.expected_value - 0.386).abs() < 1e-9);
    assert!(acc.suggested_stake <= 0.20 * 1000.0);
    assert!((acc.potential_return - acc.suggested_stake * acc.combined_odds).abs() < 0.01);
}

#[test]
fn test_shared_team_double_absent() {
    let input = SnapshotBuilder::new()
        .fixture(1, 10, 11)
        .fixture(2, 12, 10)
        .home(1, 0.60, 2.00)
        .home(2, 0.55, 2.10)
        .input(1000.0);
    let report = engine(StakingConfig::default())
        .evaluate(&input, &CancellationToken::new())
        .unwrap();
    assert!(report.accumulators.accumulators.is_empty());

    let loose = StakingConfig {
        allow_same_team: true,
        ..StakingConfig::default()
    };
    let report = engine(loose).evaluate(&input, &CancellationToken::new()).unwrap();
    assert_eq!(report.accumulators.accumulators.len(), 1);
}

#[test]
fn test_one_leg_doubles_only_is_empty() {
    let staking = StakingConfig {
        min_legs: 2,
        max_legs: 2,
        ..StakingConfig::default()
    };
    let input = SnapshotBuilder::new()
        .fixture(1, 10, 11)
        .fixture(2, 20, 21)
        .home(1, 0.60, 2.00)
        .home(2, 0.40, 2.00) // no value
        .input(1000.0);
    let report = engine(staking).evaluate(&input, &CancellationToken::new()).unwrap();

    let s = &report.accumulators.summary;
    assert!(report.accumulators.accumulators.is_empty());
    assert_eq!(
        (s.total_accumulators, s.total_doubles, s.total_trebles),
        (0, 0, 0)
    );
    assert_eq!(s.total_suggested_stake, 0.0);
    assert_eq!(s.best_ev, 0.0);
}

#[test]
fn test_bad_rows_rejected_rest_evaluated() {
    let input = SnapshotBuilder::new()
        .fixture(1, 10, 11)
        .home(1, 0.60, 2.00)
        .quote(1, "1x2", "draw", None, 1.30, 3.40)
        .quote(1, "btts", "yes", None, 0.50, 0.80)
        .probability(1, "1x2", "away", None, 0.15)
        .odds(1, "corners", "over", Some(9.5), 1.90, "bet365")
        .input(1000.0);
    let report = engine(StakingConfig::default())
        .evaluate(&input, &CancellationToken::new())
        .unwrap();

    let pick = &report.picks.picks[0];
    assert_eq!(pick.all_outcomes.len(), 1);
    assert_eq!(pick.best_outcome.as_ref().unwrap().selection, Selection::home());

    let mut reasons: Vec<_> = report.rejections.iter().map(|r| (r.selection, r.reason)).collect();
    reasons.sort_by_key(|(s, _)| *s);
    assert_eq!(
        reasons,
        vec![
            (Selection::draw(), OutcomeRejection::ProbabilityOutOfRange(1.30)),
            (Selection::away(), OutcomeRejection::MissingOdds),
            (Selection::btts(true), OutcomeRejection::OddsBelowOne(0.80)),
        ]
    );
}

#[test]
fn test_best_price_across_bookmakers_used() {
    let input = SnapshotBuilder::new()
        .fixture(1, 10, 11)
        .probability(1, "1x2", "home", None, 0.55)
        .odds(1, "1x2", "home", None, 1.95, "bet365")
        .odds(1, "h2h", "Home", None, 2.05, "pinnacle")
        .odds(1, "match_result", "1", None, 2.00, "unibet")
        .input(1000.0);
    let report = engine(StakingConfig::default()).evaluate_picks(&input).unwrap();
    let best = report.picks[0].best_outcome.clone().unwrap();
    assert_eq!(best.best_odds, 2.05);
    assert_eq!(best.bookmaker, "pinnacle");
}

#[test]
fn test_fixture_lookup_matches_list() {
    let input = matchday(8).input(1000.0);
    let engine = engine(StakingConfig::default());
    let list = engine.evaluate_picks(&input).unwrap();
    for pick in &list.picks {
        let one = engine.evaluate_fixture(&input, pick.fixture.id).unwrap().unwrap();
        assert_eq!(&one, pick);
    }
    assert!(engine.evaluate_fixture(&input, FixtureId(404)).unwrap().is_none());
}

#[test]
fn test_combination_budget_fails_whole_call() {
    let staking = StakingConfig {
        accumulator_min_ev: -100.0,
        min_leg_ev: -100.0,
        min_leg_probability: 0.0,
        min_ev_threshold: -100.0,
        allow_same_team: true,
        ..StakingConfig::default()
    };
    let limits = EngineLimits {
        max_combinations: 10,
        ..EngineLimits::default()
    };
    let engine = Engine::new(staking, limits).unwrap();
    let input = matchday(10).input(1000.0);
    assert_eq!(
        engine.evaluate(&input, &CancellationToken::new()),
        Err(EngineError::CombinationBudgetExceeded { limit: 10 })
    );
}
