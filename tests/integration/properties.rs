//! Invariants checked over a generated matchday.

use std::collections::BTreeSet;
use tokio_util::sync::CancellationToken;

use oddsiq::config::StakingConfig;
use oddsiq::strategy::EvaluationReport;
use oddsiq::types::LegId;

use crate::builders::{engine, matchday};

const BANKROLL: f64 = 1000.0;

fn evaluate(staking: StakingConfig, fixtures: i64) -> EvaluationReport {
    let input = matchday(fixtures).input(BANKROLL);
    engine(staking)
        .evaluate(&input, &CancellationToken::new())
        .unwrap()
}

fn loose() -> StakingConfig {
    StakingConfig {
        min_ev_threshold: 2.0,
        accumulator_min_ev: 5.0,
        min_leg_ev: 2.0,
        ..StakingConfig::default()
    }
}

#[test]
fn test_matchday_produces_work() {
    let report = evaluate(loose(), 12);
    assert_eq!(report.picks.picks.len(), 12);
    assert!(report.picks.summary.total_value_bets > 0);
    assert!(!report.accumulators.accumulators.is_empty());
}

#[test]
fn test_repeat_calls_bit_identical() {
    let a = evaluate(loose(), 12);
    let b = evaluate(loose(), 12);
    assert_eq!(a, b);
    assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
}

#[test]
fn test_ev_and_kelly_per_outcome() {
    let report = evaluate(loose(), 12);
    for pick in &report.picks.picks {
        for o in &pick.all_outcomes {
            assert_eq!(o.ev, o.probability * o.best_odds - 1.0);
            if o.probability * o.best_odds <= 1.0 {
                assert_eq!(o.kelly_stake, 0.0, "{o}");
            }
            assert!(o.kelly_stake >= 0.0);
        }
    }
}

#[test]
fn test_accumulator_structure() {
    let staking = StakingConfig {
        max_legs: 4,
        ..loose()
    };
    let report = evaluate(staking.clone(), 12);
    assert!(!report.accumulators.accumulators.is_empty());

    let mut seen = BTreeSet::new();
    for acc in &report.accumulators.accumulators {
        assert_eq!(acc.num_legs, acc.legs.len());
        assert!((staking.min_legs..=staking.max_legs).contains(&acc.num_legs));

        let fixtures: BTreeSet<_> = acc.legs.iter().map(|l| l.fixture_id).collect();
        assert_eq!(fixtures.len(), acc.legs.len(), "two legs share a fixture");

        for (i, a) in acc.legs.iter().enumerate() {
            for b in &acc.legs[i + 1..] {
                assert!(!a.fixture.shares_team_with(&b.fixture), "two legs share a team");
            }
        }

        let p: f64 = acc.legs.iter().map(|l| l.probability).product();
        let o: f64 = acc.legs.iter().map(|l| l.odds).product();
        assert!((acc.combined_probability - p).abs() < 1e-9);
        assert!((acc.combined_odds - o).abs() < 1e-9);
        assert!(acc.ev_percent >= staking.accumulator_min_ev);

        let ids: Vec<LegId> = acc.leg_ids();
        assert!(seen.insert(ids), "duplicate leg set");
    }
}

#[test]
fn test_same_fixture_never_combined_even_when_teams_allowed() {
    let staking = StakingConfig {
        allow_same_team: true,
        allow_same_fixture: true,
        ..loose()
    };
    let report = evaluate(staking, 12);
    for acc in &report.accumulators.accumulators {
        let fixtures: BTreeSet<_> = acc.legs.iter().map(|l| l.fixture_id).collect();
        assert_eq!(fixtures.len(), acc.legs.len());
    }
}

#[test]
fn test_accumulators_ranked() {
    let report = evaluate(loose(), 12);
    for pair in report.accumulators.accumulators.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(a.ev_percent > b.ev_percent || (a.ev_percent == b.ev_percent && a.num_legs <= b.num_legs));
    }
}

#[test]
fn test_stake_caps() {
    let staking = loose();
    let report = evaluate(staking.clone(), 12);

    let pick_cap = staking.max_bet_percentage * BANKROLL;
    for pick in &report.picks.picks {
        assert!(pick.suggested_stake >= 0.0);
        assert!(pick.suggested_stake <= pick_cap + 1e-9);
    }
    assert!(report.picks.summary.total_suggested_stake <= staking.max_pick_exposure(BANKROLL) + 1e-9);

    let acc_cap = staking.max_stake_percent * BANKROLL;
    for acc in &report.accumulators.accumulators {
        assert!(acc.suggested_stake >= 0.0);
        assert!(acc.suggested_stake <= acc_cap + 1e-9);
    }
    assert!(
        report.accumulators.summary.total_suggested_stake <= staking.max_stake_allocation(BANKROLL) + 1e-9
    );
}

#[test]
fn test_budget_zeroes_tail_but_keeps_it() {
    let staking = StakingConfig {
        max_stake_allocation: Some(30.0),
        ..loose()
    };
    let report = evaluate(staking, 12);
    let accs = &report.accumulators.accumulators;
    assert!(accs.len() > 3);

    // Once a candidate is zeroed for budget, nothing below it is staked
    let first_zero = accs.iter().position(|a| a.suggested_stake == 0.0).unwrap();
    assert!(accs[first_zero..].iter().all(|a| a.suggested_stake == 0.0));
    assert!(report.accumulators.summary.total_suggested_stake <= 30.0);
}

#[test]
fn test_lower_thresholds_only_add() {
    let strict = StakingConfig {
        min_ev_threshold: 8.0,
        accumulator_min_ev: 15.0,
        ..loose()
    };
    let high = evaluate(strict, 12);
    let low = evaluate(loose(), 12);

    let value_set = |r: &EvaluationReport| -> BTreeSet<LegId> {
        r.picks
            .picks
            .iter()
            .flat_map(|p| {
                p.value_outcomes.iter().map(move |o| LegId {
                    fixture_id: p.fixture.id,
                    selection: o.selection,
                })
            })
            .collect()
    };
    assert!(value_set(&high).is_subset(&value_set(&low)));

    let acc_ids = |r: &EvaluationReport| -> BTreeSet<uuid::Uuid> {
        r.accumulators.accumulators.iter().map(|a| a.id).collect()
    };
    assert!(acc_ids(&high).is_subset(&acc_ids(&low)));
    assert!(acc_ids(&high).len() <= acc_ids(&low).len());
}
