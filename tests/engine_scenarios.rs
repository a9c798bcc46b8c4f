//! Scenario tests for the GC rule engine.
//!
//! Covers the documented retention scenarios end to end:
//! - Nested union/intersection decision table
//! - Two-condition intersection over sample cells
//! - Rejection of malformed trees and out-of-contract cells
//! - Depth guard on pathological trees
//! - Concurrent evaluation of one shared tree

#![allow(clippy::expect_used, clippy::unwrap_used)]

use cellgc::gc::CompactionPlanner;
use cellgc::{CellMetadata, Error, GcRule, GcRuleEngine, parse_policy, should_drop};
use chrono::{TimeDelta, TimeZone, Utc};
use std::sync::Arc;
use test_case::test_case;

/// Drop if ranked beyond 10, or if older than 5 days and ranked beyond 2.
fn nested_rule() -> GcRule {
    GcRule::union([
        GcRule::max_versions(10),
        GcRule::intersection([GcRule::max_versions(2), GcRule::max_age_days(5)]).unwrap(),
    ])
    .unwrap()
}

/// Drop if older than 5 days and ranked beyond the top 2.
fn intersection_rule() -> GcRule {
    GcRule::intersection([GcRule::max_versions(2), GcRule::max_age_days(5)]).unwrap()
}

fn cell(age_days: i64, rank: u64) -> CellMetadata {
    CellMetadata::new(TimeDelta::days(age_days), rank)
}

// ============================================================================
// Decision tables
// ============================================================================

#[test_case(11, 1, true; "rank beyond ten drops via first branch")]
#[test_case(1, 6, false; "old newest version is retained")]
#[test_case(3, 6, true; "old and beyond top two drops via second branch")]
#[test_case(1, 1, false; "young newest version is retained")]
#[test_case(10, 100, true; "rank ten old drops via second branch")]
#[test_case(10, 5, false; "rank ten at age boundary is retained")]
#[test_case(2, 30, false; "rank two never matches second branch")]
fn test_nested_rule(rank: u64, age_days: i64, expected: bool) {
    assert_eq!(
        should_drop(&nested_rule(), &cell(age_days, rank)).unwrap(),
        expected
    );
}

#[test_case(6, 3, true; "cell a old and beyond top two")]
#[test_case(3, 3, false; "cell b too young")]
#[test_case(6, 1, false; "cell c newest version")]
fn test_intersection_scenario(age_days: i64, rank: u64, expected: bool) {
    assert_eq!(
        should_drop(&intersection_rule(), &cell(age_days, rank)).unwrap(),
        expected
    );
}

#[test]
fn test_parsed_policy_matches_built_rule() {
    let parsed = parse_policy("maxversions=10 or (maxversions=2 and maxage=5d)").unwrap();
    assert_eq!(parsed, nested_rule());
}

// ============================================================================
// Rejections
// ============================================================================

#[test]
fn test_empty_composites_rejected_at_construction() {
    assert!(matches!(GcRule::union([]), Err(Error::Structural(_))));
    assert!(matches!(GcRule::intersection([]), Err(Error::Structural(_))));
}

#[test]
fn test_empty_composites_rejected_at_evaluation() {
    for rule in [GcRule::Union(Vec::new()), GcRule::Intersection(Vec::new())] {
        let err = should_drop(&rule, &cell(1, 1)).unwrap_err();
        assert!(matches!(err, Error::Structural(_)), "{rule:?}: {err}");
    }
}

#[test]
fn test_invalid_metadata_rejected() {
    let rule = nested_rule();

    let negative_age = CellMetadata::new(TimeDelta::milliseconds(-1), 1);
    assert!(matches!(
        should_drop(&rule, &negative_age),
        Err(Error::InvalidInput(_))
    ));

    let rank_zero = CellMetadata::new(TimeDelta::zero(), 0);
    assert!(matches!(
        should_drop(&rule, &rank_zero),
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn test_pathological_depth_rejected() {
    let mut rule = GcRule::max_versions(1);
    for _ in 0..1_000_000 {
        rule = GcRule::Intersection(vec![rule]);
    }

    let err = should_drop(&rule, &cell(0, 5)).unwrap_err();
    assert!(matches!(
        err,
        Error::DepthExceeded {
            depth: 65,
            limit: 64
        }
    ));

    let err = GcRuleEngine::new().validate(&rule).unwrap_err();
    assert!(matches!(err, Error::DepthExceeded { .. }));

    drop(rule);
}

#[test]
fn test_custom_depth_limit() {
    let engine = GcRuleEngine::new().with_max_depth(2);
    assert!(engine.should_drop(&intersection_rule(), &cell(6, 3)).unwrap());

    let err = engine.should_drop(&nested_rule(), &cell(6, 3)).unwrap_err();
    assert!(matches!(err, Error::DepthExceeded { depth: 3, limit: 2 }));
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_shared_rule_across_threads() {
    let rule = Arc::new(nested_rule());
    let engine = GcRuleEngine::new();

    let handles: Vec<_> = (1..=8_u64)
        .map(|thread| {
            let rule = Arc::clone(&rule);
            let age = TimeDelta::days(i64::try_from(thread).unwrap());
            std::thread::spawn(move || {
                (1..=20_u64)
                    .map(|rank| engine.should_drop(&rule, &CellMetadata::new(age, rank)).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let age_days = i64::try_from(i).unwrap() + 1;
        let results = handle.join().unwrap();
        let expected: Vec<_> = (1..=20_u64)
            .map(|rank| rank > 10 || (rank > 2 && age_days > 5))
            .collect();
        assert_eq!(results, expected);
    }
}

#[test]
fn test_planner_shared_across_scoped_threads() {
    let planner = CompactionPlanner::new(GcRuleEngine::new(), nested_rule()).unwrap();
    let reference = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

    let columns: Vec<Vec<_>> = (0..4_i64)
        .map(|column| {
            (0..12_i64)
                .map(|v| reference - TimeDelta::days(v * (column + 1)))
                .collect()
        })
        .collect();

    let plans: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = columns
            .iter()
            .map(|versions| scope.spawn(|| planner.plan_column(reference, versions, true)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect()
    });

    for plan in &plans {
        assert_eq!(plan.cells_checked, 12);
        assert!(plan.retained.len() >= 2);
        assert!(plan.dropped.len() >= 2);
    }
}
