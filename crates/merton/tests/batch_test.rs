//! End-to-end batch runs over synthetic firm groups.

use chrono::NaiveDate;
use merton::data::{FirmGroup, FirmKey, Observation, TradingCalendar};
use merton::engine::{BatchOrchestrator, EngineConfig, process_group};
use merton::model::{Method, ModelConfig, solver_for};
use rstest::rstest;
use std::sync::atomic::{AtomicUsize, Ordering};

fn calendar_days(n: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2001, 1, 2).unwrap();
    (0..n)
        .map(|i| start + chrono::Duration::days(i as i64))
        .collect()
}

/// A firm whose equity follows a deterministic wiggle around `level`.
fn firm(key: FirmKey, days: &[NaiveDate], level: f64, debt: f64) -> FirmGroup {
    let observations = days
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let wiggle = 1.0 + 0.02 * ((i as f64) * 0.7).sin() + 0.001 * i as f64;
            Observation::new(*d, Some(level * wiggle), Some(debt), Some(0.03))
        })
        .collect();
    FirmGroup::new(key, observations)
}

fn fixture() -> (Vec<FirmGroup>, TradingCalendar) {
    let days = calendar_days(420);
    let calendar = TradingCalendar::new(days.clone()).unwrap();
    let groups = vec![
        firm(FirmKey::new("001004", 5, 20000, 54594), &days, 80.0, 60.0),
        firm(FirmKey::new("001045", 12, 20010, 21020), &days[100..], 300.0, 500.0),
    ];
    (groups, calendar)
}

#[rstest]
#[case(Method::Simultaneous)]
#[case(Method::Iterated)]
fn test_parallel_equals_serial_union(#[case] method: Method) {
    let (groups, calendar) = fixture();
    let solver = solver_for(method, ModelConfig::default());
    let engine = BatchOrchestrator::new(EngineConfig { threads: 2 }).unwrap();

    let parallel = engine.run(&groups, &calendar, solver.as_ref()).unwrap();

    let serial: Vec<_> = groups
        .iter()
        .flat_map(|g| process_group(g, &calendar, solver.as_ref()).results)
        .collect();

    assert!(!parallel.results.is_empty());
    assert_eq!(parallel.results.len(), serial.len());
    for (p, s) in parallel.results.iter().zip(&serial) {
        assert_eq!(p.key, s.key);
        assert_eq!(p.date, s.date);
        assert_eq!(p.estimate, s.estimate);
    }
    assert_eq!(parallel.diagnostics.groups, 2);
    assert_eq!(parallel.diagnostics.totals.solved, serial.len());
}

#[test]
fn test_results_sorted_by_key_then_date() {
    let (mut groups, calendar) = fixture();
    groups.reverse();
    let solver = solver_for(Method::Simultaneous, ModelConfig::default());
    let engine = BatchOrchestrator::new(EngineConfig::default()).unwrap();

    let output = engine.run(&groups, &calendar, solver.as_ref()).unwrap();
    let keys: Vec<_> = output
        .results
        .iter()
        .map(|r| (r.key.clone(), r.date))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert_eq!(output.results[0].key.gvkey, "001004");
}

#[test]
fn test_repeated_runs_are_identical() {
    let (groups, calendar) = fixture();
    let solver = solver_for(Method::Iterated, ModelConfig::default());
    let engine = BatchOrchestrator::new(EngineConfig { threads: 4 }).unwrap();

    let first = engine.run(&groups, &calendar, solver.as_ref()).unwrap();
    let second = engine.run(&groups, &calendar, solver.as_ref()).unwrap();
    let strip = |rows: &[merton::model::SolverResult]| {
        rows.iter()
            .map(|r| (r.key.clone(), r.date, r.estimate))
            .collect::<Vec<_>>()
    };
    assert_eq!(strip(&first.results), strip(&second.results));
}

#[test]
fn test_progress_callback_sees_every_group() {
    let (groups, calendar) = fixture();
    let solver = solver_for(Method::Simultaneous, ModelConfig::default());
    let engine = BatchOrchestrator::new(EngineConfig { threads: 2 }).unwrap();
    let seen = AtomicUsize::new(0);

    engine
        .run_with_progress(&groups, &calendar, solver.as_ref(), |_| {
            seen.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
    assert_eq!(seen.load(Ordering::Relaxed), groups.len());
}

#[test]
fn test_short_history_group_contributes_nothing() {
    let days = calendar_days(49);
    let calendar = TradingCalendar::new(days.clone()).unwrap();
    let groups = vec![firm(FirmKey::new("009999", 12, 1, 1), &days, 50.0, 20.0)];
    let solver = solver_for(Method::Iterated, ModelConfig::default());
    let engine = BatchOrchestrator::new(EngineConfig { threads: 1 }).unwrap();

    let output = engine.run(&groups, &calendar, solver.as_ref()).unwrap();
    assert!(output.results.is_empty());
    assert_eq!(output.diagnostics.groups_with_results, 0);
}
