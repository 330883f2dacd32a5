// crates/scenario-harness-core/tests/baseline_comparison.rs
// ============================================================================
// Module: Baseline Comparison Tests
// Description: Metric classification, missing baselines, and store failures.
// Purpose: Ensure regressions are detected per declared policy and fail closed.
// ============================================================================

//! Baseline comparator and shared store tests.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;

use scenario_harness_core::Baseline;
use scenario_harness_core::BaselineStore;
use scenario_harness_core::ComparisonStatus;
use scenario_harness_core::MetricClassification;
use scenario_harness_core::MetricDirection;
use scenario_harness_core::MetricPolicy;
use scenario_harness_core::MetricsSnapshot;
use scenario_harness_core::ScenarioId;
use scenario_harness_core::StoreError;
use scenario_harness_core::Timestamp;
use scenario_harness_core::runtime::BaselineComparator;
use scenario_harness_core::runtime::InMemoryBaselineStore;
use scenario_harness_core::runtime::SharedBaselineStore;
use scenario_harness_core::runtime::classify_metric;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Store whose every operation fails.
struct BrokenStore;

impl BaselineStore for BrokenStore {
    fn load(&self, _scenario_id: &ScenarioId) -> Result<Option<Baseline>, StoreError> {
        Err(StoreError::Io("disk unavailable".to_string()))
    }

    fn save(&self, _baseline: &Baseline) -> Result<(), StoreError> {
        Err(StoreError::Io("disk unavailable".to_string()))
    }

    fn list(&self) -> Result<Vec<Baseline>, StoreError> {
        Err(StoreError::Io("disk unavailable".to_string()))
    }
}

fn snapshot(values: &[(&str, f64)]) -> MetricsSnapshot {
    values.iter().map(|(name, value)| ((*name).to_string(), *value)).collect()
}

fn baseline(scenario: &str, values: &[(&str, f64)]) -> Baseline {
    Baseline {
        scenario_id: ScenarioId::new(scenario),
        stored_metrics: snapshot(values),
        stored_at: Timestamp::from_unix_millis(1_700_000_000_000),
        run_id: None,
        scenario_hash: None,
    }
}

fn policies() -> Vec<MetricPolicy> {
    vec![
        MetricPolicy::new("durationMs", MetricDirection::LowerIsBetter, 10.0),
        MetricPolicy::new("turnsCompleted", MetricDirection::HigherIsBetter, 0.0).blocking(),
        MetricPolicy::new("turnTimeouts", MetricDirection::LowerIsBetter, 0.0),
    ]
}

// ============================================================================
// SECTION: Classification
// ============================================================================

#[test]
fn direction_and_tolerance_drive_classification() {
    let lower = MetricPolicy::new("durationMs", MetricDirection::LowerIsBetter, 10.0);
    assert_eq!(
        classify_metric(&lower, 1_000.0, 1_050.0).classification,
        MetricClassification::Unchanged
    );
    assert_eq!(
        classify_metric(&lower, 1_000.0, 1_200.0).classification,
        MetricClassification::Regressed
    );
    assert_eq!(
        classify_metric(&lower, 1_000.0, 800.0).classification,
        MetricClassification::Improved
    );

    let higher = MetricPolicy::new("turnsCompleted", MetricDirection::HigherIsBetter, 0.0);
    let improved = classify_metric(&higher, 2.0, 3.0);
    assert_eq!(improved.classification, MetricClassification::Improved);
    assert!((improved.delta - 1.0).abs() < f64::EPSILON);
    assert!((improved.percent_change.unwrap() - 50.0).abs() < 1e-9);
}

#[test]
fn zero_baseline_has_no_percent_change() {
    let policy = MetricPolicy::new("turnTimeouts", MetricDirection::LowerIsBetter, 50.0);
    let regressed = classify_metric(&policy, 0.0, 1.0);
    assert_eq!(regressed.percent_change, None);
    assert_eq!(regressed.classification, MetricClassification::Regressed);

    let unchanged = classify_metric(&policy, 0.0, 0.0);
    assert_eq!(unchanged.percent_change, Some(0.0));
    assert_eq!(unchanged.classification, MetricClassification::Unchanged);
}

// ============================================================================
// SECTION: Comparator
// ============================================================================

#[test]
fn missing_baseline_reports_no_baseline() {
    let store = Arc::new(InMemoryBaselineStore::new());
    let comparator = BaselineComparator::new(store, policies());
    let report = comparator.compare(&ScenarioId::new("fresh"), &snapshot(&[("durationMs", 5.0)]));
    assert_eq!(report.status, ComparisonStatus::NoBaseline);
    assert_eq!(report.status.label(), "no-baseline");
    assert!(report.metrics.is_empty());
    assert!(!report.has_blocking_regression());
}

#[test]
fn comparison_covers_every_tracked_metric_in_policy_order() {
    let store = InMemoryBaselineStore::new();
    store
        .save(&baseline("greeting", &[
            ("durationMs", 1_000.0),
            ("turnsCompleted", 3.0),
            ("turnTimeouts", 0.0),
        ]))
        .unwrap();
    let comparator = BaselineComparator::new(Arc::new(store), policies());
    let report = comparator.compare(
        &ScenarioId::new("greeting"),
        &snapshot(&[("durationMs", 700.0), ("turnsCompleted", 2.0), ("turnTimeouts", 1.0)]),
    );
    assert_eq!(report.status, ComparisonStatus::Compared);
    assert_eq!(report.baseline_stored_at, Some(Timestamp::from_unix_millis(1_700_000_000_000)));
    let names: Vec<&str> = report.metrics.iter().map(|metric| metric.name.as_str()).collect();
    assert_eq!(names, vec!["durationMs", "turnsCompleted", "turnTimeouts"]);

    let regressions: Vec<&str> =
        report.regressions().map(|metric| metric.name.as_str()).collect();
    assert_eq!(regressions, vec!["turnsCompleted", "turnTimeouts"]);
    let improvements: Vec<&str> =
        report.improvements().map(|metric| metric.name.as_str()).collect();
    assert_eq!(improvements, vec!["durationMs"]);
    assert!(report.has_blocking_regression());
    assert_eq!(report.blocking_regressions().count(), 1);
}

#[test]
fn store_failure_is_reported_not_hidden() {
    let comparator = BaselineComparator::new(Arc::new(BrokenStore), policies());
    let report = comparator.compare(&ScenarioId::new("any"), &MetricsSnapshot::new());
    assert_eq!(report.status, ComparisonStatus::Error);
    assert!(report.error.unwrap().contains("disk unavailable"));
}

// ============================================================================
// SECTION: Shared Store
// ============================================================================

#[test]
fn shared_store_reads_and_writes_through_the_gate() {
    let inner = InMemoryBaselineStore::new();
    let shared = SharedBaselineStore::from_store(inner.clone());
    shared.save(&baseline("one", &[("durationMs", 1.0)])).unwrap();
    let written = shared
        .with_exclusive(|store| {
            store.save(&baseline("two", &[("durationMs", 2.0)]))?;
            store.list()
        })
        .unwrap();
    assert_eq!(written.len(), 2);
    assert!(inner.load(&ScenarioId::new("two")).unwrap().is_some());
    assert_eq!(shared.list().unwrap().len(), 2);
}
