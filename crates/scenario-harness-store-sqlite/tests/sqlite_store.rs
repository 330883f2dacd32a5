// crates/scenario-harness-store-sqlite/tests/sqlite_store.rs
// ============================================================================
// Module: SQLite Store Tests
// Description: Validate SQLite BaselineStore behavior.
// Purpose: Ensure durable persistence and integrity checks.
// ============================================================================

//! ## Overview
//! Conformance tests for the SQLite-backed baseline store. Exercises
//! durability, overwrite-on-save, and tamper detection against databases
//! edited behind the store's back.

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

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use proptest::prelude::*;
use scenario_harness_core::Baseline;
use scenario_harness_core::BaselineStore;
use scenario_harness_core::MetricsSnapshot;
use scenario_harness_core::RunId;
use scenario_harness_core::ScenarioId;
use scenario_harness_core::StoreError;
use scenario_harness_core::Timestamp;
use scenario_harness_store_sqlite::SqliteBaselineStore;
use scenario_harness_store_sqlite::SqliteStoreConfig;
use scenario_harness_store_sqlite::SqliteStoreError;
use scenario_harness_store_sqlite::SqliteStoreMode;
use scenario_harness_store_sqlite::SqliteSyncMode;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn sample_baseline(scenario: &str, duration_ms: f64) -> Baseline {
    let mut metrics = MetricsSnapshot::new();
    metrics.insert("durationMs", duration_ms);
    metrics.insert("turnTimeouts", 0.0);
    metrics.insert("latencyP95Ms", 41.5);
    Baseline {
        scenario_id: ScenarioId::new(scenario),
        stored_metrics: metrics,
        stored_at: Timestamp::from_unix_millis(1_700_000_000_000),
        run_id: Some(RunId::new(format!("{scenario}-run"))),
        scenario_hash: Some("abc123".to_string()),
    }
}

fn store_for(path: &Path) -> SqliteBaselineStore {
    let config = SqliteStoreConfig {
        path: path.to_path_buf(),
        busy_timeout_ms: 1_000,
        journal_mode: SqliteStoreMode::Wal,
        sync_mode: SqliteSyncMode::Full,
    };
    SqliteBaselineStore::new(config).expect("store init")
}

fn row_count(path: &Path) -> i64 {
    let connection = rusqlite::Connection::open(path).unwrap();
    connection
        .query_row("SELECT COUNT(*) FROM baselines", rusqlite::params![], |row| row.get(0))
        .unwrap()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn sqlite_store_roundtrip() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("baselines.sqlite"));
    let baseline = sample_baseline("greeting", 1_250.0);
    store.save(&baseline).unwrap();
    let loaded = store.load(&ScenarioId::new("greeting")).unwrap();
    assert_eq!(loaded, Some(baseline));
}

#[test]
fn sqlite_store_returns_none_for_missing_scenario() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("baselines.sqlite"));
    assert!(store.load(&ScenarioId::new("missing")).unwrap().is_none());
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn sqlite_store_creates_missing_parent_directories() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("dir").join("baselines.sqlite");
    let store = store_for(&path);
    store.save(&sample_baseline("greeting", 1.0)).unwrap();
    assert!(path.exists());
    assert_eq!(store.path(), path.as_path());
}

#[test]
fn sqlite_store_persists_across_instances() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("baselines.sqlite");
    let baseline = sample_baseline("greeting", 900.0);
    {
        let store = store_for(&path);
        store.save(&baseline).unwrap();
    }
    let store = store_for(&path);
    assert_eq!(store.load(&ScenarioId::new("greeting")).unwrap(), Some(baseline));
}

#[test]
fn sqlite_store_save_overwrites_the_single_row() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("baselines.sqlite");
    let store = store_for(&path);
    store.save(&sample_baseline("greeting", 1_000.0)).unwrap();
    store.save(&sample_baseline("greeting", 800.0)).unwrap();
    store.save(&sample_baseline("greeting", 650.0)).unwrap();
    let current = store.load(&ScenarioId::new("greeting")).unwrap().unwrap();
    assert_eq!(current.stored_metrics.get("durationMs"), Some(650.0));
    assert_eq!(row_count(&path), 1);

    store.save(&sample_baseline("farewell", 10.0)).unwrap();
    assert_eq!(row_count(&path), 2);
    let tables: i64 = rusqlite::Connection::open(&path)
        .unwrap()
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name != 'store_meta'",
            rusqlite::params![],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(tables, 1);
}

#[test]
fn sqlite_store_lists_current_baselines_by_scenario_id() {
    let temp = TempDir::new().unwrap();
    let store = store_for(&temp.path().join("baselines.sqlite"));
    store.save(&sample_baseline("zeta", 1.0)).unwrap();
    store.save(&sample_baseline("alpha", 2.0)).unwrap();
    store.save(&sample_baseline("alpha", 3.0)).unwrap();
    let listed = store.list().unwrap();
    let ids: Vec<&str> = listed.iter().map(|baseline| baseline.scenario_id.as_str()).collect();
    assert_eq!(ids, vec!["alpha", "zeta"]);
    assert_eq!(listed[0].stored_metrics.get("durationMs"), Some(3.0));
}

#[test]
fn sqlite_store_detects_corrupt_hash() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("baselines.sqlite");
    let store = store_for(&path);
    store.save(&sample_baseline("greeting", 1.0)).unwrap();
    {
        let connection = rusqlite::Connection::open(&path).unwrap();
        connection
            .execute(
                "UPDATE baselines SET baseline_hash = 'bad' WHERE scenario_id = ?1",
                rusqlite::params!["greeting"],
            )
            .unwrap();
    }
    let result = store.load(&ScenarioId::new("greeting"));
    assert!(matches!(result, Err(StoreError::Corrupt(_))));
}

#[test]
fn sqlite_store_detects_payload_key_mismatch() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("baselines.sqlite");
    let store = store_for(&path);
    store.save(&sample_baseline("greeting", 1.0)).unwrap();
    store.save(&sample_baseline("farewell", 1.0)).unwrap();
    {
        let connection = rusqlite::Connection::open(&path).unwrap();
        connection
            .execute(
                "UPDATE baselines SET baseline_json = (SELECT baseline_json FROM \
                 baselines WHERE scenario_id = 'farewell'), baseline_hash = (SELECT \
                 baseline_hash FROM baselines WHERE scenario_id = 'farewell') WHERE \
                 scenario_id = 'greeting'",
                rusqlite::params![],
            )
            .unwrap();
    }
    let result = store.load(&ScenarioId::new("greeting"));
    assert!(matches!(result, Err(StoreError::Invalid(_))));
}

#[test]
fn sqlite_store_rejects_unknown_schema_version() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("baselines.sqlite");
    drop(store_for(&path));
    {
        let connection = rusqlite::Connection::open(&path).unwrap();
        connection.execute("UPDATE store_meta SET version = 99", rusqlite::params![]).unwrap();
    }
    let result = SqliteBaselineStore::new(SqliteStoreConfig::new(&path));
    assert!(matches!(result, Err(SqliteStoreError::VersionMismatch(_))));
}

#[test]
fn sqlite_store_rejects_directory_path() {
    let temp = TempDir::new().unwrap();
    let result = SqliteBaselineStore::new(SqliteStoreConfig::new(temp.path()));
    let Err(SqliteStoreError::Invalid(message)) = result else {
        panic!("expected invalid path error");
    };
    assert!(message.contains("must be a file"));
}

#[test]
fn store_errors_map_into_core_taxonomy() {
    let mapped: StoreError = SqliteStoreError::TooLarge {
        max_bytes: 10,
        actual_bytes: 11,
    }
    .into();
    let StoreError::Invalid(message) = mapped else {
        panic!("expected invalid store error");
    };
    assert!(message.contains("11 bytes (max 10)"));
    assert!(matches!(StoreError::from(SqliteStoreError::Db("x".into())), StoreError::Store(_)));
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn arbitrary_metric_values_survive_persistence(
        values in prop::collection::btree_map("[a-z]{1,12}", -4_000_000i64 .. 4_000_000, 0 .. 12)
    ) {
        let temp = TempDir::new().unwrap();
        let store = store_for(&temp.path().join("baselines.sqlite"));
        let mut metrics = MetricsSnapshot::new();
        for (name, value) in &values {
            metrics.insert(name.clone(), *value as f64 / 4.0);
        }
        let baseline = Baseline {
            scenario_id: ScenarioId::new("prop"),
            stored_metrics: metrics,
            stored_at: Timestamp::from_unix_millis(0),
            run_id: None,
            scenario_hash: None,
        };
        store.save(&baseline).unwrap();
        prop_assert_eq!(store.load(&ScenarioId::new("prop")).unwrap(), Some(baseline));
    }
}
