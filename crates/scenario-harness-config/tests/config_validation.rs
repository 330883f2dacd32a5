//! Field validation tests for scenario-harness-config.
// crates/scenario-harness-config/tests/config_validation.rs
// =============================================================================
// Module: Config Validation Tests
// Description: Validate range checks and cross-field constraints.
// Purpose: Ensure out-of-range settings fail closed with a named field.
// =============================================================================

use std::path::PathBuf;

use scenario_harness_config::BaselineStoreType;
use scenario_harness_config::EventSinkKind;
use scenario_harness_config::GradingKind;
use scenario_harness_config::HarnessConfig;
use scenario_harness_config::RuntimeKind;
use scenario_harness_core::MetricDirection;
use scenario_harness_core::MetricPolicy;

mod common;

use common::TestResult;
use common::assert_invalid;

fn minimal() -> Result<HarnessConfig, String> {
    common::minimal_config().map_err(|err| err.to_string())
}

// ============================================================================
// SECTION: Suite
// ============================================================================

#[test]
fn suite_workers_must_be_in_range() -> TestResult {
    let mut config = minimal()?;
    config.suite.workers = 257;
    assert_invalid(config.validate(), "suite.workers must be between 1 and 256")
}

#[test]
fn suite_timeout_must_be_positive() -> TestResult {
    let mut config = minimal()?;
    config.suite.timeout_ms = 0;
    assert_invalid(config.validate(), "suite.timeout_ms must be greater than zero")
}

#[test]
fn pass_threshold_must_be_unit_interval() -> TestResult {
    let mut config = minimal()?;
    config.suite.pass_threshold = 1.5;
    assert_invalid(config.validate(), "suite.pass_threshold must be between 0 and 1")?;
    config.suite.pass_threshold = f64::NAN;
    assert_invalid(config.validate(), "suite.pass_threshold must be between 0 and 1")
}

#[test]
fn default_turn_timeout_must_be_positive() -> TestResult {
    let mut config = minimal()?;
    config.suite.default_turn_timeout_ms = 0;
    assert_invalid(config.validate(), "suite.default_turn_timeout_ms must be greater than zero")
}

#[test]
fn workdir_root_component_length_is_limited() -> TestResult {
    let mut config = minimal()?;
    config.suite.workdir_root = Some(PathBuf::from("a".repeat(256)));
    assert_invalid(config.validate(), "suite.workdir_root path component too long")
}

// ============================================================================
// SECTION: Adapters
// ============================================================================

#[test]
fn http_runtime_requires_endpoint() -> TestResult {
    let mut config = minimal()?;
    config.runtime.kind = RuntimeKind::Http;
    assert_invalid(config.validate(), "http runtime requires endpoint")?;
    config.runtime.endpoint = Some("ftp://agents.local".to_string());
    assert_invalid(config.validate(), "runtime.endpoint must use http or https")?;
    config.runtime.endpoint = Some("http://".to_string());
    assert_invalid(config.validate(), "runtime.endpoint must include a host")?;
    config.runtime.endpoint = Some("https://agents.local:8443".to_string());
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn echo_runtime_rejects_endpoint() -> TestResult {
    let mut config = minimal()?;
    config.runtime.endpoint = Some("http://agents.local".to_string());
    assert_invalid(config.validate(), "echo runtime must not set endpoint")
}

#[test]
fn grading_attempts_must_be_in_range() -> TestResult {
    let mut config = minimal()?;
    config.grading.max_attempts = 0;
    assert_invalid(config.validate(), "grading.max_attempts must be between 1 and 10")?;
    config.grading.max_attempts = 11;
    assert_invalid(config.validate(), "grading.max_attempts must be between 1 and 10")
}

#[test]
fn grading_backoff_must_be_consistent() -> TestResult {
    let mut config = minimal()?;
    config.grading.backoff_multiplier = 0.5;
    assert_invalid(config.validate(), "grading.backoff_multiplier must be at least 1.0")?;
    config.grading.backoff_multiplier = 2.0;
    config.grading.initial_backoff_ms = 10_000;
    assert_invalid(config.validate(), "grading.max_backoff_ms must not be less than")
}

#[test]
fn grading_thresholds_and_excerpt_are_checked() -> TestResult {
    let mut config = minimal()?;
    config.grading.default_confidence_threshold = -0.1;
    assert_invalid(config.validate(), "grading.default_confidence_threshold must be between")?;
    config.grading.default_confidence_threshold = 0.7;
    config.grading.max_excerpt_chars = 0;
    assert_invalid(config.validate(), "grading.max_excerpt_chars must be greater than zero")
}

#[test]
fn http_grading_requires_endpoint_and_disabled_rejects_one() -> TestResult {
    let mut config = minimal()?;
    config.grading.endpoint = Some("http://grader.local".to_string());
    assert_invalid(config.validate(), "disabled grading must not set endpoint")?;
    config.grading.kind = GradingKind::Http;
    config.grading.endpoint = None;
    assert_invalid(config.validate(), "http grading requires endpoint")
}

// ============================================================================
// SECTION: Baseline
// ============================================================================

#[test]
fn memory_store_rejects_path() -> TestResult {
    let mut config = minimal()?;
    config.baseline.store.path = Some(PathBuf::from("baselines.sqlite"));
    assert_invalid(config.validate(), "memory baseline.store must not set path")
}

#[test]
fn sqlite_store_requires_path() -> TestResult {
    let mut config = minimal()?;
    config.baseline.store.store_type = BaselineStoreType::Sqlite;
    assert_invalid(config.validate(), "sqlite baseline.store requires path")
}

#[test]
fn duplicate_tracked_metrics_are_rejected() -> TestResult {
    let mut config = minimal()?;
    config.baseline.metrics = vec![
        MetricPolicy::new("durationMs", MetricDirection::LowerIsBetter, 10.0),
        MetricPolicy::new("durationMs", MetricDirection::HigherIsBetter, 0.0),
    ];
    assert_invalid(config.validate(), "duplicate metric durationMs")
}

#[test]
fn negative_tolerance_is_rejected() -> TestResult {
    let mut config = minimal()?;
    config.baseline.metrics =
        vec![MetricPolicy::new("durationMs", MetricDirection::LowerIsBetter, -1.0)];
    assert_invalid(config.validate(), "durationMs tolerance_pct must be a non-negative number")
}

#[test]
fn unknown_direction_fails_to_parse() -> TestResult {
    let result = HarnessConfig::from_toml_str(
        r#"
[[baseline.metrics]]
name = "durationMs"
direction = "sideways"
"#,
    );
    match result {
        Err(err) if err.to_string().starts_with("config parse error") => Ok(()),
        Err(err) => Err(format!("unexpected error {err}")),
        Ok(_) => Err("expected parse failure".to_string()),
    }
}

// ============================================================================
// SECTION: Events
// ============================================================================

#[test]
fn file_sink_requires_path() -> TestResult {
    let mut config = minimal()?;
    config.events.sink = EventSinkKind::File;
    assert_invalid(config.validate(), "file event sink requires events.path")?;
    config.events.path = Some(PathBuf::from("events.jsonl"));
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn non_file_sink_rejects_path() -> TestResult {
    let mut config = minimal()?;
    config.events.sink = EventSinkKind::Stderr;
    config.events.path = Some(PathBuf::from("events.jsonl"));
    assert_invalid(config.validate(), "events.path is only valid with the file sink")
}
