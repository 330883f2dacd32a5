//! Config defaults and conversion tests for scenario-harness-config.
// crates/scenario-harness-config/tests/config_defaults.rs
// =============================================================================
// Module: Config Defaults Tests
// Description: Validate default values and runtime config conversion.
// Purpose: Ensure an empty config is valid and maps onto engine defaults.
// =============================================================================

use std::time::Duration;

use scenario_harness_config::BaselineStoreType;
use scenario_harness_config::ConfigOverrides;
use scenario_harness_config::EventSinkKind;
use scenario_harness_config::GradingKind;
use scenario_harness_config::RuntimeKind;
use scenario_harness_core::BaselineMode;
use scenario_harness_core::MetricDirection;
use scenario_harness_core::default_metric_policies;

mod common;

use common::TestResult;

#[test]
fn default_config_validates() -> TestResult {
    let config = common::minimal_config().map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    Ok(())
}

#[test]
fn defaults_match_documented_values() -> TestResult {
    let config = common::minimal_config().map_err(|err| err.to_string())?;
    if config.suite.workers != 4 || config.suite.timeout_ms != 600_000 {
        return Err("suite defaults drifted".to_string());
    }
    if (config.suite.pass_threshold - 0.75).abs() > f64::EPSILON {
        return Err("pass_threshold should default to 0.75".to_string());
    }
    if config.runtime.kind != RuntimeKind::Echo || config.grading.kind != GradingKind::Disabled {
        return Err("adapters should default to echo and disabled grading".to_string());
    }
    if config.baseline.mode != BaselineMode::Compare
        || config.baseline.store.store_type != BaselineStoreType::Memory
    {
        return Err("baseline should default to compare over memory".to_string());
    }
    if config.baseline.metrics != default_metric_policies() {
        return Err("tracked metrics should default to the built-in policies".to_string());
    }
    if config.events.sink != EventSinkKind::None {
        return Err("events should default to none".to_string());
    }
    Ok(())
}

#[test]
fn suite_config_reflects_every_section() -> TestResult {
    let config = scenario_harness_config::HarnessConfig::from_toml_str(
        r#"
[suite]
workers = 2
timeout_ms = 1500
pass_threshold = 0.5
default_turn_timeout_ms = 250
workdir_root = "/tmp/harness"

[grading]
kind = "http"
endpoint = "http://127.0.0.1:9000/grade"
timeout_ms = 800
max_attempts = 5
initial_backoff_ms = 10
backoff_multiplier = 3.0
max_backoff_ms = 90
default_confidence_threshold = 0.9
max_excerpt_chars = 100

[baseline]
mode = "promote"

[[baseline.metrics]]
name = "turnsCompleted"
direction = "higher_is_better"
tolerance_pct = 0.0
blocking = true
"#,
    )
    .map_err(|err| err.to_string())?;
    let suite = config.suite_config();
    if suite.workers != 2
        || suite.timeout != Duration::from_millis(1_500)
        || suite.default_turn_timeout != Duration::from_millis(250)
    {
        return Err("suite timing not carried over".to_string());
    }
    if suite.workdir_root.as_deref() != Some(std::path::Path::new("/tmp/harness")) {
        return Err("workdir_root not carried over".to_string());
    }
    if suite.baseline_mode != BaselineMode::Promote {
        return Err("baseline mode not carried over".to_string());
    }
    let [policy] = suite.metric_policies.as_slice() else {
        return Err("declared metrics should replace the defaults".to_string());
    };
    if policy.direction != MetricDirection::HigherIsBetter || !policy.blocking {
        return Err("metric policy fields not parsed".to_string());
    }
    let verification = &suite.verification;
    if (verification.pass_threshold - 0.5).abs() > f64::EPSILON
        || (verification.default_confidence_threshold - 0.9).abs() > f64::EPSILON
        || verification.max_excerpt_chars != 100
    {
        return Err("verification settings not carried over".to_string());
    }
    let grading = &verification.grading;
    if grading.max_attempts != 5
        || grading.initial_backoff != Duration::from_millis(10)
        || grading.max_backoff != Duration::from_millis(90)
        || grading.call_timeout != Duration::from_millis(800)
    {
        return Err("grading policy not carried over".to_string());
    }
    Ok(())
}

#[test]
fn overrides_replace_file_values() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config
        .apply_overrides(&ConfigOverrides {
            workers: Some(1),
            timeout_ms: Some(5_000),
            baseline_mode: Some(BaselineMode::Skip),
        })
        .map_err(|err| err.to_string())?;
    if config.suite.workers != 1
        || config.suite.timeout_ms != 5_000
        || config.baseline.mode != BaselineMode::Skip
    {
        return Err("overrides not applied".to_string());
    }
    Ok(())
}

#[test]
fn overrides_are_validated() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    let result = config.apply_overrides(&ConfigOverrides {
        workers: Some(0),
        ..ConfigOverrides::default()
    });
    common::assert_invalid(result, "suite.workers must be between 1 and 256")
}

#[test]
fn sqlite_store_config_is_derived_from_baseline_store() -> TestResult {
    let config = scenario_harness_config::HarnessConfig::from_toml_str(
        r#"
[baseline.store]
type = "sqlite"
path = "state/baselines.sqlite"
busy_timeout_ms = 100
journal_mode = "delete"
sync_mode = "normal"
"#,
    )
    .map_err(|err| err.to_string())?;
    let sqlite = config.baseline.store.sqlite_config().ok_or("expected sqlite config")?;
    if sqlite.path != std::path::Path::new("state/baselines.sqlite")
        || sqlite.busy_timeout_ms != 100
    {
        return Err("sqlite settings not carried over".to_string());
    }
    if sqlite.journal_mode.pragma_value() != "delete" || sqlite.sync_mode.pragma_value() != "normal"
    {
        return Err("sqlite pragmas not carried over".to_string());
    }
    Ok(())
}
