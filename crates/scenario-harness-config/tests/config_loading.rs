//! File loading tests for scenario-harness-config.
// crates/scenario-harness-config/tests/config_loading.rs
// =============================================================================
// Module: Config Loading Tests
// Description: Validate path resolution and file limits.
// Purpose: Ensure config files are read fail-closed under hard limits.
// =============================================================================

use std::fs;

use scenario_harness_config::CONFIG_ENV_VAR;
use scenario_harness_config::HarnessConfig;
use scenario_harness_config::MAX_CONFIG_FILE_SIZE;
use tempfile::TempDir;

mod common;

use common::TestResult;

fn temp_dir() -> Result<TempDir, String> {
    TempDir::new().map_err(|err| err.to_string())
}

#[test]
fn explicit_file_is_loaded_and_recorded() -> TestResult {
    let dir = temp_dir()?;
    let path = dir.path().join("scenario-harness.toml");
    fs::write(&path, "[suite]\nworkers = 3\n").map_err(|err| err.to_string())?;
    let config = HarnessConfig::load(Some(&path)).map_err(|err| err.to_string())?;
    if config.suite.workers != 3 {
        return Err("workers not read from file".to_string());
    }
    if config.source_path.as_deref() != Some(path.as_path()) {
        return Err("source_path not recorded".to_string());
    }
    Ok(())
}

#[test]
fn missing_explicit_file_is_an_io_error() -> TestResult {
    let dir = temp_dir()?;
    let path = dir.path().join("absent.toml");
    match HarnessConfig::load(Some(&path)) {
        Err(err) if err.to_string().starts_with("config io error") => Ok(()),
        Err(err) => Err(format!("unexpected error {err}")),
        Ok(_) => Err("missing explicit config must fail".to_string()),
    }
}

#[test]
fn implicit_default_falls_back_to_builtin_defaults() -> TestResult {
    if std::env::var_os(CONFIG_ENV_VAR).is_some() {
        return Ok(());
    }
    if std::path::Path::new(scenario_harness_config::DEFAULT_CONFIG_NAME).exists() {
        return Ok(());
    }
    let config = HarnessConfig::load(None).map_err(|err| err.to_string())?;
    if config.source_path.is_some() || config.suite.workers != 4 {
        return Err("expected built-in defaults".to_string());
    }
    Ok(())
}

#[test]
fn oversized_file_is_rejected() -> TestResult {
    let dir = temp_dir()?;
    let path = dir.path().join("big.toml");
    let padding = "#".repeat(MAX_CONFIG_FILE_SIZE + 1);
    fs::write(&path, padding).map_err(|err| err.to_string())?;
    common::assert_invalid(
        HarnessConfig::load(Some(&path)).map(|_| ()),
        "config file exceeds size limit",
    )
}

#[test]
fn non_utf8_file_is_rejected() -> TestResult {
    let dir = temp_dir()?;
    let path = dir.path().join("binary.toml");
    fs::write(&path, [0xff, 0xfe, 0x00]).map_err(|err| err.to_string())?;
    common::assert_invalid(
        HarnessConfig::load(Some(&path)).map(|_| ()),
        "config file must be utf-8",
    )
}

#[test]
fn overlong_path_component_is_rejected() -> TestResult {
    let dir = temp_dir()?;
    let path = dir.path().join("c".repeat(300));
    common::assert_invalid(
        HarnessConfig::load(Some(&path)).map(|_| ()),
        "config path component too long",
    )
}

#[test]
fn malformed_toml_is_a_parse_error() -> TestResult {
    let dir = temp_dir()?;
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[suite\nworkers = ").map_err(|err| err.to_string())?;
    match HarnessConfig::load(Some(&path)) {
        Err(err) if err.to_string().starts_with("config parse error") => Ok(()),
        Err(err) => Err(format!("unexpected error {err}")),
        Ok(_) => Err("malformed config must fail".to_string()),
    }
}

#[test]
fn invalid_values_in_file_fail_validation() -> TestResult {
    let dir = temp_dir()?;
    let path = dir.path().join("invalid.toml");
    fs::write(&path, "[grading]\nmax_attempts = 0\n").map_err(|err| err.to_string())?;
    common::assert_invalid(
        HarnessConfig::load(Some(&path)).map(|_| ()),
        "grading.max_attempts must be between 1 and 10",
    )
}
