// crates/scenario-harness-config/src/config.rs
// ============================================================================
// Module: Scenario Harness Configuration
// Description: Configuration loading and validation for the scenario harness.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: scenario-harness-core, scenario-harness-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section is optional; omitted values take the documented defaults.
//! Present but invalid values fail closed with a message naming the field.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use scenario_harness_core::BaselineMode;
use scenario_harness_core::MetricPolicy;
use scenario_harness_core::default_metric_policies;
use scenario_harness_core::runtime::GradingPolicy;
use scenario_harness_core::runtime::SuiteConfig;
use scenario_harness_core::runtime::VerificationConfig;
use scenario_harness_store_sqlite::SqliteStoreConfig;
use scenario_harness_store_sqlite::SqliteStoreMode;
use scenario_harness_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "scenario-harness.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "SCENARIO_HARNESS_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum worker count.
pub(crate) const MAX_WORKERS: usize = 256;
/// Maximum grading attempts.
pub(crate) const MAX_GRADING_ATTEMPTS: u32 = 10;
/// Maximum endpoint URL length.
pub(crate) const MAX_ENDPOINT_LENGTH: usize = 2048;
/// Maximum number of tracked metric policies.
pub(crate) const MAX_TRACKED_METRICS: usize = 128;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Scenario harness configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarnessConfig {
    /// Suite execution settings.
    #[serde(default)]
    pub suite: SuiteSection,
    /// Agent runtime adapter settings.
    #[serde(default)]
    pub runtime: RuntimeConfig,
    /// Model grader adapter and retry settings.
    #[serde(default)]
    pub grading: GradingConfig,
    /// Baseline mode, store, and tracked metrics.
    #[serde(default)]
    pub baseline: BaselineConfig,
    /// Lifecycle event sink.
    #[serde(default)]
    pub events: EventsConfig,
    /// File the configuration was read from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl HarnessConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order is the explicit path, then [`CONFIG_ENV_VAR`], then
    /// [`DEFAULT_CONFIG_NAME`] in the working directory. Only the implicit
    /// default may be absent, in which case built-in defaults apply.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_path(path)?;
        validate_path(&resolved)?;
        if !explicit && !resolved.exists() {
            return Ok(Self::default());
        }
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::from_toml_str(content)?;
        config.source_path = Some(resolved);
        Ok(config)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        if content.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.suite.validate()?;
        self.runtime.validate()?;
        self.grading.validate()?;
        self.baseline.validate()?;
        self.events.validate()?;
        Ok(())
    }

    /// Applies command-line overrides and revalidates.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an override is out of range.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> Result<(), ConfigError> {
        if let Some(workers) = overrides.workers {
            self.suite.workers = workers;
        }
        if let Some(timeout_ms) = overrides.timeout_ms {
            self.suite.timeout_ms = timeout_ms;
        }
        if let Some(mode) = overrides.baseline_mode {
            self.baseline.mode = mode;
        }
        self.validate()
    }

    /// Builds the suite runner configuration.
    #[must_use]
    pub fn suite_config(&self) -> SuiteConfig {
        SuiteConfig {
            workers: self.suite.workers,
            timeout: Duration::from_millis(self.suite.timeout_ms),
            default_turn_timeout: Duration::from_millis(self.suite.default_turn_timeout_ms),
            workdir_root: self.suite.workdir_root.clone(),
            baseline_mode: self.baseline.mode,
            metric_policies: self.baseline.metrics.clone(),
            verification: self.verification_config(),
        }
    }

    /// Builds the verification engine configuration.
    #[must_use]
    pub fn verification_config(&self) -> VerificationConfig {
        VerificationConfig {
            pass_threshold: self.suite.pass_threshold,
            default_confidence_threshold: self.grading.default_confidence_threshold,
            max_excerpt_chars: self.grading.max_excerpt_chars,
            grading: self.grading.policy(),
        }
    }
}

/// Command-line overrides layered over the file configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigOverrides {
    /// Worker count override.
    pub workers: Option<usize>,
    /// Suite timeout override in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Baseline mode override.
    pub baseline_mode: Option<BaselineMode>,
}

// ============================================================================
// SECTION: Suite
// ============================================================================

/// Suite execution settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SuiteSection {
    /// Maximum scenarios running at once.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Suite-level timeout in milliseconds.
    #[serde(default = "default_suite_timeout_ms")]
    pub timeout_ms: u64,
    /// Aggregate score a scenario must reach to pass.
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: f64,
    /// Turn timeout in milliseconds when a turn declares none.
    #[serde(default = "default_turn_timeout_ms")]
    pub default_turn_timeout_ms: u64,
    /// Parent directory for environment working directories.
    #[serde(default)]
    pub workdir_root: Option<PathBuf>,
}

impl Default for SuiteSection {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            timeout_ms: default_suite_timeout_ms(),
            pass_threshold: default_pass_threshold(),
            default_turn_timeout_ms: default_turn_timeout_ms(),
            workdir_root: None,
        }
    }
}

impl SuiteSection {
    /// Validates suite settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(ConfigError::Invalid(format!(
                "suite.workers must be between 1 and {MAX_WORKERS}"
            )));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "suite.timeout_ms must be greater than zero".to_string(),
            ));
        }
        validate_unit_interval("suite.pass_threshold", self.pass_threshold)?;
        if self.default_turn_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "suite.default_turn_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if let Some(root) = &self.workdir_root {
            validate_path_field("suite.workdir_root", root)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Runtime
// ============================================================================

/// Agent runtime adapter kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeKind {
    /// In-process runtime that echoes every message.
    #[default]
    Echo,
    /// Remote runtime reached over HTTP.
    Http,
}

/// Agent runtime adapter settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    /// Adapter kind.
    #[serde(default)]
    pub kind: RuntimeKind,
    /// Base URL for the HTTP runtime.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_runtime_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            kind: RuntimeKind::default(),
            endpoint: None,
            timeout_ms: default_runtime_timeout_ms(),
        }
    }
}

impl RuntimeConfig {
    /// Validates runtime settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "runtime.timeout_ms must be greater than zero".to_string(),
            ));
        }
        match self.kind {
            RuntimeKind::Echo => {
                if self.endpoint.is_some() {
                    return Err(ConfigError::Invalid(
                        "echo runtime must not set endpoint".to_string(),
                    ));
                }
                Ok(())
            }
            RuntimeKind::Http => {
                let endpoint = self.endpoint.as_deref().ok_or_else(|| {
                    ConfigError::Invalid("http runtime requires endpoint".to_string())
                })?;
                validate_endpoint("runtime.endpoint", endpoint)
            }
        }
    }
}

// ============================================================================
// SECTION: Grading
// ============================================================================

/// Model grader adapter kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GradingKind {
    /// No grader; model-graded rules fail as grading unavailable.
    #[default]
    Disabled,
    /// Remote grader reached over HTTP.
    Http,
}

/// Model grader adapter and retry settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GradingConfig {
    /// Adapter kind.
    #[serde(default)]
    pub kind: GradingKind,
    /// URL for the HTTP grader.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Deadline for a single grading call in milliseconds.
    #[serde(default = "default_grading_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum attempts, including the first call.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Backoff before the second attempt in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Multiplier applied per additional attempt.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Upper bound on any single backoff in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Confidence threshold for rules that declare none.
    #[serde(default = "default_confidence_threshold")]
    pub default_confidence_threshold: f64,
    /// Maximum transcript characters sent to the grader.
    #[serde(default = "default_max_excerpt_chars")]
    pub max_excerpt_chars: usize,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            kind: GradingKind::default(),
            endpoint: None,
            timeout_ms: default_grading_timeout_ms(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_backoff_ms: default_max_backoff_ms(),
            default_confidence_threshold: default_confidence_threshold(),
            max_excerpt_chars: default_max_excerpt_chars(),
        }
    }
}

impl GradingConfig {
    /// Returns the retry policy described by this section.
    #[must_use]
    pub const fn policy(&self) -> GradingPolicy {
        GradingPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            backoff_multiplier: self.backoff_multiplier,
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            call_timeout: Duration::from_millis(self.timeout_ms),
        }
    }

    /// Validates grading settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "grading.timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_attempts == 0 || self.max_attempts > MAX_GRADING_ATTEMPTS {
            return Err(ConfigError::Invalid(format!(
                "grading.max_attempts must be between 1 and {MAX_GRADING_ATTEMPTS}"
            )));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "grading.backoff_multiplier must be at least 1.0".to_string(),
            ));
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err(ConfigError::Invalid(
                "grading.max_backoff_ms must not be less than grading.initial_backoff_ms"
                    .to_string(),
            ));
        }
        validate_unit_interval(
            "grading.default_confidence_threshold",
            self.default_confidence_threshold,
        )?;
        if self.max_excerpt_chars == 0 {
            return Err(ConfigError::Invalid(
                "grading.max_excerpt_chars must be greater than zero".to_string(),
            ));
        }
        match self.kind {
            GradingKind::Disabled => {
                if self.endpoint.is_some() {
                    return Err(ConfigError::Invalid(
                        "disabled grading must not set endpoint".to_string(),
                    ));
                }
                Ok(())
            }
            GradingKind::Http => {
                let endpoint = self.endpoint.as_deref().ok_or_else(|| {
                    ConfigError::Invalid("http grading requires endpoint".to_string())
                })?;
                validate_endpoint("grading.endpoint", endpoint)
            }
        }
    }
}

// ============================================================================
// SECTION: Baseline
// ============================================================================

/// Baseline mode, store, and tracked metrics.
#[derive(Debug, Clone, Deserialize)]
pub struct BaselineConfig {
    /// How the suite treats baselines.
    #[serde(default)]
    pub mode: BaselineMode,
    /// Baseline store backend.
    #[serde(default)]
    pub store: BaselineStoreConfig,
    /// Tracked metric policies.
    #[serde(default = "default_metric_policies")]
    pub metrics: Vec<MetricPolicy>,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            mode: BaselineMode::default(),
            store: BaselineStoreConfig::default(),
            metrics: default_metric_policies(),
        }
    }
}

impl BaselineConfig {
    /// Validates baseline settings.
    fn validate(&self) -> Result<(), ConfigError> {
        self.store.validate()?;
        if self.metrics.len() > MAX_TRACKED_METRICS {
            return Err(ConfigError::Invalid(format!(
                "baseline.metrics exceeds {MAX_TRACKED_METRICS} entries"
            )));
        }
        let mut seen = BTreeSet::new();
        for policy in &self.metrics {
            if policy.name.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "baseline.metrics name must be non-empty".to_string(),
                ));
            }
            if !policy.tolerance_pct.is_finite() || policy.tolerance_pct < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "baseline.metrics {} tolerance_pct must be a non-negative number",
                    policy.name
                )));
            }
            if !seen.insert(policy.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "baseline.metrics contains duplicate metric {}",
                    policy.name
                )));
            }
        }
        Ok(())
    }
}

/// Baseline store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BaselineStoreType {
    /// Use the in-memory store (baselines last one invocation).
    #[default]
    Memory,
    /// Use the `SQLite`-backed durable store.
    Sqlite,
}

/// Baseline store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BaselineStoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: BaselineStoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for BaselineStoreConfig {
    fn default() -> Self {
        Self {
            store_type: BaselineStoreType::default(),
            path: None,
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl BaselineStoreConfig {
    /// Returns the `SQLite` store configuration when the sqlite backend is
    /// selected.
    #[must_use]
    pub fn sqlite_config(&self) -> Option<SqliteStoreConfig> {
        match (self.store_type, &self.path) {
            (BaselineStoreType::Sqlite, Some(path)) => Some(SqliteStoreConfig {
                path: path.clone(),
                busy_timeout_ms: self.busy_timeout_ms,
                journal_mode: self.journal_mode,
                sync_mode: self.sync_mode,
            }),
            _ => None,
        }
    }

    /// Validates baseline store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.store_type {
            BaselineStoreType::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid(
                        "memory baseline.store must not set path".to_string(),
                    ));
                }
                Ok(())
            }
            BaselineStoreType::Sqlite => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite baseline.store requires path".to_string())
                })?;
                validate_path_field("baseline.store.path", path)
            }
        }
    }
}

// ============================================================================
// SECTION: Events
// ============================================================================

/// Lifecycle event sink kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventSinkKind {
    /// Discard events.
    #[default]
    None,
    /// JSON lines on stderr.
    Stderr,
    /// Append-only JSON lines file.
    File,
}

/// Lifecycle event sink settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventsConfig {
    /// Sink kind.
    #[serde(default)]
    pub sink: EventSinkKind,
    /// Log file path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl EventsConfig {
    /// Validates event sink settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (EventSinkKind::File, Some(path)) => validate_path_field("events.path", path),
            (EventSinkKind::File, None) => {
                Err(ConfigError::Invalid("file event sink requires events.path".to_string()))
            }
            (_, Some(_)) => Err(ConfigError::Invalid(
                "events.path is only valid with the file sink".to_string(),
            )),
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default worker count.
pub(crate) const fn default_workers() -> usize {
    4
}

/// Default suite timeout in milliseconds.
pub(crate) const fn default_suite_timeout_ms() -> u64 {
    600_000
}

/// Default aggregate pass threshold.
pub(crate) const fn default_pass_threshold() -> f64 {
    0.75
}

/// Default turn timeout in milliseconds.
pub(crate) const fn default_turn_timeout_ms() -> u64 {
    30_000
}

/// Default runtime request timeout in milliseconds.
pub(crate) const fn default_runtime_timeout_ms() -> u64 {
    30_000
}

/// Default grading call timeout in milliseconds.
pub(crate) const fn default_grading_timeout_ms() -> u64 {
    20_000
}

/// Default grading attempts.
pub(crate) const fn default_max_attempts() -> u32 {
    3
}

/// Default initial grading backoff in milliseconds.
pub(crate) const fn default_initial_backoff_ms() -> u64 {
    250
}

/// Default grading backoff multiplier.
pub(crate) const fn default_backoff_multiplier() -> f64 {
    2.0
}

/// Default grading backoff cap in milliseconds.
pub(crate) const fn default_max_backoff_ms() -> u64 {
    5_000
}

/// Default confidence threshold for model-graded rules.
pub(crate) const fn default_confidence_threshold() -> f64 {
    0.7
}

/// Default grading transcript excerpt length.
pub(crate) const fn default_max_excerpt_chars() -> usize {
    8_000
}

/// Default `SQLite` busy timeout in milliseconds.
pub(crate) const fn default_store_busy_timeout_ms() -> u64 {
    5_000
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path and reports whether it was requested explicitly.
fn resolve_path(path: Option<&Path>) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured path field against length limits.
fn validate_path_field(field: &str, path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates an HTTP endpoint URL.
fn validate_endpoint(field: &str, endpoint: &str) -> Result<(), ConfigError> {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_ENDPOINT_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    let Some(rest) = trimmed.strip_prefix("http://").or_else(|| trimmed.strip_prefix("https://"))
    else {
        return Err(ConfigError::Invalid(format!("{field} must use http or https")));
    };
    if rest.is_empty() || rest.starts_with('/') {
        return Err(ConfigError::Invalid(format!("{field} must include a host")));
    }
    Ok(())
}

/// Validates that a value is a finite number in `[0, 1]`.
fn validate_unit_interval(field: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || !(0.0 ..= 1.0).contains(&value) {
        return Err(ConfigError::Invalid(format!("{field} must be between 0 and 1")));
    }
    Ok(())
}
