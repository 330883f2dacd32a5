// crates/scenario-harness-cli/src/wiring.rs
// ============================================================================
// Module: Collaborator Wiring
// Description: Builds adapters, stores, and sinks from configuration.
// Purpose: Assemble a suite runner from a validated harness configuration.
// Dependencies: scenario-harness-config, scenario-harness-core,
//               scenario-harness-providers, scenario-harness-store-sqlite
// ============================================================================

//! ## Overview
//! Each builder maps one configuration section onto its collaborator. Any
//! failure here happens before a scenario starts and is reported as a
//! configuration error by the binary.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use scenario_harness_config::BaselineStoreConfig;
use scenario_harness_config::BaselineStoreType;
use scenario_harness_config::EventSinkKind;
use scenario_harness_config::EventsConfig;
use scenario_harness_config::GradingConfig;
use scenario_harness_config::GradingKind;
use scenario_harness_config::HarnessConfig;
use scenario_harness_config::RuntimeConfig;
use scenario_harness_config::RuntimeKind;
use scenario_harness_core::AgentRuntime;
use scenario_harness_core::BaselineStore;
use scenario_harness_core::ModelGrader;
use scenario_harness_core::SharedBaselineStore;
use scenario_harness_core::SuiteRunner;
use scenario_harness_core::SuiteRunnerBuilder;
use scenario_harness_core::runtime::FileEventSink;
use scenario_harness_core::runtime::HarnessEventSink;
use scenario_harness_core::runtime::InMemoryBaselineStore;
use scenario_harness_core::runtime::NoopEventSink;
use scenario_harness_core::runtime::StderrEventSink;
use scenario_harness_providers::EchoRuntime;
use scenario_harness_providers::HttpAgentRuntime;
use scenario_harness_providers::HttpGraderConfig;
use scenario_harness_providers::HttpModelGrader;
use scenario_harness_providers::HttpRuntimeConfig;
use scenario_harness_providers::ProviderError;
use scenario_harness_providers::UnavailableGrader;
use scenario_harness_store_sqlite::SqliteBaselineStore;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while assembling collaborators.
#[derive(Debug, Error)]
pub enum WiringError {
    /// An adapter could not be constructed.
    #[error("adapter setup failed: {0}")]
    Provider(#[from] ProviderError),
    /// The baseline store could not be opened.
    #[error("baseline store setup failed: {0}")]
    Store(String),
    /// The event sink could not be opened.
    #[error("event sink setup failed: {0}")]
    Events(String),
    /// A required setting was missing.
    #[error("incomplete configuration: {0}")]
    Incomplete(String),
}

/// Shared baseline store trait object.
pub type DynBaselineStore = Arc<dyn BaselineStore + Send + Sync>;

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Builds the agent runtime adapter.
///
/// # Errors
///
/// Returns [`WiringError`] when the adapter cannot be constructed.
pub fn build_runtime(config: &RuntimeConfig) -> Result<Arc<dyn AgentRuntime>, WiringError> {
    match config.kind {
        RuntimeKind::Echo => Ok(Arc::new(EchoRuntime::new())),
        RuntimeKind::Http => {
            let endpoint = config
                .endpoint
                .clone()
                .ok_or_else(|| WiringError::Incomplete("runtime.endpoint".to_string()))?;
            let mut http = HttpRuntimeConfig::new(endpoint);
            http.timeout_ms = config.timeout_ms;
            Ok(Arc::new(HttpAgentRuntime::new(&http)?))
        }
    }
}

/// Builds the model grader adapter.
///
/// # Errors
///
/// Returns [`WiringError`] when the adapter cannot be constructed.
pub fn build_grader(config: &GradingConfig) -> Result<Arc<dyn ModelGrader>, WiringError> {
    match config.kind {
        GradingKind::Disabled => Ok(Arc::new(UnavailableGrader)),
        GradingKind::Http => {
            let endpoint = config
                .endpoint
                .clone()
                .ok_or_else(|| WiringError::Incomplete("grading.endpoint".to_string()))?;
            let mut http = HttpGraderConfig::new(endpoint);
            http.timeout_ms = config.timeout_ms;
            Ok(Arc::new(HttpModelGrader::new(&http)?))
        }
    }
}

/// Opens the configured baseline store.
///
/// # Errors
///
/// Returns [`WiringError`] when the store cannot be opened.
pub fn build_baseline_store(config: &BaselineStoreConfig) -> Result<DynBaselineStore, WiringError> {
    match config.store_type {
        BaselineStoreType::Memory => Ok(Arc::new(InMemoryBaselineStore::new())),
        BaselineStoreType::Sqlite => {
            let sqlite = config
                .sqlite_config()
                .ok_or_else(|| WiringError::Incomplete("baseline.store.path".to_string()))?;
            let store = SqliteBaselineStore::new(sqlite)
                .map_err(|err| WiringError::Store(err.to_string()))?;
            Ok(Arc::new(store))
        }
    }
}

/// Opens the configured event sink.
///
/// # Errors
///
/// Returns [`WiringError`] when the sink cannot be opened.
pub fn build_event_sink(config: &EventsConfig) -> Result<Arc<dyn HarnessEventSink>, WiringError> {
    match config.sink {
        EventSinkKind::None => Ok(Arc::new(NoopEventSink)),
        EventSinkKind::Stderr => Ok(Arc::new(StderrEventSink)),
        EventSinkKind::File => {
            let path = config
                .path
                .as_deref()
                .ok_or_else(|| WiringError::Incomplete("events.path".to_string()))?;
            let sink =
                FileEventSink::new(path).map_err(|err| WiringError::Events(err.to_string()))?;
            Ok(Arc::new(sink))
        }
    }
}

/// Assembles a suite runner from a validated configuration.
///
/// # Errors
///
/// Returns [`WiringError`] when any collaborator cannot be constructed.
pub fn build_runner(config: &HarnessConfig) -> Result<SuiteRunner, WiringError> {
    let runtime = build_runtime(&config.runtime)?;
    let grader = build_grader(&config.grading)?;
    let store = SharedBaselineStore::new(build_baseline_store(&config.baseline.store)?);
    let events = build_event_sink(&config.events)?;
    Ok(SuiteRunnerBuilder::new(runtime, grader, store)
        .config(config.suite_config())
        .events(events)
        .build())
}
