// crates/scenario-harness-core/src/runtime/mod.rs
// ============================================================================
// Module: Scenario Harness Runtime
// Description: Loader, provisioner, driver, collector, verification, and reporting.
// Purpose: Execute scenario suites end to end against injected collaborators.
// Dependencies: crate::{core, interfaces}, tokio
// ============================================================================

//! ## Overview
//! Runtime modules follow the data flow of a suite: load scenarios,
//! provision an environment, drive scripted turns, collect metrics, verify
//! rules, compare against baselines, and report. [`SuiteRunner`] wires the
//! stages together under a bounded worker pool.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod cancel;
pub mod collector;
pub mod comparator;
pub mod driver;
pub mod events;
pub mod loader;
pub mod provisioner;
pub mod reporter;
pub mod store;
pub mod suite;
pub mod verification;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cancel::CancelSignal;
pub use collector::MetricHook;
pub use collector::MetricsCollector;
pub use collector::PatternCountHook;
pub use collector::RunEvent;
pub use comparator::BaselineComparator;
pub use comparator::classify_metric;
pub use driver::ActorDriver;
pub use driver::DriverError;
pub use events::FileEventSink;
pub use events::HarnessEvent;
pub use events::HarnessEventKind;
pub use events::HarnessEventSink;
pub use events::MemoryEventSink;
pub use events::NoopEventSink;
pub use events::StderrEventSink;
pub use loader::SourceFormat;
pub use loader::ensure_unique_ids;
pub use loader::expand_patterns;
pub use loader::load_file;
pub use loader::load_paths;
pub use loader::parse_scenarios;
pub use provisioner::ArtifactPluginFactory;
pub use provisioner::EnvironmentLease;
pub use provisioner::Provisioner;
pub use reporter::EXIT_CONFIGURATION;
pub use reporter::EXIT_FAILURE;
pub use reporter::EXIT_PASS;
pub use reporter::ScenarioReport;
pub use reporter::ScenarioStatus;
pub use reporter::SuiteReport;
pub use reporter::SuiteSummary;
pub use store::InMemoryBaselineStore;
pub use store::SharedBaselineStore;
pub use suite::SuiteConfig;
pub use suite::SuiteRunner;
pub use suite::SuiteRunnerBuilder;
pub use verification::GradingPolicy;
pub use verification::VerificationConfig;
pub use verification::VerificationEngine;
pub use verification::aggregate_score;
pub use verification::build_verdict;
pub use verification::compare_numeric;
pub use verification::transcript_excerpt;
