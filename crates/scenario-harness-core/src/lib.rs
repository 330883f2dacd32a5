// crates/scenario-harness-core/src/lib.rs
// ============================================================================
// Module: Scenario Harness Core Library
// Description: Public API surface for the scenario harness engine.
// Purpose: Expose core types, collaborator interfaces, and runtime stages.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The scenario harness drives scripted multi-actor conversations against a
//! conversational agent runtime, collects behavioral metrics, judges each
//! run against declarative rules (including model-graded judgments), and
//! compares results to stored baselines to catch regressions. The engine is
//! backend-agnostic: agent runtimes, grading models, plugin builds, and
//! baseline storage are reached only through the traits in [`interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::AgentResponse;
pub use interfaces::AgentRuntime;
pub use interfaces::BaselineStore;
pub use interfaces::Environment;
pub use interfaces::GradeResponse;
pub use interfaces::GradingError;
pub use interfaces::GradingRequest;
pub use interfaces::ModelGrader;
pub use interfaces::OutboundMessage;
pub use interfaces::PluginError;
pub use interfaces::PluginFactory;
pub use interfaces::PluginHandle;
pub use interfaces::RuntimeError;
pub use interfaces::StoreError;
pub use runtime::ActorDriver;
pub use runtime::BaselineComparator;
pub use runtime::CancelSignal;
pub use runtime::HarnessEvent;
pub use runtime::HarnessEventKind;
pub use runtime::HarnessEventSink;
pub use runtime::InMemoryBaselineStore;
pub use runtime::MetricsCollector;
pub use runtime::Provisioner;
pub use runtime::ScenarioReport;
pub use runtime::ScenarioStatus;
pub use runtime::SharedBaselineStore;
pub use runtime::SuiteConfig;
pub use runtime::SuiteReport;
pub use runtime::SuiteRunner;
pub use runtime::SuiteRunnerBuilder;
pub use runtime::VerificationConfig;
pub use runtime::VerificationEngine;
