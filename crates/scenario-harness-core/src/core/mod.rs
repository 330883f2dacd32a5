// crates/scenario-harness-core/src/core/mod.rs
// ============================================================================
// Module: Scenario Harness Core Types
// Description: Scenario definitions, run records, metrics, and baselines.
// Purpose: Provide stable, serializable types shared by every harness stage.
// Dependencies: serde, regex, sha2
// ============================================================================

//! ## Overview
//! Core types describe the declarative scenario format, what a run observed,
//! how it was judged, and how its metrics compare to the stored baseline.
//! They carry no runtime behavior beyond validation and hashing.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod baseline;
pub mod errors;
pub mod hashing;
pub mod identifiers;
pub mod metrics;
pub mod run;
pub mod scenario;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use baseline::Baseline;
pub use baseline::BaselineAction;
pub use baseline::BaselineMode;
pub use baseline::ComparisonReport;
pub use baseline::ComparisonStatus;
pub use baseline::MetricClassification;
pub use baseline::MetricComparison;
pub use errors::ConfigurationError;
pub use errors::ProvisionError;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use identifiers::AGENT_ACTOR;
pub use identifiers::ActorId;
pub use identifiers::AgentId;
pub use identifiers::EnvironmentId;
pub use identifiers::RuleId;
pub use identifiers::RunId;
pub use identifiers::ScenarioId;
pub use metrics::MetricDirection;
pub use metrics::MetricPolicy;
pub use metrics::MetricsSnapshot;
pub use metrics::default_metric_policies;
pub use run::EnvironmentSummary;
pub use run::RuleFailure;
pub use run::RuleResult;
pub use run::RunRecord;
pub use run::RunResult;
pub use run::SendFailure;
pub use run::TranscriptEntry;
pub use run::TranscriptEntryKind;
pub use run::TurnTimeout;
pub use run::VerificationVerdict;
pub use scenario::Actor;
pub use scenario::ActorRole;
pub use scenario::CustomMetricSpec;
pub use scenario::LlmRule;
pub use scenario::NumericOperator;
pub use scenario::NumericRule;
pub use scenario::PatternOperator;
pub use scenario::PatternRule;
pub use scenario::PatternValue;
pub use scenario::PluginSpec;
pub use scenario::RuleKind;
pub use scenario::Scenario;
pub use scenario::ScriptedTurn;
pub use scenario::TranscriptScope;
pub use scenario::VerificationRule;
pub use scenario::VerificationSpec;
pub use scenario::WaitCondition;
pub use time::Timestamp;
