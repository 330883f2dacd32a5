// crates/scenario-harness-core/src/core/errors.rs
// ============================================================================
// Module: Scenario Harness Error Taxonomy
// Description: Configuration and provisioning errors shared across the engine.
// Purpose: Attribute every failure to a scenario, rule, metric, or plugin.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`ConfigurationError`] is fatal before execution and never retried.
//! [`ProvisionError`] is fatal to one scenario only; sibling scenarios keep
//! running. Turn timeouts and grading failures are recorded values rather
//! than errors, see [`crate::core::run`] and [`crate::interfaces`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Configuration Errors
// ============================================================================

/// Malformed scenario definitions or unresolvable references.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Scenario source could not be read.
    #[error("failed to read scenario source {path}: {message}")]
    Io {
        /// Source path.
        path: String,
        /// Underlying I/O message.
        message: String,
    },
    /// Scenario source could not be parsed.
    #[error("failed to parse scenario source {path}: {message}")]
    Parse {
        /// Source path.
        path: String,
        /// Parser message.
        message: String,
    },
    /// Scenario source extension is not recognized.
    #[error("unsupported scenario source format: {0} (expected .json, .yaml, .yml, or .toml)")]
    UnsupportedFormat(String),
    /// Glob pattern is malformed.
    #[error("invalid scenario path pattern {pattern}: {message}")]
    InvalidPathPattern {
        /// Offending pattern.
        pattern: String,
        /// Pattern parser message.
        message: String,
    },
    /// Glob pattern matched no files.
    #[error("scenario path pattern matched no files: {0}")]
    NoMatches(String),
    /// Required field is empty.
    #[error("scenario {scenario}: field {field} must be non-empty")]
    MissingField {
        /// Scenario identifier (or `<unknown>`).
        scenario: String,
        /// Field path.
        field: String,
    },
    /// Scenario identifier appears more than once in a suite.
    #[error("duplicate scenario id: {0}")]
    DuplicateScenarioId(String),
    /// Actor identifier appears more than once in a scenario.
    #[error("scenario {scenario}: duplicate actor id {actor}")]
    DuplicateActorId {
        /// Scenario identifier.
        scenario: String,
        /// Actor identifier.
        actor: String,
    },
    /// Actor identifier collides with the reserved agent actor.
    #[error("scenario {scenario}: actor id {actor} is reserved for agent responses")]
    ReservedActorId {
        /// Scenario identifier.
        scenario: String,
        /// Actor identifier.
        actor: String,
    },
    /// Scenario declares no participant actor.
    #[error("scenario {0}: at least one actor with role participant is required")]
    MissingParticipant(String),
    /// Scenario declares no turns.
    #[error("scenario {0}: at least one scripted turn is required")]
    MissingTurns(String),
    /// Turn references an undeclared actor.
    #[error("scenario {scenario}: turn {turn} references unknown actor {actor}")]
    UnknownActor {
        /// Scenario identifier.
        scenario: String,
        /// Zero-based turn index.
        turn: usize,
        /// Actor identifier.
        actor: String,
    },
    /// Turn is scripted for an observer actor.
    #[error("scenario {scenario}: turn {turn} is scripted for observer {actor}")]
    ObserverTurn {
        /// Scenario identifier.
        scenario: String,
        /// Zero-based turn index.
        turn: usize,
        /// Actor identifier.
        actor: String,
    },
    /// Turn wait condition is malformed.
    #[error("scenario {scenario}: turn {turn} has an invalid wait condition: {message}")]
    InvalidWait {
        /// Scenario identifier.
        scenario: String,
        /// Zero-based turn index.
        turn: usize,
        /// Validation message.
        message: String,
    },
    /// Verification is required but no rules were declared.
    #[error(
        "scenario {0}: verification.rules is empty; declare rules or set verification.required = \
         false"
    )]
    MissingRules(String),
    /// Rule identifier appears more than once in a scenario.
    #[error("scenario {scenario}: duplicate rule id {rule}")]
    DuplicateRuleId {
        /// Scenario identifier.
        scenario: String,
        /// Rule identifier.
        rule: String,
    },
    /// Rule weight is not a finite positive number.
    #[error("scenario {scenario}: rule {rule} weight must be finite and greater than zero")]
    InvalidWeight {
        /// Scenario identifier.
        scenario: String,
        /// Rule identifier.
        rule: String,
    },
    /// Threshold is outside `[0, 1]`.
    #[error("scenario {scenario}: {field} must be within [0, 1]")]
    InvalidThreshold {
        /// Scenario identifier.
        scenario: String,
        /// Field path.
        field: String,
    },
    /// Regular expression failed to compile.
    #[error("scenario {scenario}: {field} is not a valid regular expression: {message}")]
    InvalidRegex {
        /// Scenario identifier.
        scenario: String,
        /// Field path.
        field: String,
        /// Regex compiler message.
        message: String,
    },
    /// Numeric rule references a metric that no run produces.
    #[error("scenario {scenario}: rule {rule} references unknown metric {metric}")]
    UnknownMetric {
        /// Scenario identifier.
        scenario: String,
        /// Rule identifier.
        rule: String,
        /// Metric name.
        metric: String,
    },
    /// Custom metric name duplicates or shadows another metric.
    #[error("scenario {scenario}: custom metric {metric} duplicates an existing metric")]
    DuplicateMetric {
        /// Scenario identifier.
        scenario: String,
        /// Metric name.
        metric: String,
    },
}

// ============================================================================
// SECTION: Provision Errors
// ============================================================================

/// Failures constructing or tearing down an isolated environment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisionError {
    /// A required plugin could not be constructed.
    #[error("plugin {plugin} is unavailable: {reason} (hint: {hint})")]
    PluginUnavailable {
        /// Plugin name.
        plugin: String,
        /// Failure reason.
        reason: String,
        /// Remediation hint.
        hint: String,
    },
    /// The isolated working directory could not be created.
    #[error("failed to create working directory under {root}: {message}")]
    Workdir {
        /// Working directory root.
        root: String,
        /// Underlying I/O message.
        message: String,
    },
    /// The isolated working directory could not be removed.
    #[error("failed to release environment {environment}: {message}")]
    Release {
        /// Environment identifier.
        environment: String,
        /// Underlying I/O message.
        message: String,
    },
}
