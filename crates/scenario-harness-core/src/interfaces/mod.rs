// crates/scenario-harness-core/src/interfaces/mod.rs
// ============================================================================
// Module: Scenario Harness Interfaces
// Description: Collaborator interfaces for agent runtimes, grading, and storage.
// Purpose: Define the narrow contract surfaces the harness engine consumes.
// Dependencies: crate::core, async-trait, tokio
// ============================================================================

//! ## Overview
//! The engine never talks to an agent runtime, a grading model, a plugin
//! build, or a database directly. Each collaborator is reached through one
//! of the traits below so tests can substitute deterministic doubles.
//! Implementations must fail closed: an error is always reported, never
//! treated as a pass.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::core::Baseline;
use crate::core::PluginSpec;
use crate::core::identifiers::ActorId;
use crate::core::identifiers::AgentId;
use crate::core::identifiers::EnvironmentId;
use crate::core::identifiers::RuleId;
use crate::core::identifiers::ScenarioId;

// ============================================================================
// SECTION: Environment
// ============================================================================

/// Plugin constructed inside an environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginHandle {
    /// Plugin name.
    pub name: String,
    /// Resolved build artifact, when declared.
    pub artifact: Option<PathBuf>,
}

/// Isolated execution context for one scenario run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Environment identifier.
    pub environment_id: EnvironmentId,
    /// Scenario the environment was provisioned for.
    pub scenario_id: ScenarioId,
    /// Fresh agent identity; responses from other identities are discarded.
    pub agent_id: AgentId,
    /// Isolated working directory owned by this environment.
    pub workdir: PathBuf,
    /// Plugins constructed for the scenario.
    pub plugins: Vec<PluginHandle>,
}

// ============================================================================
// SECTION: Agent Runtime
// ============================================================================

/// Scripted input delivered to the agent runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Transcript sequence number of the input.
    pub sequence: u64,
    /// Zero-based turn index.
    pub turn_index: usize,
    /// Sending actor.
    pub actor_id: ActorId,
    /// Persona reference of the sending actor.
    pub persona: Option<String>,
    /// Message content.
    pub content: String,
}

/// Response emitted by the agent runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Agent identity that produced the response.
    pub agent_id: AgentId,
    /// Response content.
    pub content: String,
    /// Sequence number of the input this responds to, when known.
    pub in_reply_to: Option<u64>,
}

/// Agent runtime errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Subscription could not be established.
    #[error("agent runtime subscribe error: {0}")]
    Subscribe(String),
    /// Message delivery failed.
    #[error("agent runtime send error: {0}")]
    Send(String),
}

/// Message send/subscribe API of the conversational agent runtime.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Subscribes to responses produced inside the environment.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when the subscription cannot be established.
    async fn subscribe(
        &self,
        environment: &Environment,
    ) -> Result<mpsc::Receiver<AgentResponse>, RuntimeError>;

    /// Sends one scripted input into the environment.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when delivery fails.
    async fn send(
        &self,
        environment: &Environment,
        message: &OutboundMessage,
    ) -> Result<(), RuntimeError>;

    /// Drops any per-environment state held by the runtime.
    async fn detach(&self, _environment: &Environment) {}
}

// ============================================================================
// SECTION: Model Grader
// ============================================================================

/// Model-grading request for one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingRequest {
    /// Scenario identifier.
    pub scenario_id: ScenarioId,
    /// Rule identifier.
    pub rule_id: RuleId,
    /// Grading criterion (the rule description).
    pub criterion: String,
    /// Bounded transcript excerpt.
    pub transcript_excerpt: String,
    /// True when older transcript entries were omitted from the excerpt.
    pub truncated: bool,
}

/// Model-grading response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeResponse {
    /// Confidence the criterion holds, in `[0, 1]`.
    pub confidence: f64,
    /// Model rationale.
    pub rationale: String,
}

/// Model-grading errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GradingError {
    /// The grading call exceeded its deadline.
    #[error("grading timeout: {0}")]
    Timeout(String),
    /// The grading backend throttled the request.
    #[error("grading rate limited: {0}")]
    RateLimited(String),
    /// The grading backend failed transiently.
    #[error("grading transient failure: {0}")]
    Transient(String),
    /// The grading backend failed permanently.
    #[error("grading failed: {0}")]
    Fatal(String),
    /// Suite cancellation aborted the call.
    #[error("grading cancelled")]
    Cancelled,
}

impl GradingError {
    /// Returns true when the call may be retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::RateLimited(_) | Self::Transient(_))
    }
}

/// Model-grading call (prompt to confidence plus rationale).
#[async_trait]
pub trait ModelGrader: Send + Sync {
    /// Grades a transcript excerpt against a criterion.
    ///
    /// # Errors
    ///
    /// Returns [`GradingError`] when grading fails.
    async fn grade(&self, request: &GradingRequest) -> Result<GradeResponse, GradingError>;
}

// ============================================================================
// SECTION: Baseline Store
// ============================================================================

/// Baseline store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("baseline store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("baseline store corruption: {0}")]
    Corrupt(String),
    /// Store data version is incompatible.
    #[error("baseline store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store data is invalid.
    #[error("baseline store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("baseline store error: {0}")]
    Store(String),
}

/// Key-value persistence for the current baseline per scenario.
pub trait BaselineStore {
    /// Loads the baseline for a scenario.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn load(&self, scenario_id: &ScenarioId) -> Result<Option<Baseline>, StoreError>;

    /// Saves a baseline, replacing any existing record for the scenario.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when saving fails.
    fn save(&self, baseline: &Baseline) -> Result<(), StoreError>;

    /// Lists stored baselines ordered by scenario identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when listing fails.
    fn list(&self) -> Result<Vec<Baseline>, StoreError>;
}

// ============================================================================
// SECTION: Plugin Factory
// ============================================================================

/// Plugin construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    /// Declared build artifact does not exist.
    #[error("build artifact not found at {0}")]
    MissingArtifact(String),
    /// Plugin is not known to the factory.
    #[error("plugin is not registered")]
    Unknown,
    /// Plugin construction failed.
    #[error("plugin construction failed: {0}")]
    Construct(String),
}

impl PluginError {
    /// Returns a remediation hint for the failure.
    #[must_use]
    pub fn hint(&self, plugin: &str) -> String {
        match self {
            Self::MissingArtifact(path) => {
                format!("build plugin {plugin} so that {path} exists, then re-run the suite")
            }
            Self::Unknown => {
                format!("register plugin {plugin} with the plugin factory or mark it required = false")
            }
            Self::Construct(_) => {
                format!("check the configuration of plugin {plugin} or mark it required = false")
            }
        }
    }
}

/// Constructs the plugins a scenario declares.
pub trait PluginFactory: Send + Sync {
    /// Constructs a plugin inside the environment working directory.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError`] when the plugin cannot be constructed.
    fn construct(
        &self,
        spec: &PluginSpec,
        scenario_dir: &Path,
        workdir: &Path,
    ) -> Result<PluginHandle, PluginError>;
}
