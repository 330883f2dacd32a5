// crates/scenario-harness-core/src/core/scenario.rs
// ============================================================================
// Module: Scenario Definitions
// Description: Scenario, actor, scripted turn, and verification rule types.
// Purpose: Define the declarative scenario format with validation helpers.
// Dependencies: crate::core::{errors, hashing, identifiers, metrics}, regex, serde
// ============================================================================

//! ## Overview
//! A [`Scenario`] is an immutable, validated script: ordered actors, ordered
//! turns, and the rules that judge the run. The external format uses
//! camelCase field names. Validation enforces unique identifiers, at least
//! one participant, resolvable actor and metric references, and explicit
//! opt-out when a scenario carries no verification rules.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::path::PathBuf;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

use crate::core::errors::ConfigurationError;
use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::AGENT_ACTOR;
use crate::core::identifiers::ActorId;
use crate::core::identifiers::RuleId;
use crate::core::identifiers::ScenarioId;
use crate::core::metrics::ACTOR_MESSAGES_PREFIX;
use crate::core::metrics::actor_messages_key;
use crate::core::metrics::agent_messages_key;
use crate::core::metrics::is_builtin_metric;

// ============================================================================
// SECTION: Scenario
// ============================================================================

/// Declarative scripted multi-actor interaction plus its pass/fail criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    /// Scenario identifier, unique within a suite.
    pub id: ScenarioId,
    /// Human-readable name.
    pub name: String,
    /// Grouping category.
    pub category: String,
    /// Optional free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Actors in declaration order.
    pub actors: Vec<Actor>,
    /// Scripted turns in execution order.
    pub turns: Vec<ScriptedTurn>,
    /// Plugins the environment must provide.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<PluginSpec>,
    /// Custom metric hooks evaluated over the transcript.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<CustomMetricSpec>,
    /// Verification configuration.
    #[serde(default)]
    pub verification: VerificationSpec,
    /// Stop executing further turns after the first turn timeout.
    #[serde(default)]
    pub abort_on_timeout: bool,
    /// File the scenario was loaded from.
    #[serde(skip)]
    pub source: Option<PathBuf>,
    /// Canonical hash recorded at load time.
    #[serde(skip)]
    pub digest: Option<HashDigest>,
}

impl Scenario {
    /// Computes the canonical hash of the scenario definition.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Canonicalization`] when serialization fails.
    pub fn canonical_hash(&self) -> Result<HashDigest, HashError> {
        hash_canonical_json(DEFAULT_HASH_ALGORITHM, self)
    }

    /// Returns the actor with the given identifier.
    #[must_use]
    pub fn actor(&self, id: &ActorId) -> Option<&Actor> {
        self.actors.iter().find(|actor| &actor.id == id)
    }

    /// Returns every metric name a run of this scenario produces.
    #[must_use]
    pub fn known_metric_names(&self) -> BTreeSet<String> {
        let mut names: BTreeSet<String> =
            crate::core::metrics::BUILTIN_METRICS.iter().map(ToString::to_string).collect();
        names.insert(agent_messages_key());
        for actor in &self.actors {
            names.insert(actor_messages_key(actor.id.as_str()));
        }
        for metric in &self.metrics {
            names.insert(metric.name.clone());
        }
        names
    }

    /// Validates the scenario invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when validation fails.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let scenario = self.id.as_str();
        if scenario.trim().is_empty() {
            return Err(missing_field("<unknown>", "id"));
        }
        if self.name.trim().is_empty() {
            return Err(missing_field(scenario, "name"));
        }
        if self.category.trim().is_empty() {
            return Err(missing_field(scenario, "category"));
        }
        ensure_actors_valid(scenario, &self.actors)?;
        ensure_turns_valid(scenario, &self.actors, &self.turns)?;
        ensure_plugins_valid(scenario, &self.plugins)?;
        ensure_custom_metrics_valid(scenario, &self.actors, &self.metrics)?;
        ensure_verification_valid(self)?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Actors and Turns
// ============================================================================

/// Role an actor plays within a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// Sends scripted turns.
    Participant,
    /// Present in the conversation without scripted turns.
    Observer,
}

/// Participant or observer within a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    /// Actor identifier.
    pub id: ActorId,
    /// Actor role.
    pub role: ActorRole,
    /// Persona reference resolved by the agent runtime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
}

/// One scripted input and the condition that completes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptedTurn {
    /// Actor sending the input.
    pub actor_id: ActorId,
    /// Message content.
    pub content: String,
    /// Condition awaited after sending; defaults to one response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for: Option<WaitCondition>,
    /// Per-turn timeout override in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl ScriptedTurn {
    /// Returns the effective wait condition.
    #[must_use]
    pub fn wait_condition(&self) -> WaitCondition {
        self.wait_for.clone().unwrap_or(WaitCondition::Responses {
            count: 1,
        })
    }
}

/// Condition a turn waits for before the next turn starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WaitCondition {
    /// Wait until at least `count` responses arrived for this turn.
    Responses {
        /// Minimum response count.
        #[serde(default = "default_response_count")]
        count: u32,
    },
    /// Wait a fixed amount of time while collecting responses.
    Elapsed {
        /// Elapsed time in milliseconds.
        ms: u64,
    },
    /// Do not wait.
    None,
}

impl WaitCondition {
    /// Returns a stable description for reports.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Responses {
                count,
            } => format!("responses >= {count}"),
            Self::Elapsed {
                ms,
            } => format!("elapsed {ms}ms"),
            Self::None => "none".to_string(),
        }
    }
}

/// Default response count for wait conditions.
const fn default_response_count() -> u32 {
    1
}

// ============================================================================
// SECTION: Plugins and Custom Metrics
// ============================================================================

/// Plugin the scenario requires in its environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginSpec {
    /// Plugin name.
    pub name: String,
    /// Build artifact path, relative to the scenario file when not absolute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<PathBuf>,
    /// Whether the scenario fails to provision without this plugin.
    #[serde(default = "default_true")]
    pub required: bool,
}

/// Transcript entries a pattern is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptScope {
    /// Agent responses only.
    #[default]
    Responses,
    /// Scripted inputs only.
    Inputs,
    /// Every transcript entry.
    All,
}

/// Scenario-specific metric counting regex matches over the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomMetricSpec {
    /// Metric name.
    pub name: String,
    /// Regular expression counted per matching entry.
    pub pattern: String,
    /// Entries inspected.
    #[serde(default)]
    pub scope: TranscriptScope,
}

// ============================================================================
// SECTION: Verification
// ============================================================================

/// Verification configuration for a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationSpec {
    /// Whether the scenario must declare at least one rule.
    #[serde(default = "default_true")]
    pub required: bool,
    /// Scenario-level override of the suite pass threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_threshold: Option<f64>,
    /// Rules in declaration order.
    #[serde(default)]
    pub rules: Vec<VerificationRule>,
}

impl Default for VerificationSpec {
    fn default() -> Self {
        Self {
            required: true,
            pass_threshold: None,
            rules: Vec::new(),
        }
    }
}

/// One verification criterion with its weight and pass condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRule {
    /// Rule identifier, unique per scenario.
    pub id: RuleId,
    /// Human-readable description; the grading criterion for model rules.
    pub description: String,
    /// Relative weight in the aggregate score.
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Failing this rule fails the scenario regardless of aggregate score.
    #[serde(default)]
    pub required: bool,
    /// Minimum grading confidence for model-graded rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_threshold: Option<f64>,
    /// Rule kind and kind-specific parameters.
    #[serde(flatten)]
    pub kind: RuleKind,
}

/// Closed set of rule kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleKind {
    /// Exact comparison of a named metric.
    Numeric(NumericRule),
    /// Substring or regex presence over transcript text.
    Pattern(PatternRule),
    /// Model-graded judgment of the transcript.
    Llm(LlmRule),
}

impl RuleKind {
    /// Returns the stable kind label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Numeric(_) => "numeric",
            Self::Pattern(_) => "pattern",
            Self::Llm(_) => "llm",
        }
    }
}

/// Numeric comparison parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericRule {
    /// Metric name.
    pub metric: String,
    /// Comparison operator.
    pub operator: NumericOperator,
    /// Expected value.
    #[serde(alias = "threshold")]
    pub expected: f64,
}

/// Numeric comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumericOperator {
    /// Metric is greater than or equal to expected.
    #[serde(rename = ">=")]
    GreaterOrEqual,
    /// Metric is less than or equal to expected.
    #[serde(rename = "<=")]
    LessOrEqual,
    /// Metric equals expected.
    #[serde(rename = "==")]
    Equal,
    /// Metric differs from expected.
    #[serde(rename = "!=")]
    NotEqual,
}

impl NumericOperator {
    /// Returns the operator symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::GreaterOrEqual => ">=",
            Self::LessOrEqual => "<=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
        }
    }
}

/// Pattern presence parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternRule {
    /// Matching operator.
    pub operator: PatternOperator,
    /// Pattern or list of alternatives.
    pub value: PatternValue,
    /// Expected match state.
    #[serde(default = "default_true")]
    pub expected: bool,
    /// Transcript entries inspected.
    #[serde(default)]
    pub scope: TranscriptScope,
    /// Ignore ASCII and Unicode case when matching.
    #[serde(default)]
    pub case_insensitive: bool,
}

/// Pattern matching operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternOperator {
    /// Substring presence.
    Contains,
    /// Regular expression match.
    Matches,
}

/// One pattern or a list of alternatives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternValue {
    /// Single pattern.
    One(String),
    /// Any alternative matching counts as a match.
    Any(Vec<String>),
}

impl PatternValue {
    /// Returns the alternatives in declaration order.
    #[must_use]
    pub fn alternatives(&self) -> Vec<&str> {
        match self {
            Self::One(value) => vec![value.as_str()],
            Self::Any(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

/// Model-graded rule parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmRule {
    /// Optional per-rule excerpt bound in characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_excerpt_chars: Option<usize>,
}

/// Default rule weight.
const fn default_weight() -> f64 {
    1.0
}

/// Serde default helper for `true`.
const fn default_true() -> bool {
    true
}

// ============================================================================
// SECTION: Validation Helpers
// ============================================================================

/// Builds a missing-field error.
fn missing_field(scenario: &str, field: &str) -> ConfigurationError {
    ConfigurationError::MissingField {
        scenario: scenario.to_string(),
        field: field.to_string(),
    }
}

/// Ensures actor identifiers are unique, non-reserved, and include a participant.
fn ensure_actors_valid(scenario: &str, actors: &[Actor]) -> Result<(), ConfigurationError> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for actor in actors {
        let id = actor.id.as_str();
        if id.trim().is_empty() {
            return Err(missing_field(scenario, "actors[].id"));
        }
        if id == AGENT_ACTOR {
            return Err(ConfigurationError::ReservedActorId {
                scenario: scenario.to_string(),
                actor: id.to_string(),
            });
        }
        if !seen.insert(id) {
            return Err(ConfigurationError::DuplicateActorId {
                scenario: scenario.to_string(),
                actor: id.to_string(),
            });
        }
    }
    if !actors.iter().any(|actor| actor.role == ActorRole::Participant) {
        return Err(ConfigurationError::MissingParticipant(scenario.to_string()));
    }
    Ok(())
}

/// Ensures every turn references a participant and has a sane wait condition.
fn ensure_turns_valid(
    scenario: &str,
    actors: &[Actor],
    turns: &[ScriptedTurn],
) -> Result<(), ConfigurationError> {
    if turns.is_empty() {
        return Err(ConfigurationError::MissingTurns(scenario.to_string()));
    }
    for (index, turn) in turns.iter().enumerate() {
        let Some(actor) = actors.iter().find(|actor| actor.id == turn.actor_id) else {
            return Err(ConfigurationError::UnknownActor {
                scenario: scenario.to_string(),
                turn: index,
                actor: turn.actor_id.to_string(),
            });
        };
        if actor.role == ActorRole::Observer {
            return Err(ConfigurationError::ObserverTurn {
                scenario: scenario.to_string(),
                turn: index,
                actor: turn.actor_id.to_string(),
            });
        }
        if turn.timeout_ms == Some(0) {
            return Err(ConfigurationError::InvalidWait {
                scenario: scenario.to_string(),
                turn: index,
                message: "timeoutMs must be greater than zero".to_string(),
            });
        }
        if let Some(WaitCondition::Responses {
            count: 0,
        }) = turn.wait_for
        {
            return Err(ConfigurationError::InvalidWait {
                scenario: scenario.to_string(),
                turn: index,
                message: "responses count must be at least 1".to_string(),
            });
        }
    }
    Ok(())
}

/// Ensures plugin names are present.
fn ensure_plugins_valid(scenario: &str, plugins: &[PluginSpec]) -> Result<(), ConfigurationError> {
    if plugins.iter().any(|plugin| plugin.name.trim().is_empty()) {
        return Err(missing_field(scenario, "plugins[].name"));
    }
    Ok(())
}

/// Ensures custom metrics are uniquely named and compile.
fn ensure_custom_metrics_valid(
    scenario: &str,
    actors: &[Actor],
    metrics: &[CustomMetricSpec],
) -> Result<(), ConfigurationError> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for metric in metrics {
        let name = metric.name.as_str();
        if name.trim().is_empty() {
            return Err(missing_field(scenario, "metrics[].name"));
        }
        let shadows_actor = name.starts_with(ACTOR_MESSAGES_PREFIX)
            && (name == agent_messages_key()
                || actors.iter().any(|actor| name == actor_messages_key(actor.id.as_str())));
        if is_builtin_metric(name) || shadows_actor || !seen.insert(name) {
            return Err(ConfigurationError::DuplicateMetric {
                scenario: scenario.to_string(),
                metric: name.to_string(),
            });
        }
        Regex::new(&metric.pattern).map_err(|err| ConfigurationError::InvalidRegex {
            scenario: scenario.to_string(),
            field: format!("metrics.{name}.pattern"),
            message: err.to_string(),
        })?;
    }
    Ok(())
}

/// Ensures verification rules are present when required and well formed.
fn ensure_verification_valid(spec: &Scenario) -> Result<(), ConfigurationError> {
    let scenario = spec.id.as_str();
    let verification = &spec.verification;
    if verification.required && verification.rules.is_empty() {
        return Err(ConfigurationError::MissingRules(scenario.to_string()));
    }
    if let Some(threshold) = verification.pass_threshold {
        ensure_unit_interval(scenario, "verification.passThreshold", threshold)?;
    }
    let known_metrics = spec.known_metric_names();
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for rule in &verification.rules {
        let rule_id = rule.id.as_str();
        if rule_id.trim().is_empty() {
            return Err(missing_field(scenario, "verification.rules[].id"));
        }
        if !seen.insert(rule_id) {
            return Err(ConfigurationError::DuplicateRuleId {
                scenario: scenario.to_string(),
                rule: rule_id.to_string(),
            });
        }
        if !rule.weight.is_finite() || rule.weight <= 0.0 {
            return Err(ConfigurationError::InvalidWeight {
                scenario: scenario.to_string(),
                rule: rule_id.to_string(),
            });
        }
        if let Some(threshold) = rule.confidence_threshold {
            let field = format!("verification.rules.{rule_id}.confidenceThreshold");
            ensure_unit_interval(scenario, &field, threshold)?;
        }
        match &rule.kind {
            RuleKind::Numeric(numeric) => {
                if !known_metrics.contains(&numeric.metric) {
                    return Err(ConfigurationError::UnknownMetric {
                        scenario: scenario.to_string(),
                        rule: rule_id.to_string(),
                        metric: numeric.metric.clone(),
                    });
                }
            }
            RuleKind::Pattern(pattern) => ensure_pattern_valid(scenario, rule_id, pattern)?,
            RuleKind::Llm(_) => {
                if rule.description.trim().is_empty() {
                    return Err(missing_field(
                        scenario,
                        &format!("verification.rules.{rule_id}.description"),
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Ensures pattern alternatives are present and regexes compile.
fn ensure_pattern_valid(
    scenario: &str,
    rule_id: &str,
    pattern: &PatternRule,
) -> Result<(), ConfigurationError> {
    let alternatives = pattern.value.alternatives();
    if alternatives.is_empty() || alternatives.iter().any(|value| value.is_empty()) {
        return Err(missing_field(scenario, &format!("verification.rules.{rule_id}.value")));
    }
    if pattern.operator == PatternOperator::Matches {
        for alternative in alternatives {
            Regex::new(alternative).map_err(|err| ConfigurationError::InvalidRegex {
                scenario: scenario.to_string(),
                field: format!("verification.rules.{rule_id}.value"),
                message: err.to_string(),
            })?;
        }
    }
    Ok(())
}

/// Ensures a value lies within `[0, 1]`.
fn ensure_unit_interval(scenario: &str, field: &str, value: f64) -> Result<(), ConfigurationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidThreshold {
            scenario: scenario.to_string(),
            field: field.to_string(),
        })
    }
}
