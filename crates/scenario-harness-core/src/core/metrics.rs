// crates/scenario-harness-core/src/core/metrics.rs
// ============================================================================
// Module: Scenario Harness Metric Model
// Description: Built-in metric keys, metric snapshots, and tracking policies.
// Purpose: Keep the metric key set stable across runs and baselines.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`MetricsSnapshot`] is an ordered name → value map. Every built-in key is
//! always present so baselines and current runs can be compared key by key.
//! Per-actor message counts use the `messages.<actorId>` form.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::AGENT_ACTOR;

// ============================================================================
// SECTION: Built-in Keys
// ============================================================================

/// Total transcript entries (inputs and responses).
pub const MESSAGE_COUNT: &str = "messageCount";
/// Scripted inputs sent to the runtime.
pub const INPUT_COUNT: &str = "inputCount";
/// Agent responses accepted into the transcript.
pub const RESPONSE_COUNT: &str = "responseCount";
/// Scripted turns attempted.
pub const TURN_COUNT: &str = "turnCount";
/// Scripted turns whose wait condition was satisfied.
pub const TURNS_COMPLETED: &str = "turnsCompleted";
/// Scripted turns that timed out.
pub const TURN_TIMEOUTS: &str = "turnTimeouts";
/// Run duration in milliseconds.
pub const DURATION_MS: &str = "durationMs";
/// Mean input-to-first-response latency.
pub const LATENCY_MEAN_MS: &str = "latencyMeanMs";
/// Median input-to-first-response latency.
pub const LATENCY_P50_MS: &str = "latencyP50Ms";
/// 95th percentile input-to-first-response latency.
pub const LATENCY_P95_MS: &str = "latencyP95Ms";
/// Maximum input-to-first-response latency.
pub const LATENCY_MAX_MS: &str = "latencyMaxMs";
/// Number of retained latency samples.
pub const LATENCY_SAMPLES: &str = "latencySamples";
/// Responses dropped because they belonged to another agent identity.
pub const DISCARDED_RESPONSES: &str = "discardedResponses";

/// Prefix for per-actor message counts.
pub const ACTOR_MESSAGES_PREFIX: &str = "messages.";

/// Built-in metric keys, in reporting order.
pub const BUILTIN_METRICS: &[&str] = &[
    MESSAGE_COUNT,
    INPUT_COUNT,
    RESPONSE_COUNT,
    TURN_COUNT,
    TURNS_COMPLETED,
    TURN_TIMEOUTS,
    DURATION_MS,
    LATENCY_MEAN_MS,
    LATENCY_P50_MS,
    LATENCY_P95_MS,
    LATENCY_MAX_MS,
    LATENCY_SAMPLES,
    DISCARDED_RESPONSES,
];

/// Returns the per-actor message count key.
#[must_use]
pub fn actor_messages_key(actor: &str) -> String {
    format!("{ACTOR_MESSAGES_PREFIX}{actor}")
}

/// Returns the per-actor message count key for agent responses.
#[must_use]
pub fn agent_messages_key() -> String {
    actor_messages_key(AGENT_ACTOR)
}

/// Returns true when the name is a built-in metric key.
#[must_use]
pub fn is_builtin_metric(name: &str) -> bool {
    BUILTIN_METRICS.contains(&name)
}

// ============================================================================
// SECTION: Metrics Snapshot
// ============================================================================

/// Finalized metric values for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricsSnapshot(BTreeMap<String, f64>);

impl MetricsSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns a metric value when present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Returns a metric value, defaulting to zero when absent.
    #[must_use]
    pub fn value_or_zero(&self, name: &str) -> f64 {
        self.get(name).unwrap_or(0.0)
    }

    /// Sets a metric value.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    /// Returns true when the snapshot carries the metric.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Iterates metrics in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Returns the number of metrics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when no metric is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, f64)> for MetricsSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ============================================================================
// SECTION: Tracking Policy
// ============================================================================

/// Which direction of change counts as an improvement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricDirection {
    /// Smaller values are better (latency, duration, timeouts).
    LowerIsBetter,
    /// Larger values are better (completion counts, scores).
    HigherIsBetter,
}

/// Declared comparison policy for one tracked metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPolicy {
    /// Metric name.
    pub name: String,
    /// Improvement direction.
    pub direction: MetricDirection,
    /// Allowed change, in percent of the baseline, before classification.
    #[serde(default)]
    pub tolerance_pct: f64,
    /// Whether a regression fails the suite on its own.
    #[serde(default)]
    pub blocking: bool,
}

impl MetricPolicy {
    /// Creates a non-blocking policy.
    #[must_use]
    pub fn new(name: impl Into<String>, direction: MetricDirection, tolerance_pct: f64) -> Self {
        Self {
            name: name.into(),
            direction,
            tolerance_pct,
            blocking: false,
        }
    }

    /// Marks the policy as blocking.
    #[must_use]
    pub const fn blocking(mut self) -> Self {
        self.blocking = true;
        self
    }
}

/// Returns the default tracked metric policies.
#[must_use]
pub fn default_metric_policies() -> Vec<MetricPolicy> {
    vec![
        MetricPolicy::new(DURATION_MS, MetricDirection::LowerIsBetter, 25.0),
        MetricPolicy::new(LATENCY_MEAN_MS, MetricDirection::LowerIsBetter, 25.0),
        MetricPolicy::new(LATENCY_P95_MS, MetricDirection::LowerIsBetter, 25.0),
        MetricPolicy::new(TURN_TIMEOUTS, MetricDirection::LowerIsBetter, 0.0),
    ]
}
