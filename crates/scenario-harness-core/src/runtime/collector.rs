// crates/scenario-harness-core/src/runtime/collector.rs
// ============================================================================
// Module: Metrics Collector
// Description: Accumulate counts, latencies, and custom metrics during a run.
// Purpose: Produce a stable, complete metric snapshot for verification and baselines.
// Dependencies: crate::core, regex
// ============================================================================

//! ## Overview
//! The driver feeds [`RunEvent`] values to [`MetricsCollector::observe`].
//! [`MetricsCollector::finalize`] derives duration and latency statistics
//! from the retained samples without mutating the collector, so repeated
//! calls return identical snapshots. Every built-in key, every declared
//! actor key, and every custom metric is always present.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use regex::Regex;

use crate::core::ConfigurationError;
use crate::core::MetricsSnapshot;
use crate::core::Scenario;
use crate::core::TranscriptScope;
use crate::core::metrics;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum latency samples retained per run.
pub const MAX_LATENCY_SAMPLES: usize = 10_000;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Observation emitted by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// A scripted input was sent.
    InputSent {
        /// Zero-based turn index.
        turn_index: usize,
        /// Sending actor.
        actor: String,
        /// Message content.
        content: String,
        /// Milliseconds since run start.
        offset_ms: u64,
    },
    /// An agent response was accepted into the transcript.
    ResponseReceived {
        /// Turn the response is attributed to.
        turn_index: usize,
        /// Response content.
        content: String,
        /// Milliseconds since run start.
        offset_ms: u64,
    },
    /// A turn's wait condition was satisfied.
    TurnCompleted {
        /// Zero-based turn index.
        turn_index: usize,
    },
    /// A turn's wait condition timed out.
    TurnTimedOut {
        /// Zero-based turn index.
        turn_index: usize,
    },
    /// A response from a foreign agent identity was discarded.
    ResponseDiscarded,
    /// The run ended.
    RunEnded {
        /// Milliseconds since run start.
        offset_ms: u64,
    },
}

// ============================================================================
// SECTION: Metric Hooks
// ============================================================================

/// Scenario-specific metric computed from run events.
pub trait MetricHook: Send {
    /// Metric name.
    fn name(&self) -> &str;

    /// Observes one event.
    fn observe(&mut self, event: &RunEvent);

    /// Returns the current metric value.
    fn value(&self) -> f64;
}

/// Counts transcript entries matching a regular expression.
pub struct PatternCountHook {
    /// Metric name.
    name: String,
    /// Compiled pattern.
    pattern: Regex,
    /// Entries inspected.
    scope: TranscriptScope,
    /// Matching entry count.
    count: u64,
}

impl PatternCountHook {
    /// Compiles a pattern count hook.
    ///
    /// # Errors
    ///
    /// Returns [`regex::Error`] when the pattern does not compile.
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        scope: TranscriptScope,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            pattern: Regex::new(pattern)?,
            scope,
            count: 0,
        })
    }
}

impl MetricHook for PatternCountHook {
    fn name(&self) -> &str {
        &self.name
    }

    fn observe(&mut self, event: &RunEvent) {
        let content = match (event, self.scope) {
            (
                RunEvent::InputSent {
                    content,
                    ..
                },
                TranscriptScope::Inputs | TranscriptScope::All,
            )
            | (
                RunEvent::ResponseReceived {
                    content,
                    ..
                },
                TranscriptScope::Responses | TranscriptScope::All,
            ) => content,
            _ => return,
        };
        if self.pattern.is_match(content) {
            self.count += 1;
        }
    }

    fn value(&self) -> f64 {
        count_to_f64(self.count)
    }
}

// ============================================================================
// SECTION: Collector
// ============================================================================

/// Accumulates metrics for one run.
pub struct MetricsCollector {
    /// Inputs sent.
    inputs: u64,
    /// Responses accepted.
    responses: u64,
    /// Responses discarded.
    discarded: u64,
    /// Turns attempted.
    turns: u64,
    /// Turns completed.
    turns_completed: u64,
    /// Turns timed out.
    turn_timeouts: u64,
    /// Message counts per declared actor.
    per_actor: BTreeMap<String, u64>,
    /// Turn and send offset still awaiting a first response.
    awaiting_first: Option<(usize, u64)>,
    /// Retained input-to-first-response latency samples.
    latency_samples: Vec<u64>,
    /// Largest offset observed.
    last_offset_ms: u64,
    /// Offset of the run end, when observed.
    ended_at_ms: Option<u64>,
    /// Custom metric hooks.
    hooks: Vec<Box<dyn MetricHook>>,
}

impl MetricsCollector {
    /// Creates a collector with no custom hooks and no declared actors.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inputs: 0,
            responses: 0,
            discarded: 0,
            turns: 0,
            turns_completed: 0,
            turn_timeouts: 0,
            per_actor: BTreeMap::new(),
            awaiting_first: None,
            latency_samples: Vec::new(),
            last_offset_ms: 0,
            ended_at_ms: None,
            hooks: Vec::new(),
        }
    }

    /// Creates a collector for a scenario: declared actors and custom metrics.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidRegex`] when a custom metric pattern
    /// does not compile.
    pub fn for_scenario(scenario: &Scenario) -> Result<Self, ConfigurationError> {
        let mut collector = Self::new();
        for actor in &scenario.actors {
            collector.per_actor.insert(actor.id.to_string(), 0);
        }
        for spec in &scenario.metrics {
            let hook = PatternCountHook::new(spec.name.clone(), &spec.pattern, spec.scope)
                .map_err(|err| ConfigurationError::InvalidRegex {
                    scenario: scenario.id.to_string(),
                    field: format!("metrics.{}.pattern", spec.name),
                    message: err.to_string(),
                })?;
            collector.add_hook(Box::new(hook));
        }
        Ok(collector)
    }

    /// Registers a custom metric hook.
    pub fn add_hook(&mut self, hook: Box<dyn MetricHook>) {
        self.hooks.push(hook);
    }

    /// Accumulates one event.
    pub fn observe(&mut self, event: &RunEvent) {
        match event {
            RunEvent::InputSent {
                turn_index,
                actor,
                offset_ms,
                ..
            } => {
                self.inputs += 1;
                self.turns += 1;
                *self.per_actor.entry(actor.clone()).or_insert(0) += 1;
                self.awaiting_first = Some((*turn_index, *offset_ms));
                self.touch(*offset_ms);
            }
            RunEvent::ResponseReceived {
                turn_index,
                offset_ms,
                ..
            } => {
                self.responses += 1;
                if let Some((pending_turn, sent_at)) = self.awaiting_first
                    && pending_turn == *turn_index
                {
                    if self.latency_samples.len() < MAX_LATENCY_SAMPLES {
                        self.latency_samples.push(offset_ms.saturating_sub(sent_at));
                    }
                    self.awaiting_first = None;
                }
                self.touch(*offset_ms);
            }
            RunEvent::TurnCompleted {
                ..
            } => self.turns_completed += 1,
            RunEvent::TurnTimedOut {
                ..
            } => self.turn_timeouts += 1,
            RunEvent::ResponseDiscarded => self.discarded += 1,
            RunEvent::RunEnded {
                offset_ms,
            } => {
                self.touch(*offset_ms);
                self.ended_at_ms = Some(*offset_ms);
            }
        }
        for hook in &mut self.hooks {
            hook.observe(event);
        }
    }

    /// Computes the metric snapshot from the observed events.
    #[must_use]
    pub fn finalize(&self) -> MetricsSnapshot {
        let mut snapshot = MetricsSnapshot::new();
        snapshot.insert(metrics::MESSAGE_COUNT, count_to_f64(self.inputs + self.responses));
        snapshot.insert(metrics::INPUT_COUNT, count_to_f64(self.inputs));
        snapshot.insert(metrics::RESPONSE_COUNT, count_to_f64(self.responses));
        snapshot.insert(metrics::TURN_COUNT, count_to_f64(self.turns));
        snapshot.insert(metrics::TURNS_COMPLETED, count_to_f64(self.turns_completed));
        snapshot.insert(metrics::TURN_TIMEOUTS, count_to_f64(self.turn_timeouts));
        snapshot.insert(metrics::DISCARDED_RESPONSES, count_to_f64(self.discarded));
        snapshot.insert(
            metrics::DURATION_MS,
            count_to_f64(self.ended_at_ms.unwrap_or(self.last_offset_ms)),
        );

        let mut sorted = self.latency_samples.clone();
        sorted.sort_unstable();
        snapshot.insert(metrics::LATENCY_SAMPLES, count_to_f64(len_to_u64(sorted.len())));
        snapshot.insert(metrics::LATENCY_MEAN_MS, mean(&sorted));
        snapshot.insert(metrics::LATENCY_P50_MS, nearest_rank(&sorted, 50));
        snapshot.insert(metrics::LATENCY_P95_MS, nearest_rank(&sorted, 95));
        snapshot.insert(
            metrics::LATENCY_MAX_MS,
            sorted.last().copied().map_or(0.0, count_to_f64),
        );

        snapshot.insert(metrics::agent_messages_key(), count_to_f64(self.responses));
        for (actor, count) in &self.per_actor {
            snapshot.insert(metrics::actor_messages_key(actor), count_to_f64(*count));
        }
        for hook in &self.hooks {
            snapshot.insert(hook.name(), hook.value());
        }
        snapshot
    }

    /// Tracks the largest observed offset.
    fn touch(&mut self, offset_ms: u64) {
        self.last_offset_ms = self.last_offset_ms.max(offset_ms);
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SECTION: Statistics Helpers
// ============================================================================

/// Nearest-rank percentile over sorted samples; zero when empty.
fn nearest_rank(sorted: &[u64], percentile: u64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let n = len_to_u64(sorted.len());
    let rank = (percentile * n).div_ceil(100).clamp(1, n);
    let index = usize::try_from(rank - 1).unwrap_or(sorted.len() - 1);
    sorted.get(index).copied().map_or(0.0, count_to_f64)
}

/// Arithmetic mean; zero when empty.
fn mean(samples: &[u64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let total: f64 = samples.iter().copied().map(count_to_f64).sum();
    total / count_to_f64(len_to_u64(samples.len()))
}

/// Converts a count to `f64`.
#[allow(clippy::cast_precision_loss, reason = "Counts stay far below 2^53.")]
const fn count_to_f64(value: u64) -> f64 {
    value as f64
}

/// Converts a length to `u64`.
fn len_to_u64(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}
