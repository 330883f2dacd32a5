// crates/scenario-harness-core/src/runtime/events.rs
// ============================================================================
// Module: Harness Events
// Description: Structured lifecycle events and JSON-line event sinks.
// Purpose: Emit machine-readable run diagnostics without a logging framework.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every notable transition (environment acquired, turn timed out, grading
//! retried, environment released) is emitted as a [`HarnessEvent`] to a
//! [`HarnessEventSink`]. Sinks serialize events as JSON lines so they can be
//! routed to any logging pipeline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use serde::Serialize;

use crate::core::Timestamp;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Harness lifecycle event payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HarnessEvent {
    /// Event time in unix epoch milliseconds.
    pub timestamp_ms: i64,
    /// Event details.
    #[serde(flatten)]
    pub kind: HarnessEventKind,
}

impl HarnessEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn now(kind: HarnessEventKind) -> Self {
        Self {
            timestamp_ms: Timestamp::now().as_unix_millis(),
            kind,
        }
    }
}

/// Event details.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HarnessEventKind {
    /// A scenario run started.
    ScenarioStarted {
        /// Scenario identifier.
        scenario_id: String,
        /// Run identifier.
        run_id: String,
    },
    /// An environment was provisioned.
    EnvironmentAcquired {
        /// Scenario identifier.
        scenario_id: String,
        /// Environment identifier.
        environment_id: String,
        /// Working directory.
        workdir: String,
    },
    /// An optional plugin could not be constructed and was skipped.
    PluginSkipped {
        /// Scenario identifier.
        scenario_id: String,
        /// Plugin name.
        plugin: String,
        /// Failure reason.
        reason: String,
    },
    /// A scripted turn timed out.
    TurnTimedOut {
        /// Scenario identifier.
        scenario_id: String,
        /// Zero-based turn index.
        turn_index: usize,
        /// Time waited in milliseconds.
        waited_ms: u64,
    },
    /// A response from a foreign agent identity was discarded.
    ResponseDiscarded {
        /// Scenario identifier.
        scenario_id: String,
        /// Agent identity of the discarded response.
        agent_id: String,
    },
    /// A grading call failed transiently and will be retried.
    GradingRetry {
        /// Scenario identifier.
        scenario_id: String,
        /// Rule identifier.
        rule_id: String,
        /// Attempt that failed, starting at 1.
        attempt: u32,
        /// Backoff before the next attempt.
        backoff_ms: u64,
        /// Error message.
        error: String,
    },
    /// Grading gave up for a rule.
    GradingUnavailable {
        /// Scenario identifier.
        scenario_id: String,
        /// Rule identifier.
        rule_id: String,
        /// Last error message.
        error: String,
    },
    /// An environment was released.
    EnvironmentReleased {
        /// Scenario identifier.
        scenario_id: String,
        /// Environment identifier.
        environment_id: String,
    },
    /// An environment could not be released.
    EnvironmentReleaseFailed {
        /// Scenario identifier.
        scenario_id: String,
        /// Environment identifier.
        environment_id: String,
        /// Error message.
        error: String,
    },
    /// A scenario run finished.
    ScenarioFinished {
        /// Scenario identifier.
        scenario_id: String,
        /// Outcome label.
        outcome: String,
        /// Aggregate score when verification ran.
        aggregate_score: Option<f64>,
    },
    /// A first baseline was stored for a scenario.
    BaselineSeeded {
        /// Scenario identifier.
        scenario_id: String,
    },
    /// A baseline was overwritten by promotion.
    BaselinePromoted {
        /// Scenario identifier.
        scenario_id: String,
    },
    /// The suite timeout fired.
    SuiteCancelled {
        /// Suite timeout in milliseconds.
        timeout_ms: u64,
    },
    /// The suite finished.
    SuiteFinished {
        /// Scenario count.
        total: usize,
        /// Passed scenario count.
        passed: usize,
        /// Process exit code.
        exit_code: i32,
    },
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Sink for harness lifecycle events.
pub trait HarnessEventSink: Send + Sync {
    /// Records an event.
    fn record(&self, event: &HarnessEvent);
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Event sink that writes JSON lines to stderr.
pub struct StderrEventSink;

impl HarnessEventSink for StderrEventSink {
    fn record(&self, event: &HarnessEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Event sink that appends JSON lines to a file.
pub struct FileEventSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileEventSink {
    /// Opens the event log in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl HarnessEventSink for FileEventSink {
    fn record(&self, event: &HarnessEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Event sink that drops every event.
pub struct NoopEventSink;

impl HarnessEventSink for NoopEventSink {
    fn record(&self, _event: &HarnessEvent) {}
}

/// Event sink that keeps events in memory.
#[derive(Default)]
pub struct MemoryEventSink {
    /// Recorded events.
    events: Mutex<Vec<HarnessEvent>>,
}

impl MemoryEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HarnessEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl HarnessEventSink for MemoryEventSink {
    fn record(&self, event: &HarnessEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
