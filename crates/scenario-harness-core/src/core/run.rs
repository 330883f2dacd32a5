// crates/scenario-harness-core/src/core/run.rs
// ============================================================================
// Module: Run Records and Results
// Description: Transcript entries, turn timeouts, rule results, and verdicts.
// Purpose: Capture what a scenario run observed and how it was judged.
// Dependencies: crate::core::{identifiers, metrics, time}, serde
// ============================================================================

//! ## Overview
//! The driver produces a [`RunRecord`]: the ordered transcript, finalized
//! metrics, and every turn timeout. Verification reads the record and yields
//! a [`VerificationVerdict`]. [`RunResult::from_parts`] joins both into the
//! immutable value handed to the comparator and reporter. Run values refer
//! to their scenario only through [`ScenarioId`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ActorId;
use crate::core::identifiers::AgentId;
use crate::core::identifiers::EnvironmentId;
use crate::core::identifiers::RuleId;
use crate::core::identifiers::RunId;
use crate::core::identifiers::ScenarioId;
use crate::core::metrics::MetricsSnapshot;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Transcript
// ============================================================================

/// Direction of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptEntryKind {
    /// Scripted input sent by an actor.
    Input,
    /// Response produced by the agent under test.
    Response,
}

/// One message observed during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Monotonic sequence number within the run, starting at 1.
    pub sequence: u64,
    /// Index of the scripted turn this entry belongs to.
    pub turn_index: usize,
    /// Sending actor (`agent` for responses).
    pub actor: ActorId,
    /// Entry direction.
    pub kind: TranscriptEntryKind,
    /// Message content.
    pub content: String,
    /// Wall-clock time the entry was observed.
    pub at: Timestamp,
    /// Milliseconds since the run started.
    pub offset_ms: u64,
}

// ============================================================================
// SECTION: Turn Outcomes
// ============================================================================

/// Recorded timeout of one scripted turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnTimeout {
    /// Zero-based turn index.
    pub turn_index: usize,
    /// Actor that sent the turn.
    pub actor: ActorId,
    /// Time spent waiting before the timeout fired.
    pub waited_ms: u64,
    /// Description of the unsatisfied wait condition.
    pub condition: String,
}

/// Recorded failure to deliver a scripted input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendFailure {
    /// Zero-based turn index.
    pub turn_index: usize,
    /// Runtime error message.
    pub message: String,
}

/// Environment identity a run executed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSummary {
    /// Environment identifier.
    pub environment_id: EnvironmentId,
    /// Fresh agent identity used for the run.
    pub agent_id: AgentId,
    /// Isolated working directory.
    pub workdir: PathBuf,
    /// Names of plugins constructed for the run.
    pub plugins: Vec<String>,
}

// ============================================================================
// SECTION: Run Record
// ============================================================================

/// Everything the driver observed while executing one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Run identifier.
    pub run_id: RunId,
    /// Scenario identifier.
    pub scenario_id: ScenarioId,
    /// Environment the run executed in.
    pub environment: EnvironmentSummary,
    /// Transcript ordered by sequence number.
    pub transcript: Vec<TranscriptEntry>,
    /// Finalized metrics.
    pub metrics: MetricsSnapshot,
    /// Turns whose wait condition timed out.
    pub timeouts: Vec<TurnTimeout>,
    /// Inputs the runtime rejected.
    pub send_failures: Vec<SendFailure>,
    /// Number of scripted turns attempted.
    pub turns_attempted: usize,
    /// True when remaining turns were skipped after a timeout.
    pub aborted: bool,
    /// True when suite cancellation interrupted the run.
    pub cancelled: bool,
    /// Run start time.
    pub started_at: Timestamp,
    /// Run end time.
    pub ended_at: Timestamp,
}

impl RunRecord {
    /// Iterates entries of the given kind.
    pub fn entries(&self, kind: TranscriptEntryKind) -> impl Iterator<Item = &TranscriptEntry> {
        self.transcript.iter().filter(move |entry| entry.kind == kind)
    }
}

// ============================================================================
// SECTION: Rule Results
// ============================================================================

/// Reason a rule did not pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleFailure {
    /// The rule condition evaluated to false.
    Unsatisfied,
    /// Model grading exhausted its retry budget or failed fatally.
    GradingUnavailable {
        /// Last grading error.
        reason: String,
    },
    /// Suite cancellation aborted evaluation.
    Cancelled,
}

/// Outcome of evaluating one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    /// Rule identifier.
    pub rule_id: RuleId,
    /// Rule kind label.
    pub kind: String,
    /// Rule weight.
    pub weight: f64,
    /// Whether the rule is required.
    pub required: bool,
    /// Pass/fail outcome.
    pub passed: bool,
    /// Rule score: 1.0/0.0 for deterministic rules, confidence for graded rules.
    pub score: f64,
    /// Explanation of the outcome.
    pub rationale: String,
    /// Failure reason when the rule did not pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<RuleFailure>,
}

/// Combined verification outcome for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationVerdict {
    /// Rule results in declaration order.
    pub rule_results: Vec<RuleResult>,
    /// Weighted mean of rule pass outcomes.
    pub aggregate_score: f64,
    /// Threshold the aggregate was compared against.
    pub pass_threshold: f64,
    /// Required rules that failed.
    pub required_failures: Vec<RuleId>,
    /// Final verdict.
    pub passed: bool,
}

impl VerificationVerdict {
    /// Iterates failing rule results.
    pub fn failing_rules(&self) -> impl Iterator<Item = &RuleResult> {
        self.rule_results.iter().filter(|result| !result.passed)
    }
}

// ============================================================================
// SECTION: Run Result
// ============================================================================

/// Immutable result of one completed scenario run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Scenario identifier.
    pub scenario_id: ScenarioId,
    /// Run identifier.
    pub run_id: RunId,
    /// Environment the run executed in.
    pub environment: EnvironmentSummary,
    /// Transcript ordered by sequence number.
    pub transcript: Vec<TranscriptEntry>,
    /// Finalized metrics.
    pub metrics: MetricsSnapshot,
    /// Turn timeouts.
    pub timeouts: Vec<TurnTimeout>,
    /// Inputs the runtime rejected.
    pub send_failures: Vec<SendFailure>,
    /// Rule results in declaration order.
    pub rule_results: Vec<RuleResult>,
    /// Weighted aggregate score.
    pub aggregate_score: f64,
    /// Threshold the aggregate was compared against.
    pub pass_threshold: f64,
    /// Required rules that failed.
    pub required_failures: Vec<RuleId>,
    /// Scenario verdict.
    pub passed: bool,
    /// True when remaining turns were skipped after a timeout.
    pub aborted: bool,
    /// True when suite cancellation interrupted the run.
    pub cancelled: bool,
    /// Run start time.
    pub started_at: Timestamp,
    /// Run end time.
    pub ended_at: Timestamp,
}

impl RunResult {
    /// Joins a driver record with its verification verdict.
    #[must_use]
    pub fn from_parts(record: RunRecord, verdict: VerificationVerdict) -> Self {
        let passed = verdict.passed && !record.cancelled;
        Self {
            scenario_id: record.scenario_id,
            run_id: record.run_id,
            environment: record.environment,
            transcript: record.transcript,
            metrics: record.metrics,
            timeouts: record.timeouts,
            send_failures: record.send_failures,
            rule_results: verdict.rule_results,
            aggregate_score: verdict.aggregate_score,
            pass_threshold: verdict.pass_threshold,
            required_failures: verdict.required_failures,
            passed,
            aborted: record.aborted,
            cancelled: record.cancelled,
            started_at: record.started_at,
            ended_at: record.ended_at,
        }
    }

    /// Returns the rule result for the given rule identifier.
    #[must_use]
    pub fn rule_result(&self, rule_id: &str) -> Option<&RuleResult> {
        self.rule_results.iter().find(|result| result.rule_id.as_str() == rule_id)
    }

    /// Iterates failing rule results.
    pub fn failing_rules(&self) -> impl Iterator<Item = &RuleResult> {
        self.rule_results.iter().filter(|result| !result.passed)
    }
}
