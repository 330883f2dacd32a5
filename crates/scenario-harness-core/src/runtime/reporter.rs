// crates/scenario-harness-core/src/runtime/reporter.rs
// ============================================================================
// Module: Suite Reporter
// Description: Aggregate scenario outcomes into a suite summary and exit code.
// Purpose: Render deterministic, diagnosable suite results.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! The reporter is read-only over scenario outcomes. Scenario rows are
//! ordered by scenario id so rendering is deterministic for a given set of
//! outcomes. Each failure carries enough detail to diagnose without a
//! re-run: failing rule ids with rationale, timed-out turn locations,
//! metric deltas, and environment release failures.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write;

use serde::Deserialize;
use serde::Serialize;

use crate::core::BaselineAction;
use crate::core::BaselineMode;
use crate::core::ComparisonReport;
use crate::core::ComparisonStatus;
use crate::core::MetricComparison;
use crate::core::RunResult;
use crate::core::ScenarioId;

// ============================================================================
// SECTION: Exit Codes
// ============================================================================

/// Every scenario passed and no blocking metric regressed.
pub const EXIT_PASS: i32 = 0;
/// A scenario failed, a blocking metric regressed, or the suite was cancelled.
pub const EXIT_FAILURE: i32 = 1;
/// Scenario definitions or configuration could not be loaded.
pub const EXIT_CONFIGURATION: i32 = 2;

// ============================================================================
// SECTION: Scenario Reports
// ============================================================================

/// Final status of one scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    /// Verification passed.
    Passed,
    /// Verification failed.
    Failed,
    /// Provisioning, driving, or evaluation failed before a verdict.
    Errored,
    /// Suite cancellation interrupted the run.
    Cancelled,
}

impl ScenarioStatus {
    /// Returns the stable status label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Errored => "errored",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Outcome of one scenario within a suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario identifier.
    pub scenario_id: ScenarioId,
    /// Scenario name.
    pub name: String,
    /// Scenario category.
    pub category: String,
    /// Final status.
    pub status: ScenarioStatus,
    /// Run result when the run produced a verdict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<RunResult>,
    /// Error that prevented a verdict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Environment release failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_error: Option<String>,
    /// Baseline comparison.
    pub comparison: ComparisonReport,
    /// Baseline write performed after the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_action: Option<BaselineAction>,
}

impl ScenarioReport {
    /// Returns true when this scenario alone would fail the suite.
    #[must_use]
    pub fn fails_suite(&self) -> bool {
        self.status != ScenarioStatus::Passed
            || self.release_error.is_some()
            || self.comparison.status == ComparisonStatus::Error
            || self.comparison.has_blocking_regression()
    }
}

// ============================================================================
// SECTION: Suite Report
// ============================================================================

/// Suite-level counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteSummary {
    /// Scenario count.
    pub total: usize,
    /// Passed scenarios.
    pub passed: usize,
    /// Failed scenarios.
    pub failed: usize,
    /// Errored scenarios.
    pub errored: usize,
    /// Cancelled scenarios.
    pub cancelled: usize,
    /// Scenarios with at least one blocking regression.
    pub blocking_regressions: usize,
    /// Environment release failures.
    pub release_failures: usize,
    /// Baseline store failures.
    pub store_errors: usize,
}

/// Aggregated suite outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteReport {
    /// Baseline mode the suite ran with.
    pub baseline_mode: BaselineMode,
    /// True when the suite timeout fired.
    pub suite_timed_out: bool,
    /// Suite counts.
    pub summary: SuiteSummary,
    /// Scenario outcomes ordered by scenario id.
    pub scenarios: Vec<ScenarioReport>,
    /// Process exit code.
    pub exit_code: i32,
}

impl SuiteReport {
    /// Aggregates scenario outcomes.
    #[must_use]
    pub fn build(
        mut scenarios: Vec<ScenarioReport>,
        baseline_mode: BaselineMode,
        suite_timed_out: bool,
    ) -> Self {
        scenarios.sort_by(|left, right| left.scenario_id.cmp(&right.scenario_id));
        let mut summary = SuiteSummary {
            total: scenarios.len(),
            ..SuiteSummary::default()
        };
        for scenario in &scenarios {
            match scenario.status {
                ScenarioStatus::Passed => summary.passed += 1,
                ScenarioStatus::Failed => summary.failed += 1,
                ScenarioStatus::Errored => summary.errored += 1,
                ScenarioStatus::Cancelled => summary.cancelled += 1,
            }
            if scenario.comparison.has_blocking_regression() {
                summary.blocking_regressions += 1;
            }
            if scenario.release_error.is_some() {
                summary.release_failures += 1;
            }
            if scenario.comparison.status == ComparisonStatus::Error {
                summary.store_errors += 1;
            }
        }
        let failed = suite_timed_out || scenarios.iter().any(ScenarioReport::fails_suite);
        Self {
            baseline_mode,
            suite_timed_out,
            summary,
            scenarios,
            exit_code: if failed { EXIT_FAILURE } else { EXIT_PASS },
        }
    }

    /// Returns the process exit code.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Returns the scenario report for an identifier.
    #[must_use]
    pub fn scenario(&self, scenario_id: &str) -> Option<&ScenarioReport> {
        self.scenarios.iter().find(|report| report.scenario_id.as_str() == scenario_id)
    }

    /// Renders a deterministic text summary.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let summary = &self.summary;
        let _ = writeln!(
            out,
            "suite: {} scenarios, {} passed, {} failed, {} errored, {} cancelled (baseline mode: \
             {})",
            summary.total,
            summary.passed,
            summary.failed,
            summary.errored,
            summary.cancelled,
            self.baseline_mode.label()
        );
        if self.suite_timed_out {
            let _ = writeln!(out, "suite timeout reached; in-flight scenarios were cancelled");
        }
        for scenario in &self.scenarios {
            render_scenario(&mut out, scenario);
        }
        let _ = writeln!(out, "exit code: {}", self.exit_code);
        out
    }
}

// ============================================================================
// SECTION: Text Rendering
// ============================================================================

/// Renders one scenario block.
fn render_scenario(out: &mut String, scenario: &ScenarioReport) {
    let marker = match scenario.status {
        ScenarioStatus::Passed => "PASS",
        ScenarioStatus::Failed => "FAIL",
        ScenarioStatus::Errored => "ERROR",
        ScenarioStatus::Cancelled => "CANCELLED",
    };
    let _ = write!(out, "{marker} {} [{}]", scenario.scenario_id, scenario.category);
    if let Some(result) = &scenario.result {
        let _ = write!(
            out,
            " aggregate {:.3} (threshold {:.3})",
            result.aggregate_score, result.pass_threshold
        );
    }
    let _ = writeln!(out);
    if let Some(error) = &scenario.error {
        let _ = writeln!(out, "  error: {error}");
    }
    if let Some(result) = &scenario.result {
        for rule in result.failing_rules() {
            let required = if rule.required { " [required]" } else { "" };
            let _ = writeln!(out, "  rule {}{required} failed: {}", rule.rule_id, rule.rationale);
        }
        for timeout in &result.timeouts {
            let _ = writeln!(
                out,
                "  turn {} ({}) timed out after {}ms waiting for {}",
                timeout.turn_index, timeout.actor, timeout.waited_ms, timeout.condition
            );
        }
        for failure in &result.send_failures {
            let _ = writeln!(
                out,
                "  turn {} could not be delivered: {}",
                failure.turn_index, failure.message
            );
        }
        if result.aborted {
            let _ = writeln!(out, "  remaining turns skipped after timeout (abortOnTimeout)");
        }
    }
    render_comparison(out, &scenario.comparison);
    match scenario.baseline_action {
        Some(BaselineAction::Seeded) => {
            let _ = writeln!(out, "  baseline seeded from this run");
        }
        Some(BaselineAction::Promoted) => {
            let _ = writeln!(out, "  baseline promoted from this run");
        }
        None => {}
    }
    if let Some(error) = &scenario.release_error {
        let _ = writeln!(out, "  environment release failed: {error}");
    }
}

/// Renders the comparison lines for one scenario.
fn render_comparison(out: &mut String, comparison: &ComparisonReport) {
    match comparison.status {
        ComparisonStatus::Skipped => {}
        ComparisonStatus::NoBaseline => {
            let _ = writeln!(out, "  baseline: no-baseline");
        }
        ComparisonStatus::Error => {
            let _ = writeln!(
                out,
                "  baseline: error: {}",
                comparison.error.as_deref().unwrap_or("unknown store error")
            );
        }
        ComparisonStatus::Compared => {
            let stored_at = comparison
                .baseline_stored_at
                .and_then(|stored_at| stored_at.to_rfc3339())
                .unwrap_or_else(|| "unknown".to_string());
            let _ = writeln!(out, "  baseline: compared (stored {stored_at})");
            for metric in comparison.regressions() {
                render_metric(out, "regression", metric);
            }
            for metric in comparison.improvements() {
                render_metric(out, "improvement", metric);
            }
        }
    }
}

/// Renders one metric change line.
fn render_metric(out: &mut String, label: &str, metric: &MetricComparison) {
    let percent = metric
        .percent_change
        .map_or_else(|| "n/a".to_string(), |percent| format!("{percent:+.1}%"));
    let blocking = if metric.blocking { " [blocking]" } else { "" };
    let _ = writeln!(
        out,
        "  {label} {}: {} -> {} ({:+}, {percent}){blocking}",
        metric.name, metric.baseline, metric.current, metric.delta
    );
}
