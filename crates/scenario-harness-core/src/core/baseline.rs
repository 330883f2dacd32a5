// crates/scenario-harness-core/src/core/baseline.rs
// ============================================================================
// Module: Baselines and Comparison Reports
// Description: Stored baseline records and per-metric comparison outcomes.
// Purpose: Describe regression detection results without depending on storage.
// Dependencies: crate::core::{identifiers, metrics, time}, serde
// ============================================================================

//! ## Overview
//! A [`Baseline`] is the single current metrics snapshot per scenario. It is
//! overwritten only by promotion. A [`ComparisonReport`] classifies each
//! tracked metric as improved, regressed, or unchanged relative to it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::RunId;
use crate::core::identifiers::ScenarioId;
use crate::core::metrics::MetricDirection;
use crate::core::metrics::MetricsSnapshot;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Baseline
// ============================================================================

/// Last promoted metrics snapshot for a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    /// Scenario identifier.
    pub scenario_id: ScenarioId,
    /// Stored metric values.
    pub stored_metrics: MetricsSnapshot,
    /// Time the baseline was stored.
    pub stored_at: Timestamp,
    /// Run that produced the metrics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    /// Canonical scenario hash at the time of storing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_hash: Option<String>,
}

/// How a suite run treats baselines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineMode {
    /// Compare against stored baselines and seed missing ones from passing runs.
    #[default]
    Compare,
    /// Compare, then overwrite baselines with metrics of passing runs.
    Promote,
    /// Do not read or write baselines.
    Skip,
}

impl BaselineMode {
    /// Returns the stable mode label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Compare => "compare",
            Self::Promote => "promote",
            Self::Skip => "skip",
        }
    }
}

/// Baseline write performed for a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineAction {
    /// First baseline stored from a passing run.
    Seeded,
    /// Existing baseline overwritten by promotion.
    Promoted,
}

// ============================================================================
// SECTION: Comparison
// ============================================================================

/// Overall comparison status for one scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComparisonStatus {
    /// No baseline was stored for the scenario.
    NoBaseline,
    /// Metrics were compared against a stored baseline.
    Compared,
    /// Comparison was not performed.
    Skipped,
    /// The baseline store failed.
    Error,
}

impl ComparisonStatus {
    /// Returns the stable status label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NoBaseline => "no-baseline",
            Self::Compared => "compared",
            Self::Skipped => "skipped",
            Self::Error => "error",
        }
    }
}

/// Classification of one metric change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricClassification {
    /// Moved in the better direction beyond tolerance.
    Improved,
    /// Moved in the worse direction beyond tolerance.
    Regressed,
    /// Within tolerance.
    Unchanged,
}

/// Comparison of one tracked metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricComparison {
    /// Metric name.
    pub name: String,
    /// Declared improvement direction.
    pub direction: MetricDirection,
    /// Allowed change in percent.
    pub tolerance_pct: f64,
    /// Whether a regression fails the suite.
    pub blocking: bool,
    /// Baseline value.
    pub baseline: f64,
    /// Current value.
    pub current: f64,
    /// `current - baseline`.
    pub delta: f64,
    /// Percent change relative to the baseline; absent when the baseline is zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_change: Option<f64>,
    /// Classification.
    pub classification: MetricClassification,
}

/// Comparison outcome for one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// Scenario identifier.
    pub scenario_id: ScenarioId,
    /// Overall status.
    pub status: ComparisonStatus,
    /// Stored time of the baseline that was compared against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_stored_at: Option<Timestamp>,
    /// Per-metric comparisons in policy order.
    #[serde(default)]
    pub metrics: Vec<MetricComparison>,
    /// Store error message when status is `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComparisonReport {
    /// Creates a report with the given status and no metric rows.
    #[must_use]
    pub const fn empty(scenario_id: ScenarioId, status: ComparisonStatus) -> Self {
        Self {
            scenario_id,
            status,
            baseline_stored_at: None,
            metrics: Vec::new(),
            error: None,
        }
    }

    /// Creates a store-failure report.
    #[must_use]
    pub fn failed(scenario_id: ScenarioId, message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::empty(scenario_id, ComparisonStatus::Error)
        }
    }

    /// Iterates regressed metrics.
    pub fn regressions(&self) -> impl Iterator<Item = &MetricComparison> {
        self.metrics
            .iter()
            .filter(|metric| metric.classification == MetricClassification::Regressed)
    }

    /// Iterates improved metrics.
    pub fn improvements(&self) -> impl Iterator<Item = &MetricComparison> {
        self.metrics
            .iter()
            .filter(|metric| metric.classification == MetricClassification::Improved)
    }

    /// Iterates regressed metrics flagged as blocking.
    pub fn blocking_regressions(&self) -> impl Iterator<Item = &MetricComparison> {
        self.regressions().filter(|metric| metric.blocking)
    }

    /// Returns true when a blocking metric regressed.
    #[must_use]
    pub fn has_blocking_regression(&self) -> bool {
        self.blocking_regressions().next().is_some()
    }
}
