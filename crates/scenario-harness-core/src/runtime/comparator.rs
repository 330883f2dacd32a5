// crates/scenario-harness-core/src/runtime/comparator.rs
// ============================================================================
// Module: Baseline Comparator
// Description: Classify current metrics against the stored baseline.
// Purpose: Detect regressions and improvements per declared metric policy.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The comparator reads the baseline through an injected [`BaselineStore`]
//! and never writes. A missing baseline yields a `no-baseline` report. Each
//! tracked metric is classified by its declared direction and tolerance;
//! the direction is never inferred. A store failure yields an `error`
//! report so the failure stays visible.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::core::ComparisonReport;
use crate::core::ComparisonStatus;
use crate::core::MetricClassification;
use crate::core::MetricComparison;
use crate::core::MetricDirection;
use crate::core::MetricPolicy;
use crate::core::MetricsSnapshot;
use crate::core::ScenarioId;
use crate::interfaces::BaselineStore;

// ============================================================================
// SECTION: Comparator
// ============================================================================

/// Compares run metrics with stored baselines.
#[derive(Clone)]
pub struct BaselineComparator {
    /// Baseline store, read-only from the comparator's perspective.
    store: Arc<dyn BaselineStore + Send + Sync>,
    /// Tracked metric policies in reporting order.
    policies: Vec<MetricPolicy>,
}

impl BaselineComparator {
    /// Creates a comparator over an injected store.
    #[must_use]
    pub fn new(store: Arc<dyn BaselineStore + Send + Sync>, policies: Vec<MetricPolicy>) -> Self {
        Self {
            store,
            policies,
        }
    }

    /// Returns the tracked metric policies.
    #[must_use]
    pub fn policies(&self) -> &[MetricPolicy] {
        &self.policies
    }

    /// Compares current metrics with the scenario's baseline.
    #[must_use]
    pub fn compare(&self, scenario_id: &ScenarioId, current: &MetricsSnapshot) -> ComparisonReport {
        let baseline = match self.store.load(scenario_id) {
            Ok(Some(baseline)) => baseline,
            Ok(None) => {
                return ComparisonReport::empty(scenario_id.clone(), ComparisonStatus::NoBaseline);
            }
            Err(err) => return ComparisonReport::failed(scenario_id.clone(), err.to_string()),
        };
        let metrics = self
            .policies
            .iter()
            .map(|policy| {
                classify_metric(
                    policy,
                    baseline.stored_metrics.value_or_zero(&policy.name),
                    current.value_or_zero(&policy.name),
                )
            })
            .collect();
        ComparisonReport {
            scenario_id: scenario_id.clone(),
            status: ComparisonStatus::Compared,
            baseline_stored_at: Some(baseline.stored_at),
            metrics,
            error: None,
        }
    }
}

// ============================================================================
// SECTION: Classification
// ============================================================================

/// Classifies one metric change under a policy.
#[must_use]
#[allow(clippy::float_cmp, reason = "A zero baseline is an exact sentinel for percent change.")]
pub fn classify_metric(policy: &MetricPolicy, baseline: f64, current: f64) -> MetricComparison {
    let delta = current - baseline;
    let percent_change = if baseline != 0.0 {
        Some(delta / baseline.abs() * 100.0)
    } else if delta == 0.0 {
        Some(0.0)
    } else {
        None
    };
    let beyond_tolerance = percent_change.is_none_or(|pct| pct.abs() > policy.tolerance_pct);
    let classification = if delta == 0.0 || !beyond_tolerance {
        MetricClassification::Unchanged
    } else {
        let better = match policy.direction {
            MetricDirection::LowerIsBetter => delta < 0.0,
            MetricDirection::HigherIsBetter => delta > 0.0,
        };
        if better { MetricClassification::Improved } else { MetricClassification::Regressed }
    };
    MetricComparison {
        name: policy.name.clone(),
        direction: policy.direction,
        tolerance_pct: policy.tolerance_pct,
        blocking: policy.blocking,
        baseline,
        current,
        delta,
        percent_change,
        classification,
    }
}
