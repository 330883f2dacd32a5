// crates/scenario-harness-core/src/runtime/verification.rs
// ============================================================================
// Module: Verification Engine
// Description: Evaluate numeric, pattern, and model-graded rules against a run.
// Purpose: Combine heterogeneous rule outcomes into one attributed verdict.
// Dependencies: crate::{core, interfaces, runtime}, regex, tokio
// ============================================================================

//! ## Overview
//! Rules are a closed set of kinds dispatched by an exhaustive match.
//! Numeric rules compare a metric exactly. Pattern rules test transcript
//! text for substring or regex presence. Model-graded rules send a bounded
//! transcript excerpt to a [`ModelGrader`] under a bounded retry policy.
//! All rules of a run are evaluated concurrently; the aggregate is computed
//! only after every evaluation settles. A failed required rule fails the
//! scenario regardless of the aggregate.
//!
//! Security posture: grading backends are untrusted; confidence values
//! outside `[0, 1]` are rejected as fatal grading errors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use regex::RegexBuilder;
use tokio::task;
use tokio::task::JoinSet;

use crate::core::ConfigurationError;
use crate::core::NumericOperator;
use crate::core::NumericRule;
use crate::core::PatternOperator;
use crate::core::PatternRule;
use crate::core::RuleFailure;
use crate::core::RuleId;
use crate::core::RuleKind;
use crate::core::RuleResult;
use crate::core::RunRecord;
use crate::core::Scenario;
use crate::core::ScenarioId;
use crate::core::TranscriptEntryKind;
use crate::core::TranscriptScope;
use crate::core::VerificationRule;
use crate::core::VerificationVerdict;
use crate::interfaces::GradeResponse;
use crate::interfaces::GradingError;
use crate::interfaces::GradingRequest;
use crate::interfaces::ModelGrader;
use crate::runtime::cancel::CancelSignal;
use crate::runtime::events::HarnessEvent;
use crate::runtime::events::HarnessEventKind;
use crate::runtime::events::HarnessEventSink;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Bounded retry policy for model-grading calls.
#[derive(Debug, Clone, PartialEq)]
pub struct GradingPolicy {
    /// Maximum attempts, including the first call.
    pub max_attempts: u32,
    /// Backoff before the second attempt.
    pub initial_backoff: Duration,
    /// Multiplier applied per additional attempt.
    pub backoff_multiplier: f64,
    /// Upper bound on any single backoff.
    pub max_backoff: Duration,
    /// Deadline for a single grading call.
    pub call_timeout: Duration,
}

impl Default for GradingPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_millis(5_000),
            call_timeout: Duration::from_millis(20_000),
        }
    }
}

impl GradingPolicy {
    /// Returns the backoff after the given failed attempt (starting at 1).
    #[must_use]
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let factor = self.backoff_multiplier.max(1.0).powi(exponent);
        let initial_ms = self.initial_backoff.as_secs_f64() * 1_000.0;
        let max_ms = self.max_backoff.as_secs_f64() * 1_000.0;
        let backoff_ms = (initial_ms * factor).min(max_ms);
        if backoff_ms.is_finite() && backoff_ms > 0.0 {
            Duration::from_secs_f64(backoff_ms / 1_000.0)
        } else {
            Duration::ZERO
        }
    }
}

/// Verification engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationConfig {
    /// Suite pass threshold for the aggregate score.
    pub pass_threshold: f64,
    /// Confidence threshold for model-graded rules that declare none.
    pub default_confidence_threshold: f64,
    /// Maximum characters in a grading transcript excerpt.
    pub max_excerpt_chars: usize,
    /// Grading retry policy.
    pub grading: GradingPolicy,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            pass_threshold: 0.75,
            default_confidence_threshold: 0.7,
            max_excerpt_chars: 8_000,
            grading: GradingPolicy::default(),
        }
    }
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Evaluates verification rules against run records.
#[derive(Clone)]
pub struct VerificationEngine {
    /// Model-grading collaborator.
    grader: Arc<dyn ModelGrader>,
    /// Event sink.
    events: Arc<dyn HarnessEventSink>,
    /// Engine configuration.
    config: VerificationConfig,
}

impl VerificationEngine {
    /// Creates a verification engine.
    #[must_use]
    pub fn new(
        grader: Arc<dyn ModelGrader>,
        events: Arc<dyn HarnessEventSink>,
        config: VerificationConfig,
    ) -> Self {
        Self {
            grader,
            events,
            config,
        }
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &VerificationConfig {
        &self.config
    }

    /// Evaluates every rule of a scenario and aggregates the verdict.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when a rule references an unknown metric
    /// or carries an invalid pattern.
    pub async fn verify(
        &self,
        scenario: &Scenario,
        record: Arc<RunRecord>,
        cancel: &CancelSignal,
    ) -> Result<VerificationVerdict, ConfigurationError> {
        let rules = &scenario.verification.rules;
        let mut tasks = JoinSet::new();
        let mut task_slots: HashMap<task::Id, usize> = HashMap::new();
        for (index, rule) in rules.iter().enumerate() {
            let engine = self.clone();
            let rule = rule.clone();
            let record = Arc::clone(&record);
            let cancel = cancel.clone();
            let scenario_id = scenario.id.clone();
            let handle = tasks.spawn(async move {
                let result = engine.evaluate(&scenario_id, &rule, &record, &cancel).await;
                (index, result)
            });
            task_slots.insert(handle.id(), index);
        }

        let mut slots: Vec<Option<RuleResult>> = vec![None; rules.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => {
                    let result = match result {
                        Ok(result) => result,
                        Err(err) => {
                            tasks.abort_all();
                            return Err(err);
                        }
                    };
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = Some(result);
                    }
                }
                Err(err) => {
                    let Some(index) = task_slots.get(&err.id()).copied() else {
                        continue;
                    };
                    if let (Some(slot), Some(rule)) = (slots.get_mut(index), rules.get(index)) {
                        *slot = Some(failed_result(
                            rule,
                            format!("rule evaluation failed: {err}"),
                            RuleFailure::Unsatisfied,
                        ));
                    }
                }
            }
        }

        let rule_results: Vec<RuleResult> = slots
            .into_iter()
            .zip(rules)
            .map(|(slot, rule)| slot.unwrap_or_else(|| cancelled_result(rule)))
            .collect();
        let pass_threshold =
            scenario.verification.pass_threshold.unwrap_or(self.config.pass_threshold);
        Ok(build_verdict(rule_results, pass_threshold))
    }

    /// Evaluates one rule against a run record.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when the rule references an unknown
    /// metric or carries an invalid pattern.
    pub async fn evaluate(
        &self,
        scenario_id: &ScenarioId,
        rule: &VerificationRule,
        record: &RunRecord,
        cancel: &CancelSignal,
    ) -> Result<RuleResult, ConfigurationError> {
        match &rule.kind {
            RuleKind::Numeric(numeric) => evaluate_numeric(scenario_id, rule, numeric, record),
            RuleKind::Pattern(pattern) => evaluate_pattern(scenario_id, rule, pattern, record),
            RuleKind::Llm(llm) => {
                let max_chars = llm.max_excerpt_chars.unwrap_or(self.config.max_excerpt_chars);
                Ok(self.evaluate_llm(scenario_id, rule, record, max_chars, cancel).await)
            }
        }
    }

    /// Evaluates a model-graded rule.
    async fn evaluate_llm(
        &self,
        scenario_id: &ScenarioId,
        rule: &VerificationRule,
        record: &RunRecord,
        max_chars: usize,
        cancel: &CancelSignal,
    ) -> RuleResult {
        let threshold =
            rule.confidence_threshold.unwrap_or(self.config.default_confidence_threshold);
        let (transcript_excerpt, truncated) = transcript_excerpt(record, max_chars);
        let request = GradingRequest {
            scenario_id: scenario_id.clone(),
            rule_id: rule.id.clone(),
            criterion: rule.description.clone(),
            transcript_excerpt,
            truncated,
        };
        match self.grade_with_retry(&request, cancel).await {
            Ok(grade) => {
                let passed = grade.confidence >= threshold;
                RuleResult {
                    rule_id: rule.id.clone(),
                    kind: rule.kind.label().to_string(),
                    weight: rule.weight,
                    required: rule.required,
                    passed,
                    score: grade.confidence,
                    rationale: format!(
                        "confidence {:.3} {} threshold {:.3}: {}",
                        grade.confidence,
                        if passed { ">=" } else { "<" },
                        threshold,
                        grade.rationale
                    ),
                    failure: (!passed).then_some(RuleFailure::Unsatisfied),
                }
            }
            Err(GradingError::Cancelled) => cancelled_result(rule),
            Err(err) => {
                self.events.record(&HarnessEvent::now(HarnessEventKind::GradingUnavailable {
                    scenario_id: scenario_id.to_string(),
                    rule_id: rule.id.to_string(),
                    error: err.to_string(),
                }));
                failed_result(
                    rule,
                    format!("grading unavailable: {err}"),
                    RuleFailure::GradingUnavailable {
                        reason: err.to_string(),
                    },
                )
            }
        }
    }

    /// Calls the grader with per-call timeouts, bounded retries, and cancellation.
    async fn grade_with_retry(
        &self,
        request: &GradingRequest,
        cancel: &CancelSignal,
    ) -> Result<GradeResponse, GradingError> {
        let policy = &self.config.grading;
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt: u32 = 1;
        loop {
            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => Err(GradingError::Cancelled),
                result = tokio::time::timeout(policy.call_timeout, self.grader.grade(request)) => {
                    result.unwrap_or_else(|_| {
                        Err(GradingError::Timeout(format!(
                            "no response within {}ms",
                            policy.call_timeout.as_millis()
                        )))
                    })
                }
            };
            let err = match outcome {
                Ok(grade) => return validate_grade(grade),
                Err(err) => err,
            };
            if !err.is_retryable() || attempt >= max_attempts {
                return Err(err);
            }
            let backoff = policy.backoff_after(attempt);
            self.events.record(&HarnessEvent::now(HarnessEventKind::GradingRetry {
                scenario_id: request.scenario_id.to_string(),
                rule_id: request.rule_id.to_string(),
                attempt,
                backoff_ms: u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                error: err.to_string(),
            }));
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(GradingError::Cancelled),
                () = tokio::time::sleep(backoff) => {}
            }
            attempt += 1;
        }
    }
}

/// Rejects grades whose confidence lies outside `[0, 1]`.
fn validate_grade(grade: GradeResponse) -> Result<GradeResponse, GradingError> {
    if grade.confidence.is_finite() && (0.0..=1.0).contains(&grade.confidence) {
        Ok(grade)
    } else {
        Err(GradingError::Fatal(format!("confidence {} is outside [0, 1]", grade.confidence)))
    }
}

// ============================================================================
// SECTION: Deterministic Rules
// ============================================================================

/// Evaluates a numeric comparison.
fn evaluate_numeric(
    scenario_id: &ScenarioId,
    rule: &VerificationRule,
    numeric: &NumericRule,
    record: &RunRecord,
) -> Result<RuleResult, ConfigurationError> {
    let Some(actual) = record.metrics.get(&numeric.metric) else {
        return Err(ConfigurationError::UnknownMetric {
            scenario: scenario_id.to_string(),
            rule: rule.id.to_string(),
            metric: numeric.metric.clone(),
        });
    };
    let passed = compare_numeric(actual, numeric.operator, numeric.expected);
    let rationale = format!(
        "{} = {actual} {} {} is {passed}",
        numeric.metric,
        numeric.operator.symbol(),
        numeric.expected
    );
    Ok(if passed { passed_result(rule, rationale) } else { unsatisfied_result(rule, rationale) })
}

/// Applies a numeric operator with exact comparison.
#[must_use]
#[allow(clippy::float_cmp, reason = "Numeric rules compare exactly with no implicit tolerance.")]
pub fn compare_numeric(actual: f64, operator: NumericOperator, expected: f64) -> bool {
    match operator {
        NumericOperator::GreaterOrEqual => actual >= expected,
        NumericOperator::LessOrEqual => actual <= expected,
        NumericOperator::Equal => actual == expected,
        NumericOperator::NotEqual => actual != expected,
    }
}

/// Evaluates a pattern presence rule.
fn evaluate_pattern(
    scenario_id: &ScenarioId,
    rule: &VerificationRule,
    pattern: &PatternRule,
    record: &RunRecord,
) -> Result<RuleResult, ConfigurationError> {
    let texts: Vec<&str> = record
        .transcript
        .iter()
        .filter(|entry| match pattern.scope {
            TranscriptScope::Responses => entry.kind == TranscriptEntryKind::Response,
            TranscriptScope::Inputs => entry.kind == TranscriptEntryKind::Input,
            TranscriptScope::All => true,
        })
        .map(|entry| entry.content.as_str())
        .collect();

    let mut matched: Option<&str> = None;
    for alternative in pattern.value.alternatives() {
        let found = match pattern.operator {
            PatternOperator::Contains => {
                if pattern.case_insensitive {
                    let needle = alternative.to_lowercase();
                    texts.iter().any(|text| text.to_lowercase().contains(&needle))
                } else {
                    texts.iter().any(|text| text.contains(alternative))
                }
            }
            PatternOperator::Matches => {
                let regex = RegexBuilder::new(alternative)
                    .case_insensitive(pattern.case_insensitive)
                    .build()
                    .map_err(|err| ConfigurationError::InvalidRegex {
                        scenario: scenario_id.to_string(),
                        field: format!("verification.rules.{}.value", rule.id),
                        message: err.to_string(),
                    })?;
                texts.iter().any(|text| regex.is_match(text))
            }
        };
        if found {
            matched = Some(alternative);
            break;
        }
    }

    let passed = matched.is_some() == pattern.expected;
    let scope = match pattern.scope {
        TranscriptScope::Responses => "responses",
        TranscriptScope::Inputs => "inputs",
        TranscriptScope::All => "transcript",
    };
    let rationale = match matched {
        Some(alternative) => format!("pattern {alternative:?} found in {scope}"),
        None => format!("no pattern of {:?} found in {scope}", pattern.value.alternatives()),
    };
    let rationale = if pattern.expected {
        rationale
    } else {
        format!("{rationale} (expected absent)")
    };
    Ok(if passed { passed_result(rule, rationale) } else { unsatisfied_result(rule, rationale) })
}

// ============================================================================
// SECTION: Excerpts
// ============================================================================

/// Builds a bounded transcript excerpt keeping the most recent entries.
///
/// Returns the excerpt and whether older entries were omitted.
#[must_use]
pub fn transcript_excerpt(record: &RunRecord, max_chars: usize) -> (String, bool) {
    let mut lines: Vec<String> = Vec::new();
    let mut used = 0usize;
    let mut truncated = false;
    for entry in record.transcript.iter().rev() {
        let line = format!("[{}] {}: {}", entry.sequence, entry.actor, entry.content);
        let cost = line.chars().count() + 1;
        if used + cost > max_chars {
            truncated = true;
            if lines.is_empty() && max_chars > 0 {
                let keep = line.chars().count().saturating_sub(max_chars);
                lines.push(line.chars().skip(keep).collect());
            }
            break;
        }
        used += cost;
        lines.push(line);
    }
    lines.reverse();
    (lines.join("\n"), truncated)
}

// ============================================================================
// SECTION: Aggregation
// ============================================================================

/// Weighted mean of rule pass outcomes with weights normalized to sum to 1.
///
/// Returns 1.0 when there are no rules.
#[must_use]
pub fn aggregate_score(results: &[RuleResult]) -> f64 {
    let total_weight: f64 = results.iter().map(|result| result.weight).sum();
    if results.is_empty() || total_weight <= 0.0 {
        return 1.0;
    }
    let passed_weight: f64 =
        results.iter().filter(|result| result.passed).map(|result| result.weight).sum();
    passed_weight / total_weight
}

/// Combines rule results into a verdict.
#[must_use]
pub fn build_verdict(rule_results: Vec<RuleResult>, pass_threshold: f64) -> VerificationVerdict {
    let aggregate = aggregate_score(&rule_results);
    let required_failures: Vec<RuleId> = rule_results
        .iter()
        .filter(|result| result.required && !result.passed)
        .map(|result| result.rule_id.clone())
        .collect();
    let passed = aggregate >= pass_threshold && required_failures.is_empty();
    VerificationVerdict {
        rule_results,
        aggregate_score: aggregate,
        pass_threshold,
        required_failures,
        passed,
    }
}

// ============================================================================
// SECTION: Result Builders
// ============================================================================

/// Builds a passing deterministic result.
fn passed_result(rule: &VerificationRule, rationale: String) -> RuleResult {
    RuleResult {
        rule_id: rule.id.clone(),
        kind: rule.kind.label().to_string(),
        weight: rule.weight,
        required: rule.required,
        passed: true,
        score: 1.0,
        rationale,
        failure: None,
    }
}

/// Builds an unsatisfied deterministic result.
fn unsatisfied_result(rule: &VerificationRule, rationale: String) -> RuleResult {
    failed_result(rule, rationale, RuleFailure::Unsatisfied)
}

/// Builds a failed result with an explicit failure reason.
fn failed_result(rule: &VerificationRule, rationale: String, failure: RuleFailure) -> RuleResult {
    RuleResult {
        rule_id: rule.id.clone(),
        kind: rule.kind.label().to_string(),
        weight: rule.weight,
        required: rule.required,
        passed: false,
        score: 0.0,
        rationale,
        failure: Some(failure),
    }
}

/// Builds the result for a rule whose evaluation was cancelled.
fn cancelled_result(rule: &VerificationRule) -> RuleResult {
    failed_result(rule, "evaluation cancelled".to_string(), RuleFailure::Cancelled)
}
