// crates/scenario-harness-core/tests/verification_unit.rs
// ============================================================================
// Module: Verification Engine Unit Tests
// Description: Rule evaluation, aggregation, and model-grading retries.
// Purpose: Validate verdict semantics against hand-built run records.
// ============================================================================

//! Verification engine tests over synthetic run records.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use scenario_harness_core::ActorId;
use scenario_harness_core::AgentId;
use scenario_harness_core::ConfigurationError;
use scenario_harness_core::EnvironmentId;
use scenario_harness_core::EnvironmentSummary;
use scenario_harness_core::GradeResponse;
use scenario_harness_core::GradingError;
use scenario_harness_core::GradingRequest;
use scenario_harness_core::ModelGrader;
use scenario_harness_core::NumericOperator;
use scenario_harness_core::RuleFailure;
use scenario_harness_core::RunId;
use scenario_harness_core::RunRecord;
use scenario_harness_core::Scenario;
use scenario_harness_core::Timestamp;
use scenario_harness_core::TranscriptEntry;
use scenario_harness_core::TranscriptEntryKind;
use scenario_harness_core::runtime::CancelSignal;
use scenario_harness_core::runtime::GradingPolicy;
use scenario_harness_core::runtime::HarnessEventKind;
use scenario_harness_core::runtime::HarnessEventSink;
use scenario_harness_core::runtime::MemoryEventSink;
use scenario_harness_core::runtime::VerificationConfig;
use scenario_harness_core::runtime::VerificationEngine;
use scenario_harness_core::runtime::aggregate_score;
use scenario_harness_core::runtime::build_verdict;
use scenario_harness_core::runtime::compare_numeric;
use scenario_harness_core::runtime::loader::SourceFormat;
use scenario_harness_core::runtime::loader::parse_scenarios;
use scenario_harness_core::runtime::transcript_excerpt;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Grader that replays queued outcomes and counts calls.
struct ScriptedGrader {
    outcomes: Mutex<VecDeque<Result<GradeResponse, GradingError>>>,
    calls: Mutex<u32>,
}

impl ScriptedGrader {
    fn new(outcomes: Vec<Result<GradeResponse, GradingError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ModelGrader for ScriptedGrader {
    async fn grade(&self, _request: &GradingRequest) -> Result<GradeResponse, GradingError> {
        *self.calls.lock().unwrap() += 1;
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GradingError::Fatal("no scripted outcome".to_string())))
    }
}

/// Grader that never answers.
struct HangingGrader;

#[async_trait]
impl ModelGrader for HangingGrader {
    async fn grade(&self, _request: &GradingRequest) -> Result<GradeResponse, GradingError> {
        std::future::pending().await
    }
}

fn scenario_with_rules(rules: &Value) -> Scenario {
    let value = json!({
        "id": "verify-me",
        "name": "Verify me",
        "category": "unit",
        "actors": [{ "id": "alice", "role": "participant" }],
        "turns": [{ "actorId": "alice", "content": "hello" }],
        "verification": { "rules": rules }
    });
    parse_scenarios(&value.to_string(), SourceFormat::Json, "inline.json").unwrap().remove(0)
}

fn entry(sequence: u64, kind: TranscriptEntryKind, content: &str) -> TranscriptEntry {
    let actor = match kind {
        TranscriptEntryKind::Input => "alice",
        TranscriptEntryKind::Response => "agent",
    };
    TranscriptEntry {
        sequence,
        turn_index: 0,
        actor: ActorId::new(actor),
        kind,
        content: content.to_string(),
        at: Timestamp::from_unix_millis(0),
        offset_ms: sequence * 10,
    }
}

fn record(transcript: Vec<TranscriptEntry>, metrics: &[(&str, f64)]) -> RunRecord {
    RunRecord {
        run_id: RunId::new("run-1"),
        scenario_id: "verify-me".into(),
        environment: EnvironmentSummary {
            environment_id: EnvironmentId::new("env-1"),
            agent_id: AgentId::new("agent-1"),
            workdir: PathBuf::from("/tmp/unused"),
            plugins: Vec::new(),
        },
        transcript,
        metrics: metrics.iter().map(|(name, value)| ((*name).to_string(), *value)).collect(),
        timeouts: Vec::new(),
        send_failures: Vec::new(),
        turns_attempted: 1,
        aborted: false,
        cancelled: false,
        started_at: Timestamp::from_unix_millis(0),
        ended_at: Timestamp::from_unix_millis(20),
    }
}

fn greeting_record() -> RunRecord {
    record(
        vec![
            entry(1, TranscriptEntryKind::Input, "hello"),
            entry(2, TranscriptEntryKind::Response, "hello back"),
        ],
        &[("messageCount", 2.0), ("turnTimeouts", 0.0)],
    )
}

fn fast_config() -> VerificationConfig {
    VerificationConfig {
        grading: GradingPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(10),
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_millis(40),
            call_timeout: Duration::from_millis(500),
        },
        ..VerificationConfig::default()
    }
}

fn build_engine(grader: Arc<dyn ModelGrader>) -> (VerificationEngine, Arc<MemoryEventSink>) {
    let events = Arc::new(MemoryEventSink::new());
    let sink: Arc<dyn HarnessEventSink> = Arc::clone(&events) as Arc<dyn HarnessEventSink>;
    let engine = VerificationEngine::new(grader, sink, fast_config());
    (engine, events)
}

fn grade(confidence: f64, rationale: &str) -> Result<GradeResponse, GradingError> {
    Ok(GradeResponse {
        confidence,
        rationale: rationale.to_string(),
    })
}

// ============================================================================
// SECTION: Numeric and Aggregate Semantics
// ============================================================================

#[test]
fn numeric_operators_compare_exactly() {
    assert!(compare_numeric(5.0, NumericOperator::GreaterOrEqual, 5.0));
    assert!(compare_numeric(5.0, NumericOperator::LessOrEqual, 5.0));
    assert!(compare_numeric(5.0, NumericOperator::Equal, 5.0));
    assert!(!compare_numeric(5.0, NumericOperator::NotEqual, 5.0));
    assert!(!compare_numeric(4.999, NumericOperator::Equal, 5.0));
}

#[tokio::test]
async fn weighted_aggregate_of_one_pass_and_one_fail_is_half() {
    let scenario = scenario_with_rules(&json!([
        {
            "id": "a", "description": "enough messages", "type": "numeric",
            "metric": "messageCount", "operator": ">=", "expected": 1
        },
        {
            "id": "b", "description": "many messages", "type": "numeric",
            "metric": "messageCount", "operator": ">=", "expected": 10
        }
    ]));
    let (engine, _) = build_engine(Arc::new(ScriptedGrader::new(Vec::new())));
    let verdict = engine
        .verify(&scenario, Arc::new(greeting_record()), &CancelSignal::new())
        .await
        .unwrap();
    assert!((verdict.aggregate_score - 0.5).abs() < f64::EPSILON);
    assert!(!verdict.passed);
    assert!(verdict.rule_results[0].passed);
    assert!(!verdict.rule_results[1].passed);
    assert_eq!(verdict.rule_results[1].failure, Some(RuleFailure::Unsatisfied));
    assert!(verdict.rule_results[1].rationale.contains("messageCount = 2"));
}

#[tokio::test]
async fn failed_required_rule_fails_regardless_of_aggregate() {
    let scenario = scenario_with_rules(&json!([
        {
            "id": "min-messages", "description": "three messages", "type": "numeric",
            "metric": "messageCount", "operator": ">=", "expected": 3, "required": true
        },
        {
            "id": "greets", "description": "greets", "type": "pattern",
            "operator": "contains", "value": "hello", "weight": 100.0
        }
    ]));
    let (engine, _) = build_engine(Arc::new(ScriptedGrader::new(Vec::new())));
    let verdict = engine
        .verify(&scenario, Arc::new(greeting_record()), &CancelSignal::new())
        .await
        .unwrap();
    assert!(verdict.aggregate_score > 0.75);
    assert!(!verdict.passed);
    assert_eq!(verdict.required_failures.len(), 1);
    assert_eq!(verdict.required_failures[0].as_str(), "min-messages");
    assert_eq!(verdict.rule_results.len(), 2, "all rules are evaluated");
}

#[test]
fn aggregate_of_no_rules_is_one() {
    assert!((aggregate_score(&[]) - 1.0).abs() < f64::EPSILON);
    let verdict = build_verdict(Vec::new(), 0.75);
    assert!(verdict.passed);
}

#[tokio::test]
async fn metric_missing_from_record_is_a_configuration_error() {
    let scenario = scenario_with_rules(&json!([{
        "id": "timeouts", "description": "no timeouts", "type": "numeric",
        "metric": "latencyP95Ms", "operator": "<=", "expected": 100
    }]));
    let (engine, _) = build_engine(Arc::new(ScriptedGrader::new(Vec::new())));
    let err = engine
        .verify(&scenario, Arc::new(greeting_record()), &CancelSignal::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::UnknownMetric { .. }));
}

// ============================================================================
// SECTION: Pattern Rules
// ============================================================================

#[tokio::test]
async fn pattern_rules_respect_scope_case_and_expectation() {
    let scenario = scenario_with_rules(&json!([
        {
            "id": "any-greeting", "description": "greets", "type": "pattern",
            "operator": "contains", "value": ["hi", "hello"]
        },
        {
            "id": "case-folded", "description": "greets loudly", "type": "pattern",
            "operator": "contains", "value": "HELLO BACK", "caseInsensitive": true
        },
        {
            "id": "no-insults", "description": "never insults", "type": "pattern",
            "operator": "matches", "value": "(?:idiot|fool)", "expected": false
        },
        {
            "id": "inputs-only", "description": "response text absent from inputs",
            "type": "pattern", "operator": "contains", "value": "back", "scope": "inputs"
        }
    ]));
    let (engine, _) = build_engine(Arc::new(ScriptedGrader::new(Vec::new())));
    let verdict = engine
        .verify(&scenario, Arc::new(greeting_record()), &CancelSignal::new())
        .await
        .unwrap();
    let passed: Vec<bool> = verdict.rule_results.iter().map(|result| result.passed).collect();
    assert_eq!(passed, vec![true, true, true, false]);
    assert!((verdict.aggregate_score - 0.75).abs() < f64::EPSILON);
    assert!(verdict.passed);
}

// ============================================================================
// SECTION: Model-Graded Rules
// ============================================================================

fn llm_scenario(threshold: Option<f64>) -> Scenario {
    let mut rule = json!({
        "id": "polite", "description": "The agent is polite", "type": "llm"
    });
    if let Some(threshold) = threshold {
        rule["confidenceThreshold"] = json!(threshold);
    }
    scenario_with_rules(&json!([rule]))
}

#[tokio::test]
async fn grader_confidence_is_compared_to_threshold() {
    let grader = Arc::new(ScriptedGrader::new(vec![grade(0.65, "mostly polite")]));
    let (engine, _) = build_engine(Arc::clone(&grader) as Arc<dyn ModelGrader>);
    let verdict = engine
        .verify(&llm_scenario(Some(0.6)), Arc::new(greeting_record()), &CancelSignal::new())
        .await
        .unwrap();
    let result = &verdict.rule_results[0];
    assert!(result.passed);
    assert!((result.score - 0.65).abs() < f64::EPSILON);
    assert!(result.rationale.contains("mostly polite"));

    let grader = Arc::new(ScriptedGrader::new(vec![grade(0.65, "mostly polite")]));
    let (engine, _) = build_engine(Arc::clone(&grader) as Arc<dyn ModelGrader>);
    let verdict = engine
        .verify(&llm_scenario(None), Arc::new(greeting_record()), &CancelSignal::new())
        .await
        .unwrap();
    assert!(!verdict.rule_results[0].passed, "default threshold is 0.7");
}

#[tokio::test]
async fn retryable_grading_errors_are_retried_with_events() {
    let grader = Arc::new(ScriptedGrader::new(vec![
        Err(GradingError::RateLimited("slow down".to_string())),
        Err(GradingError::Transient("503".to_string())),
        grade(0.9, "polite"),
    ]));
    let (engine, events) = build_engine(Arc::clone(&grader) as Arc<dyn ModelGrader>);
    let verdict = engine
        .verify(&llm_scenario(None), Arc::new(greeting_record()), &CancelSignal::new())
        .await
        .unwrap();
    assert!(verdict.rule_results[0].passed);
    assert_eq!(grader.calls(), 3);
    let retries = events
        .events()
        .into_iter()
        .filter(|event| matches!(event.kind, HarnessEventKind::GradingRetry { .. }))
        .count();
    assert_eq!(retries, 2);
}

#[tokio::test]
async fn exhausted_retries_fail_only_the_graded_rule() {
    let grader = Arc::new(ScriptedGrader::new(vec![
        Err(GradingError::Transient("503".to_string())),
        Err(GradingError::Transient("503".to_string())),
        Err(GradingError::Transient("503".to_string())),
    ]));
    let (engine, events) = build_engine(Arc::clone(&grader) as Arc<dyn ModelGrader>);
    let scenario = scenario_with_rules(&json!([
        { "id": "polite", "description": "The agent is polite", "type": "llm" },
        {
            "id": "greets", "description": "greets", "type": "pattern",
            "operator": "contains", "value": "hello"
        }
    ]));
    let verdict =
        engine.verify(&scenario, Arc::new(greeting_record()), &CancelSignal::new()).await.unwrap();
    assert_eq!(grader.calls(), 3);
    let graded = &verdict.rule_results[0];
    assert!(!graded.passed);
    assert!(matches!(graded.failure, Some(RuleFailure::GradingUnavailable { .. })));
    assert!(graded.rationale.starts_with("grading unavailable"));
    assert!(verdict.rule_results[1].passed);
    assert!(
        events
            .events()
            .iter()
            .any(|event| matches!(event.kind, HarnessEventKind::GradingUnavailable { .. }))
    );
}

#[tokio::test]
async fn fatal_and_out_of_range_grades_are_not_retried() {
    let grader = Arc::new(ScriptedGrader::new(vec![grade(1.5, "overconfident")]));
    let (engine, _) = build_engine(Arc::clone(&grader) as Arc<dyn ModelGrader>);
    let verdict = engine
        .verify(&llm_scenario(None), Arc::new(greeting_record()), &CancelSignal::new())
        .await
        .unwrap();
    assert_eq!(grader.calls(), 1);
    assert!(matches!(
        verdict.rule_results[0].failure,
        Some(RuleFailure::GradingUnavailable { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn hanging_grader_times_out_per_call() {
    let (engine, _) = build_engine(Arc::new(HangingGrader));
    let verdict = engine
        .verify(&llm_scenario(None), Arc::new(greeting_record()), &CancelSignal::new())
        .await
        .unwrap();
    let result = &verdict.rule_results[0];
    assert!(!result.passed);
    assert!(result.rationale.contains("grading timeout"));
}

#[tokio::test(start_paused = true)]
async fn cancellation_aborts_pending_grading() {
    let (engine, _) = build_engine(Arc::new(HangingGrader));
    let cancel = CancelSignal::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });
    let verdict =
        engine.verify(&llm_scenario(None), Arc::new(greeting_record()), &cancel).await.unwrap();
    assert_eq!(verdict.rule_results[0].failure, Some(RuleFailure::Cancelled));
    assert!(!verdict.passed);
}

// ============================================================================
// SECTION: Excerpts and Policy
// ============================================================================

#[test]
fn transcript_excerpt_keeps_most_recent_entries() {
    let record = record(
        vec![
            entry(1, TranscriptEntryKind::Input, "first message"),
            entry(2, TranscriptEntryKind::Response, "second message"),
            entry(3, TranscriptEntryKind::Input, "third"),
        ],
        &[],
    );
    let (full, truncated) = transcript_excerpt(&record, 10_000);
    assert!(!truncated);
    assert_eq!(full.lines().count(), 3);

    let (short, truncated) = transcript_excerpt(&record, 40);
    assert!(truncated);
    assert!(short.ends_with("[3] alice: third"));
    assert!(!short.contains("first message"));
    assert!(short.chars().count() <= 40);
}

#[test]
fn backoff_grows_and_is_capped() {
    let policy = fast_config().grading;
    let millis = |attempt: u32| policy.backoff_after(attempt).as_secs_f64() * 1_000.0;
    assert!((millis(1) - 10.0).abs() < 1e-6);
    assert!((millis(2) - 20.0).abs() < 1e-6);
    assert!((millis(5) - 40.0).abs() < 1e-6);
}
