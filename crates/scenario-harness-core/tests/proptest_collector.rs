// crates/scenario-harness-core/tests/proptest_collector.rs
// ============================================================================
// Module: Metrics Collector Property-Based Tests
// Description: Property tests for metric finalization and percentile math.
// Purpose: Detect instability across wide event sequences.
// ============================================================================

//! Property-based tests for metrics collector invariants.

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

use proptest::prelude::*;
use scenario_harness_core::TranscriptScope;
use scenario_harness_core::core::metrics;
use scenario_harness_core::runtime::MetricsCollector;
use scenario_harness_core::runtime::PatternCountHook;
use scenario_harness_core::runtime::RunEvent;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds an input/response event pair per latency sample.
fn events_for_latencies(latencies: &[u64]) -> Vec<RunEvent> {
    let mut events = Vec::new();
    let mut clock = 0u64;
    for (turn_index, latency) in latencies.iter().enumerate() {
        events.push(RunEvent::InputSent {
            turn_index,
            actor: "alice".to_string(),
            content: format!("turn {turn_index}"),
            offset_ms: clock,
        });
        clock += latency;
        events.push(RunEvent::ResponseReceived {
            turn_index,
            content: format!("reply {turn_index}"),
            offset_ms: clock,
        });
        events.push(RunEvent::TurnCompleted {
            turn_index,
        });
    }
    events.push(RunEvent::RunEnded {
        offset_ms: clock,
    });
    events
}

fn collect(events: &[RunEvent]) -> MetricsCollector {
    let mut collector = MetricsCollector::new();
    for event in events {
        collector.observe(event);
    }
    collector
}

// ============================================================================
// SECTION: Deterministic Cases
// ============================================================================

#[test]
fn every_builtin_key_is_present_when_nothing_was_observed() {
    let snapshot = MetricsCollector::new().finalize();
    for key in metrics::BUILTIN_METRICS {
        assert_eq!(snapshot.get(key), Some(0.0), "missing {key}");
    }
    assert_eq!(snapshot.get(&metrics::agent_messages_key()), Some(0.0));
}

#[test]
fn nearest_rank_percentiles_over_known_samples() {
    let latencies: Vec<u64> = (1..=20).map(|value| value * 10).collect();
    let snapshot = collect(&events_for_latencies(&latencies)).finalize();
    assert_eq!(snapshot.get(metrics::LATENCY_P50_MS), Some(100.0));
    assert_eq!(snapshot.get(metrics::LATENCY_P95_MS), Some(190.0));
    assert_eq!(snapshot.get(metrics::LATENCY_MAX_MS), Some(200.0));
    assert_eq!(snapshot.get(metrics::LATENCY_MEAN_MS), Some(105.0));
    assert_eq!(snapshot.get(metrics::LATENCY_SAMPLES), Some(20.0));
    assert_eq!(snapshot.get(metrics::MESSAGE_COUNT), Some(40.0));
    assert_eq!(snapshot.get(metrics::DURATION_MS), Some(2_100.0));
    assert_eq!(snapshot.get("messages.alice"), Some(20.0));
}

#[test]
fn only_first_response_of_a_turn_is_a_latency_sample() {
    let mut events = events_for_latencies(&[30]);
    events.insert(2, RunEvent::ResponseReceived {
        turn_index: 0,
        content: "second reply".to_string(),
        offset_ms: 500,
    });
    let snapshot = collect(&events).finalize();
    assert_eq!(snapshot.get(metrics::RESPONSE_COUNT), Some(2.0));
    assert_eq!(snapshot.get(metrics::LATENCY_SAMPLES), Some(1.0));
    assert_eq!(snapshot.get(metrics::LATENCY_MAX_MS), Some(30.0));
}

#[test]
fn custom_pattern_hooks_count_matching_entries() {
    let mut collector = MetricsCollector::new();
    collector.add_hook(Box::new(
        PatternCountHook::new("apologies", "(?i)sorry", TranscriptScope::Responses).unwrap(),
    ));
    for event in events_for_latencies(&[5, 5]) {
        collector.observe(&event);
    }
    collector.observe(&RunEvent::ResponseReceived {
        turn_index: 1,
        content: "Sorry about that".to_string(),
        offset_ms: 20,
    });
    collector.observe(&RunEvent::InputSent {
        turn_index: 2,
        actor: "alice".to_string(),
        content: "sorry?".to_string(),
        offset_ms: 21,
    });
    assert_eq!(collector.finalize().get("apologies"), Some(1.0));
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    #[test]
    fn finalize_is_idempotent(latencies in prop::collection::vec(0u64 .. 10_000, 0 .. 64)) {
        let collector = collect(&events_for_latencies(&latencies));
        let first = collector.finalize();
        let second = collector.finalize();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn identical_events_yield_identical_statistics(
        latencies in prop::collection::vec(0u64 .. 10_000, 0 .. 64)
    ) {
        let events = events_for_latencies(&latencies);
        prop_assert_eq!(collect(&events).finalize(), collect(&events).finalize());
    }

    #[test]
    fn percentiles_are_ordered_and_bounded(
        latencies in prop::collection::vec(0u64 .. 10_000, 1 .. 64)
    ) {
        let snapshot = collect(&events_for_latencies(&latencies)).finalize();
        let p50 = snapshot.value_or_zero(metrics::LATENCY_P50_MS);
        let p95 = snapshot.value_or_zero(metrics::LATENCY_P95_MS);
        let max = snapshot.value_or_zero(metrics::LATENCY_MAX_MS);
        let mean = snapshot.value_or_zero(metrics::LATENCY_MEAN_MS);
        let min = latencies.iter().copied().min().unwrap_or(0) as f64;
        prop_assert!(p50 <= p95);
        prop_assert!(p95 <= max);
        prop_assert!(min <= p50);
        prop_assert!(mean >= min && mean <= max);
        prop_assert!(latencies.iter().any(|value| *value as f64 == p50));
    }
}
