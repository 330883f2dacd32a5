// crates/scenario-harness-providers/tests/runtime_adapters.rs
// ============================================================================
// Module: Agent Runtime Adapter Tests
// Description: Tests for the echo and HTTP agent runtimes.
// Purpose: Validate response routing, wire format, and failure reporting.
// ============================================================================

//! ## Overview
//! Exercises subscription routing for the echo runtime and the request and
//! reply contract of the HTTP runtime against a local stub server.

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
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use scenario_harness_core::AgentRuntime;
use scenario_harness_core::RuntimeError;
use scenario_harness_providers::EchoRuntime;
use scenario_harness_providers::HttpAgentRuntime;
use scenario_harness_providers::HttpRuntimeConfig;
use scenario_harness_providers::ProviderError;
use serde_json::Value;

use crate::common::sample_environment;
use crate::common::sample_message;
use crate::common::spawn_server;

// ============================================================================
// SECTION: Echo Runtime
// ============================================================================

#[tokio::test]
async fn echo_runtime_replies_from_environment_agent() {
    let runtime = EchoRuntime::new();
    let environment = sample_environment("env-1");
    let mut receiver = runtime.subscribe(&environment).await.unwrap();
    runtime.send(&environment, &sample_message(4, "hello")).await.unwrap();
    let response = receiver.recv().await.unwrap();
    assert_eq!(response.agent_id, environment.agent_id);
    assert_eq!(response.content, "hello");
    assert_eq!(response.in_reply_to, Some(4));
}

#[tokio::test]
async fn echo_runtime_keeps_environments_apart() {
    let runtime = EchoRuntime::new();
    let first = sample_environment("env-1");
    let second = sample_environment("env-2");
    let mut first_rx = runtime.subscribe(&first).await.unwrap();
    let mut second_rx = runtime.subscribe(&second).await.unwrap();
    runtime.send(&second, &sample_message(1, "for two")).await.unwrap();
    assert_eq!(second_rx.recv().await.unwrap().content, "for two");
    assert!(first_rx.try_recv().is_err());
}

#[tokio::test]
async fn echo_runtime_rejects_sends_after_detach() {
    let runtime = EchoRuntime::new();
    let environment = sample_environment("env-1");
    let _receiver = runtime.subscribe(&environment).await.unwrap();
    runtime.detach(&environment).await;
    let err = runtime.send(&environment, &sample_message(1, "late")).await.unwrap_err();
    assert!(matches!(err, RuntimeError::Send(message) if message.contains("no subscriber")));
}

// ============================================================================
// SECTION: HTTP Runtime
// ============================================================================

#[test]
fn http_runtime_rejects_unsupported_scheme() {
    let result = HttpAgentRuntime::new(&HttpRuntimeConfig::new("ftp://agents.local"));
    assert!(matches!(result, Err(ProviderError::InvalidEndpoint(_))));
}

#[test]
fn http_runtime_appends_messages_path() {
    let runtime = HttpAgentRuntime::new(&HttpRuntimeConfig::new("http://agents.local/api/")).unwrap();
    assert_eq!(runtime.messages_url().as_str(), "http://agents.local/api/messages");
}

#[tokio::test(flavor = "multi_thread")]
async fn http_runtime_posts_input_and_forwards_responses() {
    let (url, handle) =
        spawn_server(vec![(200, r#"{"responses":[{"content":"hi"},{"content":"there"}]}"#)]);
    let runtime = HttpAgentRuntime::new(&HttpRuntimeConfig::new(url)).unwrap();
    let environment = sample_environment("env-1");
    let mut receiver = runtime.subscribe(&environment).await.unwrap();
    runtime.send(&environment, &sample_message(7, "hello")).await.unwrap();

    let first = receiver.recv().await.unwrap();
    let second = receiver.recv().await.unwrap();
    assert_eq!(first.content, "hi");
    assert_eq!(second.content, "there");
    assert_eq!(second.agent_id, environment.agent_id);
    assert_eq!(second.in_reply_to, Some(7));

    let captured = handle.join().unwrap();
    assert_eq!(captured[0].url, "/messages");
    let body: Value = serde_json::from_str(&captured[0].body).unwrap();
    assert_eq!(body["agentId"], "agent-env-1");
    assert_eq!(body["environmentId"], "env-1");
    assert_eq!(body["actorId"], "alice");
    assert_eq!(body["content"], "hello");
    assert_eq!(body["sequence"], 7);
}

#[tokio::test(flavor = "multi_thread")]
async fn http_runtime_reports_error_status_as_send_failure() {
    let (url, handle) = spawn_server(vec![(503, "busy")]);
    let runtime = HttpAgentRuntime::new(&HttpRuntimeConfig::new(url)).unwrap();
    let environment = sample_environment("env-1");
    let _receiver = runtime.subscribe(&environment).await.unwrap();
    let err = runtime.send(&environment, &sample_message(1, "hello")).await.unwrap_err();
    assert!(err.to_string().contains("status 503"));
    handle.join().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn http_runtime_rejects_malformed_reply() {
    let (url, handle) = spawn_server(vec![(200, "not json")]);
    let runtime = HttpAgentRuntime::new(&HttpRuntimeConfig::new(url)).unwrap();
    let environment = sample_environment("env-1");
    let _receiver = runtime.subscribe(&environment).await.unwrap();
    let err = runtime.send(&environment, &sample_message(1, "hello")).await.unwrap_err();
    assert!(err.to_string().contains("invalid runtime reply"));
    handle.join().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn http_runtime_enforces_reply_size_limit() {
    let (url, handle) = spawn_server(vec![(200, r#"{"responses":[{"content":"far too long"}]}"#)]);
    let mut config = HttpRuntimeConfig::new(url);
    config.max_response_bytes = 8;
    let runtime = HttpAgentRuntime::new(&config).unwrap();
    let environment = sample_environment("env-1");
    let _receiver = runtime.subscribe(&environment).await.unwrap();
    let err = runtime.send(&environment, &sample_message(1, "hello")).await.unwrap_err();
    assert!(err.to_string().contains("size limit"));
    handle.join().unwrap();
}
