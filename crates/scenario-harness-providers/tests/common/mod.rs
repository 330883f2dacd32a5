// crates/scenario-harness-providers/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Shared environments and stub HTTP servers for adapter tests.
// Purpose: Provide reusable, deterministic test infrastructure.
// ============================================================================

//! ## Overview
//! Fixtures for building environments and outbound messages, plus a
//! `tiny_http` stub server that replays canned replies and records the
//! request bodies it received.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::thread;

use scenario_harness_core::ActorId;
use scenario_harness_core::AgentId;
use scenario_harness_core::Environment;
use scenario_harness_core::EnvironmentId;
use scenario_harness_core::OutboundMessage;
use scenario_harness_core::ScenarioId;
use tiny_http::Response;
use tiny_http::Server;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Creates an environment with a deterministic agent identity.
#[must_use]
pub fn sample_environment(id: &str) -> Environment {
    Environment {
        environment_id: EnvironmentId::new(id),
        scenario_id: ScenarioId::new("greeting"),
        agent_id: AgentId::new(format!("agent-{id}")),
        workdir: PathBuf::from("/tmp/unused"),
        plugins: Vec::new(),
    }
}

/// Creates an outbound message from `alice`.
#[must_use]
pub fn sample_message(sequence: u64, content: &str) -> OutboundMessage {
    OutboundMessage {
        sequence,
        turn_index: 0,
        actor_id: ActorId::new("alice"),
        persona: Some("curious user".to_string()),
        content: content.to_string(),
    }
}

// ============================================================================
// SECTION: Stub Server
// ============================================================================

/// Request captured by the stub server.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    /// Request path.
    pub url: String,
    /// Request body.
    pub body: String,
}

/// Spawns a server answering each request with the next canned reply.
pub fn spawn_server(
    replies: Vec<(u16, &'static str)>,
) -> (String, thread::JoinHandle<Vec<CapturedRequest>>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let url = format!("http://{addr}");
    let handle = thread::spawn(move || {
        let mut captured = Vec::new();
        for (status, body) in replies {
            let Ok(mut request) = server.recv() else {
                break;
            };
            let mut received = String::new();
            let _ = request.as_reader().read_to_string(&mut received);
            captured.push(CapturedRequest {
                url: request.url().to_string(),
                body: received,
            });
            let response = Response::from_string(body).with_status_code(status);
            let _ = request.respond(response);
        }
        captured
    });
    (url, handle)
}
