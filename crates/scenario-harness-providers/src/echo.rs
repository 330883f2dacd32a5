// crates/scenario-harness-providers/src/echo.rs
// ============================================================================
// Module: Echo Runtime
// Description: In-process agent runtime that echoes every input.
// Purpose: Dry-run scenario files without a real agent.
// Dependencies: scenario-harness-core, tokio
// ============================================================================

//! ## Overview
//! [`EchoRuntime`] answers each scripted input with its own content, sent from
//! the environment's agent identity and tagged with the input's sequence.
//! It exercises the full driver path (subscription, send, wait conditions)
//! without any network.

use async_trait::async_trait;
use scenario_harness_core::AgentResponse;
use scenario_harness_core::AgentRuntime;
use scenario_harness_core::Environment;
use scenario_harness_core::OutboundMessage;
use scenario_harness_core::RuntimeError;
use tokio::sync::mpsc;

use crate::subscriptions::SubscriptionTable;

/// Agent runtime that replies with the content it receives.
#[derive(Default)]
pub struct EchoRuntime {
    /// Open response channels.
    subscriptions: SubscriptionTable,
}

impl EchoRuntime {
    /// Creates an echo runtime with no subscriptions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentRuntime for EchoRuntime {
    async fn subscribe(
        &self,
        environment: &Environment,
    ) -> Result<mpsc::Receiver<AgentResponse>, RuntimeError> {
        self.subscriptions.open(&environment.environment_id)
    }

    async fn send(
        &self,
        environment: &Environment,
        message: &OutboundMessage,
    ) -> Result<(), RuntimeError> {
        self.subscriptions.deliver(&environment.environment_id, AgentResponse {
            agent_id: environment.agent_id.clone(),
            content: message.content.clone(),
            in_reply_to: Some(message.sequence),
        })
    }

    async fn detach(&self, environment: &Environment) {
        self.subscriptions.close(&environment.environment_id);
    }
}
