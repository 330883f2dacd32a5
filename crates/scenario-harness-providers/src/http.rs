// crates/scenario-harness-providers/src/http.rs
// ============================================================================
// Module: HTTP Agent Runtime
// Description: Agent runtime adapter that forwards inputs over HTTP.
// Purpose: Drive a remote conversational agent with scripted turns.
// Dependencies: scenario-harness-core, reqwest, serde, serde_json
// ============================================================================

//! ## Overview
//! Every scripted input becomes one `POST {endpoint}/messages` request. The
//! JSON reply lists the agent's responses, which are forwarded into the
//! environment's subscription stamped with the environment's agent identity
//! and the input's sequence number. Redirects are disabled and reply bodies
//! are size-limited.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::Url;
use reqwest::redirect::Policy;
use scenario_harness_core::AgentResponse;
use scenario_harness_core::AgentRuntime;
use scenario_harness_core::Environment;
use scenario_harness_core::OutboundMessage;
use scenario_harness_core::RuntimeError;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::ProviderError;
use crate::parse_endpoint;
use crate::read_body_limited;
use crate::subscriptions::SubscriptionTable;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the HTTP agent runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRuntimeConfig {
    /// Base URL of the runtime.
    pub endpoint: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum reply size allowed, in bytes.
    pub max_response_bytes: usize,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl HttpRuntimeConfig {
    /// Creates a configuration with default limits for the endpoint.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout_ms: 30_000,
            max_response_bytes: 1024 * 1024,
            user_agent: "scenario-harness/0.1".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Request body for one scripted input.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageRequest<'a> {
    /// Agent identity owned by the environment.
    agent_id: &'a str,
    /// Environment identifier.
    environment_id: &'a str,
    /// Scenario identifier.
    scenario_id: &'a str,
    /// Sending actor.
    actor_id: &'a str,
    /// Persona reference of the sending actor.
    #[serde(skip_serializing_if = "Option::is_none")]
    persona: Option<&'a str>,
    /// Message content.
    content: &'a str,
    /// Transcript sequence number.
    sequence: u64,
    /// Zero-based turn index.
    turn_index: usize,
}

/// Reply body listing the agent's responses.
#[derive(Debug, Deserialize)]
struct MessageReply {
    /// Responses produced for the input.
    #[serde(default)]
    responses: Vec<ReplyEntry>,
}

/// One agent response in a reply.
#[derive(Debug, Deserialize)]
struct ReplyEntry {
    /// Response content.
    content: String,
}

// ============================================================================
// SECTION: Runtime
// ============================================================================

/// Agent runtime reached over HTTP.
pub struct HttpAgentRuntime {
    /// Resolved `{endpoint}/messages` URL.
    messages_url: Url,
    /// Reply size limit.
    max_response_bytes: usize,
    /// HTTP client used for outbound requests.
    client: Client,
    /// Open response channels.
    subscriptions: SubscriptionTable,
}

impl HttpAgentRuntime {
    /// Creates an HTTP agent runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the endpoint is invalid or the HTTP
    /// client cannot be created.
    pub fn new(config: &HttpRuntimeConfig) -> Result<Self, ProviderError> {
        let base = parse_endpoint(&config.endpoint)?;
        let messages_url = join_path(&base, "messages")?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|err| ProviderError::Client(err.to_string()))?;
        Ok(Self {
            messages_url,
            max_response_bytes: config.max_response_bytes,
            client,
            subscriptions: SubscriptionTable::default(),
        })
    }

    /// Returns the URL inputs are posted to.
    #[must_use]
    pub const fn messages_url(&self) -> &Url {
        &self.messages_url
    }
}

#[async_trait]
impl AgentRuntime for HttpAgentRuntime {
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
        if !self.subscriptions.contains(&environment.environment_id) {
            return Err(RuntimeError::Send(format!(
                "environment {} has no subscriber",
                environment.environment_id
            )));
        }
        let body = MessageRequest {
            agent_id: environment.agent_id.as_str(),
            environment_id: environment.environment_id.as_str(),
            scenario_id: environment.scenario_id.as_str(),
            actor_id: message.actor_id.as_str(),
            persona: message.persona.as_deref(),
            content: &message.content,
            sequence: message.sequence,
            turn_index: message.turn_index,
        };
        let response = self
            .client
            .post(self.messages_url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|err| RuntimeError::Send(format!("http request failed: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(RuntimeError::Send(format!("runtime returned status {}", status.as_u16())));
        }
        let bytes = read_body_limited(response, self.max_response_bytes)
            .await
            .map_err(RuntimeError::Send)?;
        let reply: MessageReply = serde_json::from_slice(&bytes)
            .map_err(|err| RuntimeError::Send(format!("invalid runtime reply: {err}")))?;
        for entry in reply.responses {
            self.subscriptions.deliver(&environment.environment_id, AgentResponse {
                agent_id: environment.agent_id.clone(),
                content: entry.content,
                in_reply_to: Some(message.sequence),
            })?;
        }
        Ok(())
    }

    async fn detach(&self, environment: &Environment) {
        self.subscriptions.close(&environment.environment_id);
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Appends a path segment to a base URL, keeping any existing prefix.
fn join_path(base: &Url, segment: &str) -> Result<Url, ProviderError> {
    let mut url = base.clone();
    {
        let mut segments = url.path_segments_mut().map_err(|()| {
            ProviderError::InvalidEndpoint("endpoint cannot be a base url".to_string())
        })?;
        segments.pop_if_empty().push(segment);
    }
    Ok(url)
}
