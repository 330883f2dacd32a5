// crates/scenario-harness-providers/src/grader.rs
// ============================================================================
// Module: Model Graders
// Description: HTTP model grader and the unavailable grader.
// Purpose: Resolve model-graded rules against a configured grading backend.
// Dependencies: scenario-harness-core, reqwest, serde, serde_json
// ============================================================================

//! ## Overview
//! [`HttpModelGrader`] posts one grading request per call and maps transport
//! outcomes onto the retry taxonomy: throttling is `RateLimited`, server
//! failures and connection problems are `Transient`, client deadlines are
//! `Timeout`, and anything else is `Fatal`. [`UnavailableGrader`] stands in
//! when no grader is configured.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::redirect::Policy;
use scenario_harness_core::GradeResponse;
use scenario_harness_core::GradingError;
use scenario_harness_core::GradingRequest;
use scenario_harness_core::ModelGrader;
use serde::Deserialize;
use serde::Serialize;

use crate::ProviderError;
use crate::parse_endpoint;
use crate::read_body_limited;

// ============================================================================
// SECTION: Unavailable Grader
// ============================================================================

/// Grader used when grading is disabled; every call fails fatally.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableGrader;

#[async_trait]
impl ModelGrader for UnavailableGrader {
    async fn grade(&self, _request: &GradingRequest) -> Result<GradeResponse, GradingError> {
        Err(GradingError::Fatal("grading is not configured".to_string()))
    }
}

// ============================================================================
// SECTION: HTTP Grader
// ============================================================================

/// Configuration for the HTTP model grader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpGraderConfig {
    /// Grading endpoint URL.
    pub endpoint: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum reply size allowed, in bytes.
    pub max_response_bytes: usize,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl HttpGraderConfig {
    /// Creates a configuration with default limits for the endpoint.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout_ms: 20_000,
            max_response_bytes: 256 * 1024,
            user_agent: "scenario-harness/0.1".to_string(),
        }
    }
}

/// Request body sent to the grading backend.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GradeBody<'a> {
    /// Scenario identifier.
    scenario_id: &'a str,
    /// Rule identifier.
    rule_id: &'a str,
    /// Grading criterion.
    criterion: &'a str,
    /// Bounded transcript excerpt.
    transcript_excerpt: &'a str,
    /// Whether older entries were omitted.
    truncated: bool,
}

/// Reply body from the grading backend.
#[derive(Debug, Deserialize)]
struct GradeReply {
    /// Confidence the criterion holds.
    confidence: f64,
    /// Model rationale.
    #[serde(default)]
    rationale: String,
}

/// Model grader reached over HTTP.
pub struct HttpModelGrader {
    /// Grading endpoint.
    endpoint: Url,
    /// Reply size limit.
    max_response_bytes: usize,
    /// HTTP client used for outbound requests.
    client: Client,
}

impl HttpModelGrader {
    /// Creates an HTTP model grader.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the endpoint is invalid or the HTTP
    /// client cannot be created.
    pub fn new(config: &HttpGraderConfig) -> Result<Self, ProviderError> {
        let endpoint = parse_endpoint(&config.endpoint)?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|err| ProviderError::Client(err.to_string()))?;
        Ok(Self {
            endpoint,
            max_response_bytes: config.max_response_bytes,
            client,
        })
    }
}

#[async_trait]
impl ModelGrader for HttpModelGrader {
    async fn grade(&self, request: &GradingRequest) -> Result<GradeResponse, GradingError> {
        let body = GradeBody {
            scenario_id: request.scenario_id.as_str(),
            rule_id: request.rule_id.as_str(),
            criterion: &request.criterion,
            transcript_excerpt: &request.transcript_excerpt,
            truncated: request.truncated,
        };
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|err| classify_transport_error(&err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status));
        }
        let bytes = read_body_limited(response, self.max_response_bytes)
            .await
            .map_err(GradingError::Transient)?;
        let reply: GradeReply = serde_json::from_slice(&bytes)
            .map_err(|err| GradingError::Fatal(format!("invalid grading reply: {err}")))?;
        Ok(GradeResponse {
            confidence: reply.confidence,
            rationale: reply.rationale,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps a non-success status onto the grading error taxonomy.
fn classify_status(status: StatusCode) -> GradingError {
    let code = status.as_u16();
    if status == StatusCode::TOO_MANY_REQUESTS {
        GradingError::RateLimited(format!("grader returned status {code}"))
    } else if status.is_server_error() {
        GradingError::Transient(format!("grader returned status {code}"))
    } else {
        GradingError::Fatal(format!("grader returned status {code}"))
    }
}

/// Maps a transport failure onto the grading error taxonomy.
fn classify_transport_error(err: &reqwest::Error) -> GradingError {
    if err.is_timeout() {
        GradingError::Timeout(err.to_string())
    } else if err.is_connect() || err.is_request() {
        GradingError::Transient(err.to_string())
    } else {
        GradingError::Fatal(err.to_string())
    }
}
