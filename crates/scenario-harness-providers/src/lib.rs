// crates/scenario-harness-providers/src/lib.rs
// ============================================================================
// Module: Scenario Harness Providers
// Description: Built-in agent runtime and model grader adapters.
// Purpose: Connect the harness engine to concrete collaborators.
// Dependencies: scenario-harness-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! This crate provides the adapters the command line wires into a suite run:
//! an in-process echo runtime for dry runs, an HTTP agent runtime, an HTTP
//! model grader, and a grader that always reports grading as unavailable.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod echo;
pub mod grader;
pub mod http;
mod subscriptions;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use echo::EchoRuntime;
pub use grader::HttpGraderConfig;
pub use grader::HttpModelGrader;
pub use grader::UnavailableGrader;
pub use http::HttpAgentRuntime;
pub use http::HttpRuntimeConfig;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Adapter construction errors.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Endpoint URL is malformed or uses an unsupported scheme.
    #[error("invalid provider endpoint: {0}")]
    InvalidEndpoint(String),
    /// HTTP client could not be built.
    #[error("provider client error: {0}")]
    Client(String),
}

/// Parses and checks an endpoint URL.
pub(crate) fn parse_endpoint(endpoint: &str) -> Result<reqwest::Url, ProviderError> {
    let url = reqwest::Url::parse(endpoint.trim())
        .map_err(|err| ProviderError::InvalidEndpoint(err.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ProviderError::InvalidEndpoint(format!("unsupported scheme {other}")));
        }
    }
    if url.host_str().is_none() {
        return Err(ProviderError::InvalidEndpoint("endpoint host required".to_string()));
    }
    Ok(url)
}

/// Reads a response body while enforcing a byte limit.
pub(crate) async fn read_body_limited(
    mut response: reqwest::Response,
    max_bytes: usize,
) -> Result<Vec<u8>, String> {
    if let Some(expected) = response.content_length()
        && u64::try_from(max_bytes).is_ok_and(|max_bytes| expected > max_bytes)
    {
        return Err("response exceeds size limit".to_string());
    }
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(|err| err.to_string())? {
        if body.len().saturating_add(chunk.len()) > max_bytes {
            return Err("response exceeds size limit".to_string());
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
