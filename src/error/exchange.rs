use serde_json::Value;
use thiserror::Error as ThisError;

/// Failures of the authorization-code exchange flow.
#[derive(Debug, ThisError)]
pub enum ExchangeError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Token endpoint answered with a non-success status or without an access token.
    /// `body` carries the upstream payload for diagnostics.
    #[error("Upstream authorization failed with status {status}")]
    UpstreamAuth { status: u16, body: Value },
}

impl ExchangeError {
    pub(crate) fn missing_fields(fields: &[&str]) -> Self {
        ExchangeError::InvalidRequest(format!("missing required fields: {}", fields.join(", ")))
    }
}
