use reqwest::StatusCode;
use thiserror::Error as ThisError;

use super::IsRetryable;

/// Failures surfaced by the external platform clients.
#[derive(Debug, ThisError)]
pub enum ApiError {
    /// The stored credential was rejected; the integration needs re-authorization.
    #[error("Upstream credential expired or revoked: {message}")]
    CredentialExpired { message: String },

    /// Network failure, 5xx or throttling. Network and 5xx failures are retried before being
    /// surfaced; 4xx throttling (429, Graph rate-limit codes) is not.
    #[error("Upstream unavailable: {message}")]
    UpstreamUnavailable {
        status: Option<StatusCode>,
        message: String,
    },

    /// The upstream answered with a body that does not match the expected shape.
    #[error("Upstream protocol error: {0}")]
    UpstreamProtocol(String),

    /// Non-retriable 4xx other than an authorization failure.
    #[error("Upstream rejected request with status {status}: {body}")]
    UpstreamStatus { status: StatusCode, body: String },
}

impl ApiError {
    /// Short, stable reason code used in run summaries.
    pub fn reason(&self) -> &'static str {
        match self {
            ApiError::CredentialExpired { .. } => "credential_expired",
            ApiError::UpstreamUnavailable { .. } => "upstream_unavailable",
            ApiError::UpstreamProtocol(_) => "upstream_protocol",
            ApiError::UpstreamStatus { .. } => "upstream_status",
        }
    }

    pub(crate) fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::UpstreamProtocol(err.to_string())
        } else {
            ApiError::UpstreamUnavailable {
                status: err.status(),
                message: err.to_string(),
            }
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::from_transport(&err)
    }
}

impl IsRetryable for ApiError {
    fn is_retryable(&self) -> bool {
        match self {
            ApiError::UpstreamUnavailable { status, .. } => {
                status.is_none_or(|s| s.is_server_error())
            }
            _ => false,
        }
    }
}
