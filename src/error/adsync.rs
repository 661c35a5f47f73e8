use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error as ThisError;

use super::api::ApiError;
use super::exchange::ExchangeError;

#[derive(Debug, ThisError)]
pub enum AdsyncError {
    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Service account error: {0}")]
    ServiceAccount(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Sync already in progress for {0}")]
    SyncInProgress(&'static str),

    #[error("Ractor error: {0}")]
    RactorError(String),

    #[error("Unexpected error: {0}")]
    UnexpectedError(String),
}

impl From<jsonwebtoken::errors::Error> for AdsyncError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        AdsyncError::ServiceAccount(e.to_string())
    }
}

impl AdsyncError {
    /// Short reason code used in run summaries.
    pub fn reason(&self) -> &'static str {
        match self {
            AdsyncError::Api(e) => e.reason(),
            AdsyncError::Exchange(ExchangeError::InvalidRequest(_)) => "invalid_request",
            AdsyncError::Exchange(ExchangeError::UpstreamAuth { .. }) => "upstream_auth",
            AdsyncError::Persistence(_) => "persistence",
            AdsyncError::ServiceAccount(_) => "service_account",
            AdsyncError::JsonError(_) | AdsyncError::UrlError(_) => "invalid_data",
            AdsyncError::NotFound(_) => "not_found",
            AdsyncError::SyncInProgress(_) => "sync_in_progress",
            AdsyncError::RactorError(_) | AdsyncError::UnexpectedError(_) => "internal",
        }
    }
}

impl IntoResponse for AdsyncError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            AdsyncError::Exchange(ExchangeError::InvalidRequest(message)) => (
                StatusCode::BAD_REQUEST,
                ApiErrorBody::new(message, None),
            ),

            AdsyncError::Exchange(ExchangeError::UpstreamAuth { status, body }) => (
                StatusCode::BAD_GATEWAY,
                ApiErrorBody::new(
                    "Failed to exchange authorization code".to_string(),
                    Some(json!({ "upstream_status": status, "upstream_body": body })),
                ),
            ),

            AdsyncError::Api(ApiError::CredentialExpired { message }) => (
                StatusCode::BAD_GATEWAY,
                ApiErrorBody::new(
                    "Upstream credential expired or revoked".to_string(),
                    Some(Value::String(message)),
                ),
            ),

            AdsyncError::Api(ApiError::UpstreamUnavailable { .. }) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiErrorBody::new("Upstream service unavailable.".to_string(), None),
            ),

            AdsyncError::Api(ApiError::UpstreamProtocol(_) | ApiError::UpstreamStatus { .. }) => (
                StatusCode::BAD_GATEWAY,
                ApiErrorBody::new("Upstream service error.".to_string(), None),
            ),

            AdsyncError::ServiceAccount(message) => (
                StatusCode::BAD_REQUEST,
                ApiErrorBody::new(format!("Invalid service account: {message}"), None),
            ),

            AdsyncError::NotFound(message) => {
                (StatusCode::NOT_FOUND, ApiErrorBody::new(message, None))
            }

            AdsyncError::SyncInProgress(platform) => (
                StatusCode::CONFLICT,
                ApiErrorBody::new(format!("A {platform} sync is already running"), None),
            ),

            AdsyncError::Persistence(_)
            | AdsyncError::JsonError(_)
            | AdsyncError::UrlError(_)
            | AdsyncError::RactorError(_)
            | AdsyncError::UnexpectedError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorBody::new("An internal server error occurred.".to_string(), None),
            ),
        };
        (status, Json(body)).into_response()
    }
}

/// Standardized failure payload: `{"success": false, "error": "...", "details": ...}`.
#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiErrorBody {
    pub fn new(error: String, details: Option<Value>) -> Self {
        Self {
            success: false,
            error,
            details,
        }
    }
}
