use crate::error::ApiError;
use crate::utils::logging::with_pretty_json_debug;
use reqwest::StatusCode;
use serde::{Serialize, de::DeserializeOwned};

pub const UPSTREAM_BODY_PREVIEW_CHARS: usize = 300;

pub(crate) fn body_preview(bytes: &[u8]) -> String {
    let raw = String::from_utf8_lossy(bytes);
    format!("{:.len$}", raw, len = UPSTREAM_BODY_PREVIEW_CHARS)
}

/// Platform error envelope that may carry a more precise classification than the status code.
pub(crate) trait ErrorMapping: std::fmt::Debug + DeserializeOwned + Serialize {
    fn try_match_rule(&self, status: StatusCode) -> Option<ApiError>;

    fn error_from_status(status: StatusCode, body: String) -> ApiError {
        error_from_status(status, body)
    }
}

/// 401 means the credential is gone; 429 and 5xx are transient; any other status is final.
/// Only the 5xx class is retried in place (see `ApiError::is_retryable`).
pub(crate) fn error_from_status(status: StatusCode, body: String) -> ApiError {
    if status == StatusCode::UNAUTHORIZED {
        return ApiError::CredentialExpired { message: body };
    }
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return ApiError::UpstreamUnavailable {
            status: Some(status),
            message: body,
        };
    }
    ApiError::UpstreamStatus { status, body }
}

pub(crate) fn classify_upstream_error<E>(status: StatusCode, bytes: &[u8]) -> ApiError
where
    E: ErrorMapping,
{
    if let Ok(error) = serde_json::from_slice::<E>(bytes) {
        if let Some(mapped) = error.try_match_rule(status) {
            with_pretty_json_debug(&error, |pretty_error| {
                tracing::debug!(
                    %status,
                    reason = mapped.reason(),
                    body = %pretty_error,
                    "Upstream structured error matched mapping rule"
                );
            });
            return mapped;
        }
    }

    let preview = body_preview(bytes);
    let mapped = E::error_from_status(status, preview.clone());
    tracing::debug!(
        %status,
        reason = mapped.reason(),
        body = %preview,
        "Upstream error mapped by status"
    );
    mapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IsRetryable;
    use adsync_schema::GraphErrorBody;
    use serde_json::json;

    #[test]
    fn status_fallback_classes() {
        assert!(matches!(
            error_from_status(StatusCode::UNAUTHORIZED, String::new()),
            ApiError::CredentialExpired { .. }
        ));
        assert!(matches!(
            error_from_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            ApiError::UpstreamUnavailable { .. }
        ));
        assert!(matches!(
            error_from_status(StatusCode::BAD_GATEWAY, String::new()),
            ApiError::UpstreamUnavailable { .. }
        ));
        assert!(matches!(
            error_from_status(StatusCode::NOT_FOUND, String::new()),
            ApiError::UpstreamStatus { .. }
        ));
    }

    #[test]
    fn graph_body_overrides_status() {
        let expired = json!({
            "error": { "message": "Session has expired", "type": "OAuthException", "code": 190 }
        })
        .to_string();
        let err = classify_upstream_error::<GraphErrorBody>(StatusCode::BAD_REQUEST, expired.as_bytes());
        assert_eq!(err.reason(), "credential_expired");

        let throttled = json!({
            "error": { "message": "User request limit reached", "type": "OAuthException", "code": 17 }
        })
        .to_string();
        let err =
            classify_upstream_error::<GraphErrorBody>(StatusCode::BAD_REQUEST, throttled.as_bytes());
        assert_eq!(err.reason(), "upstream_unavailable");
        assert!(!err.is_retryable(), "4xx throttling waits for the next pass");

        let other = json!({ "error": { "message": "Invalid parameter", "code": 100 } }).to_string();
        let err = classify_upstream_error::<GraphErrorBody>(StatusCode::BAD_REQUEST, other.as_bytes());
        assert_eq!(err.reason(), "upstream_status");
    }

    #[test]
    fn oauth_exception_without_token_code_keeps_the_credential() {
        let invalid_param = json!({
            "error": { "message": "Invalid parameter", "type": "OAuthException", "code": 100 }
        })
        .to_string();
        let err = classify_upstream_error::<GraphErrorBody>(
            StatusCode::BAD_REQUEST,
            invalid_param.as_bytes(),
        );
        assert_eq!(err.reason(), "upstream_status");
        assert!(!err.is_retryable());
    }

    #[test]
    fn unstructured_body_is_previewed() {
        let body = "x".repeat(UPSTREAM_BODY_PREVIEW_CHARS * 2);
        match classify_upstream_error::<GraphErrorBody>(StatusCode::BAD_REQUEST, body.as_bytes()) {
            ApiError::UpstreamStatus { body, .. } => {
                assert_eq!(body.len(), UPSTREAM_BODY_PREVIEW_CHARS);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
