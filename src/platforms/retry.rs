use backon::{ExponentialBuilder, Retryable};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use super::policy::{ErrorMapping, body_preview, classify_upstream_error};
use crate::error::{ApiError, IsRetryable};

/// Decodes a success body; a shape mismatch is a protocol error, never retried.
pub(crate) fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice::<T>(bytes).map_err(|e| {
        ApiError::UpstreamProtocol(format!("{e}; body: {}", body_preview(bytes)))
    })
}

/// Sends the request produced by `build`, classifying failures through `E` and retrying only
/// transient ones (network, 429, 5xx, platform throttling) under `policy`.
///
/// `build` is invoked once per attempt.
pub(crate) async fn send_with_retry<T, E, F>(
    platform: &'static str,
    policy: ExponentialBuilder,
    build: F,
) -> Result<T, ApiError>
where
    T: DeserializeOwned,
    E: ErrorMapping,
    F: Fn() -> reqwest::RequestBuilder,
{
    let build = &build;
    (move || async move {
        let resp = build().send().await.map_err(ApiError::from)?;
        let status = resp.status();
        let bytes = resp.bytes().await.map_err(ApiError::from)?;

        if status.is_success() {
            return decode_body::<T>(&bytes);
        }

        debug!(
            platform,
            %status,
            body = %body_preview(&bytes),
            "[{platform}] Upstream answered with an error status"
        );
        Err(classify_upstream_error::<E>(status, &bytes))
    })
    .retry(policy)
    .when(|e: &ApiError| e.is_retryable())
    .notify(|err: &ApiError, dur: Duration| {
        warn!(
            platform,
            error = %err,
            retry_in_ms = dur.as_millis() as u64,
            "[{platform}] Transient upstream failure, retrying"
        );
    })
    .await
}
