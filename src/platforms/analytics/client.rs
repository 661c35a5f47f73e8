use adsync_schema::{
    AnalyticsErrorBody, DateRange, ReportDimension, ReportMetric, ReportRow, RunReportRequest,
    RunReportResponse, ServiceTokenResponse,
};
use backon::ExponentialBuilder;
use chrono::Utc;
use futures::stream::{self, Stream, TryStreamExt};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use moka::sync::Cache;
use reqwest::StatusCode;
use serde::{Serialize, de::DeserializeOwned};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::ANALYTICS_USER_AGENT;
use super::service_account::{JWT_BEARER_GRANT, ServiceAccount, TokenErrorBody};
use crate::config::AnalyticsResolvedConfig;
use crate::error::{AdsyncError, ApiError};
use crate::platforms::policy::{ErrorMapping, error_from_status};
use crate::platforms::retry::send_with_retry;

/// Minted tokens live one hour; reuse them for a bit less.
const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(50 * 60);

impl ErrorMapping for AnalyticsErrorBody {
    fn try_match_rule(&self, status: StatusCode) -> Option<ApiError> {
        match self.error.status.as_deref() {
            Some("UNAUTHENTICATED" | "PERMISSION_DENIED") => Some(ApiError::CredentialExpired {
                message: self.error.message.clone(),
            }),
            Some("RESOURCE_EXHAUSTED") => Some(ApiError::UpstreamUnavailable {
                status: Some(status),
                message: self.error.message.clone(),
            }),
            _ => None,
        }
    }

    fn error_from_status(status: StatusCode, body: String) -> ApiError {
        if status == StatusCode::FORBIDDEN {
            return ApiError::CredentialExpired { message: body };
        }
        error_from_status(status, body)
    }
}

/// Analytics Data API client plus the service-account token exchange.
pub struct AnalyticsApi {
    client: reqwest::Client,
    cfg: AnalyticsResolvedConfig,
    retry_policy: ExponentialBuilder,
    limiter: DefaultKeyedRateLimiter<u64>,
    key_hasher: ahash::RandomState,
    tokens: Cache<String, String>,
}

impl AnalyticsApi {
    pub fn new(cfg: AnalyticsResolvedConfig) -> Result<Self, ApiError> {
        let client = cfg.transport.http_client(ANALYTICS_USER_AGENT)?;
        let rps = NonZeroU32::new(cfg.transport.requests_per_second.max(1)).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client,
            retry_policy: cfg.transport.retry_policy(),
            cfg,
            limiter: RateLimiter::keyed(Quota::per_second(rps)),
            key_hasher: ahash::RandomState::new(),
            tokens: Cache::builder()
                .max_capacity(1024)
                .time_to_live(ACCESS_TOKEN_TTL)
                .build(),
        })
    }

    pub fn config(&self) -> &AnalyticsResolvedConfig {
        &self.cfg
    }

    /// Access token for the service account, minted through the JWT-bearer grant and cached.
    pub async fn access_token(&self, account: &ServiceAccount) -> Result<String, AdsyncError> {
        if let Some(token) = self.tokens.get(&account.email) {
            return Ok(token);
        }

        let assertion = account.sign_assertion(self.cfg.token_url.as_str(), Utc::now())?;
        let token_url = self.cfg.token_url.clone();
        let resp: ServiceTokenResponse =
            send_with_retry::<_, TokenErrorBody, _>("analytics", self.retry_policy, || {
                self.client.post(token_url.clone()).form(&[
                    ("grant_type", JWT_BEARER_GRANT),
                    ("assertion", assertion.as_str()),
                ])
            })
            .await?;

        let token = resp
            .access_token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                ApiError::UpstreamProtocol("token endpoint answered without access_token".into())
            })?;

        info!(
            service_account = %account.email,
            expires_in = ?resp.expires_in,
            "[analytics] Minted service account access token"
        );
        self.tokens.insert(account.email.clone(), token.clone());
        Ok(token)
    }

    /// Forget a cached token, e.g. after the API rejected it.
    pub fn invalidate_token(&self, account: &ServiceAccount) {
        self.tokens.invalidate(&account.email);
    }

    /// Sessions per day over the trailing window, paged with `limit`/`offset` until `rowCount`.
    pub fn daily_sessions<'a>(
        &'a self,
        token: &'a str,
        property_id: &str,
    ) -> impl Stream<Item = Result<ReportRow, ApiError>> + Send + 'a {
        let url = self.report_url(property_id);
        let page_size = self.cfg.page_size;
        // Both ends are inclusive, so N days end at `(N-1)daysAgo`.
        let window = DateRange {
            start_date: format!("{}daysAgo", self.cfg.window_days.saturating_sub(1)),
            end_date: "today".to_string(),
        };

        stream::once(async move { url })
            .map_ok(move |url| {
                let window = window.clone();
                stream::try_unfold(Some(0u64), move |offset| {
                    let url = url.clone();
                    let window = window.clone();
                    async move {
                        let Some(offset) = offset else {
                            return Ok::<_, ApiError>(None);
                        };

                        let request = RunReportRequest {
                            date_ranges: vec![window],
                            dimensions: vec![ReportDimension {
                                name: "date".to_string(),
                            }],
                            metrics: vec![ReportMetric {
                                name: "sessions".to_string(),
                            }],
                            limit: Some(page_size),
                            offset: Some(offset),
                        };
                        let page: RunReportResponse = self.post_json(token, url, &request).await?;

                        let fetched = offset + page.rows.len() as u64;
                        let total = page.row_count.unwrap_or_default();
                        let next = (!page.rows.is_empty() && fetched < total).then_some(fetched);
                        debug!(offset, fetched, total, "[analytics] runReport page");

                        let rows = page.rows.into_iter().map(Ok::<ReportRow, ApiError>);
                        Ok(Some((stream::iter(rows), next)))
                    }
                })
                .try_flatten()
            })
            .try_flatten()
    }

    fn report_url(&self, property_id: &str) -> Result<Url, ApiError> {
        let id = property_id.trim().trim_start_matches("properties/");
        self.cfg
            .api_url
            .join(&format!("v1beta/properties/{id}:runReport"))
            .map_err(|e| ApiError::UpstreamProtocol(format!("invalid property id {id}: {e}")))
    }

    async fn post_json<B, T>(&self, token: &str, url: Url, body: &B) -> Result<T, ApiError>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        self.limiter
            .until_key_ready(&self.key_hasher.hash_one(token))
            .await;

        send_with_retry::<T, AnalyticsErrorBody, _>("analytics", self.retry_policy, || {
            self.client.post(url.clone()).bearer_auth(token).json(body)
        })
        .await
    }
}
