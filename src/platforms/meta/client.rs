use adsync_schema::{
    GraphAccount, GraphCampaign, GraphErrorBody, GraphIdentity, GraphInsight, GraphPage,
    InsightFilter,
};
use backon::ExponentialBuilder;
use chrono::{Duration as ChronoDuration, Utc};
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::num::NonZeroU32;
use tracing::debug;
use url::Url;

use super::META_USER_AGENT;
use crate::config::MetaResolvedConfig;
use crate::error::ApiError;
use crate::platforms::policy::ErrorMapping;
use crate::platforms::retry::send_with_retry;

const CAMPAIGN_FIELDS: &str =
    "id,name,status,effective_status,objective,daily_budget,lifetime_budget,start_time,stop_time";
const INSIGHT_FIELDS: &str =
    "campaign_id,date_start,date_stop,spend,impressions,clicks,ctr,cpc,cpm,reach,purchase_roas,action_values";
const AD_ACCOUNT_FIELDS: &str = "id,account_id,name,currency,account_status";

/// Window lengths the insights endpoint accepts as `date_preset=last_{N}d`.
const DATE_PRESET_DAYS: [u32; 6] = [3, 7, 14, 28, 30, 90];

impl ErrorMapping for GraphErrorBody {
    fn try_match_rule(&self, status: StatusCode) -> Option<ApiError> {
        if self.error.is_throttled() {
            return Some(ApiError::UpstreamUnavailable {
                status: Some(status),
                message: self.error.message.clone(),
            });
        }
        if self.error.is_invalid_token() {
            return Some(ApiError::CredentialExpired {
                message: self.error.message.clone(),
            });
        }
        None
    }
}

/// Graph API client. Holds no credentials; every call is made on behalf of the token passed in.
pub struct MetaApi {
    pub(super) client: reqwest::Client,
    pub(super) cfg: MetaResolvedConfig,
    retry_policy: ExponentialBuilder,
    limiter: DefaultKeyedRateLimiter<u64>,
    key_hasher: ahash::RandomState,
}

impl MetaApi {
    pub fn new(cfg: MetaResolvedConfig) -> Result<Self, ApiError> {
        let client = cfg.transport.http_client(META_USER_AGENT)?;
        let rps = NonZeroU32::new(cfg.transport.requests_per_second.max(1)).unwrap_or(NonZeroU32::MIN);
        let limiter = RateLimiter::keyed(Quota::per_second(rps));

        Ok(Self {
            client,
            retry_policy: cfg.transport.retry_policy(),
            cfg,
            limiter,
            key_hasher: ahash::RandomState::new(),
        })
    }

    pub fn config(&self) -> &MetaResolvedConfig {
        &self.cfg
    }

    pub(super) fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.cfg
            .graph_api_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::UpstreamProtocol(format!("invalid Graph API path {path}: {e}")))
    }

    /// Throttles per credential, then performs a retried GET.
    async fn get_json<T: DeserializeOwned>(&self, token: &str, url: Url) -> Result<T, ApiError> {
        self.limiter
            .until_key_ready(&self.key_hasher.hash_one(token))
            .await;
        debug!(url = %url.path(), "[meta] GET");

        send_with_retry::<T, GraphErrorBody, _>("meta", self.retry_policy, || {
            self.client.get(url.clone()).bearer_auth(token)
        })
        .await
    }

    /// Follows `paging.next` until exhausted. The first error ends the stream.
    fn paginate<'a, T>(
        &'a self,
        token: &'a str,
        first: Url,
    ) -> impl Stream<Item = Result<T, ApiError>> + Send + 'a
    where
        T: DeserializeOwned + Send + 'a,
    {
        stream::try_unfold(Some(first), move |next| async move {
            let Some(url) = next else {
                return Ok::<_, ApiError>(None);
            };

            let page: GraphPage<T> = self.get_json(token, url.clone()).await?;
            let next = match page.next_url() {
                Some(raw) => {
                    let parsed = Url::parse(raw).map_err(|e| {
                        ApiError::UpstreamProtocol(format!("invalid paging.next url: {e}"))
                    })?;
                    // A cursor that points back at the same page would loop forever.
                    (parsed != url).then_some(parsed)
                }
                None => None,
            };

            let items = page.data.into_iter().map(Ok::<T, ApiError>);
            Ok(Some((stream::iter(items), next)))
        })
        .try_flatten()
    }

    /// `/me?fields=id,name`.
    pub async fn me(&self, token: &str) -> Result<GraphIdentity, ApiError> {
        let mut url = self.endpoint("me")?;
        url.query_pairs_mut().append_pair("fields", "id,name");
        self.get_json(token, url).await
    }

    /// All ad accounts visible to the token (`/me/adaccounts`).
    pub async fn ad_accounts(&self, token: &str) -> Result<Vec<GraphAccount>, ApiError> {
        let mut url = self.endpoint("me/adaccounts")?;
        url.query_pairs_mut()
            .append_pair("fields", AD_ACCOUNT_FIELDS)
            .append_pair("limit", &self.cfg.page_size.to_string());
        self.paginate(token, url).try_collect().await
    }

    /// Lazy campaign listing of one ad account.
    pub fn campaigns<'a>(
        &'a self,
        token: &'a str,
        ad_account_id: &str,
    ) -> impl Stream<Item = Result<GraphCampaign, ApiError>> + Send + 'a {
        let first = self.endpoint(&format!("{ad_account_id}/campaigns")).map(|mut url| {
            url.query_pairs_mut()
                .append_pair("fields", CAMPAIGN_FIELDS)
                .append_pair("limit", &self.cfg.page_size.to_string());
            url
        });

        stream::once(async move { first })
            .map_ok(move |url| self.paginate(token, url))
            .try_flatten()
    }

    /// Daily campaign-level insights over the trailing window for exactly `campaign_ids`.
    ///
    /// Ids are requested in chunks of `insights_chunk_size`; chunks are fetched sequentially.
    pub fn campaign_insights<'a>(
        &'a self,
        token: &'a str,
        ad_account_id: &'a str,
        campaign_ids: &[String],
    ) -> impl Stream<Item = Result<GraphInsight, ApiError>> + Send + 'a {
        let chunks: Vec<Vec<String>> = campaign_ids
            .chunks(self.cfg.insights_chunk_size.max(1))
            .map(<[String]>::to_vec)
            .collect();

        stream::iter(chunks)
            .map(move |chunk| self.insights_url(ad_account_id, &chunk))
            .map_ok(move |url| self.paginate(token, url))
            .try_flatten()
    }

    /// Daily insights of a single campaign (`/{campaign_id}/insights`).
    pub async fn single_campaign_insights(
        &self,
        token: &str,
        campaign_id: &str,
    ) -> Result<Vec<GraphInsight>, ApiError> {
        let mut url = self.endpoint(&format!("{campaign_id}/insights"))?;
        self.apply_window(&mut url);
        url.query_pairs_mut()
            .append_pair("time_increment", "1")
            .append_pair("fields", INSIGHT_FIELDS);
        self.paginate(token, url).try_collect().await
    }

    fn insights_url(&self, ad_account_id: &str, campaign_ids: &[String]) -> Result<Url, ApiError> {
        let filtering = serde_json::to_string(&[InsightFilter::campaign_ids_in(
            campaign_ids.iter().cloned(),
        )])
        .map_err(|e| ApiError::UpstreamProtocol(format!("insight filter encode failed: {e}")))?;

        let mut url = self.endpoint(&format!("{ad_account_id}/insights"))?;
        url.query_pairs_mut()
            .append_pair("level", "campaign")
            .append_pair("time_increment", "1")
            .append_pair("filtering", &filtering)
            .append_pair("fields", INSIGHT_FIELDS)
            .append_pair("limit", &self.cfg.page_size.to_string());
        self.apply_window(&mut url);
        Ok(url)
    }

    /// `date_preset` when the window has a preset, an explicit `time_range` otherwise.
    fn apply_window(&self, url: &mut Url) {
        let days = self.cfg.insights_window_days.max(1);
        if DATE_PRESET_DAYS.contains(&days) {
            url.query_pairs_mut()
                .append_pair("date_preset", &format!("last_{days}d"));
            return;
        }

        let until = Utc::now().date_naive() - ChronoDuration::days(1);
        let since = until - ChronoDuration::days(i64::from(days) - 1);
        let range = json!({
            "since": since.format("%Y-%m-%d").to_string(),
            "until": until.format("%Y-%m-%d").to_string(),
        });
        url.query_pairs_mut()
            .append_pair("time_range", &range.to_string());
    }
}
