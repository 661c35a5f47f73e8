mod analytics;
mod meta;

pub use analytics::{AnalyticsConfig, AnalyticsResolvedConfig};
pub use meta::{MetaConfig, MetaResolvedConfig};

use backon::ExponentialBuilder;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Global platform defaults (used when platform-level config is unset).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlatformDefaults {
    /// Optional upstream HTTP proxy. If set, used for reqwest clients.
    /// TOML: `platforms.defaults.proxy`. Example: `http://127.0.0.1:1080`.
    #[serde(default)]
    pub proxy: Option<Url>,

    /// Total attempts (first try included) for transient upstream failures.
    /// TOML: `platforms.defaults.retry_attempts`. Default: `3`.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: usize,

    /// Base delay of the exponential backoff, in milliseconds.
    /// TOML: `platforms.defaults.retry_base_delay_ms`. Default: `500`.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Per-request timeout, in seconds.
    /// TOML: `platforms.defaults.request_timeout_secs`. Default: `30`.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Requests per second allowed per credential.
    /// TOML: `platforms.defaults.requests_per_second`. Default: `10`.
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

impl Default for PlatformDefaults {
    fn default() -> Self {
        Self {
            proxy: None,
            retry_attempts: default_retry_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

/// All platform configurations.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct PlatformsConfig {
    /// Global defaults for platforms (overridden per platform if set).
    #[serde(default)]
    pub defaults: PlatformDefaults,

    /// Ad platform (Graph API) configuration.
    #[serde(default)]
    pub meta: MetaConfig,

    /// Analytics platform (Analytics Data API) configuration.
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

/// Transport settings shared by every resolved platform config.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub proxy: Option<Url>,
    pub retry_attempts: usize,
    pub retry_base_delay: Duration,
    pub request_timeout: Duration,
    pub requests_per_second: u32,
}

impl TransportConfig {
    /// Exponential backoff with jitter; `retry_attempts` counts the first try.
    pub fn retry_policy(&self) -> ExponentialBuilder {
        let base = self.retry_base_delay.max(Duration::from_millis(1));
        ExponentialBuilder::default()
            .with_min_delay(base)
            .with_max_delay(base.saturating_mul(8))
            .with_factor(2.0)
            .with_max_times(self.retry_attempts.saturating_sub(1))
            .with_jitter()
    }

    /// Builds the reqwest client for a platform.
    pub fn http_client(&self, user_agent: &str) -> Result<reqwest::Client, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(10))
            .timeout(self.request_timeout);

        if let Some(proxy_url) = self.proxy.as_ref() {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
        }

        builder.build()
    }
}

pub(crate) struct TransportOverrides<'a> {
    pub proxy: &'a Option<Url>,
    pub retry_attempts: Option<usize>,
    pub retry_base_delay_ms: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub requests_per_second: Option<u32>,
}

impl TransportOverrides<'_> {
    fn resolve(&self, defaults: &PlatformDefaults) -> TransportConfig {
        TransportConfig {
            proxy: self.proxy.clone().or_else(|| defaults.proxy.clone()),
            retry_attempts: self
                .retry_attempts
                .unwrap_or(defaults.retry_attempts)
                .max(1),
            retry_base_delay: Duration::from_millis(
                self.retry_base_delay_ms
                    .unwrap_or(defaults.retry_base_delay_ms),
            ),
            request_timeout: Duration::from_secs(
                self.request_timeout_secs
                    .unwrap_or(defaults.request_timeout_secs)
                    .max(1),
            ),
            requests_per_second: self
                .requests_per_second
                .unwrap_or(defaults.requests_per_second)
                .max(1),
        }
    }
}

/// `Url::join` replaces the last path segment unless the base ends with `/`.
pub(crate) fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn default_retry_attempts() -> usize {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_requests_per_second() -> u32 {
    10
}
