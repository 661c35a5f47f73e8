use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::Url;

use super::{PlatformDefaults, TransportConfig, TransportOverrides, with_trailing_slash};

static DEFAULT_API_URL: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("https://analyticsdata.googleapis.com/").expect("valid default Analytics Data URL")
});

static DEFAULT_TOKEN_URL: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("https://oauth2.googleapis.com/token").expect("valid Google token URI")
});

/// Analytics platform configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyticsConfig {
    /// Analytics Data API base URL.
    /// TOML: `platforms.analytics.api_url`. Default: `https://analyticsdata.googleapis.com/`.
    #[serde(default = "default_api_url")]
    pub api_url: Url,

    /// Token endpoint for the service-account JWT-bearer grant; also the JWT audience.
    /// TOML: `platforms.analytics.token_url`. Default: `https://oauth2.googleapis.com/token`.
    #[serde(default = "default_token_url")]
    pub token_url: Url,

    /// Trailing window of days re-fetched per run, today included.
    /// TOML: `platforms.analytics.window_days`. Default: `7`.
    #[serde(default = "default_window_days")]
    pub window_days: u32,

    /// `limit` per `runReport` page.
    /// TOML: `platforms.analytics.page_size`. Default: `10000`.
    #[serde(default = "default_page_size")]
    pub page_size: u64,

    /// TOML: `platforms.analytics.proxy`. Falls back to `platforms.defaults.proxy`.
    #[serde(default)]
    pub proxy: Option<Url>,

    /// TOML: `platforms.analytics.retry_attempts`.
    #[serde(default)]
    pub retry_attempts: Option<usize>,

    /// TOML: `platforms.analytics.retry_base_delay_ms`.
    #[serde(default)]
    pub retry_base_delay_ms: Option<u64>,

    /// TOML: `platforms.analytics.request_timeout_secs`.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// TOML: `platforms.analytics.requests_per_second`.
    #[serde(default)]
    pub requests_per_second: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct AnalyticsResolvedConfig {
    pub api_url: Url,
    pub token_url: Url,
    pub window_days: u32,
    pub page_size: u64,
    pub retry_attempts: usize,
    pub transport: TransportConfig,
}

impl AnalyticsConfig {
    pub fn resolve(&self, defaults: &PlatformDefaults) -> AnalyticsResolvedConfig {
        let transport = TransportOverrides {
            proxy: &self.proxy,
            retry_attempts: self.retry_attempts,
            retry_base_delay_ms: self.retry_base_delay_ms,
            request_timeout_secs: self.request_timeout_secs,
            requests_per_second: self.requests_per_second,
        }
        .resolve(defaults);

        AnalyticsResolvedConfig {
            api_url: with_trailing_slash(self.api_url.clone()),
            token_url: self.token_url.clone(),
            window_days: self.window_days.max(1),
            page_size: self.page_size.max(1),
            retry_attempts: transport.retry_attempts,
            transport,
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token_url: default_token_url(),
            window_days: default_window_days(),
            page_size: default_page_size(),
            proxy: None,
            retry_attempts: None,
            retry_base_delay_ms: None,
            request_timeout_secs: None,
            requests_per_second: None,
        }
    }
}

fn default_api_url() -> Url {
    DEFAULT_API_URL.clone()
}

fn default_token_url() -> Url {
    DEFAULT_TOKEN_URL.clone()
}

fn default_window_days() -> u32 {
    7
}

fn default_page_size() -> u64 {
    10_000
}
