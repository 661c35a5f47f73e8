use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::Url;

use super::{PlatformDefaults, TransportConfig, TransportOverrides, with_trailing_slash};

static DEFAULT_GRAPH_API_URL: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("https://graph.facebook.com/v19.0/").expect("valid default Graph API URL")
});

/// Ad platform configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetaConfig {
    /// Versioned Graph API base URL.
    /// TOML: `platforms.meta.graph_api_url`. Default: `https://graph.facebook.com/v19.0/`.
    #[serde(default = "default_graph_api_url")]
    pub graph_api_url: Url,

    /// `limit` requested per listing page.
    /// TOML: `platforms.meta.page_size`. Default: `100`.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Trailing window of days re-fetched for daily insights.
    /// TOML: `platforms.meta.insights_window_days`. Default: `7`.
    #[serde(default = "default_insights_window_days")]
    pub insights_window_days: u32,

    /// Max campaign ids per insights filter.
    /// TOML: `platforms.meta.insights_chunk_size`. Default: `50`.
    #[serde(default = "default_insights_chunk_size")]
    pub insights_chunk_size: usize,

    /// Divisor converting minor-unit budgets to major units.
    /// TOML: `platforms.meta.budget_minor_unit_factor`. Default: `100`.
    #[serde(default = "default_budget_minor_unit_factor")]
    pub budget_minor_unit_factor: u32,

    /// TOML: `platforms.meta.proxy`. Falls back to `platforms.defaults.proxy`.
    #[serde(default)]
    pub proxy: Option<Url>,

    /// TOML: `platforms.meta.retry_attempts`. Falls back to `platforms.defaults.retry_attempts`.
    #[serde(default)]
    pub retry_attempts: Option<usize>,

    /// TOML: `platforms.meta.retry_base_delay_ms`.
    #[serde(default)]
    pub retry_base_delay_ms: Option<u64>,

    /// TOML: `platforms.meta.request_timeout_secs`.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// TOML: `platforms.meta.requests_per_second`.
    #[serde(default)]
    pub requests_per_second: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct MetaResolvedConfig {
    pub graph_api_url: Url,
    pub page_size: u32,
    pub insights_window_days: u32,
    pub insights_chunk_size: usize,
    pub budget_minor_unit_factor: u32,
    pub retry_attempts: usize,
    pub transport: TransportConfig,
}

impl MetaConfig {
    pub fn resolve(&self, defaults: &PlatformDefaults) -> MetaResolvedConfig {
        let transport = TransportOverrides {
            proxy: &self.proxy,
            retry_attempts: self.retry_attempts,
            retry_base_delay_ms: self.retry_base_delay_ms,
            request_timeout_secs: self.request_timeout_secs,
            requests_per_second: self.requests_per_second,
        }
        .resolve(defaults);

        MetaResolvedConfig {
            graph_api_url: with_trailing_slash(self.graph_api_url.clone()),
            page_size: self.page_size.max(1),
            insights_window_days: self.insights_window_days.max(1),
            insights_chunk_size: self.insights_chunk_size.max(1),
            budget_minor_unit_factor: self.budget_minor_unit_factor,
            retry_attempts: transport.retry_attempts,
            transport,
        }
    }
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            graph_api_url: default_graph_api_url(),
            page_size: default_page_size(),
            insights_window_days: default_insights_window_days(),
            insights_chunk_size: default_insights_chunk_size(),
            budget_minor_unit_factor: default_budget_minor_unit_factor(),
            proxy: None,
            retry_attempts: None,
            retry_base_delay_ms: None,
            request_timeout_secs: None,
            requests_per_second: None,
        }
    }
}

fn default_graph_api_url() -> Url {
    DEFAULT_GRAPH_API_URL.clone()
}

fn default_page_size() -> u32 {
    100
}

fn default_insights_window_days() -> u32 {
    7
}

fn default_insights_chunk_size() -> usize {
    50
}

fn default_budget_minor_unit_factor() -> u32 {
    100
}
