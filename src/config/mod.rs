mod basic;
mod platforms;
mod sync;

pub use basic::BasicConfig;
pub use platforms::{
    AnalyticsConfig, AnalyticsResolvedConfig, MetaConfig, MetaResolvedConfig, PlatformDefaults,
    PlatformsConfig, TransportConfig,
};
pub use sync::SyncConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core server configuration (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Upstream platform settings (see `platforms` table in config.toml).
    #[serde(default)]
    pub platforms: PlatformsConfig,

    /// Synchronizer scheduling and bounds (see `sync` table in config.toml).
    #[serde(default)]
    pub sync: SyncConfig,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "ADSYNC_";

impl Config {
    /// Builds a Figment that merges defaults, `config.toml` (if present), and `ADSYNC_*`
    /// environment variables (nested keys separated by `__`, e.g. `ADSYNC_BASIC__ADMIN_KEY`).
    pub fn figment() -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment = figment.merge(Toml::file(DEFAULT_CONFIG_FILE));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Extracts the merged configuration without validating required fields.
    pub fn extract() -> Result<Self, Box<figment::Error>> {
        Self::figment().extract().map_err(Box::new)
    }

    /// Extracts and validates the configuration; binaries should use this entry point.
    pub fn load() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let cfg = Self::extract()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.basic.admin_key.trim().is_empty() {
            return Err("basic.admin_key must be set and non-empty".to_string());
        }
        if self.sync.concurrency == 0 {
            return Err("sync.concurrency must be at least 1".to_string());
        }
        let meta = self.meta();
        if meta.budget_minor_unit_factor == 0 {
            return Err("platforms.meta.budget_minor_unit_factor must be positive".to_string());
        }
        Ok(())
    }

    pub fn meta(&self) -> MetaResolvedConfig {
        self.platforms.meta.resolve(&self.platforms.defaults)
    }

    pub fn analytics(&self) -> AnalyticsResolvedConfig {
        self.platforms.analytics.resolve(&self.platforms.defaults)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_requires_admin_key() {
        let cfg = Config::default();
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.basic.admin_key = "secret".to_string();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn toml_overrides_nested_tables() {
        let cfg: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string(
                r#"
                [basic]
                admin_key = "1234"

                [platforms.defaults]
                retry_attempts = 5

                [platforms.meta]
                insights_window_days = 14
                retry_attempts = 2

                [sync]
                concurrency = 8
                "#,
            ))
            .extract()
            .expect("config extracts");

        assert_eq!(cfg.basic.admin_key, "1234");
        assert_eq!(cfg.sync.concurrency, 8);

        let meta = cfg.meta();
        assert_eq!(meta.insights_window_days, 14);
        assert_eq!(meta.retry_attempts, 2);

        let analytics = cfg.analytics();
        assert_eq!(analytics.retry_attempts, 5);
    }

    #[test]
    fn partial_basic_table_keeps_adsync_defaults() {
        let cfg: Config = Figment::new()
            .merge(Toml::string(
                r#"
                [basic]
                admin_key = 4321
                cors_allow_origins = ["https://app.example"]
                "#,
            ))
            .extract()
            .expect("config extracts");

        assert_eq!(cfg.basic.admin_key, "4321");
        assert_eq!(cfg.basic.listen_port, 8190);
        assert_eq!(cfg.basic.database_url, "sqlite://adsync.db");
        assert_eq!(cfg.basic.loglevel, "info");
        assert_eq!(cfg.basic.cors_allow_origins, ["https://app.example"]);
    }

    #[test]
    fn admin_key_rejects_tables() {
        let err = Figment::new()
            .merge(Toml::string(
                r#"
                [basic.admin_key]
                value = "x"
                "#,
            ))
            .extract::<Config>()
            .unwrap_err();
        assert!(err.to_string().contains("basic.admin_key"), "{err}");
    }
}
