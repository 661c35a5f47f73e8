use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::net::{IpAddr, Ipv4Addr};

/// `[basic]` table: the admin HTTP surface and the sync store.
///
/// Every key can also be set through `ADSYNC_BASIC__<KEY>`, e.g. `ADSYNC_BASIC__ADMIN_KEY`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasicConfig {
    /// Bind address of the admin API.
    /// TOML: `basic.listen_addr`. Default: `0.0.0.0`.
    #[serde(default = "default_listen_ip")]
    pub listen_addr: IpAddr,

    /// TOML: `basic.listen_port`. Default: `8190`.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// SQLite file holding integrations, campaigns, insights and funnel rows.
    /// Created on first start.
    /// TOML: `basic.database_url`. Default: `sqlite://adsync.db`.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// `EnvFilter` directive; `RUST_LOG` wins when set.
    /// TOML: `basic.loglevel`. Default: `info`.
    #[serde(default = "default_loglevel")]
    pub loglevel: String,

    /// Shared secret for `/integrations/*` and `/sync/*`, sent as `x-api-key` or a bearer
    /// token. `/healthz` stays public. Numbers are accepted and read as text.
    /// TOML: `basic.admin_key`. Required.
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_string_lax")]
    pub admin_key: String,

    /// Browser origins allowed to call the admin API. Empty allows any origin.
    /// TOML: `basic.cors_allow_origins`. Default: `[]`.
    #[serde(default)]
    pub cors_allow_origins: Vec<String>,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_ip(),
            listen_port: default_listen_port(),
            database_url: default_database_url(),
            loglevel: default_loglevel(),
            // Left empty; `Config::validate` rejects it.
            admin_key: String::new(),
            cors_allow_origins: Vec::new(),
        }
    }
}

fn deserialize_string_lax<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;

    match v {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(serde::de::Error::custom(
            "expected a string or a number for basic.admin_key",
        )),
    }
}

fn default_listen_ip() -> IpAddr {
    Ipv4Addr::new(0, 0, 0, 0).into()
}

fn default_listen_port() -> u16 {
    8190
}

fn default_database_url() -> String {
    "sqlite://adsync.db".to_string()
}

fn default_loglevel() -> String {
    "info".to_string()
}
