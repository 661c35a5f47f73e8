use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Synchronizer run bounds and periodic trigger intervals.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Integrations processed concurrently within one run.
    /// TOML: `sync.concurrency`. Default: `4`.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Wall-clock bound for one run; in-flight integrations are abandoned on expiry.
    /// TOML: `sync.run_timeout_secs`. Default: `300`.
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,

    /// Period of the scheduled campaign sync. `0` disables the schedule.
    /// TOML: `sync.campaigns_interval_secs`. Default: `3600`.
    #[serde(default = "default_interval_secs")]
    pub campaigns_interval_secs: u64,

    /// Period of the scheduled analytics sync. `0` disables the schedule.
    /// TOML: `sync.analytics_interval_secs`. Default: `3600`.
    #[serde(default = "default_interval_secs")]
    pub analytics_interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            run_timeout_secs: default_run_timeout_secs(),
            campaigns_interval_secs: default_interval_secs(),
            analytics_interval_secs: default_interval_secs(),
        }
    }
}

impl SyncConfig {
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs.max(1))
    }

    pub fn campaigns_interval(&self) -> Option<Duration> {
        (self.campaigns_interval_secs > 0)
            .then(|| Duration::from_secs(self.campaigns_interval_secs))
    }

    pub fn analytics_interval(&self) -> Option<Duration> {
        (self.analytics_interval_secs > 0)
            .then(|| Duration::from_secs(self.analytics_interval_secs))
    }
}

fn default_concurrency() -> usize {
    4
}

fn default_run_timeout_secs() -> u64 {
    300
}

fn default_interval_secs() -> u64 {
    3600
}
