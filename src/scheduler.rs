//! Periodic sync triggers. Each synchronizer gets its own ticking task; a tick that lands while
//! a run (scheduled or manual) is still in flight is skipped.

use futures::StreamExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;
use tracing::{error, info};

use crate::config::SyncConfig;
use crate::error::AdsyncError;
use crate::sync::{CampaignSync, FunnelSync, SyncSummary};

/// Spawns the enabled schedules. An interval of `0` disables the corresponding one.
pub fn spawn(
    campaigns: Arc<CampaignSync>,
    funnel: Arc<FunnelSync>,
    cfg: &SyncConfig,
) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();

    if let Some(period) = cfg.campaigns_interval() {
        handles.push(spawn_schedule("campaigns", period, move || {
            let sync = campaigns.clone();
            async move { sync.run().await }
        }));
    }
    if let Some(period) = cfg.analytics_interval() {
        handles.push(spawn_schedule("analytics", period, move || {
            let sync = funnel.clone();
            async move { sync.run().await }
        }));
    }

    handles
}

fn spawn_schedule<F, Fut>(name: &'static str, period: Duration, job: F) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<SyncSummary, AdsyncError>> + Send + 'static,
{
    info!(schedule = name, period_secs = period.as_secs(), "Sync schedule started");

    // First run one period after startup.
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut ticks = IntervalStream::new(interval);

    tokio::spawn(async move {
        while ticks.next().await.is_some() {
            match job().await {
                Ok(summary) => info!(
                    schedule = name,
                    run_id = %summary.run_id,
                    succeeded = summary.integrations_succeeded,
                    failed = summary.integrations_failed,
                    "Scheduled sync finished"
                ),
                Err(AdsyncError::SyncInProgress(_)) => {
                    info!(schedule = name, "Previous sync still running, skipping tick");
                }
                Err(e) => error!(schedule = name, error = %e, "Scheduled sync failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Platform;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn schedule_ticks_repeatedly_and_tolerates_conflicts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handle = spawn_schedule("test", Duration::from_millis(20), move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(AdsyncError::SyncInProgress("test"))
                } else {
                    Ok(SyncSummary::new(Platform::Meta, 0))
                }
            }
        });

        tokio::time::sleep(Duration::from_millis(150)).await;
        handle.abort();
        assert!(calls.load(Ordering::SeqCst) >= 2);
    }
}
