//! Synchronization passes over all active integrations of one platform.
//!
//! A pass enumerates integrations through the store, processes them with bounded parallelism
//! and isolates failures per integration. Only a failed enumeration aborts a pass.

pub mod campaigns;
pub mod funnel;

pub use campaigns::CampaignSync;
pub use funnel::FunnelSync;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::db::{Integration, Platform};
use crate::error::AdsyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No usable access token or service-account key.
    MissingCredential,
    /// Meta integration without any ad account.
    NoAdAccounts,
    /// Analytics integration without a property id.
    NoProperty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Succeeded,
    Skipped { reason: SkipReason },
    Failed { reason: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegrationOutcome {
    pub integration_id: i64,
    pub workspace_id: String,
    #[serde(flatten)]
    pub status: OutcomeStatus,
    pub campaigns_upserted: usize,
    pub metrics_upserted: usize,
    pub metrics_dropped: usize,
}

impl IntegrationOutcome {
    pub(crate) fn new(integration: &Integration) -> Self {
        Self {
            integration_id: integration.id,
            workspace_id: integration.workspace_id.clone(),
            status: OutcomeStatus::Succeeded,
            campaigns_upserted: 0,
            metrics_upserted: 0,
            metrics_dropped: 0,
        }
    }

    pub(crate) fn skipped(mut self, reason: SkipReason) -> Self {
        self.status = OutcomeStatus::Skipped { reason };
        self
    }

    pub(crate) fn failed(mut self, err: &AdsyncError) -> Self {
        self.status = OutcomeStatus::Failed {
            reason: err.reason(),
            message: err.to_string(),
        };
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub run_id: Uuid,
    pub platform: Platform,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub integrations_total: usize,
    pub integrations_succeeded: usize,
    pub integrations_skipped: usize,
    pub integrations_failed: usize,
    pub campaigns_upserted: usize,
    pub metrics_upserted: usize,
    pub metrics_dropped: usize,
    /// The run deadline passed; integrations still in flight were abandoned.
    pub timed_out: bool,
    pub outcomes: Vec<IntegrationOutcome>,
}

impl SyncSummary {
    pub(crate) fn new(platform: Platform, integrations_total: usize) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            platform,
            started_at: now,
            finished_at: now,
            integrations_total,
            integrations_succeeded: 0,
            integrations_skipped: 0,
            integrations_failed: 0,
            campaigns_upserted: 0,
            metrics_upserted: 0,
            metrics_dropped: 0,
            timed_out: false,
            outcomes: Vec::with_capacity(integrations_total),
        }
    }

    fn record(&mut self, outcome: IntegrationOutcome) {
        match outcome.status {
            OutcomeStatus::Succeeded => self.integrations_succeeded += 1,
            OutcomeStatus::Skipped { .. } => self.integrations_skipped += 1,
            OutcomeStatus::Failed { .. } => self.integrations_failed += 1,
        }
        self.campaigns_upserted += outcome.campaigns_upserted;
        self.metrics_upserted += outcome.metrics_upserted;
        self.metrics_dropped += outcome.metrics_dropped;
        self.outcomes.push(outcome);
    }
}

/// Drives `per_integration` over `integrations`, at most `concurrency` at a time.
///
/// When `deadline` elapses the remaining futures are dropped; upserts already committed stay.
pub(crate) async fn run_bounded<F, Fut>(
    platform: Platform,
    integrations: Vec<Integration>,
    concurrency: usize,
    deadline: Duration,
    per_integration: F,
) -> SyncSummary
where
    F: FnMut(Integration) -> Fut,
    Fut: Future<Output = IntegrationOutcome>,
{
    let mut summary = SyncSummary::new(platform, integrations.len());
    let mut pipeline = stream::iter(integrations)
        .map(per_integration)
        .buffer_unordered(concurrency.max(1));

    let timer = tokio::time::sleep(deadline);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            next = pipeline.next() => match next {
                Some(outcome) => summary.record(outcome),
                None => break,
            },
            () = &mut timer => {
                summary.timed_out = true;
                warn!(
                    run_id = %summary.run_id,
                    platform = %platform,
                    completed = summary.outcomes.len(),
                    total = summary.integrations_total,
                    "Sync run deadline reached, abandoning in-flight integrations"
                );
                break;
            }
        }
    }

    summary.finished_at = Utc::now();
    summary
}

/// Rejects a run while another one of the same kind is in flight.
#[derive(Debug)]
pub(crate) struct SingleFlight {
    name: &'static str,
    lock: Mutex<()>,
}

impl SingleFlight {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            lock: Mutex::new(()),
        }
    }

    pub(crate) async fn run<T, Fut>(&self, fut: Fut) -> Result<T, AdsyncError>
    where
        Fut: Future<Output = Result<T, AdsyncError>>,
    {
        let _guard = self
            .lock
            .try_lock()
            .map_err(|_| AdsyncError::SyncInProgress(self.name))?;
        fut.await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::IntegrationSettings;

    fn integration(id: i64) -> Integration {
        Integration {
            id,
            workspace_id: format!("ws-{id}"),
            platform: Platform::Meta,
            access_token: "t".to_string(),
            refresh_token: None,
            expires_at: None,
            platform_user_id: None,
            platform_user_name: None,
            is_active: true,
            settings: IntegrationSettings::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn summary_counts_each_outcome_kind() {
        let integrations = (1..=3).map(integration).collect();
        let summary = run_bounded(
            Platform::Meta,
            integrations,
            2,
            Duration::from_secs(5),
            |i| async move {
                let outcome = IntegrationOutcome::new(&i);
                match i.id {
                    1 => IntegrationOutcome {
                        campaigns_upserted: 2,
                        metrics_upserted: 5,
                        ..outcome
                    },
                    2 => outcome.failed(&AdsyncError::UnexpectedError("boom".into())),
                    _ => outcome.skipped(SkipReason::NoAdAccounts),
                }
            },
        )
        .await;

        assert_eq!(summary.integrations_total, 3);
        assert_eq!(summary.integrations_succeeded, 1);
        assert_eq!(summary.integrations_failed, 1);
        assert_eq!(summary.integrations_skipped, 1);
        assert_eq!(summary.campaigns_upserted, 2);
        assert_eq!(summary.metrics_upserted, 5);
        assert!(!summary.timed_out);
    }

    #[tokio::test]
    async fn deadline_abandons_slow_integrations() {
        let integrations = (1..=2).map(integration).collect();
        let summary = run_bounded(
            Platform::Meta,
            integrations,
            2,
            Duration::from_millis(200),
            |i| async move {
                if i.id == 2 {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
                IntegrationOutcome::new(&i)
            },
        )
        .await;

        assert!(summary.timed_out);
        assert_eq!(summary.integrations_succeeded, 1);
        assert_eq!(summary.outcomes.len(), 1);
    }

    #[tokio::test]
    async fn single_flight_rejects_overlapping_runs() {
        let gate = std::sync::Arc::new(SingleFlight::new("test"));
        let (started_tx, started_rx) = tokio::sync::oneshot::channel();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let held = gate.clone();
        let first = tokio::spawn(async move {
            held.run(async move {
                let _ = started_tx.send(());
                let _ = release_rx.await;
                Ok::<_, AdsyncError>(1)
            })
            .await
        });

        started_rx.await.expect("first run started");
        let second = gate.run(async { Ok::<_, AdsyncError>(2) }).await;
        assert!(matches!(second, Err(AdsyncError::SyncInProgress("test"))));

        release_tx.send(()).expect("release");
        assert_eq!(first.await.expect("join").expect("first run"), 1);
        assert_eq!(gate.run(async { Ok::<_, AdsyncError>(3) }).await.expect("free"), 3);
    }
}
