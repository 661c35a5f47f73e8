use futures::TryStreamExt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{IntegrationOutcome, SingleFlight, SkipReason, SyncSummary, run_bounded};
use crate::config::SyncConfig;
use crate::db::{Integration, Platform, SyncStore};
use crate::error::{AdsyncError, ApiError};
use crate::platforms::AnalyticsApi;
use crate::platforms::analytics::ServiceAccount;
use crate::platforms::analytics::mapping::funnel_upsert;
use crate::utils::logging::with_pretty_json_debug;

/// Daily sessions → `funnel_data` for every active analytics integration.
pub struct FunnelSync {
    store: Arc<dyn SyncStore>,
    analytics: Arc<AnalyticsApi>,
    sync: SyncConfig,
    gate: SingleFlight,
}

impl FunnelSync {
    pub fn new(store: Arc<dyn SyncStore>, analytics: Arc<AnalyticsApi>, sync: SyncConfig) -> Self {
        Self {
            store,
            analytics,
            sync,
            gate: SingleFlight::new("analytics"),
        }
    }

    pub async fn run(&self) -> Result<SyncSummary, AdsyncError> {
        self.gate.run(self.run_pass()).await
    }

    async fn run_pass(&self) -> Result<SyncSummary, AdsyncError> {
        let integrations = self
            .store
            .list_active_integrations(Platform::GoogleAnalytics)
            .await?;
        if integrations.is_empty() {
            info!("[analytics] No active analytics integrations, nothing to sync");
            return Ok(SyncSummary::new(Platform::GoogleAnalytics, 0));
        }

        let summary = run_bounded(
            Platform::GoogleAnalytics,
            integrations,
            self.sync.concurrency,
            self.sync.run_timeout(),
            |integration| self.sync_integration(integration),
        )
        .await;

        info!(
            run_id = %summary.run_id,
            succeeded = summary.integrations_succeeded,
            skipped = summary.integrations_skipped,
            failed = summary.integrations_failed,
            rows = summary.metrics_upserted,
            dropped = summary.metrics_dropped,
            timed_out = summary.timed_out,
            "[analytics] Sync pass finished"
        );
        with_pretty_json_debug(&summary, |json| debug!("[analytics] Summary:\n{json}"));
        Ok(summary)
    }

    async fn sync_integration(&self, integration: Integration) -> IntegrationOutcome {
        let mut outcome = IntegrationOutcome::new(&integration);

        let Some(property_id) = integration.settings.str_field("property_id") else {
            warn!(
                integration_id = integration.id,
                workspace_id = %integration.workspace_id,
                "[analytics] Integration has no property id, skipping"
            );
            return outcome.skipped(SkipReason::NoProperty);
        };
        let Some(account) = ServiceAccount::from_settings(&integration.settings) else {
            warn!(
                integration_id = integration.id,
                workspace_id = %integration.workspace_id,
                "[analytics] Integration has no service account, skipping"
            );
            return outcome.skipped(SkipReason::MissingCredential);
        };

        match self
            .sync_property(&integration, property_id, &account, &mut outcome)
            .await
        {
            Ok(()) => outcome,
            Err(e) => {
                if let AdsyncError::Api(ApiError::CredentialExpired { .. }) = &e {
                    self.analytics.invalidate_token(&account);
                }
                warn!(
                    integration_id = integration.id,
                    workspace_id = %integration.workspace_id,
                    property_id,
                    reason = e.reason(),
                    error = %e,
                    "[analytics] Integration sync failed"
                );
                outcome.failed(&e)
            }
        }
    }

    async fn sync_property(
        &self,
        integration: &Integration,
        property_id: &str,
        account: &ServiceAccount,
        outcome: &mut IntegrationOutcome,
    ) -> Result<(), AdsyncError> {
        let token = self.analytics.access_token(account).await?;
        let rows: Vec<_> = self
            .analytics
            .daily_sessions(&token, property_id)
            .try_collect()
            .await?;

        let user_id = integration.workspace_id.as_str();
        let mut data = Vec::with_capacity(rows.len());
        for row in &rows {
            match funnel_upsert(user_id, row) {
                Some(datum) => data.push(datum),
                None => {
                    debug!(
                        integration_id = integration.id,
                        row = ?row,
                        "[analytics] Unreadable report row dropped"
                    );
                    outcome.metrics_dropped += 1;
                }
            }
        }

        outcome.metrics_upserted = self.store.upsert_funnel_data(data).await?;
        debug!(
            integration_id = integration.id,
            rows = outcome.metrics_upserted,
            dropped = outcome.metrics_dropped,
            "[analytics] Integration synced"
        );
        Ok(())
    }
}
