use ahash::AHashMap;
use futures::TryStreamExt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{IntegrationOutcome, SingleFlight, SkipReason, SyncSummary, run_bounded};
use crate::config::SyncConfig;
use crate::db::{CampaignMetricUpsert, Integration, Platform, SyncStore};
use crate::error::{AdsyncError, ApiError};
use crate::platforms::MetaApi;
use crate::platforms::meta::mapping::{campaign_upsert, metric_upsert};
use crate::utils::logging::with_pretty_json_debug;

/// Campaign + daily insight synchronizer for Meta integrations.
pub struct CampaignSync {
    store: Arc<dyn SyncStore>,
    meta: Arc<MetaApi>,
    sync: SyncConfig,
    gate: SingleFlight,
}

/// Campaign ids listed under one ad account; insights are requested per account.
struct AccountCampaigns {
    ad_account_id: String,
    external_ids: Vec<String>,
}

impl CampaignSync {
    pub fn new(store: Arc<dyn SyncStore>, meta: Arc<MetaApi>, sync: SyncConfig) -> Self {
        Self {
            store,
            meta,
            sync,
            gate: SingleFlight::new("campaigns"),
        }
    }

    /// One pass over every active Meta integration. Fails with `SyncInProgress` when a pass
    /// is already running, or when the integrations cannot be enumerated.
    pub async fn run(&self) -> Result<SyncSummary, AdsyncError> {
        self.gate.run(self.run_pass()).await
    }

    async fn run_pass(&self) -> Result<SyncSummary, AdsyncError> {
        let integrations = self.store.list_active_integrations(Platform::Meta).await?;
        if integrations.is_empty() {
            info!("[campaigns] No active Meta integrations, nothing to sync");
            return Ok(SyncSummary::new(Platform::Meta, 0));
        }

        info!(
            integrations = integrations.len(),
            concurrency = self.sync.concurrency,
            "[campaigns] Sync pass started"
        );

        let summary = run_bounded(
            Platform::Meta,
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
            campaigns = summary.campaigns_upserted,
            metrics = summary.metrics_upserted,
            dropped = summary.metrics_dropped,
            timed_out = summary.timed_out,
            "[campaigns] Sync pass finished"
        );
        with_pretty_json_debug(&summary, |json| debug!("[campaigns] Summary:\n{json}"));
        Ok(summary)
    }

    async fn sync_integration(&self, integration: Integration) -> IntegrationOutcome {
        let mut outcome = IntegrationOutcome::new(&integration);

        if !integration.has_usable_credential() {
            warn!(
                integration_id = integration.id,
                workspace_id = %integration.workspace_id,
                "[campaigns] Integration has no usable access token, skipping"
            );
            return outcome.skipped(SkipReason::MissingCredential);
        }

        let ad_accounts = match self.ad_accounts_of(&integration).await {
            Ok(accounts) => accounts,
            Err(e) => {
                warn!(
                    integration_id = integration.id,
                    reason = e.reason(),
                    error = %e,
                    "[campaigns] Failed to discover ad accounts"
                );
                return outcome.failed(&e);
            }
        };
        if ad_accounts.is_empty() {
            warn!(
                integration_id = integration.id,
                workspace_id = %integration.workspace_id,
                "[campaigns] Integration has no ad accounts, skipping"
            );
            return outcome.skipped(SkipReason::NoAdAccounts);
        }

        match self.sync_accounts(&integration, &ad_accounts, &mut outcome).await {
            Ok(()) => {
                debug!(
                    integration_id = integration.id,
                    campaigns = outcome.campaigns_upserted,
                    metrics = outcome.metrics_upserted,
                    "[campaigns] Integration synced"
                );
                outcome
            }
            Err(e) => {
                if let AdsyncError::Api(ApiError::CredentialExpired { .. }) = &e {
                    warn!(
                        integration_id = integration.id,
                        workspace_id = %integration.workspace_id,
                        "[campaigns] Access token rejected, integration needs re-authorization"
                    );
                } else {
                    warn!(
                        integration_id = integration.id,
                        workspace_id = %integration.workspace_id,
                        reason = e.reason(),
                        error = %e,
                        "[campaigns] Integration sync failed"
                    );
                }
                outcome.failed(&e)
            }
        }
    }

    /// Accounts stored at exchange time, or the ones the token can currently see.
    async fn ad_accounts_of(&self, integration: &Integration) -> Result<Vec<String>, AdsyncError> {
        let stored = integration.settings.ad_account_ids();
        if !stored.is_empty() {
            return Ok(stored);
        }

        let discovered = self.meta.ad_accounts(&integration.access_token).await?;
        debug!(
            integration_id = integration.id,
            accounts = discovered.len(),
            "[campaigns] No stored ad accounts, discovered from token"
        );
        Ok(discovered.into_iter().map(|a| a.id).collect())
    }

    async fn sync_accounts(
        &self,
        integration: &Integration,
        ad_accounts: &[String],
        outcome: &mut IntegrationOutcome,
    ) -> Result<(), AdsyncError> {
        let token = integration.access_token.as_str();
        let factor = self.meta.config().budget_minor_unit_factor;

        let mut rows = Vec::new();
        let mut by_account = Vec::with_capacity(ad_accounts.len());
        for ad_account_id in ad_accounts {
            let campaigns: Vec<_> = self.meta.campaigns(token, ad_account_id).try_collect().await?;
            debug!(
                integration_id = integration.id,
                ad_account_id = %ad_account_id,
                campaigns = campaigns.len(),
                "[campaigns] Listed campaigns"
            );

            by_account.push(AccountCampaigns {
                ad_account_id: ad_account_id.clone(),
                external_ids: campaigns.iter().map(|c| c.id.clone()).collect(),
            });
            rows.extend(
                campaigns
                    .iter()
                    .map(|c| campaign_upsert(integration, c, factor)),
            );
        }

        let ids = self.store.upsert_campaigns(rows).await?;
        outcome.campaigns_upserted = ids.len();
        if ids.is_empty() {
            return Ok(());
        }

        let campaign_ids: AHashMap<String, i64> = ids.into_iter().collect();
        let mut metrics: Vec<CampaignMetricUpsert> = Vec::new();
        for account in by_account.iter().filter(|a| !a.external_ids.is_empty()) {
            let insights: Vec<_> = self
                .meta
                .campaign_insights(token, &account.ad_account_id, &account.external_ids)
                .try_collect()
                .await?;

            for insight in &insights {
                let external_id = insight.campaign_id.as_deref().unwrap_or_default();
                let Some(&campaign_id) = campaign_ids.get(external_id) else {
                    debug!(
                        integration_id = integration.id,
                        external_id,
                        "[campaigns] Insight for unknown campaign dropped"
                    );
                    outcome.metrics_dropped += 1;
                    continue;
                };
                match metric_upsert(campaign_id, insight) {
                    Some(row) => metrics.push(row),
                    None => {
                        debug!(
                            integration_id = integration.id,
                            external_id,
                            date = %insight.date_start,
                            "[campaigns] Insight with unreadable date dropped"
                        );
                        outcome.metrics_dropped += 1;
                    }
                }
            }
        }

        outcome.metrics_upserted = self.store.upsert_campaign_metrics(metrics).await?;
        Ok(())
    }
}
