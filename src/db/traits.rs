use async_trait::async_trait;

use super::models::{Integration, Platform};
use super::upsert::{CampaignMetricUpsert, CampaignUpsert, FunnelDatumUpsert, IntegrationUpsert};
use crate::error::AdsyncError;

/// Persistence gateway consumed by the token exchange flow and both synchronizers.
///
/// Every write is an upsert on the row's natural key, so replaying a batch is harmless.
#[async_trait]
pub trait SyncStore: Send + Sync {
    async fn list_active_integrations(
        &self,
        platform: Platform,
    ) -> Result<Vec<Integration>, AdsyncError>;

    /// Inserts or re-authorizes the (workspace, platform) integration; returns its id.
    async fn upsert_integration(&self, row: IntegrationUpsert) -> Result<i64, AdsyncError>;

    /// Returns `false` when no integration exists for the pair.
    async fn deactivate_integration(
        &self,
        workspace_id: &str,
        platform: Platform,
    ) -> Result<bool, AdsyncError>;

    /// Returns `(external_id, id)` for every written campaign, in input order.
    async fn upsert_campaigns(
        &self,
        rows: Vec<CampaignUpsert>,
    ) -> Result<Vec<(String, i64)>, AdsyncError>;

    async fn upsert_campaign_metrics(
        &self,
        rows: Vec<CampaignMetricUpsert>,
    ) -> Result<usize, AdsyncError>;

    async fn upsert_funnel_data(&self, rows: Vec<FunnelDatumUpsert>) -> Result<usize, AdsyncError>;
}
