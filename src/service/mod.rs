//! Integration lifecycle: connecting, registering and disconnecting platform accounts.

mod registration;
mod token_exchange;

pub use registration::{AnalyticsRegistration, RegistrationOutcome};
pub use token_exchange::{ExchangeOutcome, MetaExchangeRequest};

use std::sync::Arc;
use tracing::info;

use crate::db::{Platform, SyncStore};
use crate::error::{AdsyncError, ExchangeError};
use crate::platforms::MetaApi;

/// Blank strings count as absent.
pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Clone)]
pub struct IntegrationService {
    store: Arc<dyn SyncStore>,
    meta: Arc<MetaApi>,
}

impl IntegrationService {
    pub fn new(store: Arc<dyn SyncStore>, meta: Arc<MetaApi>) -> Self {
        Self { store, meta }
    }

    /// Deactivates the (workspace, platform) integration. Stored campaigns and metrics stay.
    pub async fn disconnect(&self, workspace_id: &str, platform: Platform) -> Result<(), AdsyncError> {
        let workspace_id = workspace_id.trim();
        if workspace_id.is_empty() {
            return Err(ExchangeError::missing_fields(&["workspace_id"]).into());
        }

        if !self.store.deactivate_integration(workspace_id, platform).await? {
            return Err(AdsyncError::NotFound(format!(
                "no {platform} integration for workspace {workspace_id}"
            )));
        }
        info!(workspace_id, %platform, "Integration disconnected");
        Ok(())
    }
}
