use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::info;

use super::{IntegrationService, non_blank};
use crate::db::{IntegrationSettings, IntegrationUpsert, Platform};
use crate::error::{AdsyncError, ExchangeError};
use crate::platforms::analytics::ServiceAccount;

/// Body of `POST /integrations/google-analytics`.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnalyticsRegistration {
    pub workspace_id: Option<String>,
    pub property_id: Option<String>,
    pub service_account_email: Option<String>,
    pub private_key: Option<String>,
}

impl fmt::Debug for AnalyticsRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyticsRegistration")
            .field("workspace_id", &self.workspace_id)
            .field("property_id", &self.property_id)
            .field("service_account_email", &self.service_account_email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistrationOutcome {
    pub integration_id: i64,
    pub property_id: String,
}

impl IntegrationService {
    /// Stores a service-account backed analytics integration. The key is parsed up front so a
    /// broken paste fails here instead of on every scheduled run.
    pub async fn register_analytics(
        &self,
        req: AnalyticsRegistration,
    ) -> Result<RegistrationOutcome, AdsyncError> {
        let fields = [
            ("workspace_id", non_blank(&req.workspace_id)),
            ("property_id", non_blank(&req.property_id)),
            ("service_account_email", non_blank(&req.service_account_email)),
            ("private_key", non_blank(&req.private_key)),
        ];
        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(ExchangeError::missing_fields(&missing).into());
        }
        let [workspace_id, property_id, email, private_key] =
            fields.map(|(_, v)| v.unwrap_or_default());

        let account = ServiceAccount {
            email: email.to_string(),
            private_key: private_key.to_string(),
        };
        account.validate_key().map_err(|e| {
            AdsyncError::ServiceAccount(format!("private_key is not a usable RSA key: {e}"))
        })?;

        let mut settings = Map::new();
        settings.insert("property_id".to_string(), Value::from(property_id));
        settings.insert("service_account_email".to_string(), Value::from(email));
        settings.insert("private_key".to_string(), Value::from(private_key));

        let integration_id = self
            .store
            .upsert_integration(IntegrationUpsert {
                workspace_id: workspace_id.to_string(),
                platform: Platform::GoogleAnalytics,
                // The credential is minted per run from the service account.
                access_token: String::new(),
                refresh_token: None,
                expires_at: None,
                platform_user_id: Some(account.email.clone()),
                platform_user_name: None,
                settings: IntegrationSettings(settings),
            })
            .await?;

        info!(
            integration_id,
            workspace_id,
            property_id,
            "[analytics] Integration registered"
        );
        Ok(RegistrationOutcome {
            integration_id,
            property_id: property_id.to_string(),
        })
    }
}
