use chrono::{DateTime, Duration as ChronoDuration, Utc};
use oauth2::{AuthorizationCode, ClientId, ClientSecret, RedirectUrl};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;
use tracing::{info, warn};

use super::{IntegrationService, non_blank};
use crate::db::{IntegrationSettings, IntegrationUpsert, Platform};
use crate::error::{AdsyncError, ExchangeError};
use crate::platforms::meta::CodeExchange;

/// Body of `POST /integrations/meta/exchange`. Every field is required.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetaExchangeRequest {
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub workspace_id: Option<String>,
    pub app_id: Option<String>,
    pub app_secret: Option<String>,
}

impl fmt::Debug for MetaExchangeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaExchangeRequest")
            .field("redirect_uri", &self.redirect_uri)
            .field("workspace_id", &self.workspace_id)
            .field("app_id", &self.app_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeOutcome {
    pub integration_id: i64,
    pub platform_user_name: Option<String>,
    pub ad_accounts_count: usize,
}

/// `None` for negative or unrepresentable lifetimes.
fn expiry_after(now: DateTime<Utc>, expires_in: i64) -> Option<DateTime<Utc>> {
    if expires_in < 0 {
        return None;
    }
    ChronoDuration::try_seconds(expires_in).and_then(|d| now.checked_add_signed(d))
}

struct ValidExchange {
    workspace_id: String,
    grant: CodeExchange,
}

impl MetaExchangeRequest {
    fn validate(&self) -> Result<ValidExchange, ExchangeError> {
        let fields = [
            ("code", non_blank(&self.code)),
            ("redirect_uri", non_blank(&self.redirect_uri)),
            ("workspace_id", non_blank(&self.workspace_id)),
            ("app_id", non_blank(&self.app_id)),
            ("app_secret", non_blank(&self.app_secret)),
        ];
        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(ExchangeError::missing_fields(&missing));
        }

        let [code, redirect_uri, workspace_id, app_id, app_secret] =
            fields.map(|(_, v)| v.unwrap_or_default());
        let redirect_uri = RedirectUrl::new(redirect_uri.to_string())
            .map_err(|e| ExchangeError::InvalidRequest(format!("invalid redirect_uri: {e}")))?;

        Ok(ValidExchange {
            workspace_id: workspace_id.to_string(),
            grant: CodeExchange {
                code: AuthorizationCode::new(code.to_string()),
                redirect_uri,
                client_id: ClientId::new(app_id.to_string()),
                client_secret: ClientSecret::new(app_secret.to_string()),
            },
        })
    }
}

impl IntegrationService {
    /// Code → long-lived token → identity and ad accounts → one integration upsert.
    ///
    /// Identity and account lookups are best effort; the integration is stored either way.
    pub async fn exchange_meta_code(
        &self,
        req: MetaExchangeRequest,
    ) -> Result<ExchangeOutcome, AdsyncError> {
        let ValidExchange {
            workspace_id,
            grant,
        } = req.validate()?;

        let token = self.meta.exchange_code(&grant).await?;

        let identity = match self.meta.me(&token.access_token).await {
            Ok(identity) => Some(identity),
            Err(e) => {
                warn!(
                    workspace_id = %workspace_id,
                    error = %e,
                    "[meta] Identity lookup failed, continuing without it"
                );
                None
            }
        };
        let accounts = self
            .meta
            .ad_accounts(&token.access_token)
            .await
            .unwrap_or_else(|e| {
                warn!(
                    workspace_id = %workspace_id,
                    error = %e,
                    "[meta] Ad account lookup failed, continuing without them"
                );
                Vec::new()
            });

        let ad_accounts: Vec<Value> = accounts
            .iter()
            .map(|a| {
                json!({
                    "id": a.id,
                    "name": a.name,
                    "account_id": a.account_id,
                    "currency": a.currency,
                })
            })
            .collect();
        let ad_accounts_count = ad_accounts.len();
        let mut settings = Map::new();
        settings.insert("ad_accounts".to_string(), Value::Array(ad_accounts));

        let (platform_user_id, platform_user_name) = identity
            .map(|i| (i.id, i.name))
            .unwrap_or_default();
        let expires_at = token.expires_in.and_then(|secs| expiry_after(Utc::now(), secs));
        if token.expires_in.is_some() && expires_at.is_none() {
            warn!(
                workspace_id = %workspace_id,
                expires_in = ?token.expires_in,
                "[meta] Ignoring unusable expires_in"
            );
        }

        let integration_id = self
            .store
            .upsert_integration(IntegrationUpsert {
                workspace_id: workspace_id.clone(),
                platform: Platform::Meta,
                access_token: token.access_token,
                refresh_token: None,
                expires_at,
                platform_user_id,
                platform_user_name: platform_user_name.clone(),
                settings: IntegrationSettings(settings),
            })
            .await?;

        info!(
            integration_id,
            workspace_id = %workspace_id,
            ad_accounts = ad_accounts_count,
            "[meta] Integration connected"
        );
        Ok(ExchangeOutcome {
            integration_id,
            platform_user_name,
            ad_accounts_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> MetaExchangeRequest {
        MetaExchangeRequest {
            code: Some("c0de".into()),
            redirect_uri: Some("https://app.example/callback".into()),
            workspace_id: Some("ws-1".into()),
            app_id: Some("123".into()),
            app_secret: Some("s3cret".into()),
        }
    }

    #[test]
    fn blank_fields_are_reported_as_missing() {
        let req = MetaExchangeRequest {
            code: Some("   ".into()),
            app_secret: None,
            ..full()
        };
        let err = req.validate().err().expect("rejected");
        assert_eq!(
            err.to_string(),
            "Invalid request: missing required fields: code, app_secret"
        );
    }

    #[test]
    fn redirect_uri_must_be_a_url() {
        let req = MetaExchangeRequest {
            redirect_uri: Some("not a url".into()),
            ..full()
        };
        assert!(matches!(req.validate(), Err(ExchangeError::InvalidRequest(_))));
    }

    #[test]
    fn valid_request_keeps_trimmed_values() {
        let req = MetaExchangeRequest {
            workspace_id: Some(" ws-1 ".into()),
            ..full()
        };
        let valid = req.validate().expect("valid");
        assert_eq!(valid.workspace_id, "ws-1");
        assert_eq!(valid.grant.client_id.as_str(), "123");
        assert_eq!(valid.grant.client_secret.secret(), "s3cret");
    }

    #[test]
    fn expiry_ignores_unusable_lifetimes() {
        let now = Utc::now();
        assert_eq!(expiry_after(now, 3600), Some(now + ChronoDuration::hours(1)));
        assert_eq!(expiry_after(now, 0), Some(now));
        assert!(expiry_after(now, -5).is_none());
        assert!(expiry_after(now, 10_000_000_000_000).is_none());
        assert!(expiry_after(now, i64::MAX).is_none());
    }

    #[test]
    fn debug_hides_code_and_secret() {
        let rendered = format!("{:?}", full());
        assert!(!rendered.contains("c0de"));
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("ws-1"));
    }
}
