use adsync_schema::GraphTokenResponse;
use oauth2::{AuthorizationCode, ClientId, ClientSecret, RedirectUrl};
use serde_json::Value;
use tracing::{debug, warn};

use super::MetaApi;
use crate::error::{AdsyncError, ApiError, ExchangeError};
use crate::platforms::policy::body_preview;

/// Validated input of the authorization-code grant.
#[derive(Debug, Clone)]
pub struct CodeExchange {
    pub code: AuthorizationCode,
    pub redirect_uri: RedirectUrl,
    pub client_id: ClientId,
    pub client_secret: ClientSecret,
}

/// Long-lived credential obtained from the token endpoint.
#[derive(Debug, Clone)]
pub struct ExchangedToken {
    pub access_token: String,
    pub expires_in: Option<i64>,
}

impl MetaApi {
    /// Trades an authorization code at `oauth/access_token`.
    ///
    /// Codes are single-use, so the call is not retried.
    pub async fn exchange_code(&self, req: &CodeExchange) -> Result<ExchangedToken, AdsyncError> {
        let url = self.endpoint("oauth/access_token")?;
        let resp = self
            .client
            .get(url)
            .query(&[
                ("client_id", req.client_id.as_str()),
                ("client_secret", req.client_secret.secret().as_str()),
                ("redirect_uri", req.redirect_uri.as_str()),
                ("code", req.code.secret().as_str()),
            ])
            .send()
            .await
            .map_err(ApiError::from)?;

        let status = resp.status();
        let bytes = resp.bytes().await.map_err(ApiError::from)?;
        let body: Value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(body_preview(&bytes)));

        if !status.is_success() {
            warn!(%status, "[meta] Token exchange rejected");
            return Err(ExchangeError::UpstreamAuth {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let token: GraphTokenResponse =
            serde_json::from_value(body.clone()).unwrap_or_default();
        match token.access_token.filter(|t| !t.trim().is_empty()) {
            Some(access_token) => {
                debug!(expires_in = ?token.expires_in, "[meta] Token exchange succeeded");
                Ok(ExchangedToken {
                    access_token,
                    expires_in: token.expires_in,
                })
            }
            None => {
                warn!(%status, "[meta] Token endpoint answered without an access token");
                Err(ExchangeError::UpstreamAuth {
                    status: status.as_u16(),
                    body,
                }
                .into())
            }
        }
    }
}
