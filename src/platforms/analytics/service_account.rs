use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::IntegrationSettings;
use crate::error::ApiError;
use crate::platforms::policy::ErrorMapping;

pub const ANALYTICS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/analytics.readonly";
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Service-account identity stored in an analytics integration's settings.
#[derive(Clone, PartialEq)]
pub struct ServiceAccount {
    pub email: String,
    pub private_key: String,
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("email", &self.email)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl ServiceAccount {
    pub fn from_settings(settings: &IntegrationSettings) -> Option<Self> {
        Some(Self {
            email: settings.str_field("service_account_email")?.to_string(),
            private_key: settings.str_field("private_key")?.to_string(),
        })
    }

    /// Keys pasted from a JSON key file often keep their `\n` escapes.
    fn pem(&self) -> String {
        self.private_key.trim().replace("\\n", "\n")
    }

    /// Fails early when the key is not a usable RSA PEM.
    pub fn validate_key(&self) -> Result<(), jsonwebtoken::errors::Error> {
        EncodingKey::from_rsa_pem(self.pem().as_bytes()).map(|_| ())
    }

    /// RS256 assertion for the JWT-bearer grant.
    pub fn sign_assertion(
        &self,
        audience: &str,
        now: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let key = EncodingKey::from_rsa_pem(self.pem().as_bytes())?;
        let iat = now.timestamp();
        let claims = AssertionClaims {
            iss: &self.email,
            scope: ANALYTICS_READONLY_SCOPE,
            aud: audience,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        encode(&Header::new(Algorithm::RS256), &claims, &key)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

/// OAuth error body of the token endpoint: `{"error": "invalid_grant", ...}`.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct TokenErrorBody {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl ErrorMapping for TokenErrorBody {
    fn try_match_rule(&self, _status: StatusCode) -> Option<ApiError> {
        match self.error.as_str() {
            "invalid_grant" | "invalid_client" | "unauthorized_client" => {
                Some(ApiError::CredentialExpired {
                    message: self
                        .error_description
                        .clone()
                        .unwrap_or_else(|| self.error.clone()),
                })
            }
            _ => None,
        }
    }
}
