use serde::{Deserialize, Serialize};

/// Graph API error envelope: `{"error": {...}}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GraphErrorBody {
    pub error: GraphErrorObject,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct GraphErrorObject {
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub error_subcode: Option<i64>,
    #[serde(default)]
    pub fbtrace_id: Option<String>,
}

/// Graph error codes for invalid, expired or revoked access tokens (190) and a lost API
/// session (102). Other `OAuthException` codes, e.g. 100 "Invalid parameter", are not
/// credential failures.
const TOKEN_ERROR_CODES: [i64; 2] = [190, 102];

/// Graph error codes signalling throttling (application, user, ad account level).
const THROTTLING_CODES: [i64; 5] = [4, 17, 32, 613, 80004];

impl GraphErrorObject {
    pub fn is_invalid_token(&self) -> bool {
        self.code.is_some_and(|c| TOKEN_ERROR_CODES.contains(&c))
    }

    pub fn is_throttled(&self) -> bool {
        self.code.is_some_and(|c| THROTTLING_CODES.contains(&c))
    }
}
