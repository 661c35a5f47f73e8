mod graph_error;
mod insights;

pub use graph_error::{GraphErrorBody, GraphErrorObject};
pub use insights::{GraphActionValue, GraphInsight, InsightFilter};

use serde::{Deserialize, Serialize};

/// One page of a Graph API edge listing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct GraphPage<T> {
    #[serde(default)]
    pub data: Vec<T>,
    #[serde(default)]
    pub paging: Option<GraphPaging>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct GraphPaging {
    #[serde(default)]
    pub cursors: Option<GraphCursors>,
    /// Absolute URL of the next page; absent on the last page.
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct GraphCursors {
    pub before: Option<String>,
    pub after: Option<String>,
}

impl<T> GraphPage<T> {
    pub fn next_url(&self) -> Option<&str> {
        self.paging
            .as_ref()
            .and_then(|p| p.next.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// `oauth/access_token` response. Every field is optional so a missing token can be reported
/// as an authorization failure instead of a decode failure.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct GraphTokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// `/me?fields=id,name`.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct GraphIdentity {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Entry of `/me/adaccounts`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GraphAccount {
    /// `act_<numeric id>`.
    pub id: String,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub account_status: Option<i64>,
}

/// Campaign node as returned by `/{ad_account_id}/campaigns`.
///
/// Budgets arrive as decimal strings in the account currency's minor unit.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct GraphCampaign {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub effective_status: Option<String>,
    #[serde(default)]
    pub objective: Option<String>,
    #[serde(default)]
    pub daily_budget: Option<String>,
    #[serde(default)]
    pub lifetime_budget: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub stop_time: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_exposes_next_url_only_when_present() {
        let page: GraphPage<GraphCampaign> = serde_json::from_value(json!({
            "data": [{ "id": "1", "name": "c1", "status": "ACTIVE" }],
            "paging": {
                "cursors": { "before": "a", "after": "b" },
                "next": "https://graph.example/v19.0/act_1/campaigns?after=b"
            }
        }))
        .expect("page decodes");
        assert_eq!(page.data.len(), 1);
        assert_eq!(
            page.next_url(),
            Some("https://graph.example/v19.0/act_1/campaigns?after=b")
        );

        let last: GraphPage<GraphCampaign> =
            serde_json::from_value(json!({ "data": [] })).expect("page decodes");
        assert!(last.next_url().is_none());
    }

    fn decode_page<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> GraphPage<T> {
        serde_json::from_value(value).expect("page decodes")
    }

    #[test]
    fn pages_decode_for_any_deserializable_item() {
        #[derive(Debug, Deserialize)]
        struct Bare {
            id: String,
        }

        let page: GraphPage<Bare> = decode_page(json!({ "data": [{ "id": "7" }] }));
        assert_eq!(page.data[0].id, "7");

        let empty: GraphPage<Bare> = decode_page(json!({ "paging": {} }));
        assert!(empty.data.is_empty());
        assert!(empty.next_url().is_none());
    }

    #[test]
    fn token_response_tolerates_missing_fields() {
        let resp: GraphTokenResponse =
            serde_json::from_value(json!({ "expires_in": 3600 })).expect("decodes");
        assert!(resp.access_token.is_none());
        assert_eq!(resp.expires_in, Some(3600));
    }
}
