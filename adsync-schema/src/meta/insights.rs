use serde::{Deserialize, Serialize};

/// One row of a campaign-level insights listing with `time_increment=1`.
///
/// Numeric metrics are encoded as decimal strings by the Graph API.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct GraphInsight {
    #[serde(default)]
    pub campaign_id: Option<String>,
    /// `YYYY-MM-DD`.
    pub date_start: String,
    #[serde(default)]
    pub date_stop: Option<String>,
    #[serde(default)]
    pub spend: Option<String>,
    #[serde(default)]
    pub impressions: Option<String>,
    #[serde(default)]
    pub clicks: Option<String>,
    #[serde(default)]
    pub ctr: Option<String>,
    #[serde(default)]
    pub cpc: Option<String>,
    #[serde(default)]
    pub cpm: Option<String>,
    #[serde(default)]
    pub reach: Option<String>,
    #[serde(default)]
    pub purchase_roas: Option<Vec<GraphActionValue>>,
    #[serde(default)]
    pub action_values: Option<Vec<GraphActionValue>>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct GraphActionValue {
    pub action_type: String,
    pub value: String,
}

/// Element of the insights `filtering` query parameter.
///
/// Serialized to JSON as a whole so that identifiers never need manual escaping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsightFilter {
    pub field: String,
    pub operator: String,
    pub value: Vec<String>,
}

impl InsightFilter {
    pub fn campaign_ids_in<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field: "campaign.id".to_string(),
            operator: "IN".to_string(),
            value: ids.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_serializes_ids_as_json_strings() {
        let filter = InsightFilter::campaign_ids_in(["1", "2\"x"]);
        let encoded = serde_json::to_value(vec![filter]).expect("serializes");
        assert_eq!(
            encoded,
            json!([{ "field": "campaign.id", "operator": "IN", "value": ["1", "2\"x"] }])
        );
    }

    #[test]
    fn insight_decodes_with_action_arrays() {
        let row: GraphInsight = serde_json::from_value(json!({
            "campaign_id": "42",
            "date_start": "2024-03-01",
            "date_stop": "2024-03-01",
            "spend": "12.34",
            "impressions": "1000",
            "purchase_roas": [{ "action_type": "omni_purchase", "value": "2.5" }]
        }))
        .expect("insight decodes");
        assert_eq!(row.campaign_id.as_deref(), Some("42"));
        assert_eq!(row.purchase_roas.as_ref().map(Vec::len), Some(1));
        assert!(row.clicks.is_none());
    }
}
