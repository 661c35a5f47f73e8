//! Google Analytics Data API (v1beta) `runReport` wire types and the service-account token
//! endpoint response.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RunReportRequest {
    pub date_ranges: Vec<DateRange>,
    pub dimensions: Vec<ReportDimension>,
    pub metrics: Vec<ReportMetric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    /// `YYYY-MM-DD` or a relative token such as `7daysAgo`.
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ReportDimension {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ReportMetric {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RunReportResponse {
    #[serde(default)]
    pub rows: Vec<ReportRow>,
    /// Total rows matching the query, independent of `limit`/`offset`.
    #[serde(default)]
    pub row_count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    #[serde(default)]
    pub dimension_values: Vec<ReportValue>,
    #[serde(default)]
    pub metric_values: Vec<ReportValue>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ReportValue {
    #[serde(default)]
    pub value: String,
}

impl ReportRow {
    pub fn dimension(&self, idx: usize) -> Option<&str> {
        self.dimension_values.get(idx).map(|v| v.value.as_str())
    }

    pub fn metric(&self, idx: usize) -> Option<&str> {
        self.metric_values.get(idx).map(|v| v.value.as_str())
    }
}

/// Response of the JWT-bearer grant at the Google token endpoint.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ServiceTokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Google API error envelope: `{"error": {"code", "message", "status"}}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalyticsErrorBody {
    pub error: AnalyticsErrorObject,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AnalyticsErrorObject {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serializes_camel_case_and_skips_unset_paging() {
        let req = RunReportRequest {
            date_ranges: vec![DateRange {
                start_date: "7daysAgo".to_string(),
                end_date: "today".to_string(),
            }],
            dimensions: vec![ReportDimension {
                name: "date".to_string(),
            }],
            metrics: vec![ReportMetric {
                name: "sessions".to_string(),
            }],
            limit: Some(100),
            offset: None,
        };

        let v = serde_json::to_value(&req).expect("serializes");
        assert_eq!(
            v,
            json!({
                "dateRanges": [{ "startDate": "7daysAgo", "endDate": "today" }],
                "dimensions": [{ "name": "date" }],
                "metrics": [{ "name": "sessions" }],
                "limit": 100
            })
        );
    }

    #[test]
    fn response_rows_expose_values_by_index() {
        let resp: RunReportResponse = serde_json::from_value(json!({
            "rows": [{
                "dimensionValues": [{ "value": "20240115" }],
                "metricValues": [{ "value": "321" }]
            }],
            "rowCount": 1
        }))
        .expect("decodes");

        let row = &resp.rows[0];
        assert_eq!(row.dimension(0), Some("20240115"));
        assert_eq!(row.metric(0), Some("321"));
        assert_eq!(row.metric(1), None);
        assert_eq!(resp.row_count, Some(1));
    }
}
