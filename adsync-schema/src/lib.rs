pub mod analytics;
pub mod meta;

pub use analytics::{
    AnalyticsErrorBody, AnalyticsErrorObject, DateRange, ReportDimension, ReportMetric, ReportRow,
    ReportValue, RunReportRequest, RunReportResponse, ServiceTokenResponse,
};
pub use meta::{
    GraphAccount, GraphActionValue, GraphCampaign, GraphErrorBody, GraphErrorObject, GraphIdentity,
    GraphInsight, GraphPage, GraphPaging, GraphTokenResponse, InsightFilter,
};
