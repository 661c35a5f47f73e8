//! `runReport` rows → funnel rows.

use adsync_schema::ReportRow;
use chrono::NaiveDate;

use crate::db::{FunnelDatumUpsert, PeriodType};

/// The `date` dimension is reported as `YYYYMMDD`.
pub fn parse_report_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y%m%d").ok()
}

/// `None` when the date or the session count cannot be read.
pub fn funnel_upsert(user_id: &str, row: &ReportRow) -> Option<FunnelDatumUpsert> {
    let date = parse_report_date(row.dimension(0)?)?;
    let raw = row.metric(0)?.trim();
    let visitors = raw
        .parse::<i64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v.round() as i64))?;

    Some(FunnelDatumUpsert {
        user_id: user_id.to_string(),
        date,
        period_type: PeriodType::Daily,
        visitors,
    })
}
