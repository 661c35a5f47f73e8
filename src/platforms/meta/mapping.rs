//! Projection of Graph API nodes onto storage rows.

use adsync_schema::{GraphActionValue, GraphCampaign, GraphInsight};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

use super::status::campaign_status;
use crate::db::{BudgetType, CampaignMetricUpsert, CampaignUpsert, Integration, Money, Platform};

/// Action types counted as purchase value, most aggregated first.
const PURCHASE_ACTION_TYPES: [&str; 3] = [
    "omni_purchase",
    "purchase",
    "offsite_conversion.fb_pixel_purchase",
];

pub fn campaign_upsert(
    integration: &Integration,
    campaign: &GraphCampaign,
    minor_unit_factor: u32,
) -> CampaignUpsert {
    let (budget_amount, budget_type) = normalize_budget(
        campaign.daily_budget.as_deref(),
        campaign.lifetime_budget.as_deref(),
        minor_unit_factor,
    );

    CampaignUpsert {
        workspace_id: integration.workspace_id.clone(),
        integration_id: integration.id,
        external_id: campaign.id.clone(),
        name: campaign.name.clone().unwrap_or_default(),
        status: campaign_status(campaign),
        objective: campaign.objective.clone().filter(|o| !o.is_empty()),
        budget_amount,
        budget_type,
        start_time: campaign.start_time.as_deref().and_then(parse_graph_time),
        end_time: campaign.stop_time.as_deref().and_then(parse_graph_time),
        platform: Platform::Meta,
    }
}

/// Daily budget wins over lifetime; an absent or unparseable pair yields zero and no type.
pub fn normalize_budget(
    daily: Option<&str>,
    lifetime: Option<&str>,
    minor_unit_factor: u32,
) -> (Money, Option<BudgetType>) {
    let factor = Decimal::from(minor_unit_factor.max(1));
    let to_major = |raw: &str| {
        Decimal::from_str(raw.trim()).ok().map(|minor| {
            let mut major = minor / factor;
            major.rescale(2);
            Money(major)
        })
    };

    if let Some(amount) = daily.and_then(to_major) {
        return (amount, Some(BudgetType::Daily));
    }
    if let Some(amount) = lifetime.and_then(to_major) {
        return (amount, Some(BudgetType::Lifetime));
    }
    (Money::ZERO, None)
}

/// Accepts RFC 3339 and the Graph API's `2024-01-31T10:00:00+0000` form.
pub fn parse_graph_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Builds the metric row for an already resolved campaign id. `None` if the day is unreadable.
pub fn metric_upsert(campaign_id: i64, insight: &GraphInsight) -> Option<CampaignMetricUpsert> {
    let date = NaiveDate::parse_from_str(insight.date_start.trim(), "%Y-%m-%d").ok()?;

    Some(CampaignMetricUpsert {
        campaign_id,
        date,
        spend: money(insight.spend.as_deref()),
        impressions: count(insight.impressions.as_deref()),
        clicks: count(insight.clicks.as_deref()),
        ctr: ratio(insight.ctr.as_deref()),
        cpc: ratio(insight.cpc.as_deref()),
        cpm: ratio(insight.cpm.as_deref()),
        reach: count(insight.reach.as_deref()),
        roas: purchase_entry(insight.purchase_roas.as_deref())
            .map(|v| ratio(Some(v.value.as_str())))
            .unwrap_or_default(),
        conversion_value: purchase_entry(insight.action_values.as_deref())
            .map(|v| money(Some(v.value.as_str())))
            .unwrap_or_default(),
    })
}

fn purchase_entry(values: Option<&[GraphActionValue]>) -> Option<&GraphActionValue> {
    let values = values?;
    PURCHASE_ACTION_TYPES
        .iter()
        .find_map(|kind| values.iter().find(|v| v.action_type == *kind))
}

fn money(raw: Option<&str>) -> Money {
    raw.and_then(|s| Decimal::from_str(s.trim()).ok())
        .map(Money)
        .unwrap_or_default()
}

fn count(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or_default()
}

fn ratio(raw: Option<&str>) -> f64 {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or_default()
}
