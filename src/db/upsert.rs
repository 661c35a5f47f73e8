//! Insert-or-update payloads keyed by natural identifiers.
//!
//! Each payload names its table, the columns forming its conflict target, and the remaining
//! columns it writes. The SQL is derived from those, so the conflict key is part of the type
//! rather than buried in a query string.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Sqlite;
use sqlx::query::QueryScalar;
use sqlx::sqlite::SqliteArguments;
use std::fmt;

use super::models::{BudgetType, CampaignStatus, IntegrationSettings, Money, PeriodType, Platform};

pub type UpsertQuery<'q> = QueryScalar<'q, Sqlite, i64, SqliteArguments<'q>>;

pub trait Upsert: Send + Sync {
    const TABLE: &'static str;
    /// Natural key; must match a UNIQUE constraint of `TABLE`.
    const CONFLICT_TARGET: &'static [&'static str];
    /// Remaining written columns, excluding `id`, `created_at` and `updated_at`.
    const COLUMNS: &'static [&'static str];

    /// Binds values in `CONFLICT_TARGET` order followed by `COLUMNS` order.
    fn bind<'q>(&self, query: UpsertQuery<'q>) -> UpsertQuery<'q>;

    /// `INSERT .. ON CONFLICT(..) DO UPDATE .. RETURNING id`.
    ///
    /// `created_at` is only written on insert; `updated_at` always moves forward.
    fn upsert_sql() -> String {
        let all: Vec<&str> = Self::CONFLICT_TARGET
            .iter()
            .chain(Self::COLUMNS.iter())
            .copied()
            .collect();
        let placeholders = vec!["?"; all.len() + 2].join(", ");
        let mut updates: Vec<String> = Self::COLUMNS
            .iter()
            .map(|c| format!("{c} = excluded.{c}"))
            .collect();
        updates.push("updated_at = excluded.updated_at".to_string());

        format!(
            "INSERT INTO {table} ({columns}, created_at, updated_at) VALUES ({placeholders}) \
             ON CONFLICT({target}) DO UPDATE SET {updates} RETURNING id",
            table = Self::TABLE,
            columns = all.join(", "),
            target = Self::CONFLICT_TARGET.join(", "),
            updates = updates.join(", "),
        )
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct IntegrationUpsert {
    pub workspace_id: String,
    pub platform: Platform,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub platform_user_id: Option<String>,
    pub platform_user_name: Option<String>,
    pub settings: IntegrationSettings,
}

impl fmt::Debug for IntegrationUpsert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegrationUpsert")
            .field("workspace_id", &self.workspace_id)
            .field("platform", &self.platform)
            .field("expires_at", &self.expires_at)
            .field("platform_user_id", &self.platform_user_id)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Upsert for IntegrationUpsert {
    const TABLE: &'static str = "integrations";
    const CONFLICT_TARGET: &'static [&'static str] = &["workspace_id", "platform"];
    const COLUMNS: &'static [&'static str] = &[
        "access_token",
        "refresh_token",
        "expires_at",
        "platform_user_id",
        "platform_user_name",
        "is_active",
        "settings",
    ];

    fn bind<'q>(&self, query: UpsertQuery<'q>) -> UpsertQuery<'q> {
        // Re-authorization always re-activates.
        query
            .bind(self.workspace_id.clone())
            .bind(self.platform)
            .bind(self.access_token.clone())
            .bind(self.refresh_token.clone())
            .bind(self.expires_at)
            .bind(self.platform_user_id.clone())
            .bind(self.platform_user_name.clone())
            .bind(true)
            .bind(self.settings.to_json_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignUpsert {
    pub workspace_id: String,
    pub integration_id: i64,
    pub external_id: String,
    pub name: String,
    pub status: CampaignStatus,
    pub objective: Option<String>,
    pub budget_amount: Money,
    pub budget_type: Option<BudgetType>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub platform: Platform,
}

impl Upsert for CampaignUpsert {
    const TABLE: &'static str = "campaigns";
    const CONFLICT_TARGET: &'static [&'static str] = &["integration_id", "external_id"];
    const COLUMNS: &'static [&'static str] = &[
        "workspace_id",
        "name",
        "status",
        "objective",
        "budget_amount",
        "budget_type",
        "start_time",
        "end_time",
        "platform",
    ];

    fn bind<'q>(&self, query: UpsertQuery<'q>) -> UpsertQuery<'q> {
        query
            .bind(self.integration_id)
            .bind(self.external_id.clone())
            .bind(self.workspace_id.clone())
            .bind(self.name.clone())
            .bind(self.status)
            .bind(self.objective.clone())
            .bind(self.budget_amount.to_string())
            .bind(self.budget_type)
            .bind(self.start_time)
            .bind(self.end_time)
            .bind(self.platform)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignMetricUpsert {
    pub campaign_id: i64,
    pub date: NaiveDate,
    pub spend: Money,
    pub impressions: i64,
    pub clicks: i64,
    pub ctr: f64,
    pub cpc: f64,
    pub cpm: f64,
    pub reach: i64,
    pub roas: f64,
    pub conversion_value: Money,
}

impl Upsert for CampaignMetricUpsert {
    const TABLE: &'static str = "campaign_metrics";
    const CONFLICT_TARGET: &'static [&'static str] = &["campaign_id", "date"];
    const COLUMNS: &'static [&'static str] = &[
        "spend",
        "impressions",
        "clicks",
        "ctr",
        "cpc",
        "cpm",
        "reach",
        "roas",
        "conversion_value",
    ];

    fn bind<'q>(&self, query: UpsertQuery<'q>) -> UpsertQuery<'q> {
        query
            .bind(self.campaign_id)
            .bind(self.date)
            .bind(self.spend.to_string())
            .bind(self.impressions)
            .bind(self.clicks)
            .bind(self.ctr)
            .bind(self.cpc)
            .bind(self.cpm)
            .bind(self.reach)
            .bind(self.roas)
            .bind(self.conversion_value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelDatumUpsert {
    pub user_id: String,
    pub date: NaiveDate,
    pub period_type: PeriodType,
    pub visitors: i64,
}

impl Upsert for FunnelDatumUpsert {
    const TABLE: &'static str = "funnel_data";
    const CONFLICT_TARGET: &'static [&'static str] = &["user_id", "date", "period_type"];
    const COLUMNS: &'static [&'static str] = &["visitors"];

    fn bind<'q>(&self, query: UpsertQuery<'q>) -> UpsertQuery<'q> {
        query
            .bind(self.user_id.clone())
            .bind(self.date)
            .bind(self.period_type)
            .bind(self.visitors)
    }
}
