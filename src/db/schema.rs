//! SQL DDL for initializing the database schema.
//! SQLite-first; every synchronized table carries the natural key its upsert conflicts on.

/// SQLite schema includes:
/// - `integrations` (one per (workspace_id, platform))
/// - `campaigns` (one per (integration_id, external_id))
/// - `campaign_metrics` (one per (campaign_id, date))
/// - `funnel_data` (one per (user_id, date, period_type))
pub const SQLITE_INIT: &str = r#"
-- ---------------------------------------------------------------------------
-- Platform integrations (credentials + per-platform settings JSON)
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS integrations (
    id INTEGER PRIMARY KEY NOT NULL,
    workspace_id TEXT NOT NULL,
    platform TEXT NOT NULL, -- meta | google_analytics
    access_token TEXT NOT NULL,
    refresh_token TEXT NULL,
    expires_at TEXT NULL, -- RFC3339
    platform_user_id TEXT NULL,
    platform_user_name TEXT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    settings TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL, -- RFC3339
    updated_at TEXT NOT NULL, -- RFC3339
    UNIQUE(workspace_id, platform)
);

CREATE INDEX IF NOT EXISTS idx_integrations_platform_active ON integrations(platform, is_active);

-- ---------------------------------------------------------------------------
-- Campaigns (never deleted by sync)
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS campaigns (
    id INTEGER PRIMARY KEY NOT NULL,
    workspace_id TEXT NOT NULL,
    integration_id INTEGER NOT NULL REFERENCES integrations(id),
    external_id TEXT NOT NULL,
    name TEXT NOT NULL,
    status TEXT NOT NULL, -- active | paused | archived
    objective TEXT NULL,
    budget_amount TEXT NOT NULL DEFAULT '0', -- decimal, major units
    budget_type TEXT NULL, -- daily | lifetime
    start_time TEXT NULL,
    end_time TEXT NULL,
    platform TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(integration_id, external_id)
);

-- ---------------------------------------------------------------------------
-- Daily per-campaign performance
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS campaign_metrics (
    id INTEGER PRIMARY KEY NOT NULL,
    campaign_id INTEGER NOT NULL REFERENCES campaigns(id),
    date TEXT NOT NULL, -- YYYY-MM-DD
    spend TEXT NOT NULL DEFAULT '0',
    impressions INTEGER NOT NULL DEFAULT 0,
    clicks INTEGER NOT NULL DEFAULT 0,
    ctr REAL NOT NULL DEFAULT 0,
    cpc REAL NOT NULL DEFAULT 0,
    cpm REAL NOT NULL DEFAULT 0,
    reach INTEGER NOT NULL DEFAULT 0,
    roas REAL NOT NULL DEFAULT 0,
    conversion_value TEXT NOT NULL DEFAULT '0',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(campaign_id, date)
);

-- ---------------------------------------------------------------------------
-- Traffic funnel (daily visitors per workspace owner)
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS funnel_data (
    id INTEGER PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    date TEXT NOT NULL,
    period_type TEXT NOT NULL DEFAULT 'daily',
    visitors INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(user_id, date, period_type)
)
"#;
