//! Database module: models, schema and the actor-owned SQLite store.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `upsert.rs`: natural-key upsert payloads
//! - `traits.rs`: the `SyncStore` gateway used by sync and token exchange

pub mod actor;
pub mod models;
pub mod schema;
pub mod traits;
pub mod upsert;

pub use models::{
    BudgetType, Campaign, CampaignMetric, CampaignStatus, FunnelDatum, Integration,
    IntegrationSettings, Money, PeriodType, Platform,
};
pub use schema::SQLITE_INIT;
pub use traits::SyncStore;
pub use upsert::{CampaignMetricUpsert, CampaignUpsert, FunnelDatumUpsert, IntegrationUpsert, Upsert};

pub use actor::{DbActorHandle, spawn};
