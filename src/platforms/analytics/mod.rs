//! Analytics Data API client and service-account authorization.

mod client;
pub mod mapping;
mod service_account;

pub use client::AnalyticsApi;
pub use service_account::{ANALYTICS_READONLY_SCOPE, JWT_BEARER_GRANT, ServiceAccount};

pub const ANALYTICS_USER_AGENT: &str = concat!("adsync/", env!("CARGO_PKG_VERSION"));
