//! Clients for the external platforms. No persistence happens here.

pub mod analytics;
pub mod meta;
pub(crate) mod policy;
pub(crate) mod retry;

pub use analytics::AnalyticsApi;
pub use meta::MetaApi;
pub use policy::UPSTREAM_BODY_PREVIEW_CHARS;
