//! Graph API (Marketing API) client, status normalization and row mapping.

mod client;
pub mod mapping;
mod oauth;
pub mod status;

pub use client::MetaApi;
pub use oauth::{CodeExchange, ExchangedToken};
pub use status::{campaign_status, normalize_status};

pub const META_USER_AGENT: &str = concat!("adsync/", env!("CARGO_PKG_VERSION"));
