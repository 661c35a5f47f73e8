//! HTTP surface: integration management, sync triggers and liveness.

pub mod guards;
pub mod router;
pub mod routes;

pub use router::{AdsyncState, adsync_router};
