pub mod config;
pub mod db;
pub mod error;
pub mod platforms;
pub mod scheduler;
pub mod server;
pub mod service;
pub mod sync;
pub(crate) mod utils;

pub use error::{AdsyncError, ApiError, ExchangeError};
