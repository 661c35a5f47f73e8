mod adsync;
mod api;
mod exchange;

pub use adsync::{AdsyncError, ApiErrorBody};
pub use api::ApiError;
pub use exchange::ExchangeError;

pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}
