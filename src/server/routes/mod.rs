pub mod health;
pub mod integrations;
pub mod sync;
