//! HTTP API
//!
//! Batch lifecycle triggers plus the standard health endpoint. Phase work
//! runs in spawned tasks; handlers return 202 as soon as the status
//! transition commits.

pub mod batches;
pub mod health;

pub use batches::batch_routes;
pub use health::health_routes;
