//! Runtime adapters and API surface.

pub mod api;
#[cfg(feature = "tokio-runtime")]
pub mod tokio_bridge;

pub use api::{health, status, Health, StatusResponse};
#[cfg(feature = "tokio-runtime")]
pub use tokio_bridge::TokioBridge;
