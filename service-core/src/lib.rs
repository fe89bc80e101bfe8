//! service-core: Shared infrastructure for booking platform services.
pub mod error;
pub mod middleware;

pub use axum;
pub use mongodb;
pub use serde;
pub use tracing;
pub use validator;
