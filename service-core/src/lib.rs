//! service-core: shared web infrastructure for the invoice dashboard.
pub mod middleware;
pub mod observability;

pub use axum;
pub use tracing;
