pub mod auth;
pub mod metrics;

pub use auth::require_session;
pub use metrics::metrics_middleware;
