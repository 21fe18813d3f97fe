use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use service_core::middleware::{
    request_id_middleware, security_headers_middleware, REQUEST_ID_HEADER,
};
use time::Duration;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

use crate::handlers::{
    app::{health_check, login_page},
    auth::{callback_handler, login_handler, logout_handler},
    dashboard::{dashboard_handler, invoices_handler},
    metrics::metrics,
};
use crate::middleware::{metrics_middleware, require_session};
use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    // Lax so the session cookie survives the provider's redirect back
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(state.server.secure_cookie)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(Duration::hours(
            state.server.session_inactivity_hours,
        )));

    let protected = Router::new()
        .route("/dashboard", get(dashboard_handler))
        .route("/dashboard/invoices", get(invoices_handler))
        .route_layer(from_fn_with_state(state.clone(), require_session));

    Router::new()
        .route("/", get(login_page))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/login", post(login_handler))
        .route("/auth/callback", get(callback_handler))
        .route("/logout", post(logout_handler))
        .merge(protected)
        .nest_service("/static", ServeDir::new(&state.server.static_dir))
        .layer(session_layer)
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}
