use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::guard::{decide_snapshot, GuardDecision};
use crate::session::{SessionProvider, PUBLIC_ROUTE};
use crate::AppState;

/// Gate protected routes on the session's authentication state.
///
/// Unauthenticated requests get a 303 to the public view before the handler
/// runs, so the protected URL never becomes a history entry. Allowed
/// responses are marked `no-store` so back-navigation after sign-out cannot
/// replay them from cache.
pub async fn require_session(
    State(state): State<AppState>,
    session: Session,
    request: Request<Body>,
    next: Next,
) -> Response {
    let provider = state.session_provider(session);

    match decide_snapshot(provider.authentication_snapshot().await) {
        GuardDecision::RedirectToPublic => {
            tracing::debug!(path = %request.uri().path(), "Redirecting unauthenticated request");
            Redirect::to(PUBLIC_ROUTE).into_response()
        }
        GuardDecision::Allow => {
            let mut response = next.run(request).await;
            response
                .headers_mut()
                .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
            response
        }
    }
}
