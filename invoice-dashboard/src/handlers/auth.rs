use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::services::metrics::record_sign_in;
use crate::session::{AuthorizationCallback, SessionProvider, DASHBOARD_ROUTE, PUBLIC_ROUTE};
use crate::AppState;

const SIGN_IN_FAILED_ROUTE: &str = "/?error=sign_in_failed";

/// Start the interactive sign-in by sending the browser to the provider.
pub async fn login_handler(State(state): State<AppState>, session: Session) -> Response {
    let provider = state.session_provider(session);

    match provider.begin_interactive_sign_in(&state.scopes).await {
        Ok(redirect) => Redirect::to(&redirect.authorization_url).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to start sign-in");
            record_sign_in(e.outcome_label());
            Redirect::to(SIGN_IN_FAILED_ROUTE).into_response()
        }
    }
}

/// Provider redirect target; finishes sign-in and enters the dashboard.
pub async fn callback_handler(
    State(state): State<AppState>,
    session: Session,
    Query(callback): Query<AuthorizationCallback>,
) -> Response {
    let provider = state.session_provider(session);

    match provider.complete_interactive_sign_in(callback).await {
        Ok(account) => {
            tracing::info!(account = %account.account_identifier, "Signed in");
            record_sign_in("success");
            Redirect::to(DASHBOARD_ROUTE).into_response()
        }
        Err(e) if e.is_cancellation() => {
            tracing::info!(reason = %e, "Sign-in cancelled by user");
            record_sign_in(e.outcome_label());
            Redirect::to(PUBLIC_ROUTE).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Sign-in failed");
            record_sign_in(e.outcome_label());
            Redirect::to(SIGN_IN_FAILED_ROUTE).into_response()
        }
    }
}

/// End the session, drop the mounted dashboard, then end the provider's
/// session too when it has a logout endpoint.
pub async fn logout_handler(State(state): State<AppState>, session: Session) -> Response {
    let provider = state.session_provider(session);

    match provider.dashboard_view().await {
        Ok(Some(view_id)) => {
            state.views.unmount(&view_id);
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Could not read dashboard view during sign-out"),
    }

    // Clear locally regardless; the session data is gone even if the store
    // delete fails
    if let Err(e) = provider.sign_out().await {
        tracing::error!(error = %e, "Failed to delete session during sign-out");
    } else {
        tracing::info!("Signed out");
    }

    let target = state
        .identity
        .end_session_url()
        .unwrap_or_else(|| PUBLIC_ROUTE.to_string());

    Redirect::to(&target).into_response()
}
