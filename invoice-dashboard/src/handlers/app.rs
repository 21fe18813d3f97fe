use askama::Template;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::models::SignedInAccount;
use crate::AppState;

/// The public sign-in view.
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub account: Option<SignedInAccount>,
    pub error: Option<&'static str>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginPageParams {
    pub error: Option<String>,
}

pub async fn login_page(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<LoginPageParams>,
) -> impl IntoResponse {
    let account = match state.session_provider(session).account().await {
        Ok(account) => account,
        Err(e) => {
            tracing::warn!(error = %e, "Could not read session for sign-in page");
            None
        }
    };

    // Only known codes are echoed back; the text is fixed
    let error = params.error.as_deref().and_then(|code| match code {
        "sign_in_failed" => Some("Sign-in failed. Please try again."),
        _ => None,
    });

    LoginTemplate { account, error }
}

pub async fn health_check() -> &'static str {
    "OK"
}
