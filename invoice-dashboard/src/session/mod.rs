//! Session state capability.
//!
//! The guard and the dashboard never read the browser session directly;
//! they go through [`SessionProvider`], which answers "is a principal signed
//! in" and owns the sign-in and sign-out transitions.

pub mod web;

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeSet;
use thiserror::Error;

use crate::models::SignedInAccount;

pub use web::WebSession;

/// The public (sign-in) view.
pub const PUBLIC_ROUTE: &str = "/";
/// The protected dashboard view.
pub const DASHBOARD_ROUTE: &str = "/dashboard";

pub(crate) const ACCOUNT_KEY: &str = "account";
pub(crate) const PENDING_SIGN_IN_KEY: &str = "pending_sign_in";
pub(crate) const DASHBOARD_VIEW_KEY: &str = "dashboard_view";

/// Where to send the browser to continue an interactive sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInRedirect {
    pub authorization_url: String,
}

/// Query parameters the identity provider sends back to `/auth/callback`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AuthorizationCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Error)]
#[error("session store unavailable: {0}")]
pub struct SessionError(#[from] tower_sessions::session::Error);

#[derive(Debug, Error)]
pub enum SignInError {
    /// The user backed out of the provider's prompt.
    #[error("sign-in was cancelled: {0}")]
    Cancelled(String),

    #[error("identity provider rejected sign-in: {0}")]
    Provider(String),

    #[error("sign-in state did not match the pending request")]
    StateMismatch,

    #[error("no sign-in is pending for this session")]
    NotPending,

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("id token could not be read: {0}")]
    InvalidIdToken(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl SignInError {
    /// Cancellation is an expected outcome, not a failure to report.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, SignInError::Cancelled(_))
    }

    /// Map an OAuth `error` callback parameter to a sign-in error.
    pub fn from_callback_error(error: &str, description: Option<&str>) -> Self {
        let detail = match description {
            Some(description) => format!("{}: {}", error, description),
            None => error.to_string(),
        };

        match error {
            "access_denied" | "user_cancelled" | "interaction_required" => {
                SignInError::Cancelled(detail)
            }
            _ => SignInError::Provider(detail),
        }
    }

    pub fn outcome_label(&self) -> &'static str {
        match self {
            SignInError::Cancelled(_) => "cancelled",
            SignInError::Provider(_) => "provider_error",
            SignInError::StateMismatch | SignInError::NotPending => "invalid_state",
            SignInError::TokenExchange(_) | SignInError::InvalidIdToken(_) => "token_error",
            SignInError::Session(_) => "session_error",
        }
    }
}

/// Capability over the signed-in state of one browser session.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// `Some(authenticated)` once the backing store answered; `None` when it
    /// could not be read.
    async fn authentication_snapshot(&self) -> Option<bool>;

    async fn is_authenticated(&self) -> bool {
        self.authentication_snapshot().await.unwrap_or(false)
    }

    /// Start an interactive sign-in for `scopes`. The browser must follow
    /// the returned redirect to the provider.
    async fn begin_interactive_sign_in(
        &self,
        scopes: &BTreeSet<String>,
    ) -> Result<SignInRedirect, SignInError>;

    /// Resolve the sign-in begun by
    /// [`begin_interactive_sign_in`](Self::begin_interactive_sign_in) with
    /// the provider's callback.
    async fn complete_interactive_sign_in(
        &self,
        callback: AuthorizationCallback,
    ) -> Result<SignedInAccount, SignInError>;

    /// End the session. Afterwards `is_authenticated` reports `false`.
    async fn sign_out(&self) -> Result<(), SessionError>;
}
