use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::session::{ACCOUNT_KEY, PUBLIC_ROUTE};

/// The principal returned by the identity provider after sign-in.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SignedInAccount {
    /// Stable user-facing identifier, usually the UPN or email.
    pub account_identifier: String,
    pub name: Option<String>,
}

impl SignedInAccount {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.account_identifier)
    }

    pub fn initials(&self) -> String {
        let initials: String = self
            .display_name()
            .split(|c: char| c.is_whitespace() || c == '@' || c == '.')
            .filter_map(|part| part.chars().next())
            .take(2)
            .collect::<String>()
            .to_uppercase();

        if initials.is_empty() {
            "U".to_string()
        } else {
            initials
        }
    }
}

/// Signed-in account extracted from the browser session.
///
/// Handlers behind the guard use it for display; a missing account still
/// redirects to the public view rather than rendering anything.
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub SignedInAccount);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentAccount
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to extract session",
                )
                    .into_response()
            })?;

        match session.get::<SignedInAccount>(ACCOUNT_KEY).await {
            Ok(Some(account)) => Ok(CurrentAccount(account)),
            Ok(None) => Err(Redirect::to(PUBLIC_ROUTE).into_response()),
            Err(e) => {
                tracing::warn!(error = %e, "Session store unreadable while loading account");
                Err(Redirect::to(PUBLIC_ROUTE).into_response())
            }
        }
    }
}
