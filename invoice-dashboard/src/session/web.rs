use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tower_sessions::Session;
use uuid::Uuid;

use super::{
    AuthorizationCallback, SessionError, SessionProvider, SignInError, SignInRedirect,
    ACCOUNT_KEY, DASHBOARD_VIEW_KEY, PENDING_SIGN_IN_KEY,
};
use crate::models::SignedInAccount;
use crate::services::identity::IdentityProvider;
use crate::utils::crypto::{pkce_challenge, random_url_token};

/// Sign-in started for this browser but not yet completed.
#[derive(Debug, Serialize, Deserialize)]
struct PendingSignIn {
    state: String,
    code_verifier: String,
    scopes: BTreeSet<String>,
}

/// [`SessionProvider`] over a tower-sessions browser session.
pub struct WebSession {
    session: Session,
    identity: Arc<dyn IdentityProvider>,
}

impl WebSession {
    pub fn new(session: Session, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { session, identity }
    }

    pub async fn account(&self) -> Result<Option<SignedInAccount>, SessionError> {
        Ok(self.session.get(ACCOUNT_KEY).await?)
    }

    /// Id of the dashboard view mounted for this browser, if any.
    pub async fn dashboard_view(&self) -> Result<Option<Uuid>, SessionError> {
        Ok(self.session.get(DASHBOARD_VIEW_KEY).await?)
    }

    pub async fn set_dashboard_view(&self, view_id: Uuid) -> Result<(), SessionError> {
        Ok(self.session.insert(DASHBOARD_VIEW_KEY, view_id).await?)
    }
}

#[async_trait]
impl SessionProvider for WebSession {
    async fn authentication_snapshot(&self) -> Option<bool> {
        match self.account().await {
            Ok(account) => Some(account.is_some()),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read session; treating as signed out");
                None
            }
        }
    }

    async fn begin_interactive_sign_in(
        &self,
        scopes: &BTreeSet<String>,
    ) -> Result<SignInRedirect, SignInError> {
        let state = random_url_token(32);
        let code_verifier = random_url_token(32);
        let authorization_url =
            self.identity
                .authorization_url(scopes, &state, &pkce_challenge(&code_verifier))?;

        // A newer attempt replaces any earlier pending one
        self.session
            .insert(
                PENDING_SIGN_IN_KEY,
                PendingSignIn {
                    state,
                    code_verifier,
                    scopes: scopes.clone(),
                },
            )
            .await
            .map_err(SessionError::from)?;

        tracing::debug!(scopes = ?scopes, "Interactive sign-in started");

        Ok(SignInRedirect { authorization_url })
    }

    async fn complete_interactive_sign_in(
        &self,
        callback: AuthorizationCallback,
    ) -> Result<SignedInAccount, SignInError> {
        // Single use: a replayed callback finds nothing pending
        let pending: PendingSignIn = self
            .session
            .remove(PENDING_SIGN_IN_KEY)
            .await
            .map_err(SessionError::from)?
            .ok_or(SignInError::NotPending)?;

        if callback.state.as_deref() != Some(pending.state.as_str()) {
            return Err(SignInError::StateMismatch);
        }

        if let Some(error) = callback.error.as_deref() {
            return Err(SignInError::from_callback_error(
                error,
                callback.error_description.as_deref(),
            ));
        }

        let code = callback.code.ok_or_else(|| {
            SignInError::Provider("callback carried no authorization code".to_string())
        })?;

        let account = self
            .identity
            .redeem_code(&code, &pending.code_verifier, &pending.scopes)
            .await?;

        // New session id on privilege change
        self.session.cycle_id().await.map_err(SessionError::from)?;
        self.session
            .insert(ACCOUNT_KEY, &account)
            .await
            .map_err(SessionError::from)?;

        Ok(account)
    }

    async fn sign_out(&self) -> Result<(), SessionError> {
        self.session.flush().await?;
        Ok(())
    }
}
