//! Identity provider adapter.
//!
//! Speaks the OAuth 2.0 authorization-code flow with PKCE against a
//! Microsoft-style authority (`{authority}/oauth2/v2.0/{authorize,token,logout}`).

use async_trait::async_trait;
use reqwest::{Client, Url};
use secrecy::ExposeSecret;
use serde::Deserialize;
use service_core::observability::TracedClientExt;
use std::collections::BTreeSet;
use std::time::Duration;

use crate::config::IdentitySettings;
use crate::models::SignedInAccount;
use crate::session::SignInError;
use crate::utils::jwt::decode_id_token_claims;

/// Scopes always requested so the token response carries an id token.
const OIDC_SCOPES: [&str; 2] = ["openid", "profile"];

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL of the provider's interactive prompt for this sign-in attempt.
    fn authorization_url(
        &self,
        scopes: &BTreeSet<String>,
        state: &str,
        code_challenge: &str,
    ) -> Result<String, SignInError>;

    /// Exchange an authorization code for the signed-in account.
    async fn redeem_code(
        &self,
        code: &str,
        code_verifier: &str,
        scopes: &BTreeSet<String>,
    ) -> Result<SignedInAccount, SignInError>;

    /// Provider-side logout, when the provider has one.
    fn end_session_url(&self) -> Option<String>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

pub struct OAuthIdentityClient {
    client: Client,
    settings: IdentitySettings,
}

impl OAuthIdentityClient {
    pub fn new(settings: IdentitySettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self { client, settings })
    }

    fn endpoint(&self, leaf: &str) -> String {
        format!(
            "{}/oauth2/v2.0/{}",
            self.settings.authority.trim_end_matches('/'),
            leaf
        )
    }

    fn scope_param(scopes: &BTreeSet<String>) -> String {
        let mut all: BTreeSet<&str> = scopes.iter().map(String::as_str).collect();
        all.extend(OIDC_SCOPES);
        all.into_iter().collect::<Vec<_>>().join(" ")
    }
}

#[async_trait]
impl IdentityProvider for OAuthIdentityClient {
    fn authorization_url(
        &self,
        scopes: &BTreeSet<String>,
        state: &str,
        code_challenge: &str,
    ) -> Result<String, SignInError> {
        let scope = Self::scope_param(scopes);
        let url = Url::parse_with_params(
            &self.endpoint("authorize"),
            &[
                ("client_id", self.settings.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.settings.redirect_uri.as_str()),
                ("response_mode", "query"),
                ("scope", scope.as_str()),
                ("state", state),
                ("code_challenge", code_challenge),
                ("code_challenge_method", "S256"),
                ("prompt", "select_account"),
            ],
        )
        .map_err(|e| SignInError::Provider(format!("invalid authority URL: {}", e)))?;

        Ok(url.to_string())
    }

    async fn redeem_code(
        &self,
        code: &str,
        code_verifier: &str,
        scopes: &BTreeSet<String>,
    ) -> Result<SignedInAccount, SignInError> {
        let token_url = self.endpoint("token");
        let scope = Self::scope_param(scopes);

        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("client_id", self.settings.client_id.as_str()),
            ("code", code),
            ("redirect_uri", self.settings.redirect_uri.as_str()),
            ("code_verifier", code_verifier),
            ("scope", scope.as_str()),
        ];
        if let Some(secret) = &self.settings.client_secret {
            form.push(("client_secret", secret.expose_secret().as_str()));
        }

        let response = self
            .client
            .traced_post(&token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send token request to {}: {}", token_url, e);
                SignInError::TokenExchange(format!("token request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = match response.json::<TokenErrorResponse>().await {
                Ok(body) => match body.error_description {
                    Some(description) => format!("{}: {}", body.error, description),
                    None => body.error,
                },
                Err(_) => format!("HTTP {}", status),
            };
            return Err(SignInError::TokenExchange(detail));
        }

        let tokens: TokenResponse = response.json().await.map_err(|e| {
            SignInError::TokenExchange(format!("unreadable token response: {}", e))
        })?;

        let id_token = tokens.id_token.ok_or_else(|| {
            SignInError::InvalidIdToken("token response carried no id_token".to_string())
        })?;

        let claims = decode_id_token_claims(&id_token)
            .map_err(|e| SignInError::InvalidIdToken(e.to_string()))?;

        Ok(SignedInAccount {
            account_identifier: claims.account_identifier().to_string(),
            name: claims.name.clone(),
        })
    }

    fn end_session_url(&self) -> Option<String> {
        let endpoint = self.endpoint("logout");
        match &self.settings.post_logout_redirect_uri {
            Some(redirect) => {
                Url::parse_with_params(&endpoint, &[("post_logout_redirect_uri", redirect)])
                    .ok()
                    .map(|url| url.to_string())
            }
            None => Some(endpoint),
        }
    }
}
