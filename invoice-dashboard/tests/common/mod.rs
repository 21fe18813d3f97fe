//! Test helpers for invoice-dashboard integration tests.
//!
//! Builds the real router over a fake identity provider and an in-memory
//! invoice source, and drives the cookie-based session by hand.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use invoice_dashboard::{
    config::{DashboardSettings, ServerSettings},
    models::{Invoice, SignedInAccount},
    services::{FetchError, IdentityProvider, InvoiceSource},
    session::SignInError,
    startup::build_router,
    AppState,
};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tower::util::ServiceExt;

pub const PROVIDER_AUTHORIZE_URL: &str = "https://login.test/authorize";
pub const GOOD_CODE: &str = "good-code";

/// Identity provider that accepts `GOOD_CODE` and rejects everything else.
pub struct FakeIdentityProvider {
    pub end_session_url: Option<String>,
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    fn authorization_url(
        &self,
        _scopes: &BTreeSet<String>,
        state: &str,
        code_challenge: &str,
    ) -> Result<String, SignInError> {
        Ok(format!(
            "{}?state={}&code_challenge={}",
            PROVIDER_AUTHORIZE_URL, state, code_challenge
        ))
    }

    async fn redeem_code(
        &self,
        code: &str,
        _code_verifier: &str,
        _scopes: &BTreeSet<String>,
    ) -> Result<SignedInAccount, SignInError> {
        if code == GOOD_CODE {
            Ok(SignedInAccount {
                account_identifier: "ada@example.com".to_string(),
                name: Some("Ada Lovelace".to_string()),
            })
        } else {
            Err(SignInError::TokenExchange("invalid_grant".to_string()))
        }
    }

    fn end_session_url(&self) -> Option<String> {
        self.end_session_url.clone()
    }
}

pub enum SourceOutcome {
    Invoices(Vec<Invoice>),
    Error(fn() -> FetchError),
}

/// Invoice source returning a fixed outcome and counting fetches.
///
/// With a gate, each fetch waits until the test opens it.
pub struct StaticInvoiceSource {
    outcome: SourceOutcome,
    calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl StaticInvoiceSource {
    pub fn ok(invoices: Vec<Invoice>) -> Arc<Self> {
        Arc::new(Self {
            outcome: SourceOutcome::Invoices(invoices),
            calls: AtomicUsize::new(0),
            gate: None,
        })
    }

    pub fn failing(error: fn() -> FetchError) -> Arc<Self> {
        Arc::new(Self {
            outcome: SourceOutcome::Error(error),
            calls: AtomicUsize::new(0),
            gate: None,
        })
    }

    pub fn gated(invoices: Vec<Invoice>, gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            outcome: SourceOutcome::Invoices(invoices),
            calls: AtomicUsize::new(0),
            gate: Some(gate),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InvoiceSource for StaticInvoiceSource {
    async fn load(&self) -> Result<Vec<Invoice>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.outcome {
            SourceOutcome::Invoices(invoices) => Ok(invoices.clone()),
            SourceOutcome::Error(make) => Err(make()),
        }
    }
}

/// Three invoices across two months, in fetch order INV-1, INV-2, INV-3.
pub fn sample_invoices() -> Vec<Invoice> {
    serde_json::from_value(serde_json::json!([
        {
            "prefix": "INV-", "number": 1, "date": "2024-01-05",
            "total": "100.00", "symbol": "RM", "status": 3,
            "customer_name": "Acme Sdn Bhd", "customer_phone": "+60 12-345 6789"
        },
        {
            "prefix": "INV-", "number": 2, "date": "2024-02-10",
            "total": "250.50", "symbol": "RM", "status": 4,
            "customer_name": "Globex", "customer_phone": "012 888 1234"
        },
        {
            "prefix": "INV-", "number": 3, "date": "2024-01-20",
            "total": "75.00", "symbol": "RM", "status": 1,
            "customer_name": "Initech", "customer_phone": ""
        }
    ]))
    .expect("sample invoices are valid")
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new(source: Arc<dyn InvoiceSource>) -> Self {
        Self::with_options(source, None, 1000)
    }

    pub fn with_options(
        source: Arc<dyn InvoiceSource>,
        end_session_url: Option<String>,
        first_paint_wait_ms: u64,
    ) -> Self {
        let identity = Arc::new(FakeIdentityProvider { end_session_url });
        let state = AppState::new(
            identity,
            source,
            BTreeSet::from(["User.Read".to_string()]),
            DashboardSettings {
                first_paint_wait_ms,
                view_idle_minutes: 60,
            },
            ServerSettings::default(),
        );
        let router = build_router(state.clone());
        Self { router, state }
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.router
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        self.request("GET", uri, cookie).await
    }

    pub async fn post(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        self.request("POST", uri, cookie).await
    }

    /// Start sign-in; returns the session cookie and the `state` sent to the provider.
    pub async fn begin_sign_in(&self) -> (String, String) {
        let response = self.post("/login", None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let location = location(&response);
        assert!(location.starts_with(PROVIDER_AUTHORIZE_URL));
        let state = query_param(&location, "state").expect("authorization URL carries state");
        let cookie = session_cookie(&response).expect("sign-in start sets a session cookie");

        (cookie, state)
    }

    /// Full sign-in round-trip; returns the signed-in session cookie.
    pub async fn sign_in(&self) -> String {
        let (cookie, state) = self.begin_sign_in().await;

        let callback = format!("/auth/callback?code={}&state={}", GOOD_CODE, state);
        let response = self.get(&callback, Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/dashboard");

        // The id is cycled on sign-in
        session_cookie(&response).unwrap_or(cookie)
    }
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// `name=value` of the session cookie set by a response, if any.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .find(|pair| pair.starts_with("id=") && pair.len() > "id=".len())
        .map(str::to_string)
}

pub fn query_param(url: &str, name: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    serde_urlencoded::from_str::<Vec<(String, String)>>(query)
        .ok()?
        .into_iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value)
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
