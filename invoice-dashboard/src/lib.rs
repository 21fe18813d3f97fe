pub mod config;
pub mod guard;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod session;
pub mod startup;
pub mod utils;

use config::{DashboardSettings, ServerSettings};
use pipeline::DashboardViews;
use services::{IdentityProvider, InvoiceSource};
use session::WebSession;
use std::collections::BTreeSet;
use std::sync::Arc;
use tower_sessions::Session;

/// Shared application state: upstream clients plus the mounted views.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityProvider>,
    pub invoices: Arc<dyn InvoiceSource>,
    pub views: Arc<DashboardViews>,
    pub scopes: Arc<BTreeSet<String>>,
    pub dashboard: DashboardSettings,
    pub server: ServerSettings,
}

impl AppState {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        invoices: Arc<dyn InvoiceSource>,
        scopes: BTreeSet<String>,
        dashboard: DashboardSettings,
        server: ServerSettings,
    ) -> Self {
        Self {
            identity,
            invoices,
            views: Arc::new(DashboardViews::new()),
            scopes: Arc::new(scopes),
            dashboard,
            server,
        }
    }

    /// Session capability for one request's browser session.
    pub fn session_provider(&self, session: Session) -> WebSession {
        WebSession::new(session, self.identity.clone())
    }
}
