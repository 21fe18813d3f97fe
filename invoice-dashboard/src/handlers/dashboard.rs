use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower_sessions::Session;

use crate::models::{CurrentAccount, InvoiceStatus, SignedInAccount};
use crate::pipeline::{
    derive_listing, Criteria, CriteriaParams, DashboardView, InvoiceRow, PipelineState, SortOrder,
};
use crate::session::WebSession;
use crate::AppState;

/// One `<option>` of a filter select.
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    fn new(value: impl Into<String>, label: impl Into<String>, current: Option<&str>) -> Self {
        let value = value.into();
        let selected = current == Some(value.as_str());
        Self {
            label: label.into(),
            selected,
            value,
        }
    }
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub account: SignedInAccount,
    pub loading: bool,
    pub error: Option<String>,
    pub rows: Vec<InvoiceRow>,
    pub months: Vec<SelectOption>,
    pub statuses: Vec<SelectOption>,
    pub orders: Vec<SelectOption>,
    /// Where the loading page polls for the settled view.
    pub refresh_url: String,
}

impl DashboardTemplate {
    fn render_state(account: SignedInAccount, state: PipelineState, criteria: &Criteria) -> Self {
        let (loading, error, rows, months) = match state {
            PipelineState::Loading => (true, None, Vec::new(), Vec::new()),
            PipelineState::Failed(reason) => (false, Some(reason), Vec::new(), Vec::new()),
            PipelineState::Ready(invoices) => {
                let listing = derive_listing(&invoices, criteria);
                (false, None, listing.rows, listing.months)
            }
        };

        let month = criteria.month.as_deref();
        let status = criteria.status.as_deref();
        let order = Some(criteria.order.as_str());

        let query = serde_urlencoded::to_string(criteria.to_params()).unwrap_or_default();

        Self {
            account,
            loading,
            error,
            rows,
            months: months
                .into_iter()
                .map(|m| SelectOption::new(m.clone(), m, month))
                .collect(),
            statuses: InvoiceStatus::KNOWN
                .iter()
                .map(|s| SelectOption::new(s.label(), s.label(), status))
                .collect(),
            orders: [SortOrder::Newest, SortOrder::Oldest]
                .iter()
                .map(|o| SelectOption::new(o.as_str(), o.label(), order))
                .collect(),
            refresh_url: format!("/dashboard/invoices?{}", query),
        }
    }
}

fn session_failure(e: impl std::fmt::Display) -> Response {
    tracing::error!(error = %e, "Session store failure on dashboard");
    (StatusCode::INTERNAL_SERVER_ERROR, "Session unavailable").into_response()
}

/// Mount a fresh view for this browser, replacing any previous one.
async fn mount_view(state: &AppState, provider: &WebSession) -> Result<Arc<DashboardView>, Response> {
    if let Some(previous) = provider.dashboard_view().await.map_err(session_failure)? {
        state.views.unmount(&previous);
    }

    let view = state.views.mount(state.invoices.clone());
    provider
        .set_dashboard_view(view.id())
        .await
        .map_err(session_failure)?;

    Ok(view)
}

/// Entering the dashboard mounts a new view, so each visit fetches once.
pub async fn dashboard_handler(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    session: Session,
    Query(params): Query<CriteriaParams>,
) -> Response {
    let provider = state.session_provider(session);
    let view = match mount_view(&state, &provider).await {
        Ok(view) => view,
        Err(response) => return response,
    };

    // Short wait so a fast API renders in one response instead of a
    // loading page
    let wait = state.dashboard.first_paint_wait();
    let pipeline_state = tokio::time::timeout(wait, view.pipeline().settled())
        .await
        .unwrap_or(PipelineState::Loading);

    let criteria = Criteria::from(params);
    DashboardTemplate::render_state(account, pipeline_state, &criteria).into_response()
}

/// Criteria change: re-derive from the mounted view's collection, no fetch.
pub async fn invoices_handler(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    session: Session,
    Query(params): Query<CriteriaParams>,
) -> Response {
    let provider = state.session_provider(session);

    let existing = match provider.dashboard_view().await {
        Ok(id) => id.and_then(|id| state.views.get(&id)),
        Err(e) => return session_failure(e),
    };

    let view = match existing {
        Some(view) => view,
        None => {
            tracing::debug!("No mounted dashboard view for session; mounting one");
            match mount_view(&state, &provider).await {
                Ok(view) => view,
                Err(response) => return response,
            }
        }
    };

    let criteria = Criteria::from(params);
    DashboardTemplate::render_state(account, view.pipeline().snapshot(), &criteria)
        .into_response()
}
