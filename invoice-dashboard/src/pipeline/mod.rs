//! Invoice data pipeline.
//!
//! A pipeline is mounted once per dashboard view. Mounting spawns the single
//! fetch; its outcome moves the state from `Loading` to `Ready` or `Failed`
//! exactly once, and both are terminal. Everything after that is the
//! synchronous derivation in [`derive`].

pub mod derive;
pub mod views;

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::models::Invoice;
use crate::services::metrics;
use crate::services::InvoiceSource;

pub use derive::{derive_listing, Criteria, CriteriaParams, InvoiceRow, Listing, SortOrder};
pub use views::{DashboardView, DashboardViews};

#[derive(Debug, Clone)]
pub enum PipelineState {
    Loading,
    Ready(Arc<[Invoice]>),
    /// User-facing reason; the full error is logged.
    Failed(String),
}

impl PipelineState {
    pub fn is_settled(&self) -> bool {
        !matches!(self, PipelineState::Loading)
    }
}

/// What happened to a fetch outcome when it arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Applied,
    /// The view was torn down first; the outcome was dropped.
    Discarded,
}

pub struct InvoicePipeline {
    state: watch::Receiver<PipelineState>,
}

impl InvoicePipeline {
    /// Start the one fetch for a new mount.
    pub fn mount(source: Arc<dyn InvoiceSource>) -> Self {
        Self::mount_with_handle(source).0
    }

    pub(crate) fn mount_with_handle(
        source: Arc<dyn InvoiceSource>,
    ) -> (Self, JoinHandle<Delivery>) {
        let (sender, receiver) = watch::channel(PipelineState::Loading);

        let fetch = tokio::spawn(async move {
            let next = match source.load().await {
                Ok(invoices) => {
                    tracing::info!(count = invoices.len(), "Invoices loaded");
                    metrics::record_invoice_fetch("success");
                    PipelineState::Ready(invoices.into())
                }
                Err(e) => {
                    tracing::error!(error = %e, "Invoice fetch failed");
                    metrics::record_invoice_fetch(e.outcome_label());
                    PipelineState::Failed(e.user_message().to_string())
                }
            };

            // Fails only when every receiver is gone, i.e. the view unmounted
            match sender.send(next) {
                Ok(()) => Delivery::Applied,
                Err(_) => {
                    tracing::debug!("Dashboard view unmounted before fetch completed; discarding result");
                    Delivery::Discarded
                }
            }
        });

        (Self { state: receiver }, fetch)
    }

    /// Current state without waiting.
    pub fn snapshot(&self) -> PipelineState {
        self.state.borrow().clone()
    }

    /// Wait until the fetch has settled.
    pub async fn settled(&self) -> PipelineState {
        let mut state = self.state.clone();
        loop {
            let current = state.borrow_and_update().clone();
            if current.is_settled() {
                return current;
            }
            if state.changed().await.is_err() {
                // Fetch task ended without publishing
                return PipelineState::Failed("Failed to fetch invoice data".to_string());
            }
        }
    }
}
