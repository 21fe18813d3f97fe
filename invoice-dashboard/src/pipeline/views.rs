use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::InvoicePipeline;
use crate::services::InvoiceSource;

/// A mounted dashboard: one pipeline, owned until unmount.
pub struct DashboardView {
    id: Uuid,
    pipeline: InvoicePipeline,
    mounted_at: Instant,
    /// Milliseconds after `mounted_at` of the last access.
    last_used_ms: AtomicU64,
}

impl DashboardView {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn pipeline(&self) -> &InvoicePipeline {
        &self.pipeline
    }

    fn touch(&self) {
        let elapsed = self.mounted_at.elapsed().as_millis() as u64;
        self.last_used_ms.store(elapsed, Ordering::Relaxed);
    }

    fn idle_for(&self) -> Duration {
        let last_used = Duration::from_millis(self.last_used_ms.load(Ordering::Relaxed));
        self.mounted_at.elapsed().saturating_sub(last_used)
    }
}

/// Mounted views by id.
///
/// A session's remount replaces the view it references, but two concurrent
/// remounts of one session can each mount a view; the one left unreferenced
/// is reclaimed by the idle sweep.
#[derive(Default)]
pub struct DashboardViews {
    views: DashMap<Uuid, Arc<DashboardView>>,
}

impl DashboardViews {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a new view, starting its fetch.
    pub fn mount(&self, source: Arc<dyn InvoiceSource>) -> Arc<DashboardView> {
        let view = Arc::new(DashboardView {
            id: Uuid::new_v4(),
            pipeline: InvoicePipeline::mount(source),
            mounted_at: Instant::now(),
            last_used_ms: AtomicU64::new(0),
        });

        self.views.insert(view.id, view.clone());
        tracing::debug!(view_id = %view.id, "Dashboard view mounted");
        view
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<DashboardView>> {
        let view = self.views.get(id).map(|entry| entry.value().clone())?;
        view.touch();
        Some(view)
    }

    /// Drop a view. An outstanding fetch for it will be discarded once no
    /// request still holds the view.
    pub fn unmount(&self, id: &Uuid) -> bool {
        let removed = self.views.remove(id).is_some();
        if removed {
            tracing::debug!(view_id = %id, "Dashboard view unmounted");
        }
        removed
    }

    /// Unmount every view idle for longer than `max_idle`.
    pub fn sweep_idle(&self, max_idle: Duration) -> usize {
        let before = self.views.len();
        self.views.retain(|_, view| view.idle_for() <= max_idle);
        before.saturating_sub(self.views.len())
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

/// Periodically unmount views abandoned by closed tabs or expired sessions.
pub fn spawn_idle_sweeper(views: Arc<DashboardViews>, max_idle: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let removed = views.sweep_idle(max_idle);
            if removed > 0 {
                tracing::info!(removed, remaining = views.len(), "Swept idle dashboard views");
            }
        }
    })
}
