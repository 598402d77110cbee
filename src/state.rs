//! Shared state handed to every request handler.

use metrics_exporter_prometheus::PrometheusHandle;

use crate::db::AsyncDbPool;
use crate::services::Services;

/// Cloning is cheap; everything inside is reference counted.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    /// Used directly by the health check.
    pub db_pool: Option<AsyncDbPool>,
    /// Present when the Prometheus recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        services: Services,
        db_pool: Option<AsyncDbPool>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            services,
            db_pool,
            metrics,
        }
    }

    /// State over the in-memory store with a recording task queue.
    #[cfg(test)]
    pub(crate) fn for_tests(
        store: std::sync::Arc<crate::repositories::memory::MemoryStore>,
    ) -> (Self, std::sync::Arc<crate::tasks::queue::RecordingQueue>) {
        let queue = std::sync::Arc::new(crate::tasks::queue::RecordingQueue::default());
        let services = Services::for_tests(store, Vec::new(), queue.clone());
        (Self::new(services, None, None), queue)
    }
}
