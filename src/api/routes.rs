//! Route registration and middleware stack.

use std::time::Duration;

use axum::{Router, middleware};
use tower_http::compression::CompressionLayer;
use tower_http::timeout::TimeoutLayer;

use crate::api::handlers;
use crate::api::middleware::{global_error_handler, logging_middleware, request_id_middleware};
use crate::state::AppState;

/// Builds the application router.
///
/// Layers run outermost first: request id, logging, compression, error
/// normalization, then the request timeout. The error handler must see
/// uncompressed bodies.
///
/// - `/notifications/...`: provider callbacks
/// - `/services/{service_id}/...`: intake and keyword reads
/// - `/health`, `/metrics`
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    let service_routes = Router::new()
        .merge(handlers::notifications::notification_routes())
        .merge(handlers::jobs::job_routes())
        .merge(handlers::keywords::keyword_routes());

    Router::new()
        .merge(handlers::callbacks::callback_routes())
        .nest("/services", service_routes)
        .merge(handlers::health::health_routes())
        .merge(handlers::metrics::metrics_routes())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn(global_error_handler))
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
