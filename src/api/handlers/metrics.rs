//! Prometheus scrape endpoint.

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};

use crate::state::AppState;

pub fn metrics_routes() -> Router<AppState> {
    Router::new().route("/metrics", get(render_metrics))
}

/// 404 when the recorder is not installed.
pub async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Metrics are disabled").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::repositories::memory::MemoryStore;

    #[tokio::test]
    async fn test_disabled_metrics_are_not_found() {
        let (state, _) = AppState::for_tests(Arc::new(MemoryStore::new()));
        let response = metrics_routes()
            .with_state(state)
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
