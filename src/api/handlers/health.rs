//! Health probes. The database check bypasses the service layer and talks to
//! the pool directly.

use std::collections::HashMap;
use std::time::Instant;

use axum::{Router, extract::State, http::StatusCode, response::Json, routing::get};

use crate::api::dto::{ComponentHealth, HealthResponse, HealthStatus};
use crate::db::AsyncDbPool;
use crate::state::AppState;

/// - `GET /health`: component report, 503 when unhealthy
/// - `GET /health/ready`: readiness probe
/// - `GET /health/live`: liveness probe
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check))
        .route("/health/live", get(liveness_check))
}

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let mut checks = HashMap::new();
    let mut overall = HealthStatus::Healthy;

    if let Some(pool) = &state.db_pool {
        let db = check_database(pool).await;
        if db.status == HealthStatus::Unhealthy {
            overall = HealthStatus::Unhealthy;
        }
        checks.insert("database".to_string(), db);
    }

    let status = match overall {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
    };
    let response = HealthResponse {
        status: overall,
        version: crate::pkg_version().to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        checks,
    };
    (status, Json(response))
}

pub async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    let Some(pool) = &state.db_pool else {
        return StatusCode::OK;
    };
    match check_database(pool).await.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded | HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub async fn liveness_check() -> StatusCode {
    StatusCode::OK
}

async fn check_database(pool: &AsyncDbPool) -> ComponentHealth {
    use diesel_async::RunQueryDsl;

    let start = Instant::now();
    let elapsed = || start.elapsed().as_millis() as u64;

    match pool.get().await {
        Ok(mut conn) => match diesel::sql_query("SELECT 1").execute(&mut conn).await {
            Ok(_) => ComponentHealth::healthy("Connected", elapsed()),
            Err(e) => ComponentHealth::unhealthy(format!("Query failed: {}", e), elapsed()),
        },
        Err(e) => ComponentHealth::unhealthy(format!("Connection failed: {}", e), elapsed()),
    }
}
