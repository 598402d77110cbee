//! Bulk job intake. Rows are fanned out by the `process_job` task.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
};
use uuid::Uuid;

use crate::api::dto::{CreateJobRequest, JobResponse};
use crate::error::AppResult;
use crate::state::AppState;
use crate::utils::ValidatedJson;

pub fn job_routes() -> Router<AppState> {
    Router::new().route("/{service_id}/jobs", post(create_job))
}

pub async fn create_job(
    State(state): State<AppState>,
    Path(service_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<CreateJobRequest>,
) -> AppResult<(StatusCode, Json<JobResponse>)> {
    let job = state
        .services
        .intake
        .create_job(service_id, request.into())
        .await?;
    Ok((StatusCode::CREATED, Json(job.into())))
}
