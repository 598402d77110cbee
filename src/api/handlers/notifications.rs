//! Single-notification intake. The notification row is written by the
//! delivery task, not here.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
};
use uuid::Uuid;

use crate::api::dto::{CreateNotificationRequest, NotificationQueuedResponse};
use crate::error::AppResult;
use crate::state::AppState;
use crate::utils::ValidatedJson;

pub fn notification_routes() -> Router<AppState> {
    Router::new().route("/{service_id}/notifications", post(queue_notification))
}

/// `202 Accepted` with the id the notification will be stored under.
pub async fn queue_notification(
    State(state): State<AppState>,
    Path(service_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<CreateNotificationRequest>,
) -> AppResult<(StatusCode, Json<NotificationQueuedResponse>)> {
    let queued = state
        .services
        .intake
        .queue_notification(service_id, request.into())
        .await?;
    Ok((StatusCode::ACCEPTED, Json(queued.into())))
}
