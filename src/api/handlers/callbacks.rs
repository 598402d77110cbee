//! Provider callbacks: Sinch keyword messages, Sinch delivery reports and SES
//! events relayed by SNS.
//!
//! Reports for unknown notifications or transitions that no longer apply are
//! acknowledged with `{"status": "ok"}` so providers stop retrying.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::post,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::dto::{
    CallbackAck, KeywordStored, SesNotification, SinchDeliveryReport, SinchKeywordCallback,
    SnsEnvelope,
};
use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::services::notifications::{SES, SesEventType};
use crate::services::{DeliveryReportOutcome, InboundKeywordMessage, KeywordOutcome};
use crate::state::AppState;
use crate::utils::ValidatedJson;

pub fn callback_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications/sms/shortnumber_keyword/sinch",
            post(receive_sinch_keyword),
        )
        .route(
            "/notifications/sms/sinch/{notification_id}",
            post(receive_sinch_delivery_report),
        )
        .route("/notifications/email/ses", post(receive_ses_event))
}

pub async fn receive_sinch_keyword(
    State(state): State<AppState>,
    ValidatedJson(callback): ValidatedJson<SinchKeywordCallback>,
) -> AppResult<Response> {
    let message = InboundKeywordMessage::try_from(callback)?;
    let response = match state.services.callbacks.receive_keyword(message).await? {
        KeywordOutcome::Stored(keyword) => Json(KeywordStored::new(keyword.id)).into_response(),
        KeywordOutcome::Unroutable => Json(CallbackAck::ok()).into_response(),
    };
    Ok(response)
}

pub async fn receive_sinch_delivery_report(
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
    ValidatedJson(report): ValidatedJson<SinchDeliveryReport>,
) -> AppResult<Json<CallbackAck>> {
    let batch_id = report.batch_id.unwrap_or_default();
    let status = report.status.unwrap_or_default();
    let outcome = state
        .services
        .callbacks
        .apply_sinch_report(notification_id, &batch_id, &status)
        .await?;
    log_outcome("sinch", &notification_id.to_string(), &outcome);
    Ok(Json(CallbackAck::ok()))
}

/// SNS posts with `Content-Type: text/plain`, so the body is read raw.
pub async fn receive_ses_event(
    State(state): State<AppState>,
    body: String,
) -> AppResult<Json<CallbackAck>> {
    let envelope: SnsEnvelope = serde_json::from_str(&body).map_err(|e| AppError::BadRequest {
        message: format!("Invalid SNS message: {}", e),
    })?;

    match envelope.kind.as_str() {
        SnsEnvelope::NOTIFICATION => {}
        SnsEnvelope::SUBSCRIPTION_CONFIRMATION => {
            info!(
                subscribe_url = envelope.subscribe_url.as_deref().unwrap_or_default(),
                "SNS subscription confirmation received"
            );
            return Ok(Json(CallbackAck::ok()));
        }
        other => {
            warn!(kind = other, "Ignoring SNS message type");
            return Ok(Json(CallbackAck::ok()));
        }
    }

    let event: SesNotification =
        serde_json::from_str(&envelope.message).map_err(|e| AppError::BadRequest {
            message: format!("Invalid SES notification: {}", e),
        })?;
    let bounce_type = event.bounce.as_ref().map(|b| b.bounce_type.as_str());
    let Some(event_type) = SesEventType::from_notification(&event.notification_type, bounce_type)
    else {
        warn!(
            notification_type = %event.notification_type,
            message_id = %event.mail.message_id,
            "Unhandled SES notification type"
        );
        metrics::record_delivery_report_failure(SES, "unhandled_event");
        return Ok(Json(CallbackAck::ok()));
    };

    let outcome = state
        .services
        .callbacks
        .apply_ses_event(&event.mail.message_id, event_type)
        .await?;
    log_outcome(SES, &event.mail.message_id, &outcome);
    Ok(Json(CallbackAck::ok()))
}

fn log_outcome(provider: &str, key: &str, outcome: &DeliveryReportOutcome) {
    match outcome {
        DeliveryReportOutcome::Updated(n) => {
            tracing::debug!(provider, key, status = %n.status, "Delivery report acknowledged")
        }
        DeliveryReportOutcome::UnknownNotification => {
            tracing::debug!(provider, key, "Delivery report for unknown notification acknowledged")
        }
        DeliveryReportOutcome::Ignored { current } => {
            tracing::debug!(provider, key, %current, "Stale delivery report acknowledged")
        }
    }
}
