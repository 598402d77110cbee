use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::NotificationType;
use crate::services::{DeliveryRequest, DispatchOutcome};
use crate::tasks::error::TaskFailure;
use crate::tasks::types::{Task, TaskContext};

/// Sends one notification; the payload stays encrypted until execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliverNotificationTask {
    pub service_id: Uuid,
    pub notification_id: Uuid,
    pub encrypted_payload: String,
    /// ISO-8601 creation time of the notification.
    pub created_at: String,
    pub channel: NotificationType,
}

impl DeliverNotificationTask {
    fn request(&self) -> Result<DeliveryRequest, AppError> {
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| AppError::Validation {
                field: "created_at".to_string(),
                reason: e.to_string(),
            })?;
        Ok(DeliveryRequest {
            service_id: self.service_id,
            notification_id: self.notification_id,
            encrypted_payload: self.encrypted_payload.clone(),
            created_at,
            channel: self.channel,
        })
    }
}

#[async_trait]
impl Task for DeliverNotificationTask {
    fn task_type() -> &'static str
    where
        Self: Sized,
    {
        "deliver_notification"
    }

    async fn execute(&self, ctx: TaskContext) -> Result<(), TaskFailure> {
        let request = self.request().map_err(TaskFailure::Abort)?;
        let outcome = ctx.services.dispatch.deliver(request).await?;

        match outcome {
            DispatchOutcome::Sent { provider, reference } => tracing::debug!(
                notification_id = %self.notification_id,
                provider,
                %reference,
                attempt = ctx.attempt,
                "Delivery task finished"
            ),
            DispatchOutcome::Failed { status } => tracing::info!(
                notification_id = %self.notification_id,
                %status,
                "Delivery refused by provider"
            ),
            DispatchOutcome::Rejected { reason } => tracing::info!(
                notification_id = %self.notification_id,
                %reason,
                "Delivery rejected before send"
            ),
            DispatchOutcome::AlreadyProcessed => {}
        }
        Ok(())
    }

    fn description(&self) -> Option<String> {
        Some(format!("Deliver {} notification {}", self.channel, self.notification_id))
    }
}
