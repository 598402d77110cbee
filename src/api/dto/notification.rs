//! Single-notification intake.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{EmailParameters, NotificationType};
use crate::services::{NotificationRequest, QueuedNotification};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateNotificationRequest {
    #[validate(required(message = "template_id is required"))]
    pub template_id: Option<Uuid>,
    #[validate(
        required(message = "template_version is required"),
        range(min = 1, message = "template_version must be positive")
    )]
    pub template_version: Option<i32>,
    #[validate(
        required(message = "to is required"),
        length(min = 1, max = 320, message = "to must be between 1 and 320 characters")
    )]
    pub to: Option<String>,
    #[serde(default)]
    pub personalisation: Option<HashMap<String, String>>,
    #[serde(default)]
    pub email_parameters: Option<EmailParameters>,
}

impl From<CreateNotificationRequest> for NotificationRequest {
    fn from(request: CreateNotificationRequest) -> Self {
        NotificationRequest {
            template_id: request.template_id.unwrap_or_default(),
            template_version: request.template_version.unwrap_or_default(),
            to: request.to.unwrap_or_default(),
            personalisation: request.personalisation,
            email_parameters: request.email_parameters,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationQueuedResponse {
    pub id: Uuid,
    pub channel: NotificationType,
}

impl From<QueuedNotification> for NotificationQueuedResponse {
    fn from(queued: QueuedNotification) -> Self {
        Self {
            id: queued.id,
            channel: queued.channel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_requires_recipient_and_template() {
        let request: CreateNotificationRequest =
            serde_json::from_str(r#"{"template_version": 0}"#).unwrap();
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("template_id"));
        assert!(fields.contains_key("template_version"));
        assert!(fields.contains_key("to"));
    }

    #[test]
    fn test_response_serializes_channel_lowercase() {
        let body = serde_json::to_value(NotificationQueuedResponse {
            id: Uuid::nil(),
            channel: NotificationType::Sms,
        })
        .unwrap();
        assert_eq!(body["channel"], "sms");
    }
}
