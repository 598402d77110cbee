//! Provider callback bodies and their acknowledgements.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;
use crate::services::InboundKeywordMessage;
use crate::services::notifications::SINCH;

/// Keyword message posted by Sinch for a short number.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SinchKeywordCallback {
    #[validate(required(message = "id missing from Sinch callback data"))]
    pub id: Option<String>,
    #[validate(required(message = "from missing from Sinch callback data"))]
    pub from: Option<String>,
    #[validate(required(message = "to missing from Sinch callback data"))]
    pub to: Option<String>,
    #[validate(required(message = "body missing from Sinch callback data"))]
    pub body: Option<String>,
    #[validate(required(message = "received_at missing from Sinch callback data"))]
    pub received_at: Option<String>,
}

impl TryFrom<SinchKeywordCallback> for InboundKeywordMessage {
    type Error = AppError;

    /// Expects a validated callback; absent fields become empty strings.
    fn try_from(callback: SinchKeywordCallback) -> Result<Self, Self::Error> {
        let raw = callback.received_at.unwrap_or_default();
        let received_at = parse_received_at(&raw).ok_or_else(|| AppError::Validation {
            field: "received_at".to_string(),
            reason: format!("received_at '{}' is not a valid timestamp", raw),
        })?;
        Ok(InboundKeywordMessage {
            provider: SINCH,
            provider_reference: callback.id.unwrap_or_default(),
            from: callback.from.unwrap_or_default(),
            to: callback.to.unwrap_or_default(),
            body: callback.body.unwrap_or_default(),
            received_at,
        })
    }
}

/// RFC 3339, or a zone-less ISO 8601 timestamp read as UTC.
fn parse_received_at(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Per-recipient delivery report Sinch posts to the callback url we set.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SinchDeliveryReport {
    #[validate(required(message = "batch_id missing from Sinch delivery report"))]
    pub batch_id: Option<String>,
    #[validate(required(message = "status missing from Sinch delivery report"))]
    pub status: Option<String>,
    #[serde(default)]
    pub recipient: Option<String>,
}

/// SNS HTTP delivery envelope. SNS posts it as `text/plain`.
#[derive(Debug, Clone, Deserialize)]
pub struct SnsEnvelope {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "MessageId", default)]
    pub message_id: Option<String>,
    #[serde(rename = "Message", default)]
    pub message: String,
    #[serde(rename = "SubscribeURL", default)]
    pub subscribe_url: Option<String>,
}

impl SnsEnvelope {
    pub const NOTIFICATION: &'static str = "Notification";
    pub const SUBSCRIPTION_CONFIRMATION: &'static str = "SubscriptionConfirmation";
}

/// SES event carried in `SnsEnvelope::message`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SesNotification {
    pub notification_type: String,
    pub mail: SesMail,
    #[serde(default)]
    pub bounce: Option<SesBounce>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SesMail {
    pub message_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SesBounce {
    pub bounce_type: String,
}

/// `{"status": "ok"}`: acknowledged, nothing stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackAck {
    pub status: String,
}

impl CallbackAck {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// `{"result": "success", "message": "<keyword id>"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordStored {
    pub result: String,
    pub message: String,
}

impl KeywordStored {
    pub fn new(id: impl ToString) -> Self {
        Self {
            result: "success".to_string(),
            message: id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn callback(received_at: &str) -> SinchKeywordCallback {
        SinchKeywordCallback {
            id: Some("01FC66621VHDBN".into()),
            from: Some("15145550100".into()),
            to: Some("38383".into()),
            body: Some("STOP".into()),
            received_at: Some(received_at.into()),
        }
    }

    #[test]
    fn test_received_at_formats() {
        let message = InboundKeywordMessage::try_from(callback("2026-03-02T14:05:09.123Z")).unwrap();
        assert_eq!(message.received_at.to_rfc3339(), "2026-03-02T14:05:09.123+00:00");
        assert_eq!(message.provider, "sinch");

        let naive = InboundKeywordMessage::try_from(callback("2026-03-02T14:05:09")).unwrap();
        assert_eq!(naive.received_at.to_rfc3339(), "2026-03-02T14:05:09+00:00");
    }

    #[test]
    fn test_unparseable_received_at_is_rejected() {
        let err = InboundKeywordMessage::try_from(callback("yesterday")).unwrap_err();
        assert!(matches!(err, AppError::Validation { field, .. } if field == "received_at"));
    }

    #[test]
    fn test_missing_fields_are_all_reported() {
        let callback = SinchKeywordCallback {
            id: None,
            from: Some("15145550100".into()),
            to: None,
            body: Some("hi".into()),
            received_at: None,
        };
        let errors = callback.validate().unwrap_err();
        let fields = errors.field_errors();
        assert_eq!(fields.len(), 3);
        assert!(fields.contains_key("received_at"));
    }

    #[test]
    fn test_ses_notification_parses_bounce() {
        let raw = r#"{
            "notificationType": "Bounce",
            "mail": {"messageId": "0100-abc", "destination": ["a@b.ca"]},
            "bounce": {"bounceType": "Transient", "bouncedRecipients": []}
        }"#;
        let event: SesNotification = serde_json::from_str(raw).unwrap();
        assert_eq!(event.mail.message_id, "0100-abc");
        assert_eq!(event.bounce.unwrap().bounce_type, "Transient");
    }
}
