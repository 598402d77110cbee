//! Uniform interface over the outbound provider integrations.
//!
//! Each integration normalizes its own wire errors into [`ProviderError`] so
//! the dispatch engine can classify every failure the same way.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NotificationStatus, NotificationType};

/// An SMS ready for hand-off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundSms {
    /// Notification id, echoed back by delivery reports.
    pub reference: String,
    pub to: String,
    pub body: String,
    pub sender: Option<String>,
}

/// An email ready for hand-off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub reference: String,
    /// Display name, usually the service name.
    pub from_name: String,
    /// Local part of the sending address.
    pub from_local: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub html_body: Option<String>,
    pub reply_to: Option<String>,
    pub importance: Option<String>,
    pub cc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    Sms(OutboundSms),
    Email(OutboundEmail),
}

impl OutboundMessage {
    pub fn reference(&self) -> &str {
        match self {
            OutboundMessage::Sms(sms) => &sms.reference,
            OutboundMessage::Email(email) => &email.reference,
        }
    }

    pub fn channel(&self) -> NotificationType {
        match self {
            OutboundMessage::Sms(_) => NotificationType::Sms,
            OutboundMessage::Email(_) => NotificationType::Email,
        }
    }
}

/// Provider-side id of an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReference(pub String);

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The recipient can never be delivered to; nothing was sent.
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    /// The provider answered and refused the message for good.
    #[error("Rejected by provider ({code}): {message}")]
    Rejected {
        status: NotificationStatus,
        code: String,
        message: String,
    },

    /// The provider answered with an error we do not classify.
    #[error("Provider API error ({code}): {message}")]
    Api { code: String, message: String },

    /// No usable answer: connection, timeout or undecodable body.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{provider} cannot send {channel} messages")]
    UnsupportedChannel {
        provider: &'static str,
        channel: NotificationType,
    },
}

impl ProviderError {
    /// Status persisted on the notification when a send fails this way.
    pub fn failure_status(&self) -> NotificationStatus {
        match self {
            ProviderError::Rejected { status, .. } => *status,
            _ => NotificationStatus::TechnicalFailure,
        }
    }

    /// Whether another attempt could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Api { .. } | ProviderError::Transport(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        ProviderError::Transport(error.to_string())
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Registry identifier, e.g. `"sinch"`.
    fn identifier(&self) -> &'static str;

    fn channel(&self) -> NotificationType;

    /// Canonical form of `to`, checked locally before any network call.
    fn validate_recipient(&self, to: &str) -> Result<String, ProviderError>;

    /// Submits the message. A failed send never yields a reference.
    async fn send(&self, message: &OutboundMessage) -> Result<ProviderReference, ProviderError>;
}
