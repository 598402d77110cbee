//! Provider status vocabularies mapped onto the canonical notification status.

use serde::Deserialize;

use crate::models::{NotificationStatus, StatisticsTag};

/// Canonical reading of a provider status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub message: &'static str,
    pub success: bool,
    pub status: NotificationStatus,
    /// `None` while the message is still in flight.
    pub statistics: Option<StatisticsTag>,
}

const fn classified(
    message: &'static str,
    status: NotificationStatus,
    statistics: Option<StatisticsTag>,
) -> Classification {
    Classification {
        message,
        success: !matches!(
            status,
            NotificationStatus::TemporaryFailure
                | NotificationStatus::PermanentFailure
                | NotificationStatus::TechnicalFailure
        ),
        status,
        statistics,
    }
}

/// Delivery report status values sent by Sinch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SinchStatus {
    Dispatched,
    Queued,
    Delivered,
    Failed,
    Rejected,
    Aborted,
    Expired,
    #[serde(other)]
    Unknown,
}

impl SinchStatus {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "dispatched" => SinchStatus::Dispatched,
            "queued" => SinchStatus::Queued,
            "delivered" => SinchStatus::Delivered,
            "failed" => SinchStatus::Failed,
            "rejected" => SinchStatus::Rejected,
            "aborted" => SinchStatus::Aborted,
            "expired" => SinchStatus::Expired,
            _ => SinchStatus::Unknown,
        }
    }

    pub fn classify(&self) -> Classification {
        use NotificationStatus as S;
        match self {
            SinchStatus::Dispatched => classified("Dispatched", S::Created, None),
            SinchStatus::Queued => classified("Queued", S::Sending, None),
            SinchStatus::Delivered => {
                classified("Delivered", S::Delivered, Some(StatisticsTag::Delivered))
            }
            SinchStatus::Failed => {
                classified("Failed", S::PermanentFailure, Some(StatisticsTag::Failure))
            }
            SinchStatus::Rejected => {
                classified("Rejected", S::PermanentFailure, Some(StatisticsTag::Failure))
            }
            SinchStatus::Aborted => {
                classified("Aborted", S::PermanentFailure, Some(StatisticsTag::Failure))
            }
            SinchStatus::Expired => {
                classified("Expired", S::PermanentFailure, Some(StatisticsTag::Failure))
            }
            SinchStatus::Unknown => {
                classified("Unknown", S::TechnicalFailure, Some(StatisticsTag::Failure))
            }
        }
    }
}

/// SES event kinds; bounces are split by bounce type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SesEventType {
    Permanent,
    Temporary,
    Delivery,
    Complaint,
}

impl SesEventType {
    /// Reads an SES notification's `notificationType` plus, for bounces,
    /// `bounce.bounceType`. Undetermined bounces count as permanent.
    pub fn from_notification(notification_type: &str, bounce_type: Option<&str>) -> Option<Self> {
        match notification_type {
            "Delivery" => Some(SesEventType::Delivery),
            "Complaint" => Some(SesEventType::Complaint),
            "Bounce" => match bounce_type {
                Some("Transient") | Some("Temporary") => Some(SesEventType::Temporary),
                _ => Some(SesEventType::Permanent),
            },
            _ => None,
        }
    }

    pub fn classify(&self) -> Classification {
        use NotificationStatus as S;
        match self {
            SesEventType::Permanent => classified(
                "Hard bounced",
                S::PermanentFailure,
                Some(StatisticsTag::Failure),
            ),
            SesEventType::Temporary => classified(
                "Soft bounced",
                S::TemporaryFailure,
                Some(StatisticsTag::Failure),
            ),
            SesEventType::Delivery => {
                classified("Delivered", S::Delivered, Some(StatisticsTag::Delivered))
            }
            SesEventType::Complaint => {
                classified("Complaint", S::Delivered, Some(StatisticsTag::Delivered))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderResponse {
    Sinch(SinchStatus),
    Ses(SesEventType),
}

impl ProviderResponse {
    pub fn provider(&self) -> &'static str {
        match self {
            ProviderResponse::Sinch(_) => "sinch",
            ProviderResponse::Ses(_) => "ses",
        }
    }

    pub fn classify(&self) -> Classification {
        match self {
            ProviderResponse::Sinch(status) => status.classify(),
            ProviderResponse::Ses(event) => event.classify(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sinch_terminal_failures_are_permanent() {
        for raw in ["Failed", "Rejected", "Aborted", "Expired"] {
            let c = SinchStatus::parse(raw).classify();
            assert_eq!(c.status, NotificationStatus::PermanentFailure, "{raw}");
            assert!(!c.success);
            assert_eq!(c.statistics, Some(StatisticsTag::Failure));
        }
    }

    #[test]
    fn test_sinch_in_flight_statuses() {
        assert_eq!(
            SinchStatus::parse("Dispatched").classify().status,
            NotificationStatus::Created
        );
        let queued = SinchStatus::parse("queued").classify();
        assert_eq!(queued.status, NotificationStatus::Sending);
        assert!(queued.statistics.is_none());
    }

    #[test]
    fn test_sinch_unrecognized_is_technical() {
        assert_eq!(SinchStatus::parse("Whatever"), SinchStatus::Unknown);
        let parsed: SinchStatus = serde_json::from_str("\"Whatever\"").unwrap();
        assert_eq!(parsed, SinchStatus::Unknown);
        assert_eq!(
            parsed.classify().status,
            NotificationStatus::TechnicalFailure
        );
    }

    #[test]
    fn test_ses_bounce_types() {
        let hard = SesEventType::from_notification("Bounce", Some("Permanent")).unwrap();
        assert_eq!(hard.classify().message, "Hard bounced");
        assert_eq!(hard.classify().status, NotificationStatus::PermanentFailure);

        let soft = SesEventType::from_notification("Bounce", Some("Transient")).unwrap();
        assert_eq!(soft.classify().message, "Soft bounced");
        assert_eq!(soft.classify().status, NotificationStatus::TemporaryFailure);

        assert_eq!(
            SesEventType::from_notification("Bounce", Some("Undetermined")),
            Some(SesEventType::Permanent)
        );
        assert!(SesEventType::from_notification("Open", None).is_none());
    }

    #[test]
    fn test_ses_complaint_counts_as_delivered() {
        let c = ProviderResponse::Ses(SesEventType::Complaint).classify();
        assert!(c.success);
        assert_eq!(c.status, NotificationStatus::Delivered);
        assert_eq!(c.statistics, Some(StatisticsTag::Delivered));
    }
}
