//! Notification rows, the delivery status vocabulary and the task payload.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_derive_enum::DbEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::NotificationType;

// ============================================================================
// Status vocabulary
// ============================================================================

/// Delivery status of a notification.
///
/// `created → sending → {delivered, temporary-failure, permanent-failure,
/// technical-failure}`. Transitions are applied as compare-and-swap updates
/// guarded by [`NotificationStatus::allowed_predecessors`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, DbEnum)]
#[db_enum(
    existing_type_path = "crate::schema::sql_types::NotificationStatus",
    value_style = "kebab-case"
)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationStatus {
    Created,
    Sending,
    Delivered,
    TemporaryFailure,
    PermanentFailure,
    TechnicalFailure,
}

impl NotificationStatus {
    pub const ALL: [NotificationStatus; 6] = [
        NotificationStatus::Created,
        NotificationStatus::Sending,
        NotificationStatus::Delivered,
        NotificationStatus::TemporaryFailure,
        NotificationStatus::PermanentFailure,
        NotificationStatus::TechnicalFailure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Created => "created",
            NotificationStatus::Sending => "sending",
            NotificationStatus::Delivered => "delivered",
            NotificationStatus::TemporaryFailure => "temporary-failure",
            NotificationStatus::PermanentFailure => "permanent-failure",
            NotificationStatus::TechnicalFailure => "technical-failure",
        }
    }

    /// States a row must currently be in for a move to `self` to apply.
    ///
    /// `created` has no predecessors, so nothing ever moves back to it.
    /// `technical-failure → sending` is the redelivery path taken by a retried
    /// task; `temporary-failure` can still be resolved by a later callback.
    pub fn allowed_predecessors(&self) -> &'static [NotificationStatus] {
        use NotificationStatus::*;
        match self {
            Created => &[],
            Sending => &[Created, TechnicalFailure],
            Delivered => &[Created, Sending, TemporaryFailure],
            TemporaryFailure => &[Created, Sending],
            PermanentFailure => &[Created, Sending, TemporaryFailure],
            TechnicalFailure => &[Created, Sending],
        }
    }

    pub fn can_transition_to(&self, next: NotificationStatus) -> bool {
        next.allowed_predecessors().contains(self)
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            NotificationStatus::TemporaryFailure
                | NotificationStatus::PermanentFailure
                | NotificationStatus::TechnicalFailure
        )
    }
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown notification status '{}'", s))
    }
}

/// Aggregate bucket used by provider statistics counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatisticsTag {
    Delivered,
    Failure,
}

impl StatisticsTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatisticsTag::Delivered => "delivered",
            StatisticsTag::Failure => "failure",
        }
    }
}

// ============================================================================
// Notification rows
// ============================================================================

/// Optional email headers carried alongside a notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cc_address: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Notification {
    pub id: Uuid,
    pub service_id: Uuid,
    pub template_id: Uuid,
    pub template_version: i32,
    pub notification_type: NotificationType,
    pub to: String,
    /// Encrypted JSON map; never serialized out.
    #[serde(skip)]
    pub personalisation: Option<String>,
    pub status: NotificationStatus,
    pub sent_by: Option<String>,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub job_id: Option<Uuid>,
    pub job_row_number: Option<i32>,
    pub additional_email_parameters: Option<JsonValue>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::notifications)]
pub struct NewNotification {
    pub id: Uuid,
    pub service_id: Uuid,
    pub template_id: Uuid,
    pub template_version: i32,
    pub notification_type: NotificationType,
    pub to: String,
    pub personalisation: Option<String>,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
    pub job_id: Option<Uuid>,
    pub job_row_number: Option<i32>,
    pub additional_email_parameters: Option<JsonValue>,
}

/// Fields written together with a status transition.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = crate::schema::notifications)]
pub struct NotificationStatusUpdate {
    pub status: Option<NotificationStatus>,
    pub sent_by: Option<String>,
    pub reference: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl NotificationStatusUpdate {
    pub fn status(status: NotificationStatus) -> Self {
        Self {
            status: Some(status),
            updated_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// Provider acknowledged the submission and handed back a reference.
    pub fn acknowledged(provider: &str, reference: String) -> Self {
        let now = Utc::now();
        Self {
            status: Some(NotificationStatus::Sending),
            sent_by: Some(provider.to_string()),
            reference: Some(reference),
            sent_at: Some(now),
            updated_at: Some(now),
        }
    }
}

// ============================================================================
// Task payload
// ============================================================================

/// Decrypted body of a delivery task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub to: String,
    pub template: Uuid,
    pub template_version: i32,
    #[serde(default)]
    pub personalisation: Option<HashMap<String, String>>,
    #[serde(default)]
    pub job: Option<Uuid>,
    #[serde(default)]
    pub row_number: Option<i32>,
    #[serde(default)]
    pub email_parameters: Option<EmailParameters>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_status() -> impl Strategy<Value = NotificationStatus> {
        proptest::sample::select(NotificationStatus::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_nothing_returns_to_created(from in arb_status()) {
            prop_assert!(!from.can_transition_to(NotificationStatus::Created));
        }

        #[test]
        fn prop_status_string_round_trip(status in arb_status()) {
            let parsed: NotificationStatus = status.as_str().parse().unwrap();
            prop_assert_eq!(parsed, status);
            let json = serde_json::to_string(&status).unwrap();
            prop_assert_eq!(json, format!("\"{}\"", status.as_str()));
        }

        #[test]
        fn prop_terminal_states_do_not_move(next in arb_status()) {
            prop_assert!(!NotificationStatus::Delivered.can_transition_to(next));
            prop_assert!(!NotificationStatus::PermanentFailure.can_transition_to(next));
        }
    }

    #[test]
    fn test_temporary_failure_can_be_resolved_by_callback() {
        let status = NotificationStatus::TemporaryFailure;
        assert!(status.can_transition_to(NotificationStatus::Delivered));
        assert!(status.can_transition_to(NotificationStatus::PermanentFailure));
        assert!(!status.can_transition_to(NotificationStatus::Sending));
    }

    #[test]
    fn test_technical_failure_allows_redelivery_only() {
        let status = NotificationStatus::TechnicalFailure;
        assert!(status.can_transition_to(NotificationStatus::Sending));
        assert!(!status.can_transition_to(NotificationStatus::Delivered));
    }

    #[test]
    fn test_payload_optional_fields_default() {
        let payload: NotificationPayload = serde_json::from_value(serde_json::json!({
            "to": "+16502530000",
            "template": "6c2a7e5e-1b0b-4d46-9d53-0ac3a0d1f1a1",
            "template_version": 2
        }))
        .unwrap();
        assert!(payload.personalisation.is_none());
        assert!(payload.job.is_none());
        assert!(payload.email_parameters.is_none());
    }
}
