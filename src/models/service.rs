//! Service-side entities consulted by dispatch and reconciliation.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::NotificationType;

pub const SMS_PERMISSION: &str = "sms";
pub const EMAIL_PERMISSION: &str = "email";
pub const INBOUND_SMS_PERMISSION: &str = "inbound_sms";
pub const INBOUND_SMS_KEYWORD_PERMISSION: &str = "inbound_sms_keyword";

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize)]
#[diesel(table_name = crate::schema::services)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
    pub restricted: bool,
    pub message_limit: i64,
    pub email_from: String,
    pub sms_sender: Option<String>,
    pub reply_to_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::service_permissions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ServicePermission {
    pub service_id: Uuid,
    pub permission: String,
    pub created_at: DateTime<Utc>,
}

/// A service together with its granted permissions.
#[derive(Debug, Clone)]
pub struct ServiceWithPermissions {
    pub service: Service,
    pub permissions: Vec<String>,
}

impl ServiceWithPermissions {
    pub fn has_permissions(&self, required: &[&str]) -> bool {
        required
            .iter()
            .all(|needed| self.permissions.iter().any(|p| p == needed))
    }

    /// Keyword routing needs both the keyword grant and plain SMS.
    pub fn accepts_inbound_keywords(&self) -> bool {
        self.has_permissions(&[INBOUND_SMS_KEYWORD_PERMISSION, SMS_PERMISSION])
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::service_safelist)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ServiceSafelistEntry {
    pub id: Uuid,
    pub service_id: Uuid,
    pub recipient_type: NotificationType,
    pub recipient: String,
    pub created_at: DateTime<Utc>,
}

impl ServiceSafelistEntry {
    /// Emails compare case-insensitively, phone numbers by their digits.
    pub fn matches(&self, recipient: &str) -> bool {
        match self.recipient_type {
            NotificationType::Email => self.recipient.trim().eq_ignore_ascii_case(recipient.trim()),
            NotificationType::Sms => {
                let ours = digits(&self.recipient);
                !ours.is_empty() && ours == digits(recipient)
            }
        }
    }
}

fn digits(value: &str) -> String {
    let all: String = value.chars().filter(char::is_ascii_digit).collect();
    // Treat a leading NANP country code as optional.
    match all.strip_prefix('1') {
        Some(rest) if all.len() == 11 => rest.to_string(),
        _ => all,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::service_data_retention)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ServiceDataRetention {
    pub id: Uuid,
    pub service_id: Uuid,
    pub notification_type: NotificationType,
    pub days_of_retention: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}
