//! Provider registry rows and the channel enum shared across the data model.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_derive_enum::DbEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery channel of a notification, template, provider or retention policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, DbEnum)]
#[db_enum(existing_type_path = "crate::schema::sql_types::NotificationType")]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Sms,
    Email,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Sms => "sms",
            NotificationType::Email => "email",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sms" => Ok(NotificationType::Sms),
            "email" => Ok(NotificationType::Email),
            other => Err(format!("Unknown notification type '{}'", other)),
        }
    }
}

/// A configured provider integration.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::provider_details)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProviderDetail {
    pub id: Uuid,
    pub identifier: String,
    pub display_name: String,
    pub notification_type: NotificationType,
    pub priority: i32,
    pub active: bool,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::provider_details)]
pub struct NewProviderDetail {
    pub id: Uuid,
    pub identifier: String,
    pub display_name: String,
    pub notification_type: NotificationType,
    pub priority: i32,
    pub active: bool,
    pub version: i32,
}

/// Admin-side mutation; every applied change bumps `version`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderDetailChanges {
    pub priority: Option<i32>,
    pub active: Option<bool>,
}

impl ProviderDetailChanges {
    pub fn is_empty(&self) -> bool {
        self.priority.is_none() && self.active.is_none()
    }
}

/// Snapshot written on every version of a provider row.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::provider_details_history)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProviderDetailHistory {
    pub id: Uuid,
    pub version: i32,
    pub identifier: String,
    pub display_name: String,
    pub notification_type: NotificationType,
    pub priority: i32,
    pub active: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&ProviderDetail> for ProviderDetailHistory {
    fn from(detail: &ProviderDetail) -> Self {
        Self {
            id: detail.id,
            version: detail.version,
            identifier: detail.identifier.clone(),
            display_name: detail.display_name.clone(),
            notification_type: detail.notification_type,
            priority: detail.priority,
            active: detail.active,
            updated_at: detail.updated_at,
        }
    }
}
