//! Inbound short numbers and the keyword messages received on them.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::inbound_shortnumbers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct InboundShortNumber {
    pub id: Uuid,
    pub short_number: String,
    pub provider: String,
    pub service_id: Option<Uuid>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl InboundShortNumber {
    pub fn is_available(&self) -> bool {
        self.active && self.service_id.is_none()
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::inbound_shortnumbers)]
pub struct NewInboundShortNumber {
    pub id: Uuid,
    pub short_number: String,
    pub provider: String,
    pub service_id: Option<Uuid>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Serialize)]
#[diesel(table_name = crate::schema::inbound_sms_keyword)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct InboundSmsKeyword {
    pub id: Uuid,
    pub service_id: Uuid,
    pub content: String,
    pub notify_short_number: String,
    pub user_number: String,
    pub created_at: DateTime<Utc>,
    pub provider_date: Option<DateTime<Utc>>,
    pub provider_reference: Option<String>,
    pub provider: String,
}
