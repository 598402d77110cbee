use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_derive_enum::DbEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use uuid::Uuid;

/// Lifecycle of a bulk job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DbEnum)]
#[db_enum(existing_type_path = "crate::schema::sql_types::JobStatus")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[db_enum(rename = "pending")]
    Pending,
    #[db_enum(rename = "in progress")]
    InProgress,
    #[db_enum(rename = "finished")]
    Finished,
    #[db_enum(rename = "sending limits exceeded")]
    SendingLimitsExceeded,
    #[db_enum(rename = "cancelled")]
    Cancelled,
    /// Fan-out stopped partway; some rows may already be queued.
    #[db_enum(rename = "error")]
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in progress",
            JobStatus::Finished => "finished",
            JobStatus::SendingLimitsExceeded => "sending limits exceeded",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a bulk upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecipient {
    pub to: String,
    #[serde(default)]
    pub personalisation: HashMap<String, String>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::jobs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Job {
    pub id: Uuid,
    pub service_id: Uuid,
    pub template_id: Uuid,
    pub template_version: i32,
    pub notification_count: i32,
    pub job_status: JobStatus,
    pub recipients: JsonValue,
    pub created_at: DateTime<Utc>,
    pub processing_started: Option<DateTime<Utc>>,
    pub processing_finished: Option<DateTime<Utc>>,
}

impl Job {
    pub fn recipient_rows(&self) -> Result<Vec<JobRecipient>, serde_json::Error> {
        serde_json::from_value(self.recipients.clone())
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::jobs)]
pub struct NewJob {
    pub id: Uuid,
    pub service_id: Uuid,
    pub template_id: Uuid,
    pub template_version: i32,
    pub notification_count: i32,
    pub job_status: JobStatus,
    pub recipients: JsonValue,
}
