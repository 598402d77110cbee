//! Bulk job intake.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Job, JobRecipient, JobStatus};
use crate::services::JobRequest;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateJobRequest {
    #[validate(required(message = "template_id is required"))]
    pub template_id: Option<Uuid>,
    #[validate(
        required(message = "template_version is required"),
        range(min = 1, message = "template_version must be positive")
    )]
    pub template_version: Option<i32>,
    #[validate(length(
        min = 1,
        max = 50000,
        message = "recipients must hold between 1 and 50000 rows"
    ))]
    #[serde(default)]
    pub recipients: Vec<JobRecipient>,
}

impl From<CreateJobRequest> for JobRequest {
    fn from(request: CreateJobRequest) -> Self {
        JobRequest {
            template_id: request.template_id.unwrap_or_default(),
            template_version: request.template_version.unwrap_or_default(),
            recipients: request.recipients,
        }
    }
}

/// Job summary; recipient rows are never echoed back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResponse {
    pub id: Uuid,
    pub service_id: Uuid,
    pub template_id: Uuid,
    pub template_version: i32,
    pub notification_count: i32,
    pub job_status: JobStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            service_id: job.service_id,
            template_id: job.template_id,
            template_version: job.template_version,
            notification_count: job.notification_count,
            job_status: job.job_status,
            created_at: job.created_at,
        }
    }
}
