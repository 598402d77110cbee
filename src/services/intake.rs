//! Accepting single notifications and bulk jobs, and fanning jobs out into
//! delivery tasks under the service's daily limit.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use chrono_tz::Tz;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    EmailParameters, Job, JobRecipient, JobStatus, NewJob, NotificationPayload, NotificationType,
    ServiceWithPermissions, Template,
};
use crate::repositories::Repositories;
use crate::tasks::{DeliverNotificationTask, ProcessJobTask, TaskEnvelope, TaskQueue};
use crate::utils::Encryptor;
use crate::utils::time::midnight_today;

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRequest {
    pub template_id: Uuid,
    pub template_version: i32,
    pub to: String,
    pub personalisation: Option<HashMap<String, String>>,
    pub email_parameters: Option<EmailParameters>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedNotification {
    pub id: Uuid,
    pub channel: NotificationType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    pub template_id: Uuid,
    pub template_version: i32,
    pub recipients: Vec<JobRecipient>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobIntakeOutcome {
    /// One delivery task queued per recipient row.
    Queued(usize),
    /// Today's count plus the job would pass the service's message limit.
    LimitExceeded { sent_today: i64, limit: i64 },
    /// The job was not pending; nothing done.
    Skipped(JobStatus),
}

#[derive(Clone)]
pub struct IntakeService {
    repos: Repositories,
    encryptor: Arc<Encryptor>,
    queue: Arc<dyn TaskQueue>,
    timezone: Tz,
}

impl IntakeService {
    pub fn new(
        repos: Repositories,
        encryptor: Arc<Encryptor>,
        queue: Arc<dyn TaskQueue>,
        timezone: Tz,
    ) -> Self {
        Self {
            repos,
            encryptor,
            queue,
            timezone,
        }
    }

    async fn service_and_template(
        &self,
        service_id: Uuid,
        template_id: Uuid,
        template_version: i32,
    ) -> AppResult<(ServiceWithPermissions, Template)> {
        let service = self
            .repos
            .services
            .find_with_permissions(service_id)
            .await?
            .filter(|s| s.service.active)
            .ok_or_else(|| AppError::not_found("Service", "id", service_id))?;
        let template = self
            .repos
            .templates
            .find(template_id, template_version)
            .await?
            .filter(|t| t.service_id == service_id)
            .ok_or_else(|| AppError::not_found("Template", "id", template_id))?;

        if !service.has_permissions(&[template.template_type.as_str()]) {
            return Err(AppError::BadRequest {
                message: format!(
                    "Service is not allowed to send {} messages",
                    template.template_type
                ),
            });
        }
        Ok((service, template))
    }

    async fn enqueue_delivery(
        &self,
        service_id: Uuid,
        channel: NotificationType,
        payload: &NotificationPayload,
    ) -> AppResult<Uuid> {
        let notification_id = Uuid::new_v4();
        let task = DeliverNotificationTask {
            service_id,
            notification_id,
            encrypted_payload: self.encryptor.encrypt_json(payload)?,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            channel,
        };
        self.queue.enqueue(TaskEnvelope::new(&task)?).await?;
        Ok(notification_id)
    }

    pub async fn queue_notification(
        &self,
        service_id: Uuid,
        request: NotificationRequest,
    ) -> AppResult<QueuedNotification> {
        let (_, template) = self
            .service_and_template(service_id, request.template_id, request.template_version)
            .await?;
        let channel = template.template_type;
        let payload = NotificationPayload {
            to: request.to,
            template: template.id,
            template_version: template.version,
            personalisation: request.personalisation,
            job: None,
            row_number: None,
            email_parameters: request.email_parameters,
        };
        let id = self.enqueue_delivery(service_id, channel, &payload).await?;
        info!(notification_id = %id, %service_id, %channel, "Notification queued");
        Ok(QueuedNotification { id, channel })
    }

    pub async fn create_job(&self, service_id: Uuid, request: JobRequest) -> AppResult<Job> {
        if request.recipients.is_empty() {
            return Err(AppError::Validation {
                field: "recipients".to_string(),
                reason: "A job needs at least one recipient".to_string(),
            });
        }
        let (_, template) = self
            .service_and_template(service_id, request.template_id, request.template_version)
            .await?;

        let recipients = serde_json::to_value(&request.recipients).map_err(|e| AppError::Internal {
            source: anyhow::Error::from(e),
        })?;
        let job = self
            .repos
            .jobs
            .create(NewJob {
                id: Uuid::new_v4(),
                service_id,
                template_id: template.id,
                template_version: template.version,
                notification_count: request.recipients.len() as i32,
                job_status: JobStatus::Pending,
                recipients,
            })
            .await?;

        self.queue
            .enqueue(TaskEnvelope::new(&ProcessJobTask { job_id: job.id })?)
            .await?;
        info!(job_id = %job.id, %service_id, rows = job.notification_count, "Job created");
        Ok(job)
    }

    pub async fn process_job(&self, job_id: Uuid) -> AppResult<JobIntakeOutcome> {
        let job = self
            .repos
            .jobs
            .find_by_id(job_id)
            .await?
            .ok_or_else(|| AppError::not_found("Job", "id", job_id))?;
        if job.job_status != JobStatus::Pending {
            return Ok(JobIntakeOutcome::Skipped(job.job_status));
        }

        let service = self
            .repos
            .services
            .find_with_permissions(job.service_id)
            .await?
            .ok_or_else(|| AppError::not_found("Service", "id", job.service_id))?;
        let since = midnight_today(self.timezone, Utc::now());
        let sent_today = self
            .repos
            .notifications
            .count_for_service_since(job.service_id, since)
            .await?;
        let limit = service.service.message_limit;

        if sent_today + i64::from(job.notification_count) > limit {
            self.repos
                .jobs
                .set_status(job.id, JobStatus::SendingLimitsExceeded)
                .await?;
            warn!(
                %job_id,
                service_id = %job.service_id,
                sent_today,
                limit,
                rows = job.notification_count,
                "Job exceeds daily message limit"
            );
            return Ok(JobIntakeOutcome::LimitExceeded { sent_today, limit });
        }

        let template = self
            .repos
            .templates
            .find(job.template_id, job.template_version)
            .await?
            .ok_or_else(|| AppError::not_found("Template", "id", job.template_id))?;
        let rows = job.recipient_rows().map_err(|e| AppError::UnprocessableContent {
            message: format!("Job recipients are malformed: {e}"),
        })?;

        self.repos.jobs.set_status(job.id, JobStatus::InProgress).await?;
        for (row_number, row) in rows.iter().enumerate() {
            let payload = NotificationPayload {
                to: row.to.clone(),
                template: template.id,
                template_version: template.version,
                personalisation: Some(row.personalisation.clone()),
                job: Some(job.id),
                row_number: Some(row_number as i32),
                email_parameters: None,
            };
            if let Err(e) = self
                .enqueue_delivery(job.service_id, template.template_type, &payload)
                .await
            {
                error!(%job_id, queued = row_number, rows = rows.len(), error = %e, "Job fan-out interrupted");
                self.repos.jobs.set_status(job.id, JobStatus::Error).await?;
                return Err(e);
            }
        }
        self.repos.jobs.set_status(job.id, JobStatus::Finished).await?;

        info!(%job_id, queued = rows.len(), "Job fanned out into delivery tasks");
        Ok(JobIntakeOutcome::Queued(rows.len()))
    }
}
