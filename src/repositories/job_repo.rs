//! Bulk job repository.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::{AsyncDbPool, connection};
use crate::error::{AppError, AppResult};
use crate::models::{Job, JobStatus, NewJob};
use crate::repositories::JobStore;

#[derive(Clone)]
pub struct JobRepository {
    pool: AsyncDbPool,
}

impl JobRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for JobRepository {
    async fn create(&self, new_job: NewJob) -> AppResult<Job> {
        use crate::schema::jobs::dsl::*;
        let mut conn = connection(&self.pool).await?;

        diesel::insert_into(jobs)
            .values(&new_job)
            .returning(Job::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(AppError::from)
    }

    async fn find_by_id(&self, job_id: Uuid) -> AppResult<Option<Job>> {
        use crate::schema::jobs::dsl::*;
        let mut conn = connection(&self.pool).await?;

        jobs.filter(id.eq(job_id))
            .select(Job::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(AppError::from)
    }

    async fn set_status(&self, job_id: Uuid, new_status: JobStatus) -> AppResult<Job> {
        use crate::schema::jobs::dsl::*;
        let mut conn = connection(&self.pool).await?;
        let now = Utc::now();

        let (started, finished) = match new_status {
            JobStatus::InProgress => (Some(now), None),
            JobStatus::Finished
            | JobStatus::SendingLimitsExceeded
            | JobStatus::Cancelled
            | JobStatus::Error => {
                (None, Some(now))
            }
            JobStatus::Pending => (None, None),
        };

        diesel::update(jobs.filter(id.eq(job_id)))
            .set((
                job_status.eq(new_status),
                started.map(|t| processing_started.eq(t)),
                finished.map(|t| processing_finished.eq(t)),
            ))
            .returning(Job::as_returning())
            .get_result(&mut conn)
            .await
            .optional()?
            .ok_or_else(|| AppError::not_found("Job", "id", job_id))
    }
}
