use std::sync::Arc;

use serde_json::Value as JsonValue;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::tasks::executor::TaskExecutor;
use crate::tasks::types::TaskEnvelope;

/// Cron-driven task firing on top of tokio-cron-scheduler.
pub struct CronScheduler {
    scheduler: Arc<Mutex<JobScheduler>>,
    executor: Arc<TaskExecutor>,
}

fn internal(e: impl std::error::Error + Send + Sync + 'static) -> AppError {
    AppError::Internal {
        source: anyhow::Error::from(e),
    }
}

impl CronScheduler {
    pub async fn new(executor: Arc<TaskExecutor>) -> AppResult<Self> {
        let scheduler = JobScheduler::new().await.map_err(internal)?;
        Ok(Self {
            scheduler: Arc::new(Mutex::new(scheduler)),
            executor,
        })
    }

    /// Runs `task_type` with `payload` on every tick of `cron_expression`.
    pub async fn schedule(
        &self,
        cron_expression: &str,
        task_type: &str,
        payload: JsonValue,
    ) -> AppResult<Uuid> {
        let executor = Arc::clone(&self.executor);
        let task_type = task_type.to_string();

        let job = Job::new_async(cron_expression, move |_uuid, _lock| {
            let executor = Arc::clone(&executor);
            let envelope = TaskEnvelope {
                id: Uuid::new_v4(),
                task_type: task_type.clone(),
                payload: payload.clone(),
            };
            Box::pin(async move {
                if let Err(e) = executor.run(envelope).await {
                    tracing::error!(error = %e, "Scheduled task failed");
                }
            })
        })
        .map_err(|e| AppError::BadRequest {
            message: format!("Invalid cron expression '{}': {}", cron_expression, e),
        })?;

        let id = self.scheduler.lock().await.add(job).await.map_err(internal)?;
        tracing::info!(cron = cron_expression, job_id = %id, "Scheduled task registered");
        Ok(id)
    }

    pub async fn start(&self) -> AppResult<()> {
        self.scheduler.lock().await.start().await.map_err(internal)
    }

    pub async fn stop(&self) -> AppResult<()> {
        self.scheduler.lock().await.shutdown().await.map_err(internal)
    }
}
