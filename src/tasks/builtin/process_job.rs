use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tasks::error::TaskFailure;
use crate::tasks::types::{Task, TaskContext};

/// Applies the daily limit to a bulk job and fans it out into deliveries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessJobTask {
    pub job_id: Uuid,
}

#[async_trait]
impl Task for ProcessJobTask {
    fn task_type() -> &'static str
    where
        Self: Sized,
    {
        "process_job"
    }

    async fn execute(&self, ctx: TaskContext) -> Result<(), TaskFailure> {
        let outcome = ctx.services.intake.process_job(self.job_id).await?;
        tracing::info!(job_id = %self.job_id, ?outcome, "Job processed");
        Ok(())
    }
}
