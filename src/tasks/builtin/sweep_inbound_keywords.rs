use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::tasks::error::TaskFailure;
use crate::tasks::types::{Task, TaskContext};

/// Deletes inbound keyword messages past their service's retention window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepInboundKeywordsTask {}

#[async_trait]
impl Task for SweepInboundKeywordsTask {
    fn task_type() -> &'static str
    where
        Self: Sized,
    {
        "sweep_inbound_keywords"
    }

    async fn execute(&self, ctx: TaskContext) -> Result<(), TaskFailure> {
        let deleted = ctx.services.retention.sweep().await?;
        tracing::info!(deleted_count = deleted, "Inbound keyword sweep completed");
        Ok(())
    }

    fn description(&self) -> Option<String> {
        Some("Purge inbound keyword messages past retention".to_string())
    }
}
