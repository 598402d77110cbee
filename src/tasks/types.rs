use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::Services;
use crate::tasks::error::TaskFailure;

/// Execution context handed to every task attempt.
#[derive(Clone)]
pub struct TaskContext {
    pub task_id: Uuid,
    pub attempt: u32,
    pub services: Services,
    pub cancellation_token: CancellationToken,
}

/// Trait that all background tasks implement.
#[async_trait]
pub trait Task: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this task type
    fn task_type() -> &'static str
    where
        Self: Sized;

    async fn execute(&self, ctx: TaskContext) -> Result<(), TaskFailure>;

    fn description(&self) -> Option<String> {
        None
    }
}

/// Serialized task as it travels through a queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEnvelope {
    pub id: Uuid,
    pub task_type: String,
    pub payload: JsonValue,
}

impl TaskEnvelope {
    pub fn new<T: Task + Serialize>(task: &T) -> AppResult<Self> {
        let payload = serde_json::to_value(task).map_err(|e| AppError::Internal {
            source: anyhow::Error::from(e),
        })?;
        Ok(Self {
            id: Uuid::new_v4(),
            task_type: T::task_type().to_string(),
            payload,
        })
    }
}
