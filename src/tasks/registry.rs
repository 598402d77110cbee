use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::{AppError, AppResult};
use crate::tasks::builtin::{DeliverNotificationTask, ProcessJobTask, SweepInboundKeywordsTask};
use crate::tasks::types::Task;

type TaskFactory = Box<dyn Fn(JsonValue) -> AppResult<Box<dyn Task>> + Send + Sync>;

/// Maps task type names to constructors from JSON payloads.
pub struct TaskRegistry {
    factories: HashMap<String, TaskFactory>,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with every built-in task registered.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register::<DeliverNotificationTask>()
            .register::<ProcessJobTask>()
            .register::<SweepInboundKeywordsTask>();
        registry
    }

    pub fn register<T>(&mut self) -> &mut Self
    where
        T: Task + DeserializeOwned + 'static,
    {
        let factory: TaskFactory = Box::new(|payload: JsonValue| {
            let task: T = serde_json::from_value(payload).map_err(|e| AppError::BadRequest {
                message: format!("Invalid {} payload: {}", T::task_type(), e),
            })?;
            Ok(Box::new(task) as Box<dyn Task>)
        });

        self.factories.insert(T::task_type().to_string(), factory);
        self
    }

    pub fn create_task(&self, task_type: &str, payload: JsonValue) -> AppResult<Box<dyn Task>> {
        let factory = self
            .factories
            .get(task_type)
            .ok_or_else(|| AppError::not_found("TaskType", "type", task_type))?;

        factory(payload)
    }

    pub fn task_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}
