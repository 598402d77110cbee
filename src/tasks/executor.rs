use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::TasksConfig;
use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::services::Services;
use crate::tasks::error::TaskFailure;
use crate::tasks::registry::TaskRegistry;
use crate::tasks::types::{TaskContext, TaskEnvelope};

/// Attempt limits and backoff for task execution.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub backoff_multiplier: f64,
    pub timeout: Duration,
}

impl From<&TasksConfig> for RetryPolicy {
    fn from(config: &TasksConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            retry_delay: Duration::from_secs(config.retry_delay),
            backoff_multiplier: config.retry_backoff_multiplier,
            timeout: Duration::from_secs(config.task_timeout),
        }
    }
}

/// Longest wait between two attempts of a task.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(3600);

impl RetryPolicy {
    /// `retry_delay * multiplier^attempt`, capped at [`MAX_RETRY_DELAY`].
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.retry_delay.is_zero() {
            return Duration::ZERO;
        }
        let multiplier = if self.backoff_multiplier.is_finite() && self.backoff_multiplier >= 1.0 {
            self.backoff_multiplier
        } else {
            2.0
        };
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let seconds = self.retry_delay.as_secs_f64() * multiplier.powi(exponent);
        if seconds.is_finite() && seconds < MAX_RETRY_DELAY.as_secs_f64() {
            Duration::from_secs_f64(seconds)
        } else {
            MAX_RETRY_DELAY
        }
    }
}

/// Runs tasks with timeout and exponential-backoff retry. A timed-out
/// attempt is retried like any retryable failure.
pub struct TaskExecutor {
    registry: Arc<TaskRegistry>,
    services: Services,
    policy: RetryPolicy,
    cancellation_token: CancellationToken,
}

impl TaskExecutor {
    pub fn new(
        registry: Arc<TaskRegistry>,
        services: Services,
        policy: RetryPolicy,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            registry,
            services,
            policy,
            cancellation_token,
        }
    }

    pub async fn run(&self, envelope: TaskEnvelope) -> AppResult<()> {
        let task = self
            .registry
            .create_task(&envelope.task_type, envelope.payload.clone())
            .inspect_err(|e| {
                tracing::error!(task_id = %envelope.id, task_type = %envelope.task_type, error = %e, "Failed to create task");
            })?;

        let mut last_error = None;
        for attempt in 0..=self.policy.max_retries {
            let ctx = TaskContext {
                task_id: envelope.id,
                attempt,
                services: self.services.clone(),
                cancellation_token: self.cancellation_token.child_token(),
            };
            let started = Instant::now();
            let result = tokio::time::timeout(self.policy.timeout, task.execute(ctx)).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            let failure = match result {
                Ok(Ok(())) => {
                    tracing::debug!(task_id = %envelope.id, task_type = %envelope.task_type, attempt, duration_ms, "Task completed");
                    metrics::record_task_finished(&envelope.task_type, "success");
                    return Ok(());
                }
                Ok(Err(TaskFailure::Abort(e))) => {
                    tracing::error!(task_id = %envelope.id, task_type = %envelope.task_type, attempt, error = %e, "Task aborted");
                    metrics::record_task_finished(&envelope.task_type, "aborted");
                    return Err(e);
                }
                Ok(Err(TaskFailure::Retry(e))) => {
                    tracing::warn!(task_id = %envelope.id, task_type = %envelope.task_type, attempt, error = %e, "Task attempt failed");
                    e
                }
                Err(_) => {
                    tracing::warn!(task_id = %envelope.id, task_type = %envelope.task_type, attempt, duration_ms, "Task attempt timed out");
                    AppError::Internal {
                        source: anyhow::anyhow!(
                            "Task {} timed out after {}s",
                            envelope.task_type,
                            self.policy.timeout.as_secs()
                        ),
                    }
                }
            };
            last_error = Some(failure);

            if attempt < self.policy.max_retries {
                let delay = self.policy.delay_for(attempt);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = self.cancellation_token.cancelled() => break,
                }
            }
        }

        metrics::record_task_finished(&envelope.task_type, "exhausted");
        Err(last_error.unwrap_or_else(|| AppError::Internal {
            source: anyhow::anyhow!("Task {} gave up", envelope.task_type),
        }))
    }
}
