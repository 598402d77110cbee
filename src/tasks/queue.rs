//! In-process task queue drained by a fixed pool of workers.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::tasks::executor::TaskExecutor;
use crate::tasks::types::TaskEnvelope;

#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn enqueue(&self, envelope: TaskEnvelope) -> AppResult<()>;
}

pub type TaskReceiver = mpsc::UnboundedReceiver<TaskEnvelope>;

#[derive(Clone)]
pub struct LocalTaskQueue {
    sender: mpsc::UnboundedSender<TaskEnvelope>,
}

impl LocalTaskQueue {
    pub fn channel() -> (Self, TaskReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl TaskQueue for LocalTaskQueue {
    async fn enqueue(&self, envelope: TaskEnvelope) -> AppResult<()> {
        let task_type = envelope.task_type.clone();
        self.sender.send(envelope).map_err(|_| AppError::Internal {
            source: anyhow::anyhow!("task queue is closed"),
        })?;
        metrics::record_task_queued(&task_type);
        Ok(())
    }
}

/// Spawns `count` workers pulling from `receiver` until it closes or
/// `cancel` fires.
pub fn spawn_workers(
    receiver: TaskReceiver,
    executor: Arc<TaskExecutor>,
    count: usize,
    cancel: CancellationToken,
) -> Vec<JoinHandle<()>> {
    let receiver = Arc::new(Mutex::new(receiver));
    (0..count.max(1))
        .map(|worker| {
            let receiver = Arc::clone(&receiver);
            let executor = Arc::clone(&executor);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tracing::debug!(worker, "Task worker started");
                loop {
                    let next = tokio::select! {
                        _ = cancel.cancelled() => None,
                        envelope = async { receiver.lock().await.recv().await } => envelope,
                    };
                    let Some(envelope) = next else { break };
                    let task_id = envelope.id;
                    if let Err(e) = executor.run(envelope).await {
                        tracing::error!(worker, %task_id, error = %e, "Task failed");
                    }
                }
                tracing::debug!(worker, "Task worker stopped");
            })
        })
        .collect()
}

/// Queue that only records what was enqueued. With `capacity` set it
/// refuses envelopes once that many are held.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingQueue {
    pub envelopes: std::sync::Mutex<Vec<TaskEnvelope>>,
    pub capacity: std::sync::Mutex<Option<usize>>,
}

#[cfg(test)]
impl RecordingQueue {
    pub fn taken(&self) -> Vec<TaskEnvelope> {
        self.envelopes.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl TaskQueue for RecordingQueue {
    async fn enqueue(&self, envelope: TaskEnvelope) -> AppResult<()> {
        let mut envelopes = self.envelopes.lock().unwrap();
        if self
            .capacity
            .lock()
            .unwrap()
            .is_some_and(|capacity| envelopes.len() >= capacity)
        {
            return Err(AppError::Internal {
                source: anyhow::anyhow!("task queue is full"),
            });
        }
        envelopes.push(envelope);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_queue_delivers_in_order() {
        let (queue, mut receiver) = LocalTaskQueue::channel();
        for n in 0..3 {
            queue
                .enqueue(TaskEnvelope {
                    id: uuid::Uuid::new_v4(),
                    task_type: format!("t{n}"),
                    payload: serde_json::json!({}),
                })
                .await
                .unwrap();
        }
        for n in 0..3 {
            assert_eq!(receiver.recv().await.unwrap().task_type, format!("t{n}"));
        }
    }

    #[tokio::test]
    async fn test_closed_queue_errors() {
        let (queue, receiver) = LocalTaskQueue::channel();
        drop(receiver);
        let result = queue
            .enqueue(TaskEnvelope {
                id: uuid::Uuid::new_v4(),
                task_type: "t".into(),
                payload: serde_json::json!({}),
            })
            .await;
        assert!(result.is_err());
    }
}
