//! Background task substrate: typed tasks, a local queue with workers, and
//! cron scheduling for periodic maintenance.

pub mod builtin;
pub mod error;
pub mod executor;
pub mod queue;
pub mod registry;
pub mod scheduler;
pub mod types;

pub use builtin::{DeliverNotificationTask, ProcessJobTask, SweepInboundKeywordsTask};
pub use error::TaskFailure;
pub use executor::{RetryPolicy, TaskExecutor};
pub use queue::{LocalTaskQueue, TaskQueue, TaskReceiver, spawn_workers};
pub use registry::TaskRegistry;
pub use scheduler::CronScheduler;
pub use types::{Task, TaskContext, TaskEnvelope};
