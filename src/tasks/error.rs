use thiserror::Error;

use crate::error::AppError;
use crate::services::DispatchError;

/// How a task attempt failed, deciding whether the executor tries again.
#[derive(Debug, Error)]
pub enum TaskFailure {
    #[error("retryable: {0}")]
    Retry(#[source] AppError),

    #[error("aborted: {0}")]
    Abort(#[source] AppError),
}

impl TaskFailure {
    pub fn into_inner(self) -> AppError {
        match self {
            TaskFailure::Retry(e) | TaskFailure::Abort(e) => e,
        }
    }
}

impl From<AppError> for TaskFailure {
    fn from(error: AppError) -> Self {
        if error.is_storage() {
            TaskFailure::Retry(error)
        } else {
            TaskFailure::Abort(error)
        }
    }
}

impl From<DispatchError> for TaskFailure {
    fn from(error: DispatchError) -> Self {
        match error {
            DispatchError::Retryable(e) => TaskFailure::Retry(e),
            DispatchError::Fatal(e) => TaskFailure::Abort(e),
        }
    }
}
