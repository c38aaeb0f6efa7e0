use crate::task::TaskId;

/// Failures raised by the store, the editor and the filter boundary.
///
/// None of these are fatal; the caller reports them and keeps going.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("task not found: {0}")]
    NotFound(TaskId),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl TaskError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

pub type TaskResult<T> = Result<T, TaskError>;
