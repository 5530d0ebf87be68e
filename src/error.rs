//! Error types for taskdeck
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (empty title, unknown id, bad argument)
//! - 4: Operation failed (storage could not be written)

use thiserror::Error;

/// Exit codes for the taskdeck CLI
pub mod exit_codes {
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for taskdeck operations
#[derive(Error, Debug)]
pub enum Error {
    // Validation
    #[error("Task title cannot be empty")]
    EmptyTitle,

    #[error("Tag cannot be empty")]
    EmptyTag,

    // Malformed caller input
    #[error("Invalid task ID: {0}")]
    InvalidId(u64),

    #[error("Invalid recurrence frequency: {0}")]
    InvalidFrequency(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Missing references
    #[error("Task not found: {0}")]
    TaskNotFound(u64),

    #[error("Subtask {subtask_id} not found on task {task_id}")]
    SubtaskNotFound { task_id: u64, subtask_id: String },

    #[error("Task {0} is not recurring or is inactive")]
    NotRecurring(u64),

    // Persistence
    #[error("Storage error: failed to save {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::EmptyTitle
            | Error::EmptyTag
            | Error::InvalidId(_)
            | Error::InvalidFrequency(_)
            | Error::InvalidInput(_)
            | Error::TaskNotFound(_)
            | Error::SubtaskNotFound { .. }
            | Error::NotRecurring(_) => exit_codes::USER_ERROR,

            Error::Storage(_) | Error::Io(_) | Error::Json(_) => exit_codes::OPERATION_FAILED,
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }
}

/// Result type alias for taskdeck operations
pub type Result<T> = std::result::Result<T, Error>;
