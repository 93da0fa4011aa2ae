use thiserror::Error;

/// Error taxonomy shared by every taskline crate.
///
/// Task execution failures are deliberately absent: the executor converts
/// them into a terminal `Failed` state record instead of returning an error
/// to its caller.
#[derive(Debug, Error)]
pub enum TasklineError {
    #[error("task '{name}' is not registered")]
    UnknownTask { name: String },

    #[error("task '{name}' is already registered")]
    DuplicateRegistration { name: String },

    #[error("envelope '{task_id}' is already queued")]
    DuplicateEnvelope { task_id: String },

    #[error("envelope '{task_id}' is not queued")]
    EnvelopeNotFound { task_id: String },

    #[error("no state record for task run '{task_id}'")]
    RecordNotFound { task_id: String },

    #[error("operation not supported: {0}")]
    NotSupported(String),

    #[error("invalid cron expression '{expr}': {message}")]
    InvalidCron { expr: String, message: String },

    #[error("scheduler tick failed for task '{task_name}': {message}")]
    SchedulerTick { task_name: String, message: String },

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Unified result type.
pub type TasklineResult<T> = std::result::Result<T, TasklineError>;
