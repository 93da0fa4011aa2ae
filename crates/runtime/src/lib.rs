pub mod orchestrator;

pub use orchestrator::Orchestrator;

pub use taskline_core::config::{AppConfig, QueueKind, StopBehavior};
pub use taskline_core::errors::{TasklineError, TasklineResult};
pub use taskline_core::models::{
    Cadence, TaskDefinition, TaskEnvelope, TaskPayload, TaskStateRecord, TaskStatus,
};
pub use taskline_core::logging::init_logging;
pub use taskline_core::traits;
