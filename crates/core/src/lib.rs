pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod traits;

pub use config::{AppConfig, QueueKind, StopBehavior};
pub use errors::{TasklineError, TasklineResult};
pub use models::{
    Cadence, TaskDefinition, TaskEnvelope, TaskPayload, TaskStateRecord, TaskStatus,
};
pub use traits::{
    ExclusivityLock, ExecutorService, LifecycleHooks, NoopHooks, RoundOutcome, SchedulerService,
    TaskQueue, TaskRegistry, TaskStateStore, TickError, TickOutcome,
};

/// Lane used when neither the definition nor the submission names one.
pub const DEFAULT_QUEUE: &str = "default";
