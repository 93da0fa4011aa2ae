pub mod envelope;
pub mod task;
pub mod task_state;

pub use envelope::TaskEnvelope;
pub use task::{Cadence, TaskDefinition, TaskFn, TaskFuture, TaskPayload};
pub use task_state::{TaskStateRecord, TaskStatus};
