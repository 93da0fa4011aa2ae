use async_trait::async_trait;

use crate::errors::TasklineResult;
use crate::models::TaskStateRecord;

/// What a single executor round accomplished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// An envelope was executed to a terminal state.
    Executed { task_id: String },
    /// Every visible envelope was held back by an exclusivity lock; nothing
    /// was lost, the envelopes stay queued.
    Blocked,
    /// No visible envelope in any lane.
    Idle,
}

/// Drains queue lanes and runs callables.
///
/// Execution faults never escape these methods; they are converted into a
/// terminal `Failed` state record.
#[async_trait]
pub trait ExecutorService: Send + Sync {
    /// One round: pick the next visible envelope via lane round-robin and
    /// execute it.
    async fn run_once(&self) -> TasklineResult<RoundOutcome>;

    /// Run rounds until no visible work remains; returns the number of
    /// envelopes executed.
    async fn drain(&self) -> TasklineResult<usize>;

    /// Cancel a not-yet-started task.
    ///
    /// Fails with `NotSupported` when the task is running (the synchronous
    /// executor cannot preempt an in-progress call) or already finished,
    /// `RecordNotFound` when unknown. On success the envelope is removed,
    /// the record is marked `Stopped` and returned.
    async fn stop_task(&self, task_id: &str) -> TasklineResult<TaskStateRecord>;

    /// Fails with `RecordNotFound` when no record exists.
    async fn get_task_state(&self, task_id: &str) -> TasklineResult<TaskStateRecord>;
}
