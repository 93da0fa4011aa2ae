use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::TasklineResult;
use crate::models::TaskEnvelope;

/// Contract shared by every queue strategy.
///
/// A queue is a set of named lanes, each an ordered holding area for
/// envelopes. Within one lane, dequeue order equals insertion order among
/// envelopes whose `eta` has passed; a not-yet-due envelope is invisible
/// rather than reordered. Every mutating operation must behave as an atomic
/// unit even though the baseline runtime drives the queue from a single
/// logical thread, so that concurrent strategies can substitute in.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Insert an envelope into its lane.
    ///
    /// Fails with `DuplicateEnvelope` when the `task_id` is already queued
    /// in any lane; the queue is left unchanged in that case.
    async fn enqueue(&self, envelope: TaskEnvelope) -> TasklineResult<()>;

    /// Remove and return the oldest visible envelope in `lane`.
    ///
    /// Returns `None` when nothing is visible; an empty lane is not an error.
    async fn dequeue(&self, lane: &str) -> TasklineResult<Option<TaskEnvelope>>;

    /// Remove and return the oldest envelope in `lane` regardless of `eta`.
    ///
    /// Administrative operation used by shutdown behaviors.
    async fn dequeue_any(&self, lane: &str) -> TasklineResult<Option<TaskEnvelope>>;

    /// Read-only look at up to `count` visible envelopes in `lane`.
    async fn peek(&self, lane: &str, count: usize) -> TasklineResult<Vec<TaskEnvelope>>;

    /// Move a still-queued envelope to another lane, preserving its id.
    ///
    /// Fails with `EnvelopeNotFound` when the envelope was already dequeued
    /// or never existed.
    async fn move_to_lane(&self, task_id: &str, new_lane: &str) -> TasklineResult<()>;

    /// Change the `eta` of a still-queued envelope (`None` = immediately
    /// visible). Same failure mode as `move_to_lane`.
    async fn reschedule(
        &self,
        task_id: &str,
        new_eta: Option<DateTime<Utc>>,
    ) -> TasklineResult<()>;

    /// Remove a queued envelope without executing it.
    async fn remove(&self, task_id: &str) -> TasklineResult<TaskEnvelope>;

    /// Whether any envelope for `task_name` is still queued in any lane.
    async fn has_queued(&self, task_name: &str) -> TasklineResult<bool>;

    /// Names of lanes currently holding envelopes, sorted for deterministic
    /// round-robin traversal.
    async fn lanes(&self) -> TasklineResult<Vec<String>>;

    /// Number of envelopes in `lane`, visible or not.
    async fn len(&self, lane: &str) -> TasklineResult<usize>;

    /// Number of envelopes across all lanes.
    async fn total(&self) -> TasklineResult<usize>;
}
