use async_trait::async_trait;

use crate::errors::TasklineResult;
use crate::models::TaskStateRecord;

/// Ledger of execution attempts keyed by `task_id`.
///
/// Records reach a terminal state exactly once and are never deleted by the
/// core; retention is an external concern.
#[async_trait]
pub trait TaskStateStore: Send + Sync {
    async fn create(&self, record: TaskStateRecord) -> TasklineResult<()>;

    /// Replace the record with the same `task_id`.
    ///
    /// Fails with `RecordNotFound` when absent, and rejects any transition
    /// that would leave a terminal state.
    async fn update(&self, record: TaskStateRecord) -> TasklineResult<()>;

    async fn get(&self, task_id: &str) -> TasklineResult<Option<TaskStateRecord>>;

    async fn delete(&self, task_id: &str) -> TasklineResult<()>;

    /// Whether any non-terminal record exists for `task_name`.
    async fn has_active(&self, task_name: &str) -> TasklineResult<bool>;

    /// All non-terminal records.
    async fn active_records(&self) -> TasklineResult<Vec<TaskStateRecord>>;
}
