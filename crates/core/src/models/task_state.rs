use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle states of one execution attempt.
///
/// `Pending -> Running -> {Succeeded, Failed}`; `Stopped` is the terminal
/// state reached when a not-yet-started envelope is cancelled. No transition
/// ever leaves a terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "RUNNING")]
    Running,
    #[serde(rename = "SUCCEEDED")]
    Succeeded,
    #[serde(rename = "FAILED")]
    Failed,
    #[serde(rename = "STOPPED")]
    Stopped,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Succeeded | TaskStatus::Failed | TaskStatus::Stopped
        )
    }
}

/// One row of the execution ledger, keyed by `task_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskStateRecord {
    pub task_id: String,
    pub task_name: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Present only on `Succeeded`.
    pub result: Option<Value>,
    /// Present only on `Failed`.
    pub error: Option<String>,
}

impl TaskStateRecord {
    pub fn pending(
        task_id: impl Into<String>,
        task_name: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            task_name: task_name.into(),
            status: TaskStatus::Pending,
            created_at,
            started_at: None,
            finished_at: None,
            result: None,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn mark_running(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
        self.status = TaskStatus::Running;
    }

    pub fn mark_succeeded(&mut self, result: Value) {
        self.status = TaskStatus::Succeeded;
        self.result = Some(result);
        self.finish();
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = TaskStatus::Failed;
        self.error = Some(error.into());
        self.finish();
    }

    pub fn mark_stopped(&mut self) {
        self.status = TaskStatus::Stopped;
        self.finish();
    }

    fn finish(&mut self) {
        if self.finished_at.is_none() {
            self.finished_at = Some(Utc::now());
        }
    }

    pub fn execution_duration_ms(&self) -> Option<i64> {
        match (self.started_at, self.finished_at) {
            (Some(started), Some(finished)) => Some((finished - started).num_milliseconds()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn pending() -> TaskStateRecord {
        TaskStateRecord::pending("run-1", "ping", Utc::now())
    }

    #[test]
    fn success_path_sets_timestamps_in_order() {
        let mut record = pending();
        record.mark_running();
        record.mark_succeeded(json!("ok"));

        assert_eq!(record.status, TaskStatus::Succeeded);
        assert_eq!(record.result, Some(json!("ok")));
        assert!(record.error.is_none());
        let started = record.started_at.unwrap();
        let finished = record.finished_at.unwrap();
        assert!(record.created_at <= started);
        assert!(started <= finished);
        assert!(record.execution_duration_ms().unwrap() >= 0);
    }

    #[test]
    fn failure_records_error_without_result() {
        let mut record = pending();
        record.mark_running();
        record.mark_failed("boom");

        assert_eq!(record.status, TaskStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("boom"));
        assert!(record.result.is_none());
    }

    #[test]
    fn stopped_is_terminal_without_start() {
        let mut record = pending();
        record.mark_stopped();

        assert_eq!(record.status, TaskStatus::Stopped);
        assert!(record.is_terminal());
        assert!(record.started_at.is_none());
        assert!(record.finished_at.is_some());
    }

    #[test]
    fn terminal_statuses() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Succeeded.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Stopped.is_terminal());
    }
}
