use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::task::TaskPayload;
use crate::DEFAULT_QUEUE;

/// One queued invocation of a registered task.
///
/// `task_id` identifies this specific invocation and is distinct from the
/// task name; administrative moves and reschedules preserve it. An envelope
/// with a future `eta` is invisible to `dequeue` until that instant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskEnvelope {
    pub task_id: String,
    pub task_name: String,
    #[serde(default)]
    pub payload: TaskPayload,
    pub queue_name: String,
    pub enqueued_at: DateTime<Utc>,
    pub eta: Option<DateTime<Utc>>,
    pub exclusive: bool,
}

impl TaskEnvelope {
    pub fn new(task_name: impl Into<String>, payload: TaskPayload) -> Self {
        Self {
            task_id: Uuid::new_v4().to_string(),
            task_name: task_name.into(),
            payload,
            queue_name: DEFAULT_QUEUE.to_string(),
            enqueued_at: Utc::now(),
            eta: None,
            exclusive: false,
        }
    }

    pub fn on_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue_name = queue.into();
        self
    }

    pub fn with_eta(mut self, eta: DateTime<Utc>) -> Self {
        self.eta = Some(eta);
        self
    }

    pub fn exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    /// Whether the envelope is eligible for dequeue at `now`.
    pub fn is_visible(&self, now: DateTime<Utc>) -> bool {
        self.eta.map_or(true, |eta| eta <= now)
    }
}
