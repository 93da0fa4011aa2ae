use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::DEFAULT_QUEUE;

/// Future returned by a task callable.
pub type TaskFuture = BoxFuture<'static, anyhow::Result<Value>>;

/// Callable handle invoked by the executor with the envelope payload.
pub type TaskFn = dyn Fn(TaskPayload) -> TaskFuture + Send + Sync;

/// Positional and keyword arguments carried by an envelope.
///
/// The payload is opaque to the orchestrator; only the callable interprets it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskPayload {
    pub args: Vec<Value>,
    pub kwargs: serde_json::Map<String, Value>,
}

impl TaskPayload {
    pub fn positional(args: Vec<Value>) -> Self {
        Self {
            args,
            kwargs: serde_json::Map::new(),
        }
    }
}

/// Rule determining when a task becomes due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cadence {
    /// Due once every fixed interval.
    Interval(Duration),
    /// Due per a five-or-more-field cron expression (seconds included,
    /// as accepted by the `cron` crate).
    Cron(String),
}

impl Cadence {
    pub fn every(interval: Duration) -> Self {
        Cadence::Interval(interval)
    }

    pub fn cron(expr: impl Into<String>) -> Self {
        Cadence::Cron(expr.into())
    }
}

/// Metadata describing a registered background task.
///
/// Definitions are immutable once registered; a `cadence` of `None` means the
/// task only runs when submitted manually.
#[derive(Clone)]
pub struct TaskDefinition {
    pub name: String,
    pub callable: Arc<TaskFn>,
    pub cadence: Option<Cadence>,
    pub default_queue: String,
    pub exclusive: bool,
}

impl TaskDefinition {
    pub fn new<N, F, Fut>(name: N, callable: F) -> Self
    where
        N: Into<String>,
        F: Fn(TaskPayload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self {
            name: name.into(),
            callable: Arc::new(move |payload| Box::pin(callable(payload))),
            cadence: None,
            default_queue: DEFAULT_QUEUE.to_string(),
            exclusive: false,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.cadence = Some(Cadence::Interval(interval));
        self
    }

    pub fn with_cron(mut self, expr: impl Into<String>) -> Self {
        self.cadence = Some(Cadence::Cron(expr.into()));
        self
    }

    pub fn with_cadence(mut self, cadence: Cadence) -> Self {
        self.cadence = Some(cadence);
        self
    }

    pub fn on_queue(mut self, queue: impl Into<String>) -> Self {
        self.default_queue = queue.into();
        self
    }

    /// At most one invocation of this task name may execute at a time.
    pub fn exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }
}

impl fmt::Debug for TaskDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDefinition")
            .field("name", &self.name)
            .field("cadence", &self.cadence)
            .field("default_queue", &self.default_queue)
            .field("exclusive", &self.exclusive)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_fills_defaults() {
        let def = TaskDefinition::new("cleanup", |_payload| async {
            Ok::<Value, anyhow::Error>(Value::Null)
        });
        assert_eq!(def.name, "cleanup");
        assert_eq!(def.default_queue, DEFAULT_QUEUE);
        assert!(def.cadence.is_none());
        assert!(!def.exclusive);
    }

    #[test]
    fn builder_applies_cadence_and_queue() {
        let def = TaskDefinition::new("report", |_payload| async {
            Ok::<Value, anyhow::Error>(Value::Null)
        })
        .with_interval(Duration::from_secs(60))
        .on_queue("reports")
        .exclusive(true);

        assert_eq!(def.cadence, Some(Cadence::Interval(Duration::from_secs(60))));
        assert_eq!(def.default_queue, "reports");
        assert!(def.exclusive);
    }
}
