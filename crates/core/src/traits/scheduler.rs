use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::TasklineResult;

/// Result of one scheduler pass over all registered definitions.
#[derive(Debug, Default)]
pub struct TickOutcome {
    /// `task_id`s of the envelopes enqueued by this tick.
    pub scheduled: Vec<String>,
    /// Per-task failures recovered during the pass (normal mode only).
    pub errors: Vec<TickError>,
}

#[derive(Debug, Clone)]
pub struct TickError {
    pub task_name: String,
    pub message: String,
}

/// Tick engine deciding due-ness and enqueueing due tasks.
#[async_trait]
pub trait SchedulerService: Send + Sync {
    /// Evaluate every definition once against the current time.
    async fn tick(&self) -> TasklineResult<TickOutcome>;

    /// Evaluate every definition once against an explicit `now`.
    async fn tick_at(&self, now: DateTime<Utc>) -> TasklineResult<TickOutcome>;
}
