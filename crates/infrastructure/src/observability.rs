use tracing::{error, info, warn};

use taskline_core::models::TaskStateRecord;
use taskline_core::traits::LifecycleHooks;

/// Lifecycle hooks emitting structured tracing events.
#[derive(Default)]
pub struct TracingHooks;

impl TracingHooks {
    pub fn new() -> Self {
        Self
    }
}

impl LifecycleHooks for TracingHooks {
    fn on_task_started(&self, record: &TaskStateRecord) {
        info!(
            task_id = %record.task_id,
            task_name = %record.task_name,
            "task started"
        );
    }

    fn on_task_succeeded(&self, record: &TaskStateRecord) {
        info!(
            task_id = %record.task_id,
            task_name = %record.task_name,
            duration_ms = record.execution_duration_ms(),
            "task succeeded"
        );
    }

    fn on_task_failed(&self, record: &TaskStateRecord) {
        error!(
            task_id = %record.task_id,
            task_name = %record.task_name,
            error = record.error.as_deref().unwrap_or("unknown"),
            "task failed"
        );
    }

    fn on_task_stopped(&self, record: &TaskStateRecord) {
        warn!(
            task_id = %record.task_id,
            task_name = %record.task_name,
            "task stopped before execution"
        );
    }
}
