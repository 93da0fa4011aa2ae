use crate::models::TaskStateRecord;

/// Observability callbacks invoked at task lifecycle transitions.
///
/// The executor shields itself from hook panics, so a failing hook never
/// affects the task outcome; implementations should still swallow their own
/// errors.
pub trait LifecycleHooks: Send + Sync {
    fn on_task_started(&self, _record: &TaskStateRecord) {}
    fn on_task_succeeded(&self, _record: &TaskStateRecord) {}
    fn on_task_failed(&self, _record: &TaskStateRecord) {}
    fn on_task_stopped(&self, _record: &TaskStateRecord) {}
}

/// Default hooks doing nothing.
pub struct NoopHooks;

impl LifecycleHooks for NoopHooks {}
