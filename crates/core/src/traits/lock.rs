/// Per-task-name mutual exclusion marker.
///
/// Held only while an exclusive task is executing; at most one holder per
/// task name at any instant.
pub trait ExclusivityLock: Send + Sync {
    /// Returns `true` when the lock was newly acquired, `false` when another
    /// holder already owns it.
    fn try_acquire(&self, task_name: &str) -> bool;

    /// Releasing an unheld lock is a no-op.
    fn release(&self, task_name: &str);

    fn is_locked(&self, task_name: &str) -> bool;
}
