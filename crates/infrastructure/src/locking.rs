use std::collections::HashSet;
use std::sync::Mutex;

use taskline_core::traits::ExclusivityLock;

/// Process-local exclusivity lock backed by a name set.
#[derive(Default)]
pub struct InMemoryLocker {
    held: Mutex<HashSet<String>>,
}

impl InMemoryLocker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.held.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ExclusivityLock for InMemoryLocker {
    fn try_acquire(&self, task_name: &str) -> bool {
        self.lock().insert(task_name.to_string())
    }

    fn release(&self, task_name: &str) {
        self.lock().remove(task_name);
    }

    fn is_locked(&self, task_name: &str) -> bool {
        self.lock().contains(task_name)
    }
}
