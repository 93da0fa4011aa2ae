use std::collections::HashMap;
use std::sync::Mutex;

use taskline_core::errors::{TasklineError, TasklineResult};
use taskline_core::models::TaskDefinition;
use taskline_core::traits::TaskRegistry;

#[derive(Default)]
struct RegistryInner {
    /// Names in registration order; the scheduler evaluates in this order.
    order: Vec<String>,
    tasks: HashMap<String, TaskDefinition>,
}

/// Registry keeping definitions in process memory.
#[derive(Default)]
pub struct InMemoryTaskRegistry {
    inner: Mutex<RegistryInner>,
}

impl InMemoryTaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TaskRegistry for InMemoryTaskRegistry {
    fn register(&self, definition: TaskDefinition) -> TasklineResult<()> {
        let mut inner = self.lock();
        if inner.tasks.contains_key(&definition.name) {
            return Err(TasklineError::DuplicateRegistration {
                name: definition.name,
            });
        }
        inner.order.push(definition.name.clone());
        inner.tasks.insert(definition.name.clone(), definition);
        Ok(())
    }

    fn get(&self, name: &str) -> TasklineResult<TaskDefinition> {
        self.lock()
            .tasks
            .get(name)
            .cloned()
            .ok_or_else(|| TasklineError::UnknownTask {
                name: name.to_string(),
            })
    }

    fn list(&self) -> Vec<TaskDefinition> {
        let inner = self.lock();
        inner
            .order
            .iter()
            .filter_map(|name| inner.tasks.get(name).cloned())
            .collect()
    }

    fn names(&self) -> Vec<String> {
        self.lock().order.clone()
    }

    fn contains(&self, name: &str) -> bool {
        self.lock().tasks.contains_key(name)
    }
}
