use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use taskline_core::errors::{TasklineError, TasklineResult};
use taskline_core::models::TaskStateRecord;
use taskline_core::traits::TaskStateStore;

/// Execution ledger held in process memory.
#[derive(Default)]
pub struct InMemoryTaskStateStore {
    records: RwLock<HashMap<String, TaskStateRecord>>,
}

impl InMemoryTaskStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStateStore for InMemoryTaskStateStore {
    async fn create(&self, record: TaskStateRecord) -> TasklineResult<()> {
        self.records
            .write()
            .await
            .insert(record.task_id.clone(), record);
        Ok(())
    }

    async fn update(&self, record: TaskStateRecord) -> TasklineResult<()> {
        let mut records = self.records.write().await;
        match records.get(&record.task_id) {
            None => Err(TasklineError::RecordNotFound {
                task_id: record.task_id.clone(),
            }),
            Some(current) if current.is_terminal() && current.status != record.status => {
                Err(TasklineError::Internal(format!(
                    "illegal transition from {:?} to {:?} for task run '{}'",
                    current.status, record.status, record.task_id
                )))
            }
            Some(_) => {
                records.insert(record.task_id.clone(), record);
                Ok(())
            }
        }
    }

    async fn get(&self, task_id: &str) -> TasklineResult<Option<TaskStateRecord>> {
        Ok(self.records.read().await.get(task_id).cloned())
    }

    async fn delete(&self, task_id: &str) -> TasklineResult<()> {
        self.records.write().await.remove(task_id);
        Ok(())
    }

    async fn has_active(&self, task_name: &str) -> TasklineResult<bool> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .any(|record| record.task_name == task_name && !record.is_terminal()))
    }

    async fn active_records(&self) -> TasklineResult<Vec<TaskStateRecord>> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|record| !record.is_terminal())
            .cloned()
            .collect())
    }
}
