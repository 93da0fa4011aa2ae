use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use taskline_core::errors::{TasklineError, TasklineResult};
use taskline_core::models::TaskEnvelope;
use taskline_core::traits::TaskQueue;

/// Queue strategy backed by a single ordered list.
///
/// Lane membership is a field on the envelope; every operation filters by
/// linear scan. Slowest of the strategies but trivially correct, which makes
/// it the reference implementation for the parity suite.
#[derive(Default)]
pub struct SimpleQueue {
    envelopes: Mutex<Vec<TaskEnvelope>>,
}

impl SimpleQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskQueue for SimpleQueue {
    async fn enqueue(&self, envelope: TaskEnvelope) -> TasklineResult<()> {
        let mut envelopes = self.envelopes.lock().await;
        if envelopes.iter().any(|e| e.task_id == envelope.task_id) {
            return Err(TasklineError::DuplicateEnvelope {
                task_id: envelope.task_id,
            });
        }
        envelopes.push(envelope);
        Ok(())
    }

    async fn dequeue(&self, lane: &str) -> TasklineResult<Option<TaskEnvelope>> {
        let now = Utc::now();
        let mut envelopes = self.envelopes.lock().await;
        let position = envelopes
            .iter()
            .position(|e| e.queue_name == lane && e.is_visible(now));
        Ok(position.map(|idx| envelopes.remove(idx)))
    }

    async fn dequeue_any(&self, lane: &str) -> TasklineResult<Option<TaskEnvelope>> {
        let mut envelopes = self.envelopes.lock().await;
        let position = envelopes.iter().position(|e| e.queue_name == lane);
        Ok(position.map(|idx| envelopes.remove(idx)))
    }

    async fn peek(&self, lane: &str, count: usize) -> TasklineResult<Vec<TaskEnvelope>> {
        let now = Utc::now();
        Ok(self
            .envelopes
            .lock()
            .await
            .iter()
            .filter(|e| e.queue_name == lane && e.is_visible(now))
            .take(count)
            .cloned()
            .collect())
    }

    async fn move_to_lane(&self, task_id: &str, new_lane: &str) -> TasklineResult<()> {
        let mut envelopes = self.envelopes.lock().await;
        match envelopes.iter_mut().find(|e| e.task_id == task_id) {
            Some(envelope) => {
                envelope.queue_name = new_lane.to_string();
                Ok(())
            }
            None => Err(TasklineError::EnvelopeNotFound {
                task_id: task_id.to_string(),
            }),
        }
    }

    async fn reschedule(
        &self,
        task_id: &str,
        new_eta: Option<DateTime<Utc>>,
    ) -> TasklineResult<()> {
        let mut envelopes = self.envelopes.lock().await;
        match envelopes.iter_mut().find(|e| e.task_id == task_id) {
            Some(envelope) => {
                envelope.eta = new_eta;
                Ok(())
            }
            None => Err(TasklineError::EnvelopeNotFound {
                task_id: task_id.to_string(),
            }),
        }
    }

    async fn remove(&self, task_id: &str) -> TasklineResult<TaskEnvelope> {
        let mut envelopes = self.envelopes.lock().await;
        let position = envelopes.iter().position(|e| e.task_id == task_id);
        match position {
            Some(idx) => Ok(envelopes.remove(idx)),
            None => Err(TasklineError::EnvelopeNotFound {
                task_id: task_id.to_string(),
            }),
        }
    }

    async fn has_queued(&self, task_name: &str) -> TasklineResult<bool> {
        Ok(self
            .envelopes
            .lock()
            .await
            .iter()
            .any(|e| e.task_name == task_name))
    }

    async fn lanes(&self) -> TasklineResult<Vec<String>> {
        let lanes: BTreeSet<String> = self
            .envelopes
            .lock()
            .await
            .iter()
            .map(|e| e.queue_name.clone())
            .collect();
        Ok(lanes.into_iter().collect())
    }

    async fn len(&self, lane: &str) -> TasklineResult<usize> {
        Ok(self
            .envelopes
            .lock()
            .await
            .iter()
            .filter(|e| e.queue_name == lane)
            .count())
    }

    async fn total(&self) -> TasklineResult<usize> {
        Ok(self.envelopes.lock().await.len())
    }
}
