use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use taskline_core::errors::{TasklineError, TasklineResult};
use taskline_core::models::TaskEnvelope;
use taskline_core::traits::TaskQueue;

/// Queue strategy keeping one deque per lane.
///
/// Avoids cross-lane scans on the hot dequeue path; empty lanes are pruned
/// so `lanes()` only reports lanes that still hold envelopes. This is the
/// default strategy.
#[derive(Default)]
pub struct LaneMapQueue {
    lanes: Mutex<HashMap<String, VecDeque<TaskEnvelope>>>,
}

impl LaneMapQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

fn take_at(
    lanes: &mut HashMap<String, VecDeque<TaskEnvelope>>,
    lane: &str,
    idx: usize,
) -> Option<TaskEnvelope> {
    let queue = lanes.get_mut(lane)?;
    let envelope = queue.remove(idx);
    if queue.is_empty() {
        lanes.remove(lane);
    }
    envelope
}

#[async_trait]
impl TaskQueue for LaneMapQueue {
    async fn enqueue(&self, envelope: TaskEnvelope) -> TasklineResult<()> {
        let mut lanes = self.lanes.lock().await;
        let duplicate = lanes
            .values()
            .flatten()
            .any(|e| e.task_id == envelope.task_id);
        if duplicate {
            return Err(TasklineError::DuplicateEnvelope {
                task_id: envelope.task_id,
            });
        }
        lanes
            .entry(envelope.queue_name.clone())
            .or_default()
            .push_back(envelope);
        Ok(())
    }

    async fn dequeue(&self, lane: &str) -> TasklineResult<Option<TaskEnvelope>> {
        let now = Utc::now();
        let mut lanes = self.lanes.lock().await;
        let position = lanes
            .get(lane)
            .and_then(|queue| queue.iter().position(|e| e.is_visible(now)));
        Ok(position.and_then(|idx| take_at(&mut lanes, lane, idx)))
    }

    async fn dequeue_any(&self, lane: &str) -> TasklineResult<Option<TaskEnvelope>> {
        let mut lanes = self.lanes.lock().await;
        let has_front = lanes.get(lane).is_some_and(|queue| !queue.is_empty());
        Ok(if has_front {
            take_at(&mut lanes, lane, 0)
        } else {
            None
        })
    }

    async fn peek(&self, lane: &str, count: usize) -> TasklineResult<Vec<TaskEnvelope>> {
        let now = Utc::now();
        Ok(self
            .lanes
            .lock()
            .await
            .get(lane)
            .map(|queue| {
                queue
                    .iter()
                    .filter(|e| e.is_visible(now))
                    .take(count)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn move_to_lane(&self, task_id: &str, new_lane: &str) -> TasklineResult<()> {
        let mut lanes = self.lanes.lock().await;
        let found = lanes.iter().find_map(|(lane, queue)| {
            queue
                .iter()
                .position(|e| e.task_id == task_id)
                .map(|idx| (lane.clone(), idx))
        });
        let Some((lane, idx)) = found else {
            return Err(TasklineError::EnvelopeNotFound {
                task_id: task_id.to_string(),
            });
        };
        if let Some(mut envelope) = take_at(&mut lanes, &lane, idx) {
            envelope.queue_name = new_lane.to_string();
            lanes
                .entry(envelope.queue_name.clone())
                .or_default()
                .push_back(envelope);
        }
        Ok(())
    }

    async fn reschedule(
        &self,
        task_id: &str,
        new_eta: Option<DateTime<Utc>>,
    ) -> TasklineResult<()> {
        let mut lanes = self.lanes.lock().await;
        match lanes
            .values_mut()
            .flatten()
            .find(|e| e.task_id == task_id)
        {
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
        let mut lanes = self.lanes.lock().await;
        let found = lanes.iter().find_map(|(lane, queue)| {
            queue
                .iter()
                .position(|e| e.task_id == task_id)
                .map(|idx| (lane.clone(), idx))
        });
        match found {
            Some((lane, idx)) => {
                take_at(&mut lanes, &lane, idx).ok_or_else(|| TasklineError::Internal(
                    format!("envelope '{task_id}' vanished during removal"),
                ))
            }
            None => Err(TasklineError::EnvelopeNotFound {
                task_id: task_id.to_string(),
            }),
        }
    }

    async fn has_queued(&self, task_name: &str) -> TasklineResult<bool> {
        Ok(self
            .lanes
            .lock()
            .await
            .values()
            .flatten()
            .any(|e| e.task_name == task_name))
    }

    async fn lanes(&self) -> TasklineResult<Vec<String>> {
        let mut names: Vec<String> = self.lanes.lock().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn len(&self, lane: &str) -> TasklineResult<usize> {
        Ok(self
            .lanes
            .lock()
            .await
            .get(lane)
            .map(VecDeque::len)
            .unwrap_or(0))
    }

    async fn total(&self) -> TasklineResult<usize> {
        Ok(self.lanes.lock().await.values().map(VecDeque::len).sum())
    }
}
