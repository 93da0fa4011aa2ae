use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use taskline_core::errors::{TasklineError, TasklineResult};
use taskline_core::models::{TaskDefinition, TaskEnvelope, TaskPayload, TaskStateRecord};
use taskline_core::traits::{
    SchedulerService, TaskQueue, TaskRegistry, TaskStateStore, TickError, TickOutcome,
};

use crate::cadence::cadence_due;

/// Tick engine walking every registered definition and enqueueing the due
/// ones.
///
/// Each due task fires at most once per tick regardless of how much time
/// passed since the previous tick; missed occurrences collapse into a single
/// fire. The last-fire instant advances only after the envelope is actually
/// queued, so a failed enqueue retries on the next tick.
pub struct TickScheduler {
    registry: Arc<dyn TaskRegistry>,
    queue: Arc<dyn TaskQueue>,
    state_store: Arc<dyn TaskStateStore>,
    last_fire: Mutex<HashMap<String, DateTime<Utc>>>,
    panic_mode: bool,
}

impl TickScheduler {
    pub fn new(
        registry: Arc<dyn TaskRegistry>,
        queue: Arc<dyn TaskQueue>,
        state_store: Arc<dyn TaskStateStore>,
    ) -> Self {
        Self {
            registry,
            queue,
            state_store,
            last_fire: Mutex::new(HashMap::new()),
            panic_mode: false,
        }
    }

    /// Abort a tick on the first per-task error instead of recovering.
    pub fn panic_mode(mut self, enabled: bool) -> Self {
        self.panic_mode = enabled;
        self
    }

    pub async fn task_last_fire(&self, task_name: &str) -> Option<DateTime<Utc>> {
        self.last_fire.lock().await.get(task_name).copied()
    }

    /// Backdate or seed the last-fire instant, mainly useful in tests and
    /// when restoring scheduler state.
    pub async fn set_task_last_fire(&self, task_name: &str, at: DateTime<Utc>) {
        self.last_fire.lock().await.insert(task_name.to_string(), at);
    }

    async fn evaluate(
        &self,
        definition: &TaskDefinition,
        now: DateTime<Utc>,
    ) -> TasklineResult<Option<String>> {
        let Some(cadence) = &definition.cadence else {
            return Ok(None);
        };

        let last_fire = self.task_last_fire(&definition.name).await;
        if !cadence_due(cadence, last_fire, now)? {
            return Ok(None);
        }

        if definition.exclusive
            && (self.queue.has_queued(&definition.name).await?
                || self.state_store.has_active(&definition.name).await?)
        {
            debug!(
                task_name = %definition.name,
                "skipping due exclusive task, previous invocation still pending"
            );
            return Ok(None);
        }

        let mut envelope = TaskEnvelope::new(&definition.name, TaskPayload::default())
            .on_queue(&definition.default_queue)
            .exclusive(definition.exclusive);
        // Stamp with the tick's own clock so deterministic ticks produce
        // consistent envelope and record timestamps.
        envelope.enqueued_at = now;
        let task_id = envelope.task_id.clone();

        self.state_store
            .create(TaskStateRecord::pending(&task_id, &definition.name, now))
            .await?;
        if let Err(e) = self.queue.enqueue(envelope).await {
            // No envelope, no record.
            self.state_store.delete(&task_id).await?;
            return Err(e);
        }

        self.last_fire
            .lock()
            .await
            .insert(definition.name.clone(), now);
        info!(
            task_id = %task_id,
            task_name = %definition.name,
            lane = %definition.default_queue,
            "scheduled task"
        );
        Ok(Some(task_id))
    }
}

#[async_trait]
impl SchedulerService for TickScheduler {
    async fn tick(&self) -> TasklineResult<TickOutcome> {
        self.tick_at(Utc::now()).await
    }

    async fn tick_at(&self, now: DateTime<Utc>) -> TasklineResult<TickOutcome> {
        let mut outcome = TickOutcome::default();
        for definition in self.registry.list() {
            match self.evaluate(&definition, now).await {
                Ok(Some(task_id)) => outcome.scheduled.push(task_id),
                Ok(None) => {}
                Err(e) => {
                    if self.panic_mode {
                        return Err(TasklineError::SchedulerTick {
                            task_name: definition.name,
                            message: e.to_string(),
                        });
                    }
                    warn!(task_name = %definition.name, error = %e, "tick failed for task");
                    outcome.errors.push(TickError {
                        task_name: definition.name,
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok(outcome)
    }
}
