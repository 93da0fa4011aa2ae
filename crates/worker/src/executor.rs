use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use taskline_core::errors::{TasklineError, TasklineResult};
use taskline_core::models::{TaskEnvelope, TaskStateRecord, TaskStatus};
use taskline_core::traits::{
    ExclusivityLock, ExecutorService, LifecycleHooks, NoopHooks, RoundOutcome, TaskQueue,
    TaskRegistry, TaskStateStore,
};

/// Synchronous in-process executor.
///
/// One envelope runs at a time; lanes are drained round-robin so one busy
/// lane cannot starve the others. Task faults and hook panics are contained
/// here, only queue and ledger faults propagate to the caller.
pub struct LocalExecutor {
    registry: Arc<dyn TaskRegistry>,
    queue: Arc<dyn TaskQueue>,
    state_store: Arc<dyn TaskStateStore>,
    locker: Arc<dyn ExclusivityLock>,
    hooks: Arc<dyn LifecycleHooks>,
    cursor: AtomicUsize,
}

impl LocalExecutor {
    pub fn new(
        registry: Arc<dyn TaskRegistry>,
        queue: Arc<dyn TaskQueue>,
        state_store: Arc<dyn TaskStateStore>,
        locker: Arc<dyn ExclusivityLock>,
    ) -> Self {
        Self {
            registry,
            queue,
            state_store,
            locker,
            hooks: Arc::new(NoopHooks),
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn LifecycleHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    fn emit(&self, hook: impl FnOnce()) {
        if std::panic::catch_unwind(AssertUnwindSafe(hook)).is_err() {
            warn!("lifecycle hook panicked");
        }
    }

    async fn execute(&self, envelope: TaskEnvelope) -> TasklineResult<()> {
        let mut record = match self.state_store.get(&envelope.task_id).await? {
            Some(record) => record,
            None => {
                // Envelope arrived without a ledger entry; heal it so the
                // run is still observable.
                let record = TaskStateRecord::pending(
                    &envelope.task_id,
                    &envelope.task_name,
                    envelope.enqueued_at,
                );
                self.state_store.create(record.clone()).await?;
                record
            }
        };

        record.mark_running();
        self.state_store.update(record.clone()).await?;
        self.emit(|| self.hooks.on_task_started(&record));

        match self.registry.get(&envelope.task_name) {
            Ok(definition) => {
                debug!(
                    task_id = %envelope.task_id,
                    task_name = %envelope.task_name,
                    "executing task"
                );
                match (definition.callable)(envelope.payload).await {
                    Ok(value) => record.mark_succeeded(value),
                    Err(e) => record.mark_failed(format!("{e:#}")),
                }
            }
            Err(e) => record.mark_failed(e.to_string()),
        }

        self.state_store.update(record.clone()).await?;
        if record.status == TaskStatus::Succeeded {
            self.emit(|| self.hooks.on_task_succeeded(&record));
        } else {
            self.emit(|| self.hooks.on_task_failed(&record));
        }
        Ok(())
    }
}

#[async_trait]
impl ExecutorService for LocalExecutor {
    async fn run_once(&self) -> TasklineResult<RoundOutcome> {
        let lanes = self.queue.lanes().await?;
        if lanes.is_empty() {
            return Ok(RoundOutcome::Idle);
        }

        let start = self.cursor.load(Ordering::Relaxed);
        let mut blocked = false;
        for offset in 0..lanes.len() {
            let idx = (start + offset) % lanes.len();
            let Some(envelope) = self.queue.dequeue(&lanes[idx]).await? else {
                continue;
            };

            if envelope.exclusive && !self.locker.try_acquire(&envelope.task_name) {
                debug!(
                    task_id = %envelope.task_id,
                    task_name = %envelope.task_name,
                    "exclusivity lock held, requeueing envelope"
                );
                self.queue.enqueue(envelope).await?;
                blocked = true;
                continue;
            }

            self.cursor.store(idx + 1, Ordering::Relaxed);
            let locked = envelope.exclusive;
            let task_id = envelope.task_id.clone();
            let task_name = envelope.task_name.clone();
            let result = self.execute(envelope).await;
            if locked {
                self.locker.release(&task_name);
            }
            result?;
            return Ok(RoundOutcome::Executed { task_id });
        }

        Ok(if blocked {
            RoundOutcome::Blocked
        } else {
            RoundOutcome::Idle
        })
    }

    async fn drain(&self) -> TasklineResult<usize> {
        let mut executed = 0;
        while let RoundOutcome::Executed { .. } = self.run_once().await? {
            executed += 1;
        }
        Ok(executed)
    }

    async fn stop_task(&self, task_id: &str) -> TasklineResult<TaskStateRecord> {
        let Some(mut record) = self.state_store.get(task_id).await? else {
            return Err(TasklineError::RecordNotFound {
                task_id: task_id.to_string(),
            });
        };

        match record.status {
            TaskStatus::Running => {
                return Err(TasklineError::NotSupported(format!(
                    "task '{task_id}' is already running and cannot be stopped"
                )));
            }
            status if status.is_terminal() => {
                return Err(TasklineError::NotSupported(format!(
                    "task '{task_id}' already finished"
                )));
            }
            _ => {}
        }

        match self.queue.remove(task_id).await {
            Ok(_) => {}
            // The record can exist without an envelope, stopping is still
            // meaningful then.
            Err(TasklineError::EnvelopeNotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        record.mark_stopped();
        self.state_store.update(record.clone()).await?;
        self.emit(|| self.hooks.on_task_stopped(&record));
        Ok(record)
    }

    async fn get_task_state(&self, task_id: &str) -> TasklineResult<TaskStateRecord> {
        self.state_store
            .get(task_id)
            .await?
            .ok_or_else(|| TasklineError::RecordNotFound {
                task_id: task_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;
    use serde_json::{json, Value};

    use taskline_core::models::{TaskDefinition, TaskPayload};
    use taskline_infrastructure::{
        InMemoryLocker, InMemoryTaskRegistry, InMemoryTaskStateStore, LaneMapQueue,
    };

    use super::*;

    struct Fixture {
        registry: Arc<InMemoryTaskRegistry>,
        queue: Arc<LaneMapQueue>,
        state_store: Arc<InMemoryTaskStateStore>,
        locker: Arc<InMemoryLocker>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                registry: Arc::new(InMemoryTaskRegistry::new()),
                queue: Arc::new(LaneMapQueue::new()),
                state_store: Arc::new(InMemoryTaskStateStore::new()),
                locker: Arc::new(InMemoryLocker::new()),
            }
        }

        fn executor(&self) -> LocalExecutor {
            LocalExecutor::new(
                self.registry.clone(),
                self.queue.clone(),
                self.state_store.clone(),
                self.locker.clone(),
            )
        }

        async fn submit(&self, task_name: &str, lane: &str) -> String {
            let envelope = TaskEnvelope::new(task_name, TaskPayload::default()).on_queue(lane);
            let task_id = envelope.task_id.clone();
            self.state_store
                .create(TaskStateRecord::pending(&task_id, task_name, Utc::now()))
                .await
                .unwrap();
            self.queue.enqueue(envelope).await.unwrap();
            task_id
        }
    }

    #[tokio::test]
    async fn successful_run_records_result() {
        let f = Fixture::new();
        f.registry
            .register(TaskDefinition::new("answer", |_payload| async {
                Ok::<Value, anyhow::Error>(json!(42))
            }))
            .unwrap();
        let task_id = f.submit("answer", "default").await;

        let executor = f.executor();
        let outcome = executor.run_once().await.unwrap();
        assert_eq!(outcome, RoundOutcome::Executed { task_id: task_id.clone() });

        let record = executor.get_task_state(&task_id).await.unwrap();
        assert_eq!(record.status, TaskStatus::Succeeded);
        assert_eq!(record.result, Some(json!(42)));
        assert!(record.started_at.is_some() && record.finished_at.is_some());
    }

    #[tokio::test]
    async fn failing_task_records_error() {
        let f = Fixture::new();
        f.registry
            .register(TaskDefinition::new("boom", |_payload| async {
                Err::<Value, anyhow::Error>(anyhow::anyhow!("kaput"))
            }))
            .unwrap();
        let task_id = f.submit("boom", "default").await;

        let executor = f.executor();
        executor.run_once().await.unwrap();

        let record = executor.get_task_state(&task_id).await.unwrap();
        assert_eq!(record.status, TaskStatus::Failed);
        assert!(record.error.as_deref().unwrap().contains("kaput"));
        assert!(record.result.is_none());
    }

    #[tokio::test]
    async fn unregistered_task_fails_instead_of_crashing() {
        let f = Fixture::new();
        let task_id = f.submit("ghost", "default").await;

        let executor = f.executor();
        let outcome = executor.run_once().await.unwrap();
        assert!(matches!(outcome, RoundOutcome::Executed { .. }));

        let record = executor.get_task_state(&task_id).await.unwrap();
        assert_eq!(record.status, TaskStatus::Failed);
        assert!(record.error.as_deref().unwrap().contains("ghost"));
    }

    #[tokio::test]
    async fn envelope_without_record_gets_one() {
        let f = Fixture::new();
        f.registry
            .register(TaskDefinition::new("stray", |_payload| async {
                Ok::<Value, anyhow::Error>(Value::Null)
            }))
            .unwrap();
        let envelope = TaskEnvelope::new("stray", TaskPayload::default());
        let task_id = envelope.task_id.clone();
        f.queue.enqueue(envelope).await.unwrap();

        let executor = f.executor();
        executor.run_once().await.unwrap();
        let record = executor.get_task_state(&task_id).await.unwrap();
        assert_eq!(record.status, TaskStatus::Succeeded);
    }

    #[tokio::test]
    async fn lanes_are_drained_round_robin() {
        let f = Fixture::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for lane in ["alpha", "beta"] {
            let order = order.clone();
            f.registry
                .register(TaskDefinition::new(lane, move |_payload| {
                    let order = order.clone();
                    async move {
                        order.lock().unwrap().push(lane);
                        Ok::<Value, anyhow::Error>(Value::Null)
                    }
                }))
                .unwrap();
            for _ in 0..4 {
                f.submit(lane, lane).await;
            }
        }

        let executor = f.executor();
        assert_eq!(executor.drain().await.unwrap(), 8);
        assert_eq!(
            *order.lock().unwrap(),
            ["alpha", "beta", "alpha", "beta", "alpha", "beta", "alpha", "beta"]
        );
    }

    #[tokio::test]
    async fn run_once_on_empty_queue_is_idle() {
        let f = Fixture::new();
        let executor = f.executor();
        assert_eq!(executor.run_once().await.unwrap(), RoundOutcome::Idle);
        assert_eq!(executor.drain().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn locked_exclusive_task_is_requeued() {
        let f = Fixture::new();
        f.registry
            .register(
                TaskDefinition::new("solo", |_payload| async {
                    Ok::<Value, anyhow::Error>(Value::Null)
                })
                .exclusive(true),
            )
            .unwrap();
        let envelope =
            TaskEnvelope::new("solo", TaskPayload::default()).exclusive(true);
        let task_id = envelope.task_id.clone();
        f.state_store
            .create(TaskStateRecord::pending(&task_id, "solo", Utc::now()))
            .await
            .unwrap();
        f.queue.enqueue(envelope).await.unwrap();
        assert!(f.locker.try_acquire("solo"));

        let executor = f.executor();
        assert_eq!(executor.run_once().await.unwrap(), RoundOutcome::Blocked);
        assert_eq!(f.queue.total().await.unwrap(), 1);
        // Drain must not spin on work it cannot take.
        assert_eq!(executor.drain().await.unwrap(), 0);

        f.locker.release("solo");
        assert!(matches!(
            executor.run_once().await.unwrap(),
            RoundOutcome::Executed { .. }
        ));
        // Lock released after the run completed.
        assert!(!f.locker.is_locked("solo"));
    }

    #[tokio::test]
    async fn stop_pending_task_removes_envelope() {
        let f = Fixture::new();
        let task_id = f.submit("later", "default").await;

        let executor = f.executor();
        let record = executor.stop_task(&task_id).await.unwrap();
        assert_eq!(record.status, TaskStatus::Stopped);
        assert_eq!(f.queue.total().await.unwrap(), 0);
        assert_eq!(executor.run_once().await.unwrap(), RoundOutcome::Idle);
    }

    #[tokio::test]
    async fn stop_pending_record_without_envelope_still_stops() {
        let f = Fixture::new();
        f.state_store
            .create(TaskStateRecord::pending("orphan", "later", Utc::now()))
            .await
            .unwrap();

        let record = f.executor().stop_task("orphan").await.unwrap();
        assert_eq!(record.status, TaskStatus::Stopped);
    }

    #[tokio::test]
    async fn stop_rejects_running_and_finished_tasks() {
        let f = Fixture::new();
        let executor = f.executor();

        let mut running = TaskStateRecord::pending("r1", "busy", Utc::now());
        f.state_store.create(running.clone()).await.unwrap();
        running.mark_running();
        f.state_store.update(running).await.unwrap();
        assert!(matches!(
            executor.stop_task("r1").await,
            Err(TasklineError::NotSupported(_))
        ));

        let mut done = TaskStateRecord::pending("d1", "busy", Utc::now());
        f.state_store.create(done.clone()).await.unwrap();
        done.mark_running();
        f.state_store.update(done.clone()).await.unwrap();
        done.mark_succeeded(Value::Null);
        f.state_store.update(done).await.unwrap();
        assert!(matches!(
            executor.stop_task("d1").await,
            Err(TasklineError::NotSupported(_))
        ));

        assert!(matches!(
            executor.stop_task("missing").await,
            Err(TasklineError::RecordNotFound { .. })
        ));
    }

    mockall::mock! {
        Hooks {}
        impl LifecycleHooks for Hooks {
            fn on_task_started(&self, record: &TaskStateRecord);
            fn on_task_succeeded(&self, record: &TaskStateRecord);
            fn on_task_failed(&self, record: &TaskStateRecord);
            fn on_task_stopped(&self, record: &TaskStateRecord);
        }
    }

    #[tokio::test]
    async fn hooks_fire_on_success_path() {
        let f = Fixture::new();
        f.registry
            .register(TaskDefinition::new("observed", |_payload| async {
                Ok::<Value, anyhow::Error>(Value::Null)
            }))
            .unwrap();
        f.submit("observed", "default").await;

        let mut hooks = MockHooks::new();
        hooks
            .expect_on_task_started()
            .withf(|record| record.task_name == "observed")
            .times(1)
            .return_const(());
        hooks.expect_on_task_succeeded().times(1).return_const(());
        hooks.expect_on_task_failed().never();

        let executor = f.executor().with_hooks(Arc::new(hooks));
        executor.run_once().await.unwrap();
    }

    struct PanickingHooks;

    impl LifecycleHooks for PanickingHooks {
        fn on_task_started(&self, _record: &TaskStateRecord) {
            panic!("bad hook");
        }
    }

    #[tokio::test]
    async fn hook_panic_does_not_affect_task_outcome() {
        let f = Fixture::new();
        f.registry
            .register(TaskDefinition::new("sturdy", |_payload| async {
                Ok::<Value, anyhow::Error>(json!("done"))
            }))
            .unwrap();
        let task_id = f.submit("sturdy", "default").await;

        let executor = f.executor().with_hooks(Arc::new(PanickingHooks));
        let outcome = executor.run_once().await.unwrap();
        assert!(matches!(outcome, RoundOutcome::Executed { .. }));

        let record = executor.get_task_state(&task_id).await.unwrap();
        assert_eq!(record.status, TaskStatus::Succeeded);
    }

    #[tokio::test]
    async fn payload_reaches_the_callable() {
        let f = Fixture::new();
        f.registry
            .register(TaskDefinition::new("adder", |payload: TaskPayload| async move {
                let sum: i64 = payload
                    .args
                    .iter()
                    .filter_map(Value::as_i64)
                    .sum();
                Ok::<Value, anyhow::Error>(json!(sum))
            }))
            .unwrap();
        let envelope = TaskEnvelope::new(
            "adder",
            TaskPayload::positional(vec![json!(2), json!(3)]),
        );
        let task_id = envelope.task_id.clone();
        f.queue.enqueue(envelope).await.unwrap();

        let executor = f.executor();
        executor.run_once().await.unwrap();
        let record = executor.get_task_state(&task_id).await.unwrap();
        assert_eq!(record.result, Some(json!(5)));
    }
}
