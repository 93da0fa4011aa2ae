use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use taskline_core::config::{AppConfig, StopBehavior};
use taskline_core::errors::TasklineResult;
use taskline_core::models::{TaskDefinition, TaskEnvelope, TaskPayload, TaskStateRecord};
use taskline_core::traits::{
    ExclusivityLock, ExecutorService, SchedulerService, TaskQueue, TaskRegistry, TaskStateStore,
};
use taskline_dispatcher::TickScheduler;
use taskline_infrastructure::{
    build_queue, InMemoryLocker, InMemoryTaskRegistry, InMemoryTaskStateStore, TracingHooks,
};
use taskline_worker::LocalExecutor;

/// Facade wiring registry, queue, scheduler and executor into one runtime.
///
/// `run` drives the tick-then-drain loop until a stop is requested; every
/// other method is safe to call from outside the loop.
pub struct Orchestrator {
    registry: Arc<dyn TaskRegistry>,
    queue: Arc<dyn TaskQueue>,
    state_store: Arc<dyn TaskStateStore>,
    scheduler: Arc<TickScheduler>,
    executor: Arc<LocalExecutor>,
    tick_interval: Duration,
    default_stop: StopBehavior,
    running: AtomicBool,
    requested_stop: Mutex<Option<StopBehavior>>,
}

impl Orchestrator {
    /// Build a fully wired orchestrator from configuration, with in-memory
    /// defaults for every component.
    pub async fn from_config(config: AppConfig) -> TasklineResult<Self> {
        config.validate()?;
        let registry: Arc<dyn TaskRegistry> = Arc::new(InMemoryTaskRegistry::new());
        let queue = build_queue(config.queue).await?;
        let state_store: Arc<dyn TaskStateStore> = Arc::new(InMemoryTaskStateStore::new());
        let locker: Arc<dyn ExclusivityLock> = Arc::new(InMemoryLocker::new());
        Ok(Self::with_components(
            registry,
            queue,
            state_store,
            locker,
            config,
        ))
    }

    /// Wire an orchestrator from caller-provided components.
    pub fn with_components(
        registry: Arc<dyn TaskRegistry>,
        queue: Arc<dyn TaskQueue>,
        state_store: Arc<dyn TaskStateStore>,
        locker: Arc<dyn ExclusivityLock>,
        config: AppConfig,
    ) -> Self {
        let scheduler = Arc::new(
            TickScheduler::new(registry.clone(), queue.clone(), state_store.clone())
                .panic_mode(config.panic_mode),
        );
        let executor = Arc::new(
            LocalExecutor::new(
                registry.clone(),
                queue.clone(),
                state_store.clone(),
                locker,
            )
            .with_hooks(Arc::new(TracingHooks::new())),
        );
        Self {
            registry,
            queue,
            state_store,
            scheduler,
            executor,
            tick_interval: config.tick_interval(),
            default_stop: config.stop_behavior,
            running: AtomicBool::new(false),
            requested_stop: Mutex::new(None),
        }
    }

    pub fn register(&self, definition: TaskDefinition) -> TasklineResult<()> {
        info!(task_name = %definition.name, cadence = ?definition.cadence, "registering task");
        self.registry.register(definition)
    }

    /// Enqueue one invocation of a registered task outside its cadence.
    ///
    /// `lane` overrides the definition's default lane; a future `eta` keeps
    /// the envelope invisible until that instant. Returns the `task_id` of
    /// the queued invocation.
    pub async fn submit_task(
        &self,
        task_name: &str,
        payload: TaskPayload,
        lane: Option<&str>,
        eta: Option<DateTime<Utc>>,
    ) -> TasklineResult<String> {
        let definition = self.registry.get(task_name)?;

        let mut envelope = TaskEnvelope::new(task_name, payload)
            .on_queue(lane.unwrap_or(&definition.default_queue))
            .exclusive(definition.exclusive);
        if let Some(eta) = eta {
            envelope = envelope.with_eta(eta);
        }
        let task_id = envelope.task_id.clone();

        self.state_store
            .create(TaskStateRecord::pending(&task_id, task_name, Utc::now()))
            .await?;
        if let Err(e) = self.queue.enqueue(envelope).await {
            self.state_store.delete(&task_id).await?;
            return Err(e);
        }
        info!(task_id = %task_id, task_name, "submitted task");
        Ok(task_id)
    }

    /// Tick-then-drain loop. Returns when a stop is requested, or with an
    /// error when a tick fails in panic mode.
    pub async fn run(&self) -> TasklineResult<()> {
        self.running.store(true, Ordering::SeqCst);
        info!(tick_interval_ms = self.tick_interval.as_millis() as u64, "orchestrator started");

        let result = self.run_loop().await;
        self.running.store(false, Ordering::SeqCst);
        info!("orchestrator stopped");
        result
    }

    async fn run_loop(&self) -> TasklineResult<()> {
        loop {
            if let Some(behavior) = self.take_requested_stop() {
                self.shutdown(behavior).await?;
                return Ok(());
            }

            let outcome = self.scheduler.tick().await?;
            if !outcome.scheduled.is_empty() {
                debug!(scheduled = outcome.scheduled.len(), "tick enqueued tasks");
            }
            self.executor.drain().await?;

            tokio::time::sleep(self.tick_interval).await;
        }
    }

    /// Request the loop to stop with the configured behavior.
    pub fn stop(&self) {
        self.stop_with(self.default_stop);
    }

    /// Request the loop to stop with an explicit behavior.
    pub fn stop_with(&self, behavior: StopBehavior) {
        let mut requested = self
            .requested_stop
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        *requested = Some(behavior);
    }

    fn take_requested_stop(&self) -> Option<StopBehavior> {
        self.requested_stop
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }

    /// Apply a stop behavior to the queue immediately.
    pub async fn shutdown(&self, behavior: StopBehavior) -> TasklineResult<()> {
        info!(behavior = ?behavior, "shutting down");
        match behavior {
            StopBehavior::Drain => {
                // Finish what is ready now, then stop the rest. Envelopes
                // with a future eta are not waited for.
                self.executor.drain().await?;
                self.cancel_queued().await?;
            }
            StopBehavior::Cancel => {
                self.cancel_queued().await?;
            }
            StopBehavior::Ignore => {}
        }
        Ok(())
    }

    /// Remove every queued envelope and mark its record `Stopped`.
    /// Returns the number of cancelled envelopes.
    pub async fn cancel_queued(&self) -> TasklineResult<usize> {
        let mut cancelled = 0;
        for lane in self.queue.lanes().await? {
            while let Some(envelope) = self.queue.dequeue_any(&lane).await? {
                match self.state_store.get(&envelope.task_id).await? {
                    Some(mut record) if !record.is_terminal() => {
                        record.mark_stopped();
                        self.state_store.update(record).await?;
                    }
                    Some(_) => {}
                    None => {
                        let mut record = TaskStateRecord::pending(
                            &envelope.task_id,
                            &envelope.task_name,
                            envelope.enqueued_at,
                        );
                        record.mark_stopped();
                        self.state_store.create(record).await?;
                    }
                }
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            info!(cancelled, "cancelled queued envelopes");
        }
        Ok(cancelled)
    }

    pub async fn stop_task(&self, task_id: &str) -> TasklineResult<TaskStateRecord> {
        self.executor.stop_task(task_id).await
    }

    pub async fn task_state(&self, task_id: &str) -> TasklineResult<TaskStateRecord> {
        self.executor.get_task_state(task_id).await
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run one scheduler tick and drain the queue without entering the loop.
    /// Intended for callers driving the runtime from their own cadence.
    pub async fn tick_once(&self) -> TasklineResult<usize> {
        self.scheduler.tick().await?;
        self.executor.drain().await
    }

    pub fn registry(&self) -> &Arc<dyn TaskRegistry> {
        &self.registry
    }

    pub fn queue(&self) -> &Arc<dyn TaskQueue> {
        &self.queue
    }

    pub fn state_store(&self) -> &Arc<dyn TaskStateStore> {
        &self.state_store
    }
}
