pub mod executor;
pub mod hooks;
pub mod lock;
pub mod queue;
pub mod registry;
pub mod scheduler;
pub mod state_store;

pub use executor::{ExecutorService, RoundOutcome};
pub use hooks::{LifecycleHooks, NoopHooks};
pub use lock::ExclusivityLock;
pub use queue::TaskQueue;
pub use registry::TaskRegistry;
pub use scheduler::{SchedulerService, TickError, TickOutcome};
pub use state_store::TaskStateStore;
