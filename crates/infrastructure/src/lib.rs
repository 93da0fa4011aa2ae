pub mod factory;
pub mod lane_queue;
pub mod locking;
pub mod observability;
pub mod registry;
pub mod simple_queue;
pub mod sqlite_queue;
pub mod state_store;

pub use factory::build_queue;
pub use lane_queue::LaneMapQueue;
pub use locking::InMemoryLocker;
pub use observability::TracingHooks;
pub use registry::InMemoryTaskRegistry;
pub use simple_queue::SimpleQueue;
pub use sqlite_queue::SqliteQueue;
pub use state_store::InMemoryTaskStateStore;
