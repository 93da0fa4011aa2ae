use crate::errors::TasklineResult;
use crate::models::TaskDefinition;

/// Lookup of registered task definitions.
///
/// The registry is an explicit instance owned by the orchestrator and shared
/// by reference with the scheduler and executor; there is no process-wide
/// default registry.
pub trait TaskRegistry: Send + Sync {
    /// Fails with `DuplicateRegistration` when the name is taken.
    fn register(&self, definition: TaskDefinition) -> TasklineResult<()>;

    /// Fails with `UnknownTask` when no definition carries that name.
    fn get(&self, name: &str) -> TasklineResult<TaskDefinition>;

    /// Definitions in registration order.
    fn list(&self) -> Vec<TaskDefinition>;

    fn names(&self) -> Vec<String>;

    fn contains(&self, name: &str) -> bool;
}
