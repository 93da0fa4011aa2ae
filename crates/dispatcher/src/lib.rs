pub mod cadence;
pub mod scheduler;

pub use cadence::{cadence_due, CronCadence};
pub use scheduler::TickScheduler;
