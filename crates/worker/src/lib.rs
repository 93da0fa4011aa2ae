pub mod executor;

pub use executor::LocalExecutor;
