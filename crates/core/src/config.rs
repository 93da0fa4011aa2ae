use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{TasklineError, TasklineResult};

/// Queue strategy selector, resolved once at startup into a concrete
/// `TaskQueue` instance by the infrastructure factory.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueueKind {
    /// Single ordered list, linear scan per lane.
    Simple,
    /// One deque per lane.
    #[default]
    LaneMap,
    /// In-memory SQLite table.
    Sqlite,
}

impl FromStr for QueueKind {
    type Err = TasklineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(QueueKind::Simple),
            "lane_map" => Ok(QueueKind::LaneMap),
            "sqlite" => Ok(QueueKind::Sqlite),
            other => Err(TasklineError::Configuration(format!(
                "unknown queue strategy '{other}'"
            ))),
        }
    }
}

/// What happens to queued work when the orchestrator loop is asked to stop.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopBehavior {
    /// Finish queued-and-ready work, then mark the rest stopped.
    #[default]
    Drain,
    /// Mark every queued envelope stopped without executing it.
    Cancel,
    /// Halt immediately, leaving queue and records untouched.
    Ignore,
}

impl FromStr for StopBehavior {
    type Err = TasklineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drain" => Ok(StopBehavior::Drain),
            "cancel" => Ok(StopBehavior::Cancel),
            "ignore" => Ok(StopBehavior::Ignore),
            other => Err(TasklineError::Configuration(format!(
                "unknown stop behavior '{other}'"
            ))),
        }
    }
}

/// Runtime configuration.
///
/// Values are immutable for the lifetime of one orchestrator instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub queue: QueueKind,
    pub tick_interval_ms: u64,
    pub stop_behavior: StopBehavior,
    /// When set, a scheduler tick aborts on the first per-task error instead
    /// of recording it and moving on.
    pub panic_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            queue: QueueKind::default(),
            tick_interval_ms: 1000,
            stop_behavior: StopBehavior::default(),
            panic_mode: false,
        }
    }
}

impl AppConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn from_toml(content: &str) -> TasklineResult<Self> {
        toml::from_str(content).map_err(|e| TasklineError::Configuration(e.to_string()))
    }

    pub fn from_file(path: &Path) -> TasklineResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TasklineError::Configuration(format!("cannot read '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Apply `TASKLINE_*` environment overrides on top of this config.
    pub fn apply_env(mut self) -> TasklineResult<Self> {
        if let Ok(value) = std::env::var("TASKLINE_QUEUE") {
            self.queue = value.parse()?;
        }
        if let Ok(value) = std::env::var("TASKLINE_TICK_INTERVAL_MS") {
            self.tick_interval_ms = value.parse().map_err(|_| {
                TasklineError::Configuration(format!("invalid tick interval '{value}'"))
            })?;
        }
        if let Ok(value) = std::env::var("TASKLINE_STOP_BEHAVIOR") {
            self.stop_behavior = value.parse()?;
        }
        if let Ok(value) = std::env::var("TASKLINE_PANIC_MODE") {
            self.panic_mode = value.parse().map_err(|_| {
                TasklineError::Configuration(format!("invalid panic mode flag '{value}'"))
            })?;
        }
        Ok(self)
    }

    /// Load configuration with the usual precedence:
    /// defaults, then the optional TOML file, then environment variables.
    pub fn load(path: Option<&Path>) -> TasklineResult<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = base.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> TasklineResult<()> {
        if self.tick_interval_ms == 0 {
            return Err(TasklineError::Configuration(
                "tick_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.queue, QueueKind::LaneMap);
        assert_eq!(config.tick_interval_ms, 1000);
        assert_eq!(config.stop_behavior, StopBehavior::Drain);
        assert!(!config.panic_mode);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_toml_with_partial_fields() {
        let config = AppConfig::from_toml(
            r#"
            queue = "sqlite"
            tick_interval_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.queue, QueueKind::Sqlite);
        assert_eq!(config.tick_interval_ms, 250);
        // Unspecified fields keep their defaults.
        assert_eq!(config.stop_behavior, StopBehavior::Drain);
    }

    #[test]
    fn rejects_unknown_queue_kind() {
        let result = AppConfig::from_toml(r#"queue = "carrier_pigeon""#);
        assert!(matches!(result, Err(TasklineError::Configuration(_))));
    }

    #[test]
    fn rejects_zero_tick_interval() {
        let config = AppConfig {
            tick_interval_ms: 0,
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TasklineError::Configuration(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "stop_behavior = \"cancel\"").unwrap();
        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.stop_behavior, StopBehavior::Cancel);
    }

    #[test]
    fn env_overrides_take_precedence() {
        std::env::set_var("TASKLINE_QUEUE", "simple");
        std::env::set_var("TASKLINE_PANIC_MODE", "true");
        let config = AppConfig::default().apply_env().unwrap();
        std::env::remove_var("TASKLINE_QUEUE");
        std::env::remove_var("TASKLINE_PANIC_MODE");

        assert_eq!(config.queue, QueueKind::Simple);
        assert!(config.panic_mode);
    }
}
