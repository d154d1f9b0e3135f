use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "LogConfig::default_name")]
    pub name: String,

    /// Messages below this level are dropped
    #[serde(default)]
    pub level: Level,
}

impl LogConfig {
    fn default_name() -> String {
        "app".to_string()
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
            level: Level::default(),
        }
    }
}

/// Application logger.
pub trait Logger: Send + Sync {
    fn log(&self, level: Level, message: &str);

    fn enabled(&self, level: Level) -> bool;

    fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    fn warning(&self, message: &str) {
        self.log(Level::Warning, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }
}

/// Logger that forwards to `tracing` under the configured log name.
#[derive(Debug, Default, Clone)]
pub struct Log {
    config: LogConfig,
}

impl Log {
    pub const CLASS: &'static str = "app_kernel::components::Log";

    pub fn new(config: LogConfig) -> Self {
        Self { config }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }
}

impl Logger for Log {
    fn log(&self, level: Level, message: &str) {
        if !self.enabled(level) {
            return;
        }

        let log = self.config.name.as_str();
        match level {
            Level::Debug => debug!(log = %log, "{}", message),
            Level::Info => info!(log = %log, "{}", message),
            Level::Warning => warn!(log = %log, "{}", message),
            Level::Error => error!(log = %log, "{}", message),
            Level::Critical => error!(log = %log, critical = true, "{}", message),
        }
    }

    fn enabled(&self, level: Level) -> bool {
        level >= self.config.level
    }
}
