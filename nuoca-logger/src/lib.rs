//! # NuoCA Logger
//!
//! Logging and tracing support for the collection agent and its plugin
//! processes. Everything is written to stderr (or a log file) because a
//! plugin process's stdout carries the protocol.

use nuoca_core::Category;
use nuoca_protocol::Action;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Environment variable that overrides the configured log filter.
pub const LOG_FILTER_ENV: &str = nuoca_core::LOG_LEVEL_ENV;

pub type InitError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Where and how log lines are written.
#[derive(Debug, Clone)]
pub struct LogSettings {
    /// Default filter directive, e.g. `info` or `nuoca_runtime=debug`
    pub level: String,
    /// Emit JSON lines instead of human readable text
    pub json: bool,
    /// Append to this file instead of stderr
    pub file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl LogSettings {
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Self::default()
        }
    }

    pub fn json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn file(mut self, file: Option<impl AsRef<Path>>) -> Self {
        self.file = file.map(|p| p.as_ref().to_path_buf());
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(&self.level))
    }
}

/// Initialize the global tracing subscriber.
///
/// Fails if a subscriber is already installed or the log file cannot be
/// opened.
pub fn init_tracing(settings: &LogSettings) -> Result<(), InitError> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(settings.filter())
        .with_target(true);

    match &settings.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let builder = builder.with_ansi(false).with_writer(Mutex::new(file));
            if settings.json {
                builder.json().try_init()
            } else {
                builder.try_init()
            }
        }
        None => {
            let builder = builder.with_writer(std::io::stderr);
            if settings.json {
                builder.json().try_init()
            } else {
                builder.try_init()
            }
        }
    }
}

/// Logger for one agent run
#[derive(Debug, Clone)]
pub struct Logger {
    pub run_id: String,
}

/// Success and failure counts for one side of a collection cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PluginTally {
    pub ok: usize,
    pub failed: usize,
}

impl PluginTally {
    pub fn total(&self) -> usize {
        self.ok + self.failed
    }
}

impl Logger {
    /// Create a new logger
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_run_id(run_id: String) -> Self {
        Self { run_id }
    }

    pub fn info(&self, message: &str) {
        info!(run_id = %self.run_id, "{}", message);
    }

    pub fn error(&self, message: &str) {
        error!(run_id = %self.run_id, "{}", message);
    }

    /// A plugin interaction failed and the plugin was skipped.
    pub fn plugin_failure(&self, name: &str, category: Category, action: Action, reason: &str) {
        warn!(
            run_id = %self.run_id,
            plugin = %name,
            category = %category,
            action = %action,
            reason = %reason,
            "plugin interaction failed"
        );
    }

    /// Raw plugin response, logged when running verbose.
    pub fn plugin_response(&self, name: &str, category: Category, action: Action, body: &str) {
        info!(
            run_id = %self.run_id,
            plugin = %name,
            category = %category,
            action = %action,
            response = %body,
            "plugin response"
        );
    }

    /// One line per finished collection cycle.
    pub fn cycle_summary(&self, tick_ms: i64, records: usize, inputs: PluginTally, outputs: PluginTally) {
        if inputs.failed > 0 || outputs.failed > 0 {
            warn!(
                run_id = %self.run_id,
                tick_ms,
                records,
                inputs_ok = inputs.ok,
                inputs_failed = inputs.failed,
                outputs_ok = outputs.ok,
                outputs_failed = outputs.failed,
                "collection cycle finished with failures"
            );
        } else {
            debug!(
                run_id = %self.run_id,
                tick_ms,
                records,
                inputs = inputs.ok,
                outputs = outputs.ok,
                "collection cycle finished"
            );
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_ids_are_unique() {
        let a = Logger::new();
        let b = Logger::new();
        assert_ne!(a.run_id, b.run_id);
        assert_eq!(a.clone().run_id, a.run_id);
    }

    #[test]
    fn test_tally_total() {
        let tally = PluginTally { ok: 2, failed: 1 };
        assert_eq!(tally.total(), 3);
    }

    #[test]
    fn test_settings_builder() {
        let settings = LogSettings::new("debug")
            .json(true)
            .file(Some("/tmp/nuoca.log"));
        assert_eq!(settings.level, "debug");
        assert!(settings.json);
        assert_eq!(settings.file, Some(PathBuf::from("/tmp/nuoca.log")));
    }

    #[test]
    fn test_logging_without_subscriber_is_harmless() {
        let logger = Logger::with_run_id("run-1".to_string());
        logger.plugin_failure("disk", Category::Input, Action::Collect, "timed out");
        logger.cycle_summary(1000, 2, PluginTally { ok: 1, failed: 1 }, PluginTally::default());
    }
}
