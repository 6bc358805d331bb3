use crate::category::{ActivationState, Category};

/// Failure to bind a configured plugin to a running process.
#[derive(Debug, thiserror::Error)]
pub enum ActivationError {
    #[error("plugin '{name}' ({category}) was not discovered")]
    NotDiscovered { name: String, category: Category },

    #[error("plugin '{name}' ({category}) is already active")]
    AlreadyActive { name: String, category: Category },

    #[error("plugin '{name}' ({category}) is still tracked in state {state}")]
    AlreadyTracked {
        name: String,
        category: Category,
        state: ActivationState,
    },

    #[error("failed to spawn plugin '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("plugin '{name}' process has no {pipe} pipe")]
    MissingPipe { name: String, pipe: &'static str },
}

/// Invalid interval schedule parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("collection interval must be at least one millisecond")]
    ZeroInterval,

    #[error("start time {seed_ms} ms is before the current time {now_ms} ms")]
    SeedInPast { seed_ms: i64, now_ms: i64 },
}
