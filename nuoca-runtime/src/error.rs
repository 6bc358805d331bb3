use nuoca_core::{ActivationError, Category, ScheduleError};

/// A configured plugin that could not be brought to `Started`.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Activation(#[from] ActivationError),

    #[error("plugin '{name}' ({category}) failed startup: {reason}")]
    Rejected {
        name: String,
        category: Category,
        reason: String,
    },
}

/// Fatal agent errors. Plugin failures never surface here.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("starttime must be in the future (starttime {starttime}s, now {now}s)")]
    StartTimeNotInFuture { starttime: i64, now: i64 },

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("agent has not been started")]
    NotStarted,
}
