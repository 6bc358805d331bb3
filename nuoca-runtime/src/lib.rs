//! # NuoCA Runtime
//!
//! The collection loop: interval-aligned collection cycles over input and
//! output plugins, plugin lifecycle management and the top-level agent.

mod agent;
mod cycle;
mod error;
mod lifecycle;

pub use agent::{Agent, AgentSettings, StartReport};
pub use cycle::{normalize, CollectionCycle, CycleReport, CycleSettings};
pub use error::{AgentError, StartupError};
pub use lifecycle::{LifecycleManager, ReapReport};

/// Prelude module for runtime functionality
pub mod prelude {
    pub use crate::{
        Agent, AgentError, AgentSettings, CollectionCycle, CycleReport, LifecycleManager,
        ReapReport,
    };
}
