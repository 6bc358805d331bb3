//! # NuoCA Config
//!
//! YAML configuration for the collection agent

mod config;
mod loader;

pub use config::*;
pub use loader::*;

/// Prelude module for configuration
pub mod prelude {
    pub use crate::{ConfigLoader, NuocaConfig, PluginSpec};
}
