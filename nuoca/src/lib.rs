//! # NuoCA - Plugin Based Telemetry Collection Agent
//!
//! On every wall-clock aligned tick the agent asks each input plugin for
//! metric values, turns them into namespaced, timestamped records and hands
//! the batch to every output plugin. Each plugin lives in its own process
//! and speaks a length-delimited JSON protocol on stdin/stdout.
//!
//! ## Crates
//!
//! - `protocol`: messages, records and framing
//! - `core`: plugin hosting, registry and interval scheduling
//! - `runtime`: collection cycle, lifecycle management and the agent loop
//! - `config`: YAML configuration
//! - `logger`: tracing setup
//!
//! ## Quick Start
//!
//! ```no_run
//! use nuoca::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::from_yaml_file("nuoca.yml")?;
//!     let sources: Vec<Box<dyn PluginDiscovery + Send + Sync>> =
//!         vec![Box::new(nuoca::plugins::builtin_catalog())];
//!     let mut agent = Agent::new(
//!         AgentSettings::from_config(config).self_test(),
//!         Arc::new(ProcessSpawner::current_exe()?),
//!         sources,
//!         Logger::new(),
//!     );
//!     let result = agent.start().await;
//!     if result.is_ok() {
//!         agent.run_until(std::future::pending()).await?;
//!     }
//!     agent.shutdown().await;
//!     result?;
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod cli;
pub mod plugins;

pub use nuoca_config as config;
pub use nuoca_core as core;
pub use nuoca_logger as logger;
pub use nuoca_protocol as protocol;
pub use nuoca_runtime as runtime;

/// Prelude module for easy imports
pub mod prelude {
    pub use nuoca_config::prelude::*;
    pub use nuoca_core::prelude::*;
    pub use nuoca_core::{ExecutableDirectory, PluginDiscovery, ProcessSpawner};
    pub use nuoca_logger::{init_tracing, LogSettings, Logger};
    pub use nuoca_runtime::prelude::*;
}
