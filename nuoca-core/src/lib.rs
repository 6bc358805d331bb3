//! # NuoCA Core
//!
//! Plugin hosting, the plugin registry and the interval synchronizer.
//!
//! Every plugin runs behind a [`PluginChannel`] in its own process (or, for
//! embedding and tests, its own thread). The [`PluginRegistry`] is the only
//! owner of plugin descriptors; everything else borrows them by name and
//! category.
//!
//! [`PluginChannel`]: nuoca_protocol::PluginChannel

#![cfg_attr(docsrs, feature(doc_cfg))]

mod category;
mod descriptor;
mod discovery;
mod error;
mod host;
mod interval;
mod plugin;
mod registry;
mod serve;


pub use category::{ActivationState, Category};
pub use descriptor::PluginDescriptor;
pub use discovery::{EntryPoint, ExecutableDirectory, PluginCandidate, PluginDiscovery};
pub use error::{ActivationError, ScheduleError};
pub use host::{
    InProcessSpawner, PluginSpawner, ProcessHandle, ProcessSpawner, LOG_LEVEL_ENV,
};
pub use interval::{Clock, IntervalSynchronizer, SystemClock};
pub use plugin::{Plugin, PluginCatalog, PluginFactory};
pub use registry::PluginRegistry;
pub use serve::{serve, serve_stdio};

/// Prelude module for core functionality
pub mod prelude {
    pub use crate::{
        ActivationState, Category, IntervalSynchronizer, Plugin, PluginCatalog,
        PluginDescriptor, PluginRegistry, PluginSpawner,
    };
    pub use nuoca_protocol::prelude::*;
}
