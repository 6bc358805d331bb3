use crate::category::Category;
use anyhow::{anyhow, Result};
use nuoca_protocol::{PluginConfig, RawValues, Record};
use std::fmt;
use std::sync::Arc;

/// Plugin side of the protocol.
///
/// Methods run inside the plugin process, one request at a time. A plugin
/// that gathers data on its own schedule should do so on a background
/// thread and hand back whatever has accumulated from `collect`.
pub trait Plugin: Send {
    /// Called once before any `collect`/`store`.
    fn startup(&mut self, config: &PluginConfig) -> Result<()>;

    /// Input plugins: return the raw value maps gathered since the last call.
    fn collect(&mut self, _collection_interval: u64) -> Result<Vec<RawValues>> {
        Err(anyhow!("collect is not supported by this plugin"))
    }

    /// Output plugins: persist or forward one cycle's batch.
    fn store(&mut self, _ts_values: &[Record]) -> Result<()> {
        Err(anyhow!("store is not supported by this plugin"))
    }

    /// Release resources; the process stays reachable until `exit`.
    fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}

pub type PluginFactory = Arc<dyn Fn() -> Box<dyn Plugin> + Send + Sync>;

#[derive(Clone)]
struct CatalogEntry {
    name: String,
    category: Category,
    factory: PluginFactory,
}

/// Compiled-in table of plugin factories keyed by name and category.
#[derive(Clone, Default)]
pub struct PluginCatalog {
    entries: Vec<CatalogEntry>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory, replacing any earlier one with the same key.
    pub fn register<F>(&mut self, name: impl Into<String>, category: Category, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn Plugin> + Send + Sync + 'static,
    {
        let name = name.into();
        self.entries
            .retain(|e| !(e.name == name && e.category == category));
        self.entries.push(CatalogEntry {
            name,
            category,
            factory: Arc::new(factory),
        });
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<F>(mut self, name: impl Into<String>, category: Category, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Plugin> + Send + Sync + 'static,
    {
        self.register(name, category, factory);
        self
    }

    /// Instantiate a plugin.
    pub fn create(&self, name: &str, category: Category) -> Option<Box<dyn Plugin>> {
        self.entries
            .iter()
            .find(|e| e.name == name && e.category == category)
            .map(|e| (e.factory)())
    }

    pub fn contains(&self, name: &str, category: Category) -> bool {
        self.entries
            .iter()
            .any(|e| e.name == name && e.category == category)
    }

    /// Registered (name, category) pairs in registration order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, Category)> {
        self.entries.iter().map(|e| (e.name.as_str(), e.category))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| (&e.name, e.category)))
            .finish()
    }
}
