use crate::category::{ActivationState, Category};
use crate::descriptor::PluginDescriptor;
use crate::discovery::{PluginCandidate, PluginDiscovery};
use crate::error::ActivationError;
use crate::host::PluginSpawner;
use nuoca_protocol::PluginConfig;
use std::sync::Arc;
use tracing::{info, warn};

/// Single source of truth mapping (name, category) to a plugin descriptor.
///
/// Descriptors are kept in activation order, which is also the order in
/// which collected values are merged.
pub struct PluginRegistry {
    spawner: Arc<dyn PluginSpawner>,
    candidates: Vec<PluginCandidate>,
    plugins: Vec<PluginDescriptor>,
}

impl PluginRegistry {
    pub fn new(spawner: Arc<dyn PluginSpawner>) -> Self {
        Self {
            spawner,
            candidates: Vec::new(),
            plugins: Vec::new(),
        }
    }

    /// Ask every discovery source for candidates. When two sources offer
    /// the same (name, category) the first one wins.
    pub fn discover_candidates(&mut self, sources: &[&dyn PluginDiscovery]) -> Vec<PluginCandidate> {
        let mut found: Vec<PluginCandidate> = Vec::new();
        for source in sources {
            for candidate in source.discover() {
                if found
                    .iter()
                    .any(|c| c.name == candidate.name && c.category == candidate.category)
                {
                    continue;
                }
                found.push(candidate);
            }
        }
        self.candidates = found.clone();
        found
    }

    /// Keep only candidates explicitly named in configuration, in
    /// configuration order. Configuration is an allowlist.
    pub fn filter_to_configured(
        candidates: &[PluginCandidate],
        category: Category,
        configured: &[&str],
    ) -> Vec<PluginCandidate> {
        configured
            .iter()
            .filter_map(|name| {
                let found = candidates
                    .iter()
                    .find(|c| c.category == category && c.name == *name)
                    .cloned();
                if found.is_none() {
                    warn!(plugin = %name, category = %category, "configured plugin was not discovered");
                }
                found
            })
            .collect()
    }

    /// Spawn the plugin process and track it as `Activated`.
    pub fn activate(
        &mut self,
        name: &str,
        category: Category,
        config: PluginConfig,
    ) -> Result<&mut PluginDescriptor, ActivationError> {
        let candidate = self
            .candidates
            .iter()
            .find(|c| c.name == name && c.category == category)
            .cloned()
            .ok_or_else(|| ActivationError::NotDiscovered {
                name: name.to_string(),
                category,
            })?;

        if let Some(index) = self.position(name, category) {
            let state = self.plugins[index].state();
            match state {
                ActivationState::Exited => {
                    self.plugins.remove(index);
                }
                s if s.is_active() => {
                    return Err(ActivationError::AlreadyActive {
                        name: name.to_string(),
                        category,
                    })
                }
                state => {
                    return Err(ActivationError::AlreadyTracked {
                        name: name.to_string(),
                        category,
                        state,
                    })
                }
            }
        }

        let (process, channel) = self.spawner.spawn(&candidate)?;
        info!(plugin = %name, category = %category, pid = ?process.id(), "plugin activated");
        self.plugins.push(PluginDescriptor::new(
            candidate.name,
            category,
            config,
            process,
            channel,
        ));
        let last = self.plugins.len() - 1;
        Ok(&mut self.plugins[last])
    }

    /// Take the plugin out of collection and close its pipe. The process
    /// stays tracked until it is reaped.
    pub fn deactivate(&mut self, name: &str, category: Category) -> bool {
        match self.lookup_mut(name, category) {
            Some(descriptor) => {
                descriptor.transition(ActivationState::Deactivated);
                descriptor.release_channel();
                true
            }
            None => false,
        }
    }

    pub fn lookup(&self, name: &str, category: Category) -> Option<&PluginDescriptor> {
        self.plugins
            .iter()
            .find(|d| d.name() == name && d.category() == category)
    }

    pub fn lookup_mut(&mut self, name: &str, category: Category) -> Option<&mut PluginDescriptor> {
        self.plugins
            .iter_mut()
            .find(|d| d.name() == name && d.category() == category)
    }

    /// Activated or started plugins of one category, in activation order.
    pub fn list_activated(&self, category: Category) -> Vec<&PluginDescriptor> {
        self.plugins
            .iter()
            .filter(|d| d.category() == category && d.state().is_active())
            .collect()
    }

    /// Mutable view of [`list_activated`](Self::list_activated).
    pub fn activated_mut(&mut self, category: Category) -> Vec<&mut PluginDescriptor> {
        self.plugins
            .iter_mut()
            .filter(|d| d.category() == category && d.state().is_active())
            .collect()
    }

    /// Every tracked descriptor, whatever its state.
    pub fn tracked(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.plugins.iter()
    }

    pub fn tracked_mut(&mut self) -> impl Iterator<Item = &mut PluginDescriptor> {
        self.plugins.iter_mut()
    }

    /// Forget a plugin whose process is gone.
    pub fn remove(&mut self, name: &str, category: Category) -> Option<PluginDescriptor> {
        let index = self.position(name, category)?;
        Some(self.plugins.remove(index))
    }

    /// Drop every descriptor in the `Exited` state.
    pub fn remove_exited(&mut self) -> usize {
        let before = self.plugins.len();
        self.plugins
            .retain(|d| d.state() != ActivationState::Exited);
        before - self.plugins.len()
    }

    pub fn candidates(&self) -> &[PluginCandidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    fn position(&self, name: &str, category: Category) -> Option<usize> {
        self.plugins
            .iter()
            .position(|d| d.name() == name && d.category() == category)
    }
}
