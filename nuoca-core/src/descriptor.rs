use crate::category::{ActivationState, Category};
use crate::host::ProcessHandle;
use nuoca_protocol::{PluginChannel, PluginConfig};
use std::fmt;

/// Identity and runtime binding of one activated plugin.
pub struct PluginDescriptor {
    name: String,
    category: Category,
    configuration: PluginConfig,
    process_handle: ProcessHandle,
    channel: Option<PluginChannel>,
    activation_state: ActivationState,
}

impl PluginDescriptor {
    pub(crate) fn new(
        name: String,
        category: Category,
        configuration: PluginConfig,
        process_handle: ProcessHandle,
        channel: PluginChannel,
    ) -> Self {
        Self {
            name,
            category,
            configuration,
            process_handle,
            channel: Some(channel),
            activation_state: ActivationState::Activated,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn configuration(&self) -> &PluginConfig {
        &self.configuration
    }

    pub fn state(&self) -> ActivationState {
        self.activation_state
    }

    /// The channel, only while the plugin is activated or started.
    pub fn channel_mut(&mut self) -> Option<&mut PluginChannel> {
        if self.activation_state.is_active() {
            self.channel.as_mut()
        } else {
            None
        }
    }

    /// The channel regardless of state, for cooperative teardown of a
    /// plugin that failed startup but still holds an open pipe.
    pub fn teardown_channel_mut(&mut self) -> Option<&mut PluginChannel> {
        self.channel.as_mut()
    }

    pub fn process_mut(&mut self) -> &mut ProcessHandle {
        &mut self.process_handle
    }

    pub fn is_alive(&mut self) -> bool {
        self.process_handle.is_alive()
    }

    /// Move to a new lifecycle state.
    pub fn transition(&mut self, state: ActivationState) {
        tracing::debug!(
            plugin = %self.name,
            category = %self.category,
            from = %self.activation_state,
            to = %state,
            "plugin state change"
        );
        self.activation_state = state;
    }

    /// Drop the agent end of the pipe. The plugin sees end-of-file.
    pub fn release_channel(&mut self) {
        self.channel = None;
    }
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("state", &self.activation_state)
            .field("process", &self.process_handle)
            .field("has_channel", &self.channel.is_some())
            .finish()
    }
}
