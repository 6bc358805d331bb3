use anyhow::{Context, Result};
use nuoca_core::Plugin;
use nuoca_protocol::{PluginConfig, RawValues};

/// Input plugin returning the configured `collected_values` on every
/// collect. Useful for self-tests and for tagging a deployment.
#[derive(Debug, Default)]
pub struct StaticInput {
    values: Vec<RawValues>,
}

impl StaticInput {
    pub const NAME: &'static str = "Static";
}

impl Plugin for StaticInput {
    fn startup(&mut self, config: &PluginConfig) -> Result<()> {
        self.values = match config.get("collected_values") {
            Some(values) => serde_json::from_value(values.clone())
                .context("collected_values must be a list of maps of scalar values")?,
            None => Vec::new(),
        };
        Ok(())
    }

    fn collect(&mut self, _collection_interval: u64) -> Result<Vec<RawValues>> {
        Ok(self.values.clone())
    }
}
