#![allow(dead_code)]

use anyhow::{bail, Result};
use nuoca_core::{Category, InProcessSpawner, Plugin, PluginCatalog, PluginDiscovery};
use nuoca_logger::Logger;
use nuoca_protocol::{PluginConfig, RawValues, Record, Value};
use nuoca_runtime::{Agent, AgentSettings};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub type Batches = Arc<Mutex<Vec<Vec<Record>>>>;

pub fn raw(pairs: &[(&str, Value)]) -> RawValues {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Input plugin returning the same value maps on every collect.
pub struct Fixed {
    pub maps: Vec<RawValues>,
    pub delay: Duration,
}

impl Plugin for Fixed {
    fn startup(&mut self, _config: &PluginConfig) -> Result<()> {
        Ok(())
    }

    fn collect(&mut self, _collection_interval: u64) -> Result<Vec<RawValues>> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        Ok(self.maps.clone())
    }
}

/// Input plugin whose startup always fails; counts collect calls.
pub struct Rejecting {
    pub collects: Arc<AtomicUsize>,
}

impl Plugin for Rejecting {
    fn startup(&mut self, _config: &PluginConfig) -> Result<()> {
        bail!("no broker configured")
    }

    fn collect(&mut self, _collection_interval: u64) -> Result<Vec<RawValues>> {
        self.collects.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

/// Output plugin keeping every stored batch.
pub struct Capture {
    pub batches: Batches,
}

impl Plugin for Capture {
    fn startup(&mut self, _config: &PluginConfig) -> Result<()> {
        Ok(())
    }

    fn store(&mut self, ts_values: &[Record]) -> Result<()> {
        self.batches
            .lock()
            .map_err(|_| anyhow::anyhow!("poisoned"))?
            .push(ts_values.to_vec());
        Ok(())
    }
}

/// Input plugin whose collect always fails.
pub struct BrokenInput;

impl Plugin for BrokenInput {
    fn startup(&mut self, _config: &PluginConfig) -> Result<()> {
        Ok(())
    }

    fn collect(&mut self, _collection_interval: u64) -> Result<Vec<RawValues>> {
        bail!("sensor unavailable")
    }
}

/// Output plugin whose store always fails.
pub struct BrokenOutput;

impl Plugin for BrokenOutput {
    fn startup(&mut self, _config: &PluginConfig) -> Result<()> {
        Ok(())
    }

    fn store(&mut self, _ts_values: &[Record]) -> Result<()> {
        bail!("backend rejected batch")
    }
}

/// Output plugin that blocks inside store and stops reading its pipe.
pub struct Stalled {
    pub stall: Duration,
}

impl Plugin for Stalled {
    fn startup(&mut self, _config: &PluginConfig) -> Result<()> {
        Ok(())
    }

    fn store(&mut self, _ts_values: &[Record]) -> Result<()> {
        std::thread::sleep(self.stall);
        Ok(())
    }
}

/// One value map with `fields` integer fields.
pub fn wide_map(fields: usize) -> RawValues {
    (0..fields)
        .map(|i| (format!("field_{i}"), Value::Integer(i as i64)))
        .collect()
}

pub fn fixed(catalog: PluginCatalog, name: &str, maps: Vec<RawValues>, delay: Duration) -> PluginCatalog {
    catalog.with(name, Category::Input, move || {
        Box::new(Fixed {
            maps: maps.clone(),
            delay,
        })
    })
}

pub fn capture(catalog: PluginCatalog, name: &str, batches: &Batches) -> PluginCatalog {
    let batches = batches.clone();
    catalog.with(name, Category::Output, move || {
        Box::new(Capture {
            batches: batches.clone(),
        })
    })
}

pub fn settings(inputs: &[&str], outputs: &[&str]) -> AgentSettings {
    let mut settings = AgentSettings::default();
    settings.collection_interval = 10;
    settings.plugin_pipe_timeout = Duration::from_millis(500);
    settings.subprocess_exit_timeout = Duration::from_secs(3);
    settings.reap_poll_interval = Duration::from_millis(20);
    settings.input_plugins = inputs.iter().map(|n| nuoca_config::PluginSpec::new(*n)).collect();
    settings.output_plugins = outputs.iter().map(|n| nuoca_config::PluginSpec::new(*n)).collect();
    settings
}

pub fn in_process_agent(catalog: PluginCatalog, settings: AgentSettings) -> Agent {
    let catalog = Arc::new(catalog);
    let sources: Vec<Box<dyn PluginDiscovery + Send + Sync>> = vec![Box::new(catalog.as_ref().clone())];
    Agent::new(
        settings,
        Arc::new(InProcessSpawner::new(catalog)),
        sources,
        Logger::new(),
    )
}
