//! Command line interface of the `nuoca` binary.

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use nuoca_config::{ConfigLoader, NuocaConfig};
use nuoca_core::Category;
use nuoca_protocol::Value;
use nuoca_runtime::AgentSettings;
use std::path::PathBuf;

/// NuoCA - plugin based telemetry collection agent
#[derive(Parser, Debug)]
#[command(name = "nuoca", version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the collection agent (default)
    Run(RunArgs),
    /// Serve one built-in plugin over stdin/stdout
    Plugin(PluginArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// NuoCA configuration file
    #[arg(long, env = "NUOCA_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Collection interval in seconds (overrides config file)
    #[arg(long)]
    pub collection_interval: Option<u64>,

    /// Directory of plugin executables laid out as <dir>/<category>/<name>
    #[arg(long)]
    pub plugin_dir: Option<PathBuf>,

    /// Start time in epoch seconds for the first collection interval
    #[arg(long)]
    pub starttime: Option<i64>,

    /// Log every plugin response
    #[arg(long)]
    pub verbose: bool,

    /// Run SELFTEST_LOOP_COUNT collection intervals and exit
    #[arg(long)]
    pub self_test: bool,

    /// Log filter, e.g. `info` or `nuoca_runtime=debug`
    #[arg(long, default_value = "info", env = "NUOCA_LOG")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Static value added to every record (repeatable)
    #[arg(long = "output-value", value_name = "KEY=VALUE", value_parser = parse_output_value)]
    pub output_values: Vec<(String, Value)>,
}

#[derive(Args, Debug, Clone)]
pub struct PluginArgs {
    /// Plugin category: input, output or transform
    #[arg(long)]
    pub category: Category,

    /// Plugin name
    #[arg(long)]
    pub name: String,
}

fn parse_output_value(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    ConfigLoader::validate_output_key(key).map_err(|e| e.to_string())?;
    Ok((key.to_string(), Value::parse_literal(value)))
}

impl RunArgs {
    /// Build agent settings: command line first, then the configuration
    /// file, then defaults.
    pub fn settings(&self, config: NuocaConfig) -> Result<AgentSettings> {
        if self.collection_interval == Some(0) {
            return Err(anyhow!("--collection-interval must be greater than zero"));
        }
        let mut settings = AgentSettings::from_config(config);
        if let Some(interval) = self.collection_interval {
            settings.collection_interval = interval;
        }
        settings.starttime = self.starttime;
        settings.verbose = self.verbose;
        settings.self_test = self.self_test;
        for (key, value) in &self.output_values {
            settings.output_values.insert(key.clone(), value.clone());
        }
        ConfigLoader::validate_output_values(&settings.output_values)?;
        Ok(settings)
    }
}
