use anyhow::{anyhow, Context, Result};
use clap::Parser;
use nuoca::cli::{Cli, Command, PluginArgs, RunArgs};
use nuoca::plugins::builtin_catalog;
use nuoca_config::ConfigLoader;
use nuoca_core::{serve_stdio, ExecutableDirectory, PluginDiscovery, ProcessSpawner};
use nuoca_logger::{init_tracing, LogSettings, Logger};
use nuoca_runtime::Agent;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        None => run(cli.run).await,
        Some(Command::Run(args)) => run(args).await,
        Some(Command::Plugin(args)) => plugin(args).await,
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let config_file = args
        .config_file
        .as_ref()
        .ok_or_else(|| anyhow!("You must provide a NuoCA Config file"))?;
    let config = ConfigLoader::from_yaml_file(config_file)?;

    init_tracing(
        &LogSettings::new(&args.log_level)
            .json(args.log_json)
            .file(config.nuoca_logfile.as_ref()),
    )
    .map_err(|e| anyhow!("failed to initialize logging: {e}"))?;

    let settings = args.settings(config)?;
    let spawner = ProcessSpawner::current_exe()
        .context("cannot locate the nuoca executable")?
        .with_log_level(&args.log_level);

    let mut sources: Vec<Box<dyn PluginDiscovery + Send + Sync>> =
        vec![Box::new(builtin_catalog())];
    if let Some(dir) = &args.plugin_dir {
        sources.push(Box::new(ExecutableDirectory::new(dir)));
    }

    let mut agent = Agent::new(settings, Arc::new(spawner), sources, Logger::new());
    let outcome = async {
        let report = agent.start().await?;
        if !report.failed.is_empty() {
            warn!(failed = report.failed.len(), "some plugins failed to start");
        }
        agent.run_until(shutdown_signal()).await
    }
    .await;

    let reaped = agent.shutdown().await;
    if !reaped.stuck.is_empty() {
        warn!(stuck = ?reaped.stuck, "plugin processes still running after shutdown");
    }

    let cycles = outcome?;
    info!(cycles, "nuoca agent stopped");
    Ok(())
}

async fn plugin(args: PluginArgs) -> Result<()> {
    init_tracing(&LogSettings::new("warn"))
        .map_err(|e| anyhow!("failed to initialize logging: {e}"))?;

    let plugin = builtin_catalog()
        .create(&args.name, args.category)
        .ok_or_else(|| anyhow!("no built-in {} plugin named '{}'", args.category, args.name))?;
    serve_stdio(plugin, &args.name, args.category).await?;
    Ok(())
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl-C"),
        _ = terminate => info!("received SIGTERM"),
    }
}
