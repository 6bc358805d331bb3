use crate::cycle::{CollectionCycle, CycleReport, CycleSettings};
use crate::error::{AgentError, StartupError};
use crate::lifecycle::{LifecycleManager, ReapReport};
use nuoca_config::{NuocaConfig, PluginSpec, DEFAULT_COLLECTION_INTERVAL};
use nuoca_core::{
    Category, Clock, IntervalSynchronizer, PluginDiscovery, PluginRegistry, PluginSpawner,
    SystemClock,
};
use nuoca_logger::Logger;
use nuoca_protocol::Values;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Everything the agent needs to know for one run.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Collection interval in seconds
    pub collection_interval: u64,
    pub plugin_pipe_timeout: Duration,
    pub subprocess_exit_timeout: Duration,
    /// Poll period used while waiting for plugin processes to exit
    pub reap_poll_interval: Duration,
    pub self_test: bool,
    pub selftest_loop_count: u32,
    /// First tick in epoch seconds; must be in the future
    pub starttime: Option<i64>,
    pub verbose: bool,
    pub output_values: Values,
    pub input_plugins: Vec<PluginSpec>,
    pub output_plugins: Vec<PluginSpec>,
    pub transform_plugins: Vec<PluginSpec>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from_config(NuocaConfig::default())
    }
}

impl AgentSettings {
    pub fn from_config(config: NuocaConfig) -> Self {
        Self {
            collection_interval: config
                .collection_interval
                .unwrap_or(DEFAULT_COLLECTION_INTERVAL),
            plugin_pipe_timeout: Duration::from_secs(config.plugin_pipe_timeout),
            subprocess_exit_timeout: Duration::from_secs(config.subprocess_exit_timeout),
            reap_poll_interval: Duration::from_secs(1),
            self_test: false,
            selftest_loop_count: config.selftest_loop_count,
            starttime: None,
            verbose: false,
            output_values: config.output_values,
            input_plugins: config.input_plugins,
            output_plugins: config.output_plugins,
            transform_plugins: config.transform_plugins,
        }
    }

    pub fn plugins(&self, category: Category) -> &[PluginSpec] {
        match category {
            Category::Input => &self.input_plugins,
            Category::Output => &self.output_plugins,
            Category::Transform => &self.transform_plugins,
        }
    }

    /// Run `selftest_loop_count` cycles and stop.
    pub fn self_test(mut self) -> Self {
        self.self_test = true;
        self
    }
}

/// Plugins started and rejected by [`Agent::start`].
#[derive(Debug, Default)]
pub struct StartReport {
    pub started: Vec<(String, Category)>,
    pub failed: Vec<StartupError>,
}

/// Top-level collection agent.
///
/// `start` activates the configured plugins, `run_until` drives collection
/// cycles until the shutdown future resolves (or the self-test count is
/// reached) and `shutdown` tears every plugin down. Callers run `shutdown`
/// even when `start` fails.
pub struct Agent {
    settings: AgentSettings,
    registry: PluginRegistry,
    sources: Vec<Box<dyn PluginDiscovery + Send + Sync>>,
    lifecycle: LifecycleManager,
    cycle: CollectionCycle,
    logger: Logger,
    synchronizer: Option<IntervalSynchronizer>,
    last_report: Option<CycleReport>,
}

impl Agent {
    pub fn new(
        settings: AgentSettings,
        spawner: Arc<dyn PluginSpawner>,
        sources: Vec<Box<dyn PluginDiscovery + Send + Sync>>,
        logger: Logger,
    ) -> Self {
        let lifecycle = LifecycleManager::new(settings.plugin_pipe_timeout, logger.clone())
            .with_poll_interval(settings.reap_poll_interval);
        let cycle = CollectionCycle::new(
            CycleSettings {
                pipe_timeout: settings.plugin_pipe_timeout,
                collection_interval: settings.collection_interval,
                output_values: settings.output_values.clone(),
                verbose: settings.verbose,
            },
            logger.clone(),
        );
        Self {
            settings,
            registry: PluginRegistry::new(spawner),
            sources,
            lifecycle,
            cycle,
            logger,
            synchronizer: None,
            last_report: None,
        }
    }

    /// Validate the schedule, discover plugins and start the configured ones.
    ///
    /// Only schedule problems are fatal. A plugin that fails to start is
    /// reported and left out of collection.
    pub async fn start(&mut self) -> Result<StartReport, AgentError> {
        self.logger.info("nuoca agent starting");

        if let Some(starttime) = self.settings.starttime {
            let now = SystemClock.now_ms().div_euclid(1000);
            if now >= starttime {
                let err = AgentError::StartTimeNotInFuture { starttime, now };
                self.logger.error(&err.to_string());
                return Err(err);
            }
        }
        let synchronizer = IntervalSynchronizer::new(
            Duration::from_secs(self.settings.collection_interval),
            self.settings.starttime,
        )?;

        let sources: Vec<&dyn PluginDiscovery> = self
            .sources
            .iter()
            .map(|s| s.as_ref() as &dyn PluginDiscovery)
            .collect();
        let candidates = self.registry.discover_candidates(&sources);
        info!(candidates = candidates.len(), "plugins discovered");

        let mut report = StartReport::default();
        for category in Category::ALL {
            let specs = self.settings.plugins(category).to_vec();
            let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
            for candidate in PluginRegistry::filter_to_configured(&candidates, category, &names) {
                let config = specs
                    .iter()
                    .find(|s| s.name == candidate.name)
                    .map(|s| s.config.clone())
                    .unwrap_or_default();
                match self
                    .lifecycle
                    .activate_and_startup(&mut self.registry, &candidate.name, category, config)
                    .await
                {
                    Ok(()) => report.started.push((candidate.name, category)),
                    Err(e) => {
                        error!(run_id = %self.logger.run_id, error = %e, "plugin not started");
                        report.failed.push(e);
                    }
                }
            }
        }

        info!(
            run_id = %self.logger.run_id,
            started = report.started.len(),
            failed = report.failed.len(),
            first_tick_ms = synchronizer.next_tick_ms(),
            "nuoca agent started"
        );
        self.synchronizer = Some(synchronizer);
        Ok(report)
    }

    /// Drive collection cycles until `shutdown` resolves. In self-test mode
    /// stops after `selftest_loop_count` cycles. Returns the number of
    /// cycles run.
    ///
    /// A cycle that has begun always completes, so `store` for one tick is
    /// finished before the loop looks at `shutdown` again.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<u64, AgentError>
    where
        F: Future<Output = ()>,
    {
        let mut synchronizer = self.synchronizer.take().ok_or(AgentError::NotStarted)?;
        tokio::pin!(shutdown);

        let mut cycles: u64 = 0;
        loop {
            if self.settings.self_test && cycles >= u64::from(self.settings.selftest_loop_count) {
                self.logger.info("self-test loop count reached");
                break;
            }
            let tick = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    self.logger.info("shutdown requested");
                    break;
                }
                tick = synchronizer.wait_for_next_interval() => tick,
            };
            let report = self.cycle.run(&mut self.registry, tick).await;
            self.last_report = Some(report);
            cycles += 1;
        }

        self.synchronizer = Some(synchronizer);
        Ok(cycles)
    }

    /// Run one collection cycle for an explicit tick.
    pub async fn run_cycle(&mut self, tick_ms: i64) -> &CycleReport {
        let report = self.cycle.run(&mut self.registry, tick_ms).await;
        self.last_report.insert(report)
    }

    /// Shut down, exit and reap every plugin. Safe to call when nothing
    /// was started.
    pub async fn shutdown(&mut self) -> ReapReport {
        self.logger.info("nuoca agent shutdown");
        let acknowledged = self.lifecycle.shutdown_all(&mut self.registry).await;
        self.lifecycle.exit_all(&mut self.registry).await;
        let report = self
            .lifecycle
            .reap(&mut self.registry, self.settings.subprocess_exit_timeout)
            .await;
        info!(
            run_id = %self.logger.run_id,
            acknowledged,
            exited = report.exited.len(),
            terminated = report.terminated.len(),
            detached = report.detached.len(),
            "plugins reaped"
        );
        report
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn last_report(&self) -> Option<&CycleReport> {
        self.last_report.as_ref()
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }
}
