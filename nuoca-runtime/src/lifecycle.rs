use crate::error::StartupError;
use futures::future::join_all;
use nuoca_core::{ActivationState, Category, PluginDescriptor, PluginRegistry, ProcessHandle};
use nuoca_logger::Logger;
use nuoca_protocol::{Action, PluginChannel, PluginConfig, Request};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Plugins that left the registry during [`LifecycleManager::reap`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReapReport {
    /// Exited on their own
    pub exited: Vec<(String, Category)>,
    /// Still running at the deadline and killed
    pub terminated: Vec<(String, Category)>,
    /// In-process workers still running at the deadline; left to finish
    /// on their own
    pub detached: Vec<(String, Category)>,
    /// Could not be killed; still tracked
    pub stuck: Vec<(String, Category)>,
}

impl ReapReport {
    pub fn is_empty(&self) -> bool {
        self.exited.is_empty()
            && self.terminated.is_empty()
            && self.detached.is_empty()
            && self.stuck.is_empty()
    }
}

/// Drives plugins through startup, shutdown, exit and reaping.
#[derive(Debug, Clone)]
pub struct LifecycleManager {
    pipe_timeout: Duration,
    poll_interval: Duration,
    logger: Logger,
}

impl LifecycleManager {
    pub fn new(pipe_timeout: Duration, logger: Logger) -> Self {
        Self {
            pipe_timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
            logger,
        }
    }

    /// How often `reap` checks for exited processes.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Activate a plugin and confirm its `startup`.
    ///
    /// On success the plugin is `Started`. On a rejected or unanswered
    /// startup it is marked `Failed`, asked to shut down and exit, and left
    /// `Deactivated` for the reaper.
    pub async fn activate_and_startup(
        &self,
        registry: &mut PluginRegistry,
        name: &str,
        category: Category,
        config: PluginConfig,
    ) -> Result<(), StartupError> {
        let descriptor = registry.activate(name, category, config)?;
        let config = descriptor.configuration().clone();

        let outcome = match descriptor.channel_mut() {
            Some(channel) => match channel
                .round_trip(Request::Startup { config }, self.pipe_timeout)
                .await
            {
                Ok(resp) => match resp.failure_reason() {
                    None => Ok(()),
                    Some(reason) => Err(reason),
                },
                Err(e) => Err(e.to_string()),
            },
            None => Err("channel unavailable".to_string()),
        };

        match outcome {
            Ok(()) => {
                descriptor.transition(ActivationState::Started);
                info!(plugin = %name, category = %category, "plugin started");
                Ok(())
            }
            Err(reason) => {
                self.logger
                    .plugin_failure(name, category, Action::Startup, &reason);
                descriptor.transition(ActivationState::Failed);
                self.abandon(descriptor).await;
                Err(StartupError::Rejected {
                    name: name.to_string(),
                    category,
                    reason,
                })
            }
        }
    }

    /// Best-effort `shutdown` + `exit` for a plugin that failed startup,
    /// then drop its pipe.
    async fn abandon(&self, descriptor: &mut PluginDescriptor) {
        let name = descriptor.name().to_string();
        let category = descriptor.category();
        if let Some(channel) = descriptor.teardown_channel_mut() {
            self.request_shutdown(channel, &name, category).await;
            if let Err(e) = channel.send(Request::Exit, self.pipe_timeout).await {
                debug!(plugin = %name, error = %e, "exit not delivered");
            }
        }
        descriptor.transition(ActivationState::Deactivated);
        descriptor.release_channel();
    }

    async fn request_shutdown(&self, channel: &mut PluginChannel, name: &str, category: Category) -> bool {
        let reason = match channel.round_trip(Request::Shutdown, self.pipe_timeout).await {
            Ok(resp) => match resp.failure_reason() {
                None => return true,
                Some(reason) => reason,
            },
            Err(e) => e.to_string(),
        };
        self.logger
            .plugin_failure(name, category, Action::Shutdown, &reason);
        false
    }

    /// Send `shutdown` to every plugin that is still activated or started.
    /// Returns how many acknowledged it.
    pub async fn shutdown_all(&self, registry: &mut PluginRegistry) -> usize {
        let pending = registry
            .tracked_mut()
            .filter(|d| d.state().is_active())
            .map(|descriptor| async move {
                let name = descriptor.name().to_string();
                let category = descriptor.category();
                match descriptor.channel_mut() {
                    Some(channel) => self.request_shutdown(channel, &name, category).await,
                    None => false,
                }
            });
        join_all(pending).await.into_iter().filter(|ok| *ok).count()
    }

    /// Send `exit` to every plugin that still has a pipe and close it.
    pub async fn exit_all(&self, registry: &mut PluginRegistry) {
        for descriptor in registry.tracked_mut() {
            let name = descriptor.name().to_string();
            if let Some(channel) = descriptor.teardown_channel_mut() {
                if let Err(e) = channel.send(Request::Exit, self.pipe_timeout).await {
                    debug!(plugin = %name, error = %e, "exit not delivered");
                }
            }
            descriptor.release_channel();
            if descriptor.state() != ActivationState::Exited {
                descriptor.transition(ActivationState::Deactivated);
            }
        }
    }

    /// Wait up to `timeout` for plugin processes to exit, polling once per
    /// poll interval, then kill the survivors. Every plugin that is gone
    /// is removed from the registry.
    pub async fn reap(&self, registry: &mut PluginRegistry, timeout: Duration) -> ReapReport {
        let mut report = ReapReport::default();
        if registry.is_empty() {
            return report;
        }

        let deadline = Instant::now() + timeout;
        loop {
            let alive = registry
                .tracked_mut()
                .map(|d| d.is_alive())
                .filter(|alive| *alive)
                .count();
            let now = Instant::now();
            if alive == 0 || now >= deadline {
                break;
            }
            debug!(alive, "waiting for plugin processes to exit");
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }

        for descriptor in registry.tracked_mut() {
            let key = (descriptor.name().to_string(), descriptor.category());
            if !descriptor.is_alive() {
                descriptor.transition(ActivationState::Exited);
                report.exited.push(key);
                continue;
            }
            let worker = matches!(descriptor.process_mut(), ProcessHandle::Thread(_));
            match descriptor.process_mut().terminate().await {
                Ok(()) if worker => {
                    info!(plugin = %key.0, category = %key.1, "plugin worker did not exit in time; detached");
                    descriptor.transition(ActivationState::Exited);
                    report.detached.push(key);
                }
                Ok(()) => {
                    info!(plugin = %key.0, category = %key.1, "plugin did not exit in time; terminated");
                    descriptor.transition(ActivationState::Exited);
                    report.terminated.push(key);
                }
                Err(e) => {
                    error!(plugin = %key.0, category = %key.1, error = %e, "failed to terminate plugin");
                    report.stuck.push(key);
                }
            }
        }

        registry.remove_exited();
        report
    }
}
