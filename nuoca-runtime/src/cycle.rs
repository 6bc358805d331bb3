use futures::future::join_all;
use nuoca_core::{ActivationState, Category, PluginDescriptor, PluginRegistry};
use nuoca_logger::{Logger, PluginTally};
use nuoca_protocol::{
    Action, RawValues, Record, Request, Response, Value, Values, COLLECTION_NAME_FIELD,
    TIMESTAMP_FIELD,
};
use std::time::Duration;
use tracing::{debug, warn};

/// Parameters shared by every collection cycle of one run.
#[derive(Debug, Clone)]
pub struct CycleSettings {
    /// Per-plugin round-trip timeout
    pub pipe_timeout: Duration,
    /// Collection interval in seconds, stamped on every record
    pub collection_interval: u64,
    /// Static fields applied to every record after plugin values
    pub output_values: Values,
    /// Log every plugin response at info level
    pub verbose: bool,
}

/// Outcome of one collection cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub tick_ms: i64,
    /// Batch handed to every output plugin
    pub records: Vec<Record>,
    pub inputs: PluginTally,
    pub outputs: PluginTally,
}

/// Turn one raw value map into a record.
///
/// The key prefix is the map's `nuocaCollectionName` when present, the
/// plugin name otherwise. A `TimeStamp` field is consumed as the record
/// timestamp; without a usable one the record gets `tick_ms`. Static
/// values are applied last and win on collision.
pub fn normalize(
    plugin: &str,
    mut raw: RawValues,
    tick_ms: i64,
    collection_interval: u64,
    static_values: &Values,
) -> Record {
    let prefix = match raw.remove(COLLECTION_NAME_FIELD) {
        Some(Value::String(name)) => name,
        Some(other) => other.to_string(),
        None => plugin.to_string(),
    };

    let timestamp = match raw.remove(TIMESTAMP_FIELD) {
        Some(value) => value.as_epoch().unwrap_or_else(|| {
            warn!(plugin = %plugin, value = %value, "ignoring unusable TimeStamp");
            tick_ms
        }),
        None => tick_ms,
    };

    let mut values: Values = raw
        .into_iter()
        .map(|(field, value)| (format!("{prefix}.{field}"), value))
        .collect();
    for (key, value) in static_values {
        values.insert(key.clone(), value.clone());
    }

    Record::new(timestamp, collection_interval, values)
}

/// Drives one fan-out / fan-in / normalize / store pass per tick.
#[derive(Debug, Clone)]
pub struct CollectionCycle {
    settings: CycleSettings,
    logger: Logger,
}

impl CollectionCycle {
    pub fn new(settings: CycleSettings, logger: Logger) -> Self {
        Self { settings, logger }
    }

    pub fn settings(&self) -> &CycleSettings {
        &self.settings
    }

    /// Run a full cycle for `tick_ms`. Plugin failures are logged and
    /// skipped; the cycle itself never fails.
    pub async fn run(&self, registry: &mut PluginRegistry, tick_ms: i64) -> CycleReport {
        let (collected, inputs) = self.collect_inputs(registry).await;

        let mut records = Vec::new();
        for (plugin, maps) in collected {
            for raw in maps {
                records.push(normalize(
                    &plugin,
                    raw,
                    tick_ms,
                    self.settings.collection_interval,
                    &self.settings.output_values,
                ));
            }
        }

        let outputs = self.store_outputs(registry, &records).await;
        self.logger
            .cycle_summary(tick_ms, records.len(), inputs, outputs);

        CycleReport {
            tick_ms,
            records,
            inputs,
            outputs,
        }
    }

    /// Collected value maps per input plugin, in activation order.
    async fn collect_inputs(
        &self,
        registry: &mut PluginRegistry,
    ) -> (Vec<(String, Vec<RawValues>)>, PluginTally) {
        let request = Request::Collect {
            collection_interval: self.settings.collection_interval,
        };
        let responses = self.exchange(registry, Category::Input, request).await;

        let mut tally = PluginTally::default();
        let mut collected = Vec::new();
        for (plugin, response) in responses {
            let values = response.and_then(|resp| {
                resp.into_collected_values()
                    .ok_or_else(|| "response is missing collected_values".to_string())
            });
            match values {
                Ok(values) => {
                    tally.ok += 1;
                    collected.push((plugin, values));
                }
                Err(reason) => {
                    tally.failed += 1;
                    self.logger
                        .plugin_failure(&plugin, Category::Input, Action::Collect, &reason);
                }
            }
        }
        (collected, tally)
    }

    async fn store_outputs(&self, registry: &mut PluginRegistry, records: &[Record]) -> PluginTally {
        let request = Request::Store {
            ts_values: records.to_vec(),
        };
        let responses = self.exchange(registry, Category::Output, request).await;

        let mut tally = PluginTally::default();
        for (plugin, response) in responses {
            match response {
                Ok(_) => tally.ok += 1,
                Err(reason) => {
                    tally.failed += 1;
                    self.logger
                        .plugin_failure(&plugin, Category::Output, Action::Store, &reason);
                }
            }
        }
        tally
    }

    /// Send `request` to every started plugin of `category`, then wait for
    /// all answers concurrently, each under its own timeout.
    ///
    /// Plugins whose send failed are reported immediately. Results keep
    /// activation order.
    async fn exchange(
        &self,
        registry: &mut PluginRegistry,
        category: Category,
        request: Request,
    ) -> Vec<(String, Result<Response, String>)> {
        let action = request.action();
        let timeout = self.settings.pipe_timeout;
        let mut targets: Vec<(&mut PluginDescriptor, Option<String>)> = Vec::new();

        for descriptor in registry.activated_mut(category) {
            if descriptor.state() != ActivationState::Started {
                continue;
            }
            let (sent, broken) = match descriptor.channel_mut() {
                Some(channel) => {
                    let sent = channel
                        .send(request.clone(), timeout)
                        .await
                        .err()
                        .map(|e| format!("send failed: {e}"));
                    (sent, channel.is_broken())
                }
                None => (Some("channel unavailable".to_string()), false),
            };
            if broken {
                // a torn frame cannot be recovered; keep the process for the reaper
                warn!(
                    plugin = %descriptor.name(),
                    category = %category,
                    action = %action,
                    "plugin pipe is broken; deactivating"
                );
                descriptor.transition(ActivationState::Deactivated);
                descriptor.release_channel();
            }
            targets.push((descriptor, sent));
        }

        let verbose = self.settings.verbose;
        let logger = &self.logger;
        let waits = targets.into_iter().map(|(descriptor, send_error)| async move {
            let name = descriptor.name().to_string();
            if let Some(reason) = send_error {
                return (name, Err(reason));
            }
            let result = match descriptor.channel_mut() {
                Some(channel) => channel.receive(timeout).await.map_err(|e| e.to_string()),
                None => Err("channel unavailable".to_string()),
            };
            if verbose {
                if let Ok(resp) = &result {
                    let body = serde_json::to_string(resp).unwrap_or_default();
                    logger.plugin_response(&name, category, action, &body);
                }
            }
            let result = result.and_then(|resp| match resp.failure_reason() {
                None => Ok(resp),
                Some(reason) => Err(reason),
            });
            debug!(plugin = %name, action = %action, ok = result.is_ok(), "plugin answered");
            (name, result)
        });

        join_all(waits).await
    }
}
