use crate::category::Category;
use crate::plugin::Plugin;
use nuoca_protocol::{ChannelError, HostLink, Request, Response};
use tracing::{debug, info, warn};

fn outcome(seq: u64, result: anyhow::Result<()>) -> Response {
    match result {
        Ok(()) => Response::success(seq),
        Err(e) => Response::failure(seq, format!("{e:#}")),
    }
}

/// Plugin-side protocol loop.
///
/// Answers every request until the agent sends `exit` or closes the pipe.
/// `collect` and `store` are refused before a successful `startup` and for
/// plugins of the wrong category.
pub async fn serve(
    mut plugin: Box<dyn Plugin>,
    name: &str,
    category: Category,
    mut link: HostLink,
) -> Result<(), ChannelError> {
    let mut started = false;
    let mut shut_down = false;

    loop {
        let message = match link.recv().await {
            Ok(Some(message)) => message,
            Ok(None) => {
                debug!(plugin = %name, "agent closed the pipe");
                if started && !shut_down {
                    if let Err(e) = plugin.shutdown() {
                        warn!(plugin = %name, error = %e, "shutdown after pipe close failed");
                    }
                }
                return Ok(());
            }
            Err(ChannelError::Malformed(e)) => {
                // no seq to answer to
                warn!(plugin = %name, error = %e, "ignoring malformed message");
                continue;
            }
            Err(e) => return Err(e),
        };

        let seq = message.seq;
        let action = message.action();
        debug!(plugin = %name, seq, action = %action, "request");

        let response = match message.request {
            Request::Exit => {
                info!(plugin = %name, "exit requested");
                return Ok(());
            }
            Request::Startup { config } => {
                let response = outcome(seq, plugin.startup(&config));
                started = response.is_success();
                shut_down = false;
                response
            }
            Request::Collect {
                collection_interval,
            } => {
                if category != Category::Input {
                    Response::failure(seq, format!("collect is not valid for {category} plugins"))
                } else if !started {
                    Response::failure(seq, "plugin has not been started")
                } else {
                    match plugin.collect(collection_interval) {
                        Ok(values) => Response::collected(seq, values),
                        Err(e) => Response::failure(seq, format!("{e:#}")),
                    }
                }
            }
            Request::Store { ts_values } => {
                if category != Category::Output {
                    Response::failure(seq, format!("store is not valid for {category} plugins"))
                } else if !started {
                    Response::failure(seq, "plugin has not been started")
                } else {
                    outcome(seq, plugin.store(&ts_values))
                }
            }
            Request::Shutdown => {
                shut_down = true;
                outcome(seq, plugin.shutdown())
            }
        };

        if let Some(reason) = response.failure_reason() {
            warn!(plugin = %name, action = %action, reason = %reason, "request failed");
        }
        link.send(&response).await?;
    }
}

/// Run [`serve`] over the current process's stdin and stdout.
pub async fn serve_stdio(
    plugin: Box<dyn Plugin>,
    name: &str,
    category: Category,
) -> Result<(), ChannelError> {
    let link = HostLink::new(tokio::io::stdin(), tokio::io::stdout());
    serve(plugin, name, category, link).await
}
