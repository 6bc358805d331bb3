use crate::codec::Endpoint;
use crate::error::ChannelError;
use crate::message::{Action, Message, Request, Response};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

/// Agent side of a plugin pipe.
///
/// Half duplex: each request gets a fresh `seq` and [`receive`] only
/// returns the response carrying that `seq`. Responses that arrive after
/// their request already timed out are dropped on the next read.
///
/// [`receive`]: PluginChannel::receive
pub struct PluginChannel {
    endpoint: Endpoint<Message, Response>,
    next_seq: u64,
    awaiting: Option<(u64, Action)>,
    broken: bool,
}

impl PluginChannel {
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + 'static,
        W: AsyncWrite + Send + 'static,
    {
        Self {
            endpoint: Endpoint::new(reader, writer),
            next_seq: 1,
            awaiting: None,
            broken: false,
        }
    }

    /// Write one request, giving up after `timeout`. Returns the assigned
    /// `seq`.
    ///
    /// A write that times out or fails may leave a partial frame on the
    /// pipe, so the channel is marked broken and every later `send` fails
    /// with [`ChannelError::Broken`].
    pub async fn send(&mut self, request: Request, timeout: Duration) -> Result<u64, ChannelError> {
        if self.broken {
            return Err(ChannelError::Broken);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        let action = request.action();
        // a failed write leaves nothing to wait for
        self.awaiting = None;
        let written = match tokio::time::timeout(timeout, self.endpoint.send(&Message { seq, request })).await {
            Ok(result) => result,
            Err(_) => Err(ChannelError::WriteTimeout(timeout)),
        };
        if let Err(e) = written {
            if !matches!(e, ChannelError::Encode(_)) {
                self.broken = true;
            }
            return Err(e);
        }
        if action.expects_response() {
            self.awaiting = Some((seq, action));
        }
        Ok(seq)
    }

    /// Wait up to `timeout` for the response to the last request.
    pub async fn receive(&mut self, timeout: Duration) -> Result<Response, ChannelError> {
        let (seq, action) = self.awaiting.ok_or(ChannelError::NothingPending)?;
        let endpoint = &mut self.endpoint;
        let wait = async {
            loop {
                match endpoint.recv().await? {
                    None => return Err(ChannelError::Closed),
                    Some(resp) if resp.seq == seq => return Ok(resp),
                    Some(stale) => {
                        tracing::debug!(
                            stale_seq = stale.seq,
                            expected_seq = seq,
                            action = %action,
                            "discarding late plugin response"
                        );
                    }
                }
            }
        };
        let result = match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(ChannelError::Timeout(timeout)),
        };
        self.awaiting = None;
        result
    }

    /// Send a request and wait for its response, each step bounded by
    /// `timeout`.
    pub async fn round_trip(
        &mut self,
        request: Request,
        timeout: Duration,
    ) -> Result<Response, ChannelError> {
        self.send(request, timeout).await?;
        self.receive(timeout).await
    }

    /// Whether an earlier write was cut short. A broken channel cannot be
    /// written to again.
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// The action of the request currently awaiting a response, if any.
    pub fn pending_action(&self) -> Option<Action> {
        self.awaiting.map(|(_, action)| action)
    }
}
