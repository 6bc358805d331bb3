use std::time::Duration;

/// Errors raised while talking to the other end of a plugin pipe.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("write did not complete within {0:?}")]
    WriteTimeout(Duration),

    #[error("channel is broken by an earlier incomplete write")]
    Broken,

    #[error("channel closed by peer")]
    Closed,

    #[error("no request awaiting a response")]
    NothingPending,
}
