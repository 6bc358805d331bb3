use crate::error::ChannelError;
use crate::message::{Message, Response};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::pin::Pin;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

/// Upper bound for a single frame (16 MiB).
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

type BoxedReader = Pin<Box<dyn AsyncRead + Send>>;
type BoxedWriter = Pin<Box<dyn AsyncWrite + Send>>;

fn codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .max_frame_length(MAX_FRAME_SIZE)
        .new_codec()
}

/// Typed, length-delimited JSON endpoint over a pair of byte streams.
///
/// `Tx` is what this side writes, `Rx` what it reads.
pub struct Endpoint<Tx, Rx> {
    reader: FramedRead<BoxedReader, LengthDelimitedCodec>,
    writer: FramedWrite<BoxedWriter, LengthDelimitedCodec>,
    _marker: PhantomData<fn(Tx) -> Rx>,
}

/// Plugin side of a pipe: reads messages, writes responses.
pub type HostLink = Endpoint<Response, Message>;

impl<Tx, Rx> Endpoint<Tx, Rx>
where
    Tx: Serialize,
    Rx: DeserializeOwned,
{
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + 'static,
        W: AsyncWrite + Send + 'static,
    {
        Self {
            reader: FramedRead::new(Box::pin(reader) as BoxedReader, codec()),
            writer: FramedWrite::new(Box::pin(writer) as BoxedWriter, codec()),
            _marker: PhantomData,
        }
    }

    /// Write one frame and flush it.
    pub async fn send(&mut self, item: &Tx) -> Result<(), ChannelError> {
        let encoded = serde_json::to_vec(item).map_err(ChannelError::Encode)?;
        self.writer.send(Bytes::from(encoded)).await?;
        Ok(())
    }

    /// Read the next frame. `Ok(None)` means the peer closed the stream.
    ///
    /// Cancel safe: a partially read frame stays buffered.
    pub async fn recv(&mut self) -> Result<Option<Rx>, ChannelError> {
        match self.reader.next().await {
            None => Ok(None),
            Some(frame) => {
                let frame = frame?;
                serde_json::from_slice(&frame)
                    .map(Some)
                    .map_err(ChannelError::Malformed)
            }
        }
    }
}
