//! # NuoCA Protocol
//!
//! Message vocabulary and framing shared by the collection agent and its
//! plugin processes.
//!
//! Every frame is a 4-byte big-endian length followed by one JSON document.
//! The agent sends [`Message`]s and the plugin answers each one (except
//! `exit`) with a [`Response`] carrying the same `seq`.

mod channel;
mod codec;
mod error;
mod message;
mod record;
mod value;

pub use channel::PluginChannel;
pub use codec::{Endpoint, HostLink, MAX_FRAME_SIZE};
pub use error::ChannelError;
pub use message::{
    Action, Message, PluginConfig, RawValues, Request, RespValues, Response,
    STATUS_FAILURE, STATUS_SUCCESS,
};
pub use record::{
    Record, Values, COLLECTION_NAME_FIELD, RESERVED_RECORD_FIELDS, TIMESTAMP_FIELD,
};
pub use value::Value;

/// Prelude module for protocol types
pub mod prelude {
    pub use crate::{
        Action, ChannelError, Message, PluginChannel, PluginConfig, RawValues,
        Record, Request, Response, Value,
    };
}
