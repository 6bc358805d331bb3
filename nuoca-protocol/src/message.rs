use crate::record::Record;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Plugin configuration as supplied by the configuration file.
pub type PluginConfig = serde_json::Map<String, serde_json::Value>;

/// One raw value map as returned by an input plugin.
pub type RawValues = BTreeMap<String, Value>;

pub const STATUS_SUCCESS: i32 = 0;
pub const STATUS_FAILURE: i32 = 1;

/// Protocol verbs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Startup,
    Collect,
    Store,
    Shutdown,
    Exit,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Startup => "startup",
            Action::Collect => "collect",
            Action::Store => "store",
            Action::Shutdown => "shutdown",
            Action::Exit => "exit",
        }
    }

    /// Whether the plugin is expected to answer this action.
    pub fn expects_response(&self) -> bool {
        !matches!(self, Action::Exit)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action together with its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "snake_case")]
pub enum Request {
    Startup {
        #[serde(default)]
        config: PluginConfig,
    },
    Collect {
        collection_interval: u64,
    },
    Store {
        ts_values: Vec<Record>,
    },
    Shutdown,
    Exit,
}

impl Request {
    pub fn action(&self) -> Action {
        match self {
            Request::Startup { .. } => Action::Startup,
            Request::Collect { .. } => Action::Collect,
            Request::Store { .. } => Action::Store,
            Request::Shutdown => Action::Shutdown,
            Request::Exit => Action::Exit,
        }
    }
}

/// Envelope sent from the agent to a plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Per-channel request id, echoed back in the response
    pub seq: u64,
    pub request: Request,
}

impl Message {
    pub fn action(&self) -> Action {
        self.request.action()
    }
}

/// Values returned by a successful `collect`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RespValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected_values: Option<Vec<RawValues>>,
}

/// Envelope sent from a plugin back to the agent.
///
/// `status_code` is optional on the wire so that a plugin omitting it
/// still decodes; callers treat a missing status as a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub seq: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resp_values: Option<RespValues>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn success(seq: u64) -> Self {
        Self {
            seq,
            status_code: Some(STATUS_SUCCESS),
            resp_values: None,
            error: None,
        }
    }

    pub fn collected(seq: u64, values: Vec<RawValues>) -> Self {
        Self {
            resp_values: Some(RespValues {
                collected_values: Some(values),
            }),
            ..Self::success(seq)
        }
    }

    pub fn failure(seq: u64, error: impl Into<String>) -> Self {
        Self {
            seq,
            status_code: Some(STATUS_FAILURE),
            resp_values: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == Some(STATUS_SUCCESS)
    }

    /// Describe why this response counts as a failure, if it does.
    pub fn failure_reason(&self) -> Option<String> {
        match (self.status_code, &self.error) {
            (Some(STATUS_SUCCESS), _) => None,
            (None, _) => Some("response is missing status_code".to_string()),
            (Some(code), Some(err)) => Some(format!("status {code}: {err}")),
            (Some(code), None) => Some(format!("status {code}")),
        }
    }

    /// Take the collected value maps out of a collect response.
    pub fn into_collected_values(self) -> Option<Vec<RawValues>> {
        self.resp_values.and_then(|r| r.collected_values)
    }
}
