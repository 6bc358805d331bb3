use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Plugin category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Supplies time-series values on `collect`
    Input,
    /// Persists or forwards record batches on `store`
    Output,
    /// Activated and started, but never driven per cycle
    Transform,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Input, Category::Output, Category::Transform];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Input => "input",
            Category::Output => "output",
            Category::Transform => "transform",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "input" => Ok(Category::Input),
            "output" => Ok(Category::Output),
            "transform" => Ok(Category::Transform),
            other => Err(format!("unknown plugin category: {other}")),
        }
    }
}

/// Where a plugin is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivationState {
    Discovered,
    /// Process spawned, `startup` not yet confirmed
    Activated,
    /// `startup` succeeded; eligible for collect/store
    Started,
    /// `startup` failed
    Failed,
    /// Removed from collection; process awaiting reap
    Deactivated,
    /// Process confirmed gone
    Exited,
}

impl ActivationState {
    /// Whether the descriptor's channel may be used in this state.
    pub fn is_active(&self) -> bool {
        matches!(self, ActivationState::Activated | ActivationState::Started)
    }
}

impl fmt::Display for ActivationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActivationState::Discovered => "discovered",
            ActivationState::Activated => "activated",
            ActivationState::Started => "started",
            ActivationState::Failed => "failed",
            ActivationState::Deactivated => "deactivated",
            ActivationState::Exited => "exited",
        };
        f.write_str(s)
    }
}
