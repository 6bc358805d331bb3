use serde::{Deserialize, Serialize};
use std::fmt;

/// A single metric value.
///
/// Field sets are plugin defined, but every value must be one of these
/// scalar kinds. Anything else in a plugin response makes the response
/// malformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Value {
    /// Parse a command line style literal: integers, then floats, then
    /// booleans, falling back to a string.
    pub fn parse_literal(raw: &str) -> Self {
        if let Ok(i) = raw.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            return Value::Float(f);
        }
        match raw {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(raw.to_string()),
        }
    }

    /// Interpret the value as an integral epoch timestamp.
    ///
    /// Numeric strings are accepted because plugins commonly forward
    /// timestamps they scraped as text.
    pub fn as_epoch(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.trunc() as i64)
                })
            }
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}
