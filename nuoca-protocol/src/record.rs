use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reserved raw field that overrides the key prefix of one value map.
pub const COLLECTION_NAME_FIELD: &str = "nuocaCollectionName";

/// Reserved raw field carrying a plugin supplied timestamp.
pub const TIMESTAMP_FIELD: &str = "TimeStamp";

/// Record fields that value maps and static overrides may not use.
pub const RESERVED_RECORD_FIELDS: [&str; 2] = ["timestamp", "collection_interval"];

/// Namespaced metric values of one record.
pub type Values = BTreeMap<String, Value>;

/// One timestamped observation set produced during a collection cycle.
///
/// Serialized flat, so a record reads as
/// `{"A.x": 1, "timestamp": 1000, "collection_interval": 10}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Epoch milliseconds
    pub timestamp: i64,
    /// Collection interval in seconds
    pub collection_interval: u64,
    #[serde(flatten)]
    pub values: Values,
}

impl Record {
    pub fn new(timestamp: i64, collection_interval: u64, values: Values) -> Self {
        Self {
            timestamp,
            collection_interval,
            values,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}
