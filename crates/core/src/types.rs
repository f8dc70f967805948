//! Identity and field-map types shared by every layer

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Field name to value mapping for one record
///
/// Ordered so that persisted field lists and debug output are deterministic.
pub type FieldMap = BTreeMap<String, Value>;

/// Name of the identity field written alongside every record
pub const ID_FIELD: &str = "id";

/// Unique, strictly increasing record identifier
///
/// Rendered in decimal when used as a sorted-set member or key suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(u64);

impl RecordId {
    /// Wrap a raw id
    pub const fn new(raw: u64) -> Self {
        RecordId(raw)
    }

    /// Raw id value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Value stored under the `id` field of the record hash
    pub fn to_value(&self) -> Value {
        Value::Int(self.0 as i64)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(RecordId)
    }
}

impl From<u64> for RecordId {
    fn from(raw: u64) -> Self {
        RecordId(raw)
    }
}
