//! Store commands and replies
//!
//! The object store talks to its backing key-value system through a small,
//! closed command set: hashes for record bodies and unique claims, sorted
//! sets for ordered and hashed indexes, counters for id reservation.
//! Every command produces exactly one [`Reply`].

use std::time::Duration;
use strata_core::{FieldMap, Paging, StoreError, StoreResult, Value};

/// How a batch of commands is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// One round trip, commands applied in order, no isolation.
    /// Stops at the first failing command; earlier commands stay applied.
    Pipeline,
    /// One round trip, all-or-nothing
    Transaction,
}

/// A single store command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Set hash fields. Reply: `Int(new fields)`
    HSet {
        /// Hash key
        key: String,
        /// Fields to write
        fields: Vec<(String, Value)>,
    },
    /// Read one hash field. Reply: `Value`
    HGet {
        /// Hash key
        key: String,
        /// Field
        field: String,
    },
    /// Read several hash fields. Reply: `Values` (one slot per field)
    HMGet {
        /// Hash key
        key: String,
        /// Fields
        fields: Vec<String>,
    },
    /// Read a whole hash. Reply: `Hash` (empty if absent)
    HGetAll {
        /// Hash key
        key: String,
    },
    /// Set a field only if absent. Reply: `Bool(was set)`
    HSetNx {
        /// Hash key
        key: String,
        /// Field
        field: String,
        /// Value to set
        value: Value,
    },
    /// Delete hash fields. Reply: `Int(removed)`
    HDel {
        /// Hash key
        key: String,
        /// Fields
        fields: Vec<String>,
    },
    /// Delete a field only if it currently equals `expected`. Reply: `Bool(removed)`
    HDelIfEq {
        /// Hash key
        key: String,
        /// Field
        field: String,
        /// Required current value
        expected: Value,
    },
    /// Atomically add to an integer hash field. Reply: `Int(new value)`
    HIncrBy {
        /// Hash key
        key: String,
        /// Field
        field: String,
        /// Amount
        delta: i64,
    },
    /// Atomically add to a counter key. Reply: `Int(new value)`
    IncrBy {
        /// Counter key
        key: String,
        /// Amount
        delta: i64,
    },
    /// Insert or rescore sorted-set members. Reply: `Int(new members)`
    ZAdd {
        /// Sorted-set key
        key: String,
        /// `(member, score)` pairs
        members: Vec<(String, f64)>,
    },
    /// Remove sorted-set members. Reply: `Int(removed)`
    ZRem {
        /// Sorted-set key
        key: String,
        /// Members
        members: Vec<String>,
    },
    /// Members with `min <= score <= max`, ascending. Reply: `Members`
    ZRangeByScore {
        /// Sorted-set key
        key: String,
        /// Lower bound (inclusive)
        min: f64,
        /// Upper bound (inclusive)
        max: f64,
        /// Window into the matching members
        limit: Option<Paging>,
    },
    /// Members by rank. Reply: `Members`
    ZRange {
        /// Sorted-set key
        key: String,
        /// Window; `None` returns every member
        limit: Option<Paging>,
        /// Highest score first
        reverse: bool,
    },
    /// Intersect sorted sets into `dest`, summing scores. Reply: `Int(cardinality)`
    ZInterStore {
        /// Destination key (replaced)
        dest: String,
        /// Source keys
        keys: Vec<String>,
    },
    /// Set a time-to-live on a key. Reply: `Bool(key existed)`
    Expire {
        /// Key
        key: String,
        /// Time to live
        ttl: Duration,
    },
    /// Delete keys. Reply: `Int(removed)`
    Del {
        /// Keys
        keys: Vec<String>,
    },
}

impl Command {
    /// Short command name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::HSet { .. } => "HSET",
            Command::HGet { .. } => "HGET",
            Command::HMGet { .. } => "HMGET",
            Command::HGetAll { .. } => "HGETALL",
            Command::HSetNx { .. } => "HSETNX",
            Command::HDel { .. } => "HDEL",
            Command::HDelIfEq { .. } => "HDELIFEQ",
            Command::HIncrBy { .. } => "HINCRBY",
            Command::IncrBy { .. } => "INCRBY",
            Command::ZAdd { .. } => "ZADD",
            Command::ZRem { .. } => "ZREM",
            Command::ZRangeByScore { .. } => "ZRANGEBYSCORE",
            Command::ZRange { .. } => "ZRANGE",
            Command::ZInterStore { .. } => "ZINTERSTORE",
            Command::Expire { .. } => "EXPIRE",
            Command::Del { .. } => "DEL",
        }
    }
}

/// Result of one command
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Integer result (counts, counters)
    Int(i64),
    /// Boolean result (conditional commands)
    Bool(bool),
    /// Single optional value
    Value(Option<Value>),
    /// One optional value per requested field
    Values(Vec<Option<Value>>),
    /// Whole hash
    Hash(FieldMap),
    /// Sorted-set members
    Members(Vec<String>),
}

impl Reply {
    fn mismatch(&self, expected: &str) -> StoreError {
        StoreError::Protocol(format!("expected {} reply, got {:?}", expected, self))
    }

    /// Unwrap an `Int` reply
    pub fn into_int(self) -> StoreResult<i64> {
        match self {
            Reply::Int(i) => Ok(i),
            other => Err(other.mismatch("Int")),
        }
    }

    /// Unwrap a `Bool` reply
    pub fn into_bool(self) -> StoreResult<bool> {
        match self {
            Reply::Bool(b) => Ok(b),
            other => Err(other.mismatch("Bool")),
        }
    }

    /// Unwrap a `Value` reply
    pub fn into_value(self) -> StoreResult<Option<Value>> {
        match self {
            Reply::Value(v) => Ok(v),
            other => Err(other.mismatch("Value")),
        }
    }

    /// Unwrap a `Values` reply
    pub fn into_values(self) -> StoreResult<Vec<Option<Value>>> {
        match self {
            Reply::Values(v) => Ok(v),
            other => Err(other.mismatch("Values")),
        }
    }

    /// Unwrap a `Hash` reply
    pub fn into_hash(self) -> StoreResult<FieldMap> {
        match self {
            Reply::Hash(h) => Ok(h),
            other => Err(other.mismatch("Hash")),
        }
    }

    /// Unwrap a `Members` reply
    pub fn into_members(self) -> StoreResult<Vec<String>> {
        match self {
            Reply::Members(m) => Ok(m),
            other => Err(other.mismatch("Members")),
        }
    }
}
