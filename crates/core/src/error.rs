//! Error types for the object store
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Caller errors (`NoMatchingIndex`, `DuplicateKey`, `InvalidState`, `Query`)
//! are never retried. Store failures travel unchanged inside
//! `StoreUnavailable`.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for object store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for raw store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures reported by the store collaborator
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// Connection refused, dropped, or otherwise unusable
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store did not answer within the configured timeout
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    /// Command applied to a key holding a different kind of structure
    #[error("wrong type for key '{key}': expected {expected}")]
    WrongType {
        /// Offending key
        key: String,
        /// Structure the command expected
        expected: &'static str,
    },

    /// Command arguments the store refuses (e.g. non-integer increment target)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Reply shape did not match the command that produced it
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Error types for the object store
#[derive(Debug, Error)]
pub enum Error {
    /// The condition's field set matches no configured index
    #[error("no index matches condition fields {fields:?}")]
    NoMatchingIndex {
        /// Sorted field names of the condition
        fields: Vec<String>,
    },

    /// A unique index value is already owned by another record
    #[error("duplicate value '{value}' for unique index {index} (owned by record {owner})")]
    DuplicateKey {
        /// Namespace of the unique index
        index: String,
        /// Composite value that collided
        value: String,
        /// Id currently owning the value
        owner: String,
    },

    /// Operation not valid in the record's current lifecycle state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Malformed condition for the resolved index
    #[error("query error: {0}")]
    Query(String),

    /// A record value cannot be indexed (e.g. non-numeric value for an ordered index)
    #[error("invalid value for field '{field}': {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Why it was rejected
        reason: String,
    },

    /// Field not part of the record schema
    #[error("unknown field '{0}'")]
    UnknownField(String),

    /// Key spec definition violates its invariants
    #[error("invalid key spec: {0}")]
    InvalidKeySpec(String),

    /// Configuration could not be loaded or is invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// Store transport or command failure, propagated unmodified
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),
}

impl Error {
    /// True for failures originating in the store collaborator
    pub fn is_store_error(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_))
    }
}
