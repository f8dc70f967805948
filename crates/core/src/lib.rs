//! Core types for the Strata object store
//!
//! This crate defines the foundational types used throughout the system:
//! - Value: scalar field values (string, integer, float)
//! - RecordId / FieldMap: record identity and field storage
//! - Condition: query descriptor (exact values, ranges, paging)
//! - Error / StoreError: the error taxonomy shared by every layer

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod condition;
pub mod error;
pub mod types;
pub mod value;

pub use condition::{Condition, Paging, Predicate};
pub use error::{Error, Result, StoreError, StoreResult};
pub use types::{FieldMap, RecordId, ID_FIELD};
pub use value::Value;
