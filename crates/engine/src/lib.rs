//! Record engine for the Strata object store
//!
//! This crate orchestrates the lower layers:
//! - RecordType: schema + key spec + store binding, and every record operation
//! - Record: in-memory record values
//! - IdGenerator: batched, counter-backed id allocation
//! - ObjectStoreConfig: `objects.toml` configuration
//!
//! The engine is the only component that knows about:
//! - Record hash and id-set key layout
//! - Ordering of unique claims relative to the write batch
//! - Stale index cleanup from previously stored values

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod idgen;
pub mod record;
pub mod record_type;

pub use config::{ObjectStoreConfig, CONFIG_FILE_NAME};
pub use idgen::{IdGenerator, IncrementalIdGenerator};
pub use record::Record;
pub use record_type::{RecordType, RecordTypeBuilder};
