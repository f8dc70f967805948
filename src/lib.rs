//! Strata objects - secondary indexes and queries over a key-value store
//!
//! Records are persisted as hashes in a store that only knows keys. Every
//! record type carries a key spec: the indexes that let it be found by field
//! values instead of by id.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use strata_objects::{Condition, Index, InMemoryStore, Record, RecordType};
//!
//! let users = RecordType::builder("users", Arc::new(InMemoryStore::new()))
//!     .fields(["name", "score"])
//!     .index(Index::unique("users", ["name"]))
//!     .index(Index::ordered_numeric("users", "score"))
//!     .build()?;
//!
//! let mut alice = Record::new().with("name", "alice").with("score", 42);
//! users.save(&mut alice)?;
//!
//! let top = users.get(&Condition::new().between("score", 40.0, 50.0), &["name"])?;
//! assert_eq!(top[0].get("name"), alice.get("name"));
//! # Ok::<(), strata_objects::Error>(())
//! ```
//!
//! # Architecture
//!
//! - `strata-core`: values, conditions, errors
//! - `strata-storage`: the store contract and an in-memory store
//! - `strata-index`: index variants and key specs
//! - `strata-engine`: record types, id generation, configuration

pub use strata_core::{
    Condition, Error, FieldMap, Paging, Predicate, RecordId, Result, StoreError, StoreResult,
    Value, ID_FIELD,
};
pub use strata_engine::{
    IdGenerator, IncrementalIdGenerator, ObjectStoreConfig, Record, RecordType,
    RecordTypeBuilder, CONFIG_FILE_NAME,
};
pub use strata_index::{
    FullTextIndex, Index, IndexKind, KeySpec, OrderedNumericIndex, Tokenizer, UniqueIndex,
    UnorderedIndex,
};
pub use strata_storage::{Command, ExecMode, InMemoryStore, Pipeline, Reply, Store};

/// Fault injection for exercising partial-failure behavior
pub mod testing {
    pub use strata_storage::testing::FaultyStore;
}
