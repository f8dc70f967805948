//! Storage layer for the Strata object store
//!
//! This crate defines the contract between the indexing core and its
//! backing key-value system, plus an in-process implementation:
//! - Store: batched command execution (pipelines and transactions)
//! - Command / Reply: hashes, sorted sets, counters, expiry
//! - Pipeline: builder for one-round-trip batches
//! - InMemoryStore: FxHashMap + parking_lot implementation of Store
//! - SortedSet: score-ordered member set backing the in-memory store
//! - testing: fault injection for partial-failure tests

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod command;
pub mod memory;
pub mod sorted_set;
pub mod store;
pub mod testing;

pub use command::{Command, ExecMode, Reply};
pub use memory::InMemoryStore;
pub use sorted_set::SortedSet;
pub use store::{Pipeline, Store};
