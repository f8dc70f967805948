//! Testing utilities for store failure handling
//!
//! This module provides tools for exercising the object store's
//! partial-failure policy:
//!
//! - **FaultyStore**: wraps any [`Store`] and fails a chosen command with
//!   `StoreError::Unavailable`, applying the commands before it the way a
//!   real pipeline would
//!
//! # Example
//!
//! ```
//! use strata_storage::testing::FaultyStore;
//! use strata_storage::{Command, InMemoryStore, Store};
//!
//! let store = FaultyStore::new(InMemoryStore::new());
//! store.fail_after(0);
//! let err = store.call(Command::HGetAll { key: "k".into() });
//! assert!(err.is_err());
//! ```

mod faulty;

pub use faulty::FaultyStore;
