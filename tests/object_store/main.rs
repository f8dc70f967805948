//! Object Store Integration Tests
//!
//! End-to-end record lifecycle against the in-memory store:
//! saving, querying through every index kind, partial updates,
//! deletes and partial-failure behavior.


mod concurrency;
mod config_file;
mod delete;
mod failures;
mod fulltext;
mod key_spec;
mod ordered;
mod partial_update;
mod unique;
