//! Secondary indexes for the Strata object store
//!
//! This crate provides:
//! - Index: tagged enum over the four index variants
//! - UnorderedIndex: hashed equality lookup
//! - OrderedNumericIndex: numeric range lookup, ascending by value
//! - UniqueIndex: value-to-owner mapping with duplicate detection
//! - FullTextIndex: weighted token lookup, ranked by summed score
//! - KeySpec: routes queries and writes to the right indexes
//! - Tokenizer: text normalization for full-text indexes

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod fulltext;
pub mod index;
pub mod keyspec;
pub mod ordered;
pub mod tokenizer;
pub mod unique;
pub mod unordered;

pub use fulltext::{FullTextIndex, Scorer, DEFAULT_RESULT_TTL};
pub use index::{Index, IndexKind, RecordView};
pub use keyspec::KeySpec;
pub use ordered::OrderedNumericIndex;
pub use tokenizer::Tokenizer;
pub use unique::UniqueIndex;
pub use unordered::UnorderedIndex;
