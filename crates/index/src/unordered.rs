//! Hashed equality index
//!
//! Non-unique lookup for short values (emails, names, artist/album pairs).
//! The composite value of the indexed fields is hashed with xxh3 and the
//! hash, truncated to 53 bits so it is exactly representable as an `f64`,
//! becomes the record's score in a sorted set. Records with equal values
//! therefore share a score and are found with an exact-score range scan.
//!
//! Matching is case sensitive. Two distinct values whose truncated hashes
//! collide are indistinguishable: a lookup for either returns both.

use crate::index::{
    composite_from_condition, composite_value, namespace_for, parse_ids, sorted_fields, RecordView,
};
use std::collections::BTreeSet;
use strata_core::{Condition, RecordId, Result};
use strata_storage::{Pipeline, Reply, Store};
use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

/// Largest integer range exactly representable by an `f64` mantissa
const SCORE_MASK: u64 = (1 << 53) - 1;

/// Hashed, non-unique equality index
#[derive(Debug, Clone)]
pub struct UnorderedIndex {
    namespace: String,
    fields: Vec<String>,
    field_set: BTreeSet<String>,
}

impl UnorderedIndex {
    /// Index over `fields` under `prefix`
    pub fn new<S: Into<String>>(prefix: &str, fields: impl IntoIterator<Item = S>) -> Self {
        let fields = sorted_fields(fields);
        UnorderedIndex {
            namespace: namespace_for("k", prefix, &fields),
            field_set: fields.iter().cloned().collect(),
            fields,
        }
    }

    /// Sorted-set key holding `id -> hash`
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Indexed fields, sorted
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Indexed fields as a set
    pub fn field_set(&self) -> &BTreeSet<String> {
        &self.field_set
    }

    /// Score for a composite value
    pub fn score_of(composite: &str) -> f64 {
        (xxh3_64(composite.as_bytes()) & SCORE_MASK) as f64
    }

    /// Queue `ZADD namespace hash id`
    pub fn update(&self, record: RecordView<'_>, pipe: &mut Pipeline) -> Result<()> {
        let Some(value) = composite_value(&self.fields, record.fields) else {
            debug!(index = %self.namespace, id = %record.id, "record lacks indexed fields, skipping");
            return Ok(());
        };
        let score = Self::score_of(&value);
        debug!(index = %self.namespace, id = %record.id, score, "indexing value");
        pipe.zadd(self.namespace.clone(), vec![(record.id.to_string(), score)]);
        Ok(())
    }

    /// Queue `ZREM namespace id`
    pub fn remove(&self, record: RecordView<'_>, pipe: &mut Pipeline) {
        pipe.zrem(self.namespace.clone(), vec![record.id.to_string()]);
    }

    /// Ids whose indexed value hashes to the condition's value
    pub fn find(&self, store: &dyn Store, condition: &Condition) -> Result<Vec<RecordId>> {
        let value = composite_from_condition(&self.fields, condition)?;
        let score = Self::score_of(&value);
        let mut pipe = Pipeline::new();
        pipe.zrange_by_score(self.namespace.clone(), score, score, condition.paging());
        let members = first_members(pipe.execute(store)?)?;
        parse_ids(members)
    }
}

/// Members from the first reply of a batch
pub(crate) fn first_members(replies: Vec<Reply>) -> Result<Vec<String>> {
    match replies.into_iter().next() {
        Some(reply) => Ok(reply.into_members()?),
        None => Ok(Vec::new()),
    }
}
