//! Index abstraction
//!
//! [`Index`] is a closed set of index variants sharing one capability set:
//!
//! - `update`: queue (or, for unique claims, perform) the writes that index
//!   one record
//! - `update_many`: index several records in one round trip
//! - `find`: resolve a [`Condition`] to matching record ids
//! - `remove`: queue the writes that drop one record from the index
//!
//! Each variant owns a namespace derived from its prefix and sorted field
//! names, so constructing the same index twice addresses the same store keys.
//!
//! # Missing fields
//!
//! A record lacking any field an index reads is not indexed by it. This lets
//! partially populated records be saved; they are simply invisible to that
//! index until the field is set.

use crate::fulltext::FullTextIndex;
use crate::ordered::OrderedNumericIndex;
use crate::unique::UniqueIndex;
use crate::unordered::UnorderedIndex;
use std::collections::BTreeSet;
use strata_core::{Condition, Error, FieldMap, RecordId, Result, StoreError};
use strata_storage::{Pipeline, Store};

/// Separator between field values in composite index values
///
/// Colons and backslashes inside a value are escaped before joining, so
/// distinct value tuples never produce the same composite.
pub const VALUE_SEPARATOR: &str = "::";

/// One record as seen by an index update
#[derive(Debug, Clone, Copy)]
pub struct RecordView<'a> {
    /// Record identity
    pub id: RecordId,
    /// Current field values (at least the fields the index reads)
    pub fields: &'a FieldMap,
    /// Previously indexed values, when known, for stale-entry cleanup
    pub previous: Option<&'a FieldMap>,
}

impl<'a> RecordView<'a> {
    /// View with no knowledge of previous values
    pub fn new(id: RecordId, fields: &'a FieldMap) -> Self {
        RecordView {
            id,
            fields,
            previous: None,
        }
    }

    /// Attach previously indexed values
    pub fn with_previous(mut self, previous: &'a FieldMap) -> Self {
        self.previous = Some(previous);
        self
    }
}

/// Kind of an index, for logs and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// Hashed equality index
    Unordered,
    /// Single numeric field, range capable
    OrderedNumeric,
    /// Value to single owner
    Unique,
    /// Weighted token index
    FullText,
}

/// A secondary index over one record type
#[derive(Debug, Clone)]
pub enum Index {
    /// Hashed equality lookup over one or more fields
    Unordered(UnorderedIndex),
    /// Score-ordered lookup over one numeric field
    OrderedNumeric(OrderedNumericIndex),
    /// Uniqueness-enforcing lookup over one or more fields
    Unique(UniqueIndex),
    /// Token lookup over weighted text fields
    FullText(FullTextIndex),
}

impl Index {
    /// Hashed equality index over `fields`
    pub fn unordered<S: Into<String>>(prefix: &str, fields: impl IntoIterator<Item = S>) -> Self {
        Index::Unordered(UnorderedIndex::new(prefix, fields))
    }

    /// Ordered index over one numeric field
    pub fn ordered_numeric(prefix: &str, field: &str) -> Self {
        Index::OrderedNumeric(OrderedNumericIndex::new(prefix, field))
    }

    /// Unique index over `fields`
    pub fn unique<S: Into<String>>(prefix: &str, fields: impl IntoIterator<Item = S>) -> Self {
        Index::Unique(UniqueIndex::new(prefix, fields))
    }

    /// Kind of this index
    pub fn kind(&self) -> IndexKind {
        match self {
            Index::Unordered(_) => IndexKind::Unordered,
            Index::OrderedNumeric(_) => IndexKind::OrderedNumeric,
            Index::Unique(_) => IndexKind::Unique,
            Index::FullText(_) => IndexKind::FullText,
        }
    }

    /// Store namespace owned by this index
    pub fn namespace(&self) -> &str {
        match self {
            Index::Unordered(i) => i.namespace(),
            Index::OrderedNumeric(i) => i.namespace(),
            Index::Unique(i) => i.namespace(),
            Index::FullText(i) => i.namespace(),
        }
    }

    /// Field names a condition must name, exactly, to select this index
    pub fn query_fields(&self) -> &BTreeSet<String> {
        match self {
            Index::Unordered(i) => i.field_set(),
            Index::OrderedNumeric(i) => i.field_set(),
            Index::Unique(i) => i.field_set(),
            Index::FullText(i) => i.field_set(),
        }
    }

    /// Record fields this index reads when updating
    pub fn source_fields(&self) -> Vec<&str> {
        match self {
            Index::Unordered(i) => i.fields().iter().map(String::as_str).collect(),
            Index::OrderedNumeric(i) => vec![i.field()],
            Index::Unique(i) => i.fields().iter().map(String::as_str).collect(),
            Index::FullText(i) => i.source_fields().collect(),
        }
    }

    /// True if changing any of `fields` requires refreshing this index
    pub fn is_affected_by<'f>(&self, fields: impl IntoIterator<Item = &'f str>) -> bool {
        let sources = self.source_fields();
        let query = self.query_fields();
        fields
            .into_iter()
            .any(|f| sources.contains(&f) || query.contains(f))
    }

    /// Index one record
    ///
    /// Ordinary writes are queued on `pipe`. Unique claims are made against
    /// `store` immediately, because their outcome decides whether the rest
    /// of the batch may proceed.
    ///
    /// # Errors
    ///
    /// `DuplicateKey` for a unique collision, `InvalidValue` for values the
    /// index cannot score, `StoreUnavailable` for store failures.
    pub fn update(&self, store: &dyn Store, record: RecordView<'_>, pipe: &mut Pipeline) -> Result<()> {
        match self {
            Index::Unordered(i) => i.update(record, pipe),
            Index::OrderedNumeric(i) => i.update(record, pipe),
            Index::Unique(i) => i.update(store, record, pipe),
            Index::FullText(i) => i.update(record, pipe),
        }
    }

    /// Index several records in one round trip
    pub fn update_many(&self, store: &dyn Store, records: &[RecordView<'_>]) -> Result<()> {
        let mut pipe = Pipeline::new();
        for record in records {
            self.update(store, *record, &mut pipe)?;
        }
        pipe.execute(store)?;
        Ok(())
    }

    /// Queue removal of one record
    pub fn remove(&self, record: RecordView<'_>, pipe: &mut Pipeline) {
        match self {
            Index::Unordered(i) => i.remove(record, pipe),
            Index::OrderedNumeric(i) => i.remove(record, pipe),
            Index::Unique(i) => i.remove(record, pipe),
            Index::FullText(i) => i.remove(record, pipe),
        }
    }

    /// Queue release of unique claims made for a write that failed
    ///
    /// No-op for every kind but [`IndexKind::Unique`].
    pub fn release_unsaved(&self, record: RecordView<'_>, pipe: &mut Pipeline) {
        if let Index::Unique(i) = self {
            i.release_unsaved(record, pipe);
        }
    }

    /// Resolve a condition to matching record ids
    ///
    /// # Errors
    ///
    /// `Query` if the condition lacks a field or uses a predicate this index
    /// cannot serve.
    pub fn find(&self, store: &dyn Store, condition: &Condition) -> Result<Vec<RecordId>> {
        match self {
            Index::Unordered(i) => i.find(store, condition),
            Index::OrderedNumeric(i) => i.find(store, condition),
            Index::Unique(i) => i.find(store, condition),
            Index::FullText(i) => i.find(store, condition),
        }
    }
}

impl From<FullTextIndex> for Index {
    fn from(index: FullTextIndex) -> Self {
        Index::FullText(index)
    }
}

impl std::fmt::Display for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}({})", self.kind(), self.namespace())
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Sorted, deduplicated field names
pub(crate) fn sorted_fields<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Vec<String> {
    let set: BTreeSet<String> = fields.into_iter().map(Into::into).collect();
    set.into_iter().collect()
}

/// `"{tag}:{prefix}:{f1,f2,...}"`
pub(crate) fn namespace_for(tag: &str, prefix: &str, fields: &[String]) -> String {
    format!("{}:{}:{}", tag, prefix, fields.join(","))
}

/// Composite value of `fields` in a record, or `None` if any is missing
pub(crate) fn composite_value(fields: &[String], values: &FieldMap) -> Option<String> {
    let parts: Option<Vec<String>> = fields
        .iter()
        .map(|f| values.get(f).map(|v| escape_part(&v.to_string())))
        .collect();
    parts.map(|p| p.join(VALUE_SEPARATOR))
}

/// Composite value requested by an exact-match condition
pub(crate) fn composite_from_condition(fields: &[String], condition: &Condition) -> Result<String> {
    let predicates = condition.values_for(fields)?;
    let parts = fields
        .iter()
        .zip(predicates)
        .map(|(f, p)| p.exact(f).map(|v| escape_part(&v.to_string())))
        .collect::<Result<Vec<_>>>()?;
    Ok(parts.join(VALUE_SEPARATOR))
}

fn escape_part(part: &str) -> String {
    if !part.contains([':', '\\']) {
        return part.to_string();
    }
    let mut escaped = String::with_capacity(part.len() + 2);
    for c in part.chars() {
        if c == ':' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Parse sorted-set members back into record ids
pub(crate) fn parse_ids(members: Vec<String>) -> Result<Vec<RecordId>> {
    members
        .into_iter()
        .map(|m| {
            m.parse::<RecordId>().map_err(|_| {
                Error::from(StoreError::Protocol(format!(
                    "index member '{}' is not a record id",
                    m
                )))
            })
        })
        .collect()
}
