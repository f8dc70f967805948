//! Index selection for one record type
//!
//! A [`KeySpec`] is fixed when the record type is defined. Queries are routed
//! to the single index whose query field set equals the condition's field
//! set. Writes are routed to every index reading a changed field; that
//! routing is memoized per distinct set of changed fields.

use crate::index::Index;
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use strata_core::{Condition, Error, Result};
use tracing::{debug, trace};

/// The indexes bound to a record type
#[derive(Debug, Default)]
pub struct KeySpec {
    indexes: Vec<Index>,
    update_cache: DashMap<Vec<String>, Arc<[usize]>>,
}

impl Clone for KeySpec {
    fn clone(&self) -> Self {
        // The cache is a pure function of the indexes; a clone starts cold.
        KeySpec {
            indexes: self.indexes.clone(),
            update_cache: DashMap::new(),
        }
    }
}

impl KeySpec {
    /// Validate and bind `indexes`
    ///
    /// # Errors
    ///
    /// `InvalidKeySpec` if an index has no fields, or two indexes share a
    /// query field set.
    pub fn new(indexes: Vec<Index>) -> Result<Self> {
        let mut seen: Vec<&BTreeSet<String>> = Vec::with_capacity(indexes.len());
        for index in &indexes {
            let fields = index.query_fields();
            if fields.is_empty() || index.source_fields().is_empty() {
                return Err(Error::InvalidKeySpec(format!("{} has no fields", index)));
            }
            if seen.contains(&fields) {
                return Err(Error::InvalidKeySpec(format!(
                    "{} duplicates the query fields {:?} of another index",
                    index, fields
                )));
            }
            seen.push(fields);
        }
        debug!(indexes = indexes.len(), "key spec bound");
        Ok(KeySpec {
            indexes,
            update_cache: DashMap::new(),
        })
    }

    /// Key spec with no indexes
    pub fn empty() -> Self {
        Self::default()
    }

    /// Configured indexes, in definition order
    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    /// Number of configured indexes
    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    /// True if no index is configured
    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// The index whose query fields equal the condition's fields
    ///
    /// # Errors
    ///
    /// `NoMatchingIndex` if no index matches exactly. Partial matches never
    /// fall back to another index.
    pub fn resolve_for_query(&self, condition: &Condition) -> Result<&Index> {
        let wanted: BTreeSet<&str> = condition.field_names().collect();
        self.indexes
            .iter()
            .find(|index| {
                let fields = index.query_fields();
                fields.len() == wanted.len() && fields.iter().all(|f| wanted.contains(f.as_str()))
            })
            .ok_or_else(|| Error::NoMatchingIndex {
                fields: wanted.into_iter().map(String::from).collect(),
            })
    }

    /// Every index that must be refreshed when `changed` fields are written
    ///
    /// Order follows definition order.
    pub fn resolve_for_update<'f>(&self, changed: impl IntoIterator<Item = &'f str>) -> Vec<&Index> {
        let key: Vec<String> = changed
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(String::from)
            .collect();

        let positions = match self.update_cache.get(&key) {
            Some(hit) => {
                trace!(fields = ?key, "update routing cache hit");
                Arc::clone(hit.value())
            }
            None => {
                let computed: Arc<[usize]> = self
                    .indexes
                    .iter()
                    .enumerate()
                    .filter(|(_, index)| index.is_affected_by(key.iter().map(String::as_str)))
                    .map(|(i, _)| i)
                    .collect();
                self.update_cache
                    .entry(key)
                    .or_insert(computed)
                    .value()
                    .clone()
            }
        };
        positions.iter().map(|&i| &self.indexes[i]).collect()
    }

    /// Number of memoized update routings
    pub fn cached_routings(&self) -> usize {
        self.update_cache.len()
    }
}
