//! Ordered numeric index
//!
//! Stores `id -> value` for a single numeric field in a sorted set. Serves
//! exact lookups and inclusive ranges, ascending by value, with paging.
//! This is the index behind "top N by score" and "between A and B" queries.

use crate::index::{namespace_for, parse_ids, RecordView};
use crate::unordered::first_members;
use std::collections::BTreeSet;
use strata_core::{Condition, Error, Predicate, RecordId, Result};
use strata_storage::{Pipeline, Store};
use tracing::debug;

/// Score-ordered index over one numeric field
#[derive(Debug, Clone)]
pub struct OrderedNumericIndex {
    namespace: String,
    field: String,
    field_set: BTreeSet<String>,
}

impl OrderedNumericIndex {
    /// Index over `field` under `prefix`
    pub fn new(prefix: &str, field: &str) -> Self {
        let field = field.to_string();
        OrderedNumericIndex {
            namespace: namespace_for("ok", prefix, std::slice::from_ref(&field)),
            field_set: BTreeSet::from([field.clone()]),
            field,
        }
    }

    /// Sorted-set key holding `id -> value`
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Indexed field
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Indexed field as a set
    pub fn field_set(&self) -> &BTreeSet<String> {
        &self.field_set
    }

    /// Queue `ZADD namespace value id`
    ///
    /// # Errors
    ///
    /// `InvalidValue` if the field is present but not numeric.
    pub fn update(&self, record: RecordView<'_>, pipe: &mut Pipeline) -> Result<()> {
        let Some(value) = record.fields.get(&self.field) else {
            debug!(index = %self.namespace, id = %record.id, "record lacks indexed field, skipping");
            return Ok(());
        };
        let score = value
            .as_f64()
            .filter(|s| !s.is_nan())
            .ok_or_else(|| Error::InvalidValue {
                field: self.field.clone(),
                reason: format!("'{}' is not numeric", value),
            })?;
        pipe.zadd(self.namespace.clone(), vec![(record.id.to_string(), score)]);
        Ok(())
    }

    /// Queue `ZREM namespace id`
    pub fn remove(&self, record: RecordView<'_>, pipe: &mut Pipeline) {
        pipe.zrem(self.namespace.clone(), vec![record.id.to_string()]);
    }

    /// Inclusive `[min, max]` bounds requested by a condition
    pub fn bounds(&self, condition: &Condition) -> Result<(f64, f64)> {
        let predicate = condition.values_for(std::slice::from_ref(&self.field))?[0];
        match predicate {
            Predicate::Is(v) => {
                let x = v.as_f64().ok_or_else(|| {
                    Error::Query(format!("'{}' is not numeric for field '{}'", v, self.field))
                })?;
                Ok((x, x))
            }
            Predicate::Between { min, max } => {
                if min.is_nan() || max.is_nan() {
                    return Err(Error::Query(format!(
                        "NaN range bound for field '{}'",
                        self.field
                    )));
                }
                Ok((*min, *max))
            }
        }
    }

    /// Ids whose value lies within the condition's bounds, ascending by value
    pub fn find(&self, store: &dyn Store, condition: &Condition) -> Result<Vec<RecordId>> {
        let (min, max) = self.bounds(condition)?;
        let mut pipe = Pipeline::new();
        pipe.zrange_by_score(self.namespace.clone(), min, max, condition.paging());
        parse_ids(first_members(pipe.execute(store)?)?)
    }
}
