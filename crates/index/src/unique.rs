//! Unique index
//!
//! Maps the composite value of the indexed fields to exactly one owning
//! record id, stored as a field of one hash. Claims use the store's atomic
//! set-if-absent followed by a read-back of the owner in the same round trip:
//!
//! 1. `HSETNX namespace value id`
//! 2. `HGET namespace value`
//!
//! If the set did not happen and the owner is this record, the claim is an
//! idempotent re-save. Any other owner is a `DuplicateKey` error. The index
//! adds no locking of its own; correctness rests on `HSETNX` being atomic.
//!
//! Releases go through `HDELIFEQ`, so a record never drops a claim that has
//! since passed to another record.

use crate::index::{composite_from_condition, composite_value, namespace_for, sorted_fields, RecordView};
use std::collections::BTreeSet;
use strata_core::{Condition, Error, RecordId, Result, StoreError, Value};
use strata_storage::{Command, Pipeline, Store};
use tracing::{debug, warn};

/// Value-to-owner index enforcing uniqueness
#[derive(Debug, Clone)]
pub struct UniqueIndex {
    namespace: String,
    fields: Vec<String>,
    field_set: BTreeSet<String>,
}

impl UniqueIndex {
    /// Index over `fields` under `prefix`
    pub fn new<S: Into<String>>(prefix: &str, fields: impl IntoIterator<Item = S>) -> Self {
        let fields = sorted_fields(fields);
        UniqueIndex {
            namespace: namespace_for("uk", prefix, &fields),
            field_set: fields.iter().cloned().collect(),
            fields,
        }
    }

    /// Hash key holding `value -> id`
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

    fn owner_value(id: RecordId) -> Value {
        Value::String(id.to_string())
    }

    /// Claim the record's value, then queue release of its previous value
    ///
    /// The claim is executed immediately against `store`; only the release
    /// of a changed previous value is queued on `pipe`.
    ///
    /// # Errors
    ///
    /// `DuplicateKey` if another record owns the value.
    pub fn update(&self, store: &dyn Store, record: RecordView<'_>, pipe: &mut Pipeline) -> Result<()> {
        let Some(value) = composite_value(&self.fields, record.fields) else {
            debug!(index = %self.namespace, id = %record.id, "record lacks indexed fields, skipping");
            return Ok(());
        };
        self.claim(store, record.id, &value)?;

        let previous = record
            .previous
            .and_then(|prev| composite_value(&self.fields, prev));
        if let Some(old) = previous.filter(|old| *old != value) {
            debug!(index = %self.namespace, id = %record.id, old = %old, "releasing previous unique value");
            self.queue_release(record.id, old, pipe);
        }
        Ok(())
    }

    fn claim(&self, store: &dyn Store, id: RecordId, value: &str) -> Result<()> {
        let mut pipe = Pipeline::new();
        pipe.push(Command::HSetNx {
            key: self.namespace.clone(),
            field: value.to_string(),
            value: Self::owner_value(id),
        });
        pipe.push(Command::HGet {
            key: self.namespace.clone(),
            field: value.to_string(),
        });
        let mut replies = pipe.execute(store)?.into_iter();
        let set = next_reply(&mut replies)?.into_bool()?;
        let owner = next_reply(&mut replies)?.into_value()?;

        if set {
            debug!(index = %self.namespace, id = %id, value, "unique value claimed");
            return Ok(());
        }

        let owner = owner.map(|o| o.to_string()).unwrap_or_default();
        debug!(index = %self.namespace, id = %id, owner = %owner, "possible unique collision, checking owner");
        if owner == id.to_string() {
            debug!(index = %self.namespace, id = %id, "unique value already owned by this record");
            Ok(())
        } else {
            warn!(index = %self.namespace, id = %id, owner = %owner, value, "unique key collision");
            Err(Error::DuplicateKey {
                index: self.namespace.clone(),
                value: value.to_string(),
                owner,
            })
        }
    }

    fn queue_release(&self, id: RecordId, value: String, pipe: &mut Pipeline) {
        pipe.push(Command::HDelIfEq {
            key: self.namespace.clone(),
            field: value,
            expected: Self::owner_value(id),
        });
    }

    /// Queue release of the record's claim, if it still owns it
    pub fn remove(&self, record: RecordView<'_>, pipe: &mut Pipeline) {
        if let Some(value) = composite_value(&self.fields, record.fields) {
            self.queue_release(record.id, value, pipe);
        }
    }

    /// Queue release of a claim made by [`update`](Self::update) whose write
    /// never landed
    ///
    /// Only a value that differs from the previously stored one is released;
    /// the stored value stays claimed.
    pub fn release_unsaved(&self, record: RecordView<'_>, pipe: &mut Pipeline) {
        let Some(value) = composite_value(&self.fields, record.fields) else {
            return;
        };
        let previous = record
            .previous
            .and_then(|prev| composite_value(&self.fields, prev));
        if previous.as_deref() != Some(value.as_str()) {
            debug!(index = %self.namespace, id = %record.id, value = %value, "releasing unsaved unique claim");
            self.queue_release(record.id, value, pipe);
        }
    }

    /// The owner of the condition's value, if any
    pub fn find(&self, store: &dyn Store, condition: &Condition) -> Result<Vec<RecordId>> {
        let value = composite_from_condition(&self.fields, condition)?;
        let owner = store
            .call(Command::HGet {
                key: self.namespace.clone(),
                field: value,
            })?
            .into_value()?;
        match owner {
            None => Ok(Vec::new()),
            Some(v) => {
                let raw = v.to_string();
                let id = raw.parse::<RecordId>().map_err(|_| {
                    StoreError::Protocol(format!("unique owner '{}' is not a record id", raw))
                })?;
                Ok(vec![id])
            }
        }
    }
}

fn next_reply(
    replies: &mut impl Iterator<Item = strata_storage::Reply>,
) -> Result<strata_storage::Reply> {
    replies
        .next()
        .ok_or_else(|| StoreError::Protocol("missing reply in unique claim".to_string()).into())
}
