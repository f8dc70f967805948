//! In-memory record values
//!
//! A [`Record`] is plain data: an optional id plus field values. Persistence
//! goes through [`RecordType`](crate::RecordType), which owns the schema, the
//! key spec and the store handle.

use std::fmt;
use strata_core::{FieldMap, RecordId, Value};

/// One record of some record type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub(crate) id: Option<RecordId>,
    pub(crate) fields: FieldMap,
}

impl Record {
    /// Unsaved record with no fields
    pub fn new() -> Self {
        Self::default()
    }

    /// Unsaved record with the given fields
    pub fn from_fields(fields: FieldMap) -> Self {
        Record { id: None, fields }
    }

    /// Builder-style field setter
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Set a field before the first save
    ///
    /// Changes to a persisted record go through `RecordType::update` so the
    /// store and indexes stay in step.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub(crate) fn loaded(id: RecordId, fields: FieldMap) -> Self {
        Record {
            id: Some(id),
            fields,
        }
    }

    /// Assigned id, once saved
    pub fn id(&self) -> Option<RecordId> {
        self.id
    }

    /// True once the record has an id
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// One field value
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// All field values
    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// Consume into field values
    pub fn into_fields(self) -> FieldMap {
        self.fields
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "#{} {{", id)?,
            None => write!(f, "(unsaved) {{")?,
        }
        for (i, (k, v)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, " {}: {}", k, v)?;
        }
        write!(f, " }}")
    }
}
