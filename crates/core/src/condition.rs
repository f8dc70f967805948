//! Query descriptors
//!
//! A [`Condition`] maps field names to a requested [`Predicate`] (an exact
//! value or a numeric range) and optionally carries [`Paging`].
//!
//! Conditions are not validated when built. A missing field or a predicate
//! the target index cannot serve surfaces as [`Error::Query`] when an index
//! consumes the condition.

use crate::error::{Error, Result};
use crate::types::FieldMap;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Constraint on a single field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// Field equals the value
    Is(Value),
    /// Field is numerically within `[min, max]`, both ends inclusive
    Between {
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },
}

impl Predicate {
    /// The exact value, or `Error::Query` for a range
    pub fn exact(&self, field: &str) -> Result<&Value> {
        match self {
            Predicate::Is(v) => Ok(v),
            Predicate::Between { .. } => Err(Error::Query(format!(
                "range predicate on '{}' is not supported by this index",
                field
            ))),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Is(v) => write!(f, "== {}", v),
            Predicate::Between { min, max } => write!(f, "in [{}, {}]", min, max),
        }
    }
}

/// Window into an ordered result: skip `offset`, return at most `count`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    /// Number of leading results to skip
    pub offset: usize,
    /// Maximum number of results to return
    pub count: usize,
}

/// Query descriptor: field constraints plus optional paging
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    predicates: BTreeMap<String, Predicate>,
    paging: Option<Paging>,
}

impl Condition {
    /// Empty condition
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact-match condition for every field in the map
    pub fn from_fields(fields: FieldMap) -> Self {
        Condition {
            predicates: fields
                .into_iter()
                .map(|(k, v)| (k, Predicate::Is(v)))
                .collect(),
            paging: None,
        }
    }

    /// Require `field == value`
    pub fn is(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicates
            .insert(field.into(), Predicate::Is(value.into()));
        self
    }

    /// Require `min <= field <= max`
    pub fn between(mut self, field: impl Into<String>, min: f64, max: f64) -> Self {
        self.predicates
            .insert(field.into(), Predicate::Between { min, max });
        self
    }

    /// Return at most `count` results starting at `offset`
    pub fn with_paging(mut self, offset: usize, count: usize) -> Self {
        self.paging = Some(Paging { offset, count });
        self
    }

    /// Paging window, if any
    pub fn paging(&self) -> Option<Paging> {
        self.paging
    }

    /// Field names constrained by this condition, in sorted order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.predicates.keys().map(String::as_str)
    }

    /// Predicate for one field
    pub fn predicate(&self, field: &str) -> Option<&Predicate> {
        self.predicates.get(field)
    }

    /// Predicates for the given fields, in the given order
    ///
    /// # Errors
    ///
    /// `Error::Query` if any requested field is not constrained.
    pub fn values_for<S: AsRef<str>>(&self, fields: &[S]) -> Result<Vec<&Predicate>> {
        fields
            .iter()
            .map(|f| {
                let f = f.as_ref();
                self.predicates
                    .get(f)
                    .ok_or_else(|| Error::Query(format!("condition has no value for field '{}'", f)))
            })
            .collect()
    }

    /// True if no field is constrained
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Condition(")?;
        for (i, (field, pred)) in self.predicates.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", field, pred)?;
        }
        if let Some(p) = self.paging {
            write!(f, "; offset {}, count {}", p.offset, p.count)?;
        }
        f.write_str(")")
    }
}
