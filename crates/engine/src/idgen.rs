//! Record id generation
//!
//! Ids come from an atomic counter in the store, so they are strictly
//! increasing across every process sharing a namespace. Each round trip
//! reserves a batch of ids that is then handed out locally; a process that
//! exits with part of a batch unused leaves a gap. Uniqueness and
//! monotonicity hold, density does not.

use parking_lot::Mutex;
use std::ops::Range;
use std::sync::Arc;
use strata_core::{RecordId, Result, StoreError};
use strata_storage::{Command, Store};
use tracing::debug;

/// Source of fresh record ids
///
/// Thread safety: `next_id` may be called concurrently.
pub trait IdGenerator: Send + Sync {
    /// A never-before-issued id, greater than every id this generator issued
    fn next_id(&self) -> Result<RecordId>;
}

/// Counter-backed generator reserving ids in batches
pub struct IncrementalIdGenerator {
    store: Arc<dyn Store>,
    key: String,
    batch_size: u64,
    reserved: Mutex<Range<u64>>,
}

impl IncrementalIdGenerator {
    /// Generator over the `idgen:{namespace}` counter
    ///
    /// A `batch_size` of 0 is treated as 1.
    pub fn new(store: Arc<dyn Store>, namespace: &str, batch_size: u64) -> Self {
        Self {
            store,
            key: format!("idgen:{}", namespace),
            batch_size: batch_size.max(1),
            reserved: Mutex::new(0..0),
        }
    }

    /// Counter key in the store
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Ids reserved per round trip
    pub fn batch_size(&self) -> u64 {
        self.batch_size
    }

    /// Ids reserved but not yet issued
    pub fn remaining(&self) -> u64 {
        let reserved = self.reserved.lock();
        reserved.end - reserved.start
    }

    fn reserve(&self) -> Result<Range<u64>> {
        let delta = i64::try_from(self.batch_size)
            .map_err(|_| StoreError::InvalidArgument("id batch size overflows".to_string()))?;
        let high = self
            .store
            .call(Command::IncrBy {
                key: self.key.clone(),
                delta,
            })?
            .into_int()?;
        let high = u64::try_from(high).ok().filter(|h| *h >= self.batch_size).ok_or_else(|| {
            StoreError::Protocol(format!("id counter '{}' returned {}", self.key, high))
        })?;
        let batch = (high - self.batch_size + 1)..(high + 1);
        debug!(key = %self.key, first = batch.start, last = high, "reserved id batch");
        Ok(batch)
    }
}

impl IdGenerator for IncrementalIdGenerator {
    fn next_id(&self) -> Result<RecordId> {
        let mut reserved = self.reserved.lock();
        if reserved.is_empty() {
            *reserved = self.reserve()?;
        }
        let id = reserved.start;
        reserved.start += 1;
        Ok(RecordId::new(id))
    }
}

impl std::fmt::Debug for IncrementalIdGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncrementalIdGenerator")
            .field("key", &self.key)
            .field("batch_size", &self.batch_size)
            .field("remaining", &self.remaining())
            .finish()
    }
}
