//! In-memory store
//!
//! `InMemoryStore` implements the full [`Store`] contract inside the process:
//! hashes, sorted sets, counters, expiry, pipelines and transactions. It is
//! the store used by embedded deployments and by every test in the
//! workspace.
//!
//! # Design
//!
//! - One `parking_lot::Mutex` over an `FxHashMap<String, Slot>`; a batch holds
//!   the lock for its whole duration, so every batch is isolated from others
//! - Expired keys are evicted lazily when a command touches them
//! - Transactions record the prior state of each key on first write and
//!   restore it if a later command fails

use crate::command::{Command, ExecMode, Reply};
use crate::sorted_set::SortedSet;
use crate::store::Store;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use strata_core::{FieldMap, Paging, StoreError, StoreResult, Value};
use tracing::debug;

/// Structure held under a key
#[derive(Debug, Clone)]
enum Entry {
    Hash(FieldMap),
    Sorted(SortedSet),
    Counter(i64),
}

impl Entry {
    fn kind(&self) -> &'static str {
        match self {
            Entry::Hash(_) => "hash",
            Entry::Sorted(_) => "sorted set",
            Entry::Counter(_) => "counter",
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    entry: Entry,
    expires_at: Option<Instant>,
}

impl Slot {
    fn new(entry: Entry) -> Self {
        Slot {
            entry,
            expires_at: None,
        }
    }
}

type Keyspace = FxHashMap<String, Slot>;

/// Prior state of keys written during a transaction
#[derive(Default)]
struct UndoLog {
    saved: Vec<(String, Option<Slot>)>,
}

/// Mutable view over the keyspace for one batch
struct Batch<'a> {
    data: &'a mut Keyspace,
    undo: Option<UndoLog>,
    now: Instant,
}

impl<'a> Batch<'a> {
    fn evict_if_expired(&mut self, key: &str) {
        let expired = self
            .data
            .get(key)
            .and_then(|s| s.expires_at)
            .map_or(false, |t| t <= self.now);
        if expired {
            self.touch(key);
            self.data.remove(key);
        }
    }

    /// Record the prior state of `key` before its first write in a transaction
    fn touch(&mut self, key: &str) {
        if let Some(undo) = self.undo.as_mut() {
            if !undo.saved.iter().any(|(k, _)| k == key) {
                undo.saved.push((key.to_string(), self.data.get(key).cloned()));
            }
        }
    }

    fn rollback(&mut self) {
        if let Some(undo) = self.undo.take() {
            for (key, prior) in undo.saved.into_iter().rev() {
                match prior {
                    Some(slot) => {
                        self.data.insert(key, slot);
                    }
                    None => {
                        self.data.remove(&key);
                    }
                }
            }
        }
    }

    fn read_hash(&mut self, key: &str) -> StoreResult<Option<&FieldMap>> {
        self.evict_if_expired(key);
        match self.data.get(key) {
            None => Ok(None),
            Some(Slot {
                entry: Entry::Hash(h),
                ..
            }) => Ok(Some(h)),
            Some(_) => Err(wrong_type(key, "hash")),
        }
    }

    fn read_sorted(&mut self, key: &str) -> StoreResult<Option<&SortedSet>> {
        self.evict_if_expired(key);
        match self.data.get(key) {
            None => Ok(None),
            Some(Slot {
                entry: Entry::Sorted(z),
                ..
            }) => Ok(Some(z)),
            Some(_) => Err(wrong_type(key, "sorted set")),
        }
    }

    /// Hash under `key`, created if absent
    fn write_hash(&mut self, key: &str) -> StoreResult<&mut FieldMap> {
        self.evict_if_expired(key);
        if let Some(slot) = self.data.get(key) {
            if !matches!(slot.entry, Entry::Hash(_)) {
                return Err(wrong_type(key, "hash"));
            }
        }
        self.touch(key);
        let slot = self
            .data
            .entry(key.to_string())
            .or_insert_with(|| Slot::new(Entry::Hash(FieldMap::new())));
        match &mut slot.entry {
            Entry::Hash(h) => Ok(h),
            other => Err(wrong_type(key, other.kind())),
        }
    }

    /// Sorted set under `key`, created if absent
    fn write_sorted(&mut self, key: &str) -> StoreResult<&mut SortedSet> {
        self.evict_if_expired(key);
        if let Some(slot) = self.data.get(key) {
            if !matches!(slot.entry, Entry::Sorted(_)) {
                return Err(wrong_type(key, "sorted set"));
            }
        }
        self.touch(key);
        let slot = self
            .data
            .entry(key.to_string())
            .or_insert_with(|| Slot::new(Entry::Sorted(SortedSet::new())));
        match &mut slot.entry {
            Entry::Sorted(z) => Ok(z),
            other => Err(wrong_type(key, other.kind())),
        }
    }

    /// Drop a key whose structure became empty, matching store semantics
    fn drop_if_empty(&mut self, key: &str) {
        let empty = match self.data.get(key).map(|s| &s.entry) {
            Some(Entry::Hash(h)) => h.is_empty(),
            Some(Entry::Sorted(z)) => z.is_empty(),
            _ => false,
        };
        if empty {
            self.data.remove(key);
        }
    }

    fn apply(&mut self, command: Command) -> StoreResult<Reply> {
        match command {
            Command::HSet { key, fields } => {
                let hash = self.write_hash(&key)?;
                let mut added = 0;
                for (field, value) in fields {
                    if hash.insert(field, value).is_none() {
                        added += 1;
                    }
                }
                self.drop_if_empty(&key);
                Ok(Reply::Int(added))
            }
            Command::HGet { key, field } => {
                let value = self.read_hash(&key)?.and_then(|h| h.get(&field).cloned());
                Ok(Reply::Value(value))
            }
            Command::HMGet { key, fields } => {
                let hash = self.read_hash(&key)?;
                let values = fields
                    .iter()
                    .map(|f| hash.and_then(|h| h.get(f).cloned()))
                    .collect();
                Ok(Reply::Values(values))
            }
            Command::HGetAll { key } => {
                let hash = self.read_hash(&key)?.cloned().unwrap_or_default();
                Ok(Reply::Hash(hash))
            }
            Command::HSetNx { key, field, value } => {
                if self
                    .read_hash(&key)?
                    .map_or(false, |h| h.contains_key(&field))
                {
                    return Ok(Reply::Bool(false));
                }
                self.write_hash(&key)?.insert(field, value);
                Ok(Reply::Bool(true))
            }
            Command::HDel { key, fields } => {
                if self.read_hash(&key)?.is_none() {
                    return Ok(Reply::Int(0));
                }
                let hash = self.write_hash(&key)?;
                let removed = fields.iter().filter(|f| hash.remove(*f).is_some()).count();
                self.drop_if_empty(&key);
                Ok(Reply::Int(removed as i64))
            }
            Command::HDelIfEq {
                key,
                field,
                expected,
            } => {
                let matches = self
                    .read_hash(&key)?
                    .and_then(|h| h.get(&field))
                    .map_or(false, |v| *v == expected);
                if !matches {
                    return Ok(Reply::Bool(false));
                }
                self.write_hash(&key)?.remove(&field);
                self.drop_if_empty(&key);
                Ok(Reply::Bool(true))
            }
            Command::HIncrBy { key, field, delta } => {
                let current = match self.read_hash(&key)?.and_then(|h| h.get(&field)) {
                    None => 0,
                    Some(Value::Int(i)) => *i,
                    Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| {
                        StoreError::InvalidArgument(format!(
                            "hash field '{}' of '{}' is not an integer",
                            field, key
                        ))
                    })?,
                    Some(other) => {
                        return Err(StoreError::InvalidArgument(format!(
                            "hash field '{}' of '{}' holds {}, not an integer",
                            field,
                            key,
                            other.type_name()
                        )))
                    }
                };
                let next = current.checked_add(delta).ok_or_else(|| {
                    StoreError::InvalidArgument("increment would overflow".to_string())
                })?;
                self.write_hash(&key)?.insert(field, Value::Int(next));
                Ok(Reply::Int(next))
            }
            Command::IncrBy { key, delta } => {
                self.evict_if_expired(&key);
                let current = match self.data.get(&key).map(|s| &s.entry) {
                    None => 0,
                    Some(Entry::Counter(c)) => *c,
                    Some(_) => return Err(wrong_type(&key, "counter")),
                };
                let next = current.checked_add(delta).ok_or_else(|| {
                    StoreError::InvalidArgument("increment would overflow".to_string())
                })?;
                self.touch(&key);
                let expires_at = self.data.get(&key).and_then(|s| s.expires_at);
                self.data.insert(
                    key,
                    Slot {
                        entry: Entry::Counter(next),
                        expires_at,
                    },
                );
                Ok(Reply::Int(next))
            }
            Command::ZAdd { key, members } => {
                if members.iter().any(|(_, s)| s.is_nan()) {
                    return Err(StoreError::InvalidArgument("score is NaN".to_string()));
                }
                let set = self.write_sorted(&key)?;
                let added = members
                    .into_iter()
                    .map(|(m, s)| set.insert(m, s))
                    .filter(|new| *new)
                    .count();
                self.drop_if_empty(&key);
                Ok(Reply::Int(added as i64))
            }
            Command::ZRem { key, members } => {
                if self.read_sorted(&key)?.is_none() {
                    return Ok(Reply::Int(0));
                }
                let set = self.write_sorted(&key)?;
                let removed = members.iter().filter(|m| set.remove(m)).count();
                self.drop_if_empty(&key);
                Ok(Reply::Int(removed as i64))
            }
            Command::ZRangeByScore {
                key,
                min,
                max,
                limit,
            } => {
                let members = match self.read_sorted(&key)? {
                    None => Vec::new(),
                    Some(set) => window(set.range_by_score(min, max), limit),
                };
                Ok(Reply::Members(members))
            }
            Command::ZRange {
                key,
                limit,
                reverse,
            } => {
                let members = match self.read_sorted(&key)? {
                    None => Vec::new(),
                    Some(set) if reverse => window(set.iter().rev().map(|(m, _)| m), limit),
                    Some(set) => window(set.iter().map(|(m, _)| m), limit),
                };
                Ok(Reply::Members(members))
            }
            Command::ZInterStore { dest, keys } => {
                let mut result: Option<SortedSet> = None;
                for key in &keys {
                    let set = match self.read_sorted(key)? {
                        Some(set) => set,
                        None => {
                            result = Some(SortedSet::new());
                            break;
                        }
                    };
                    result = Some(match result {
                        None => set.clone(),
                        Some(acc) => {
                            let mut next = SortedSet::new();
                            for (member, score) in acc.iter() {
                                if let Some(other) = set.score(member) {
                                    next.insert(member.to_string(), score + other);
                                }
                            }
                            next
                        }
                    });
                }
                let result = result.unwrap_or_default();
                let size = result.len() as i64;
                self.touch(&dest);
                if result.is_empty() {
                    self.data.remove(&dest);
                } else {
                    self.data.insert(dest, Slot::new(Entry::Sorted(result)));
                }
                Ok(Reply::Int(size))
            }
            Command::Expire { key, ttl } => {
                self.evict_if_expired(&key);
                if !self.data.contains_key(&key) {
                    return Ok(Reply::Bool(false));
                }
                self.touch(&key);
                let deadline = self.now + ttl;
                if let Some(slot) = self.data.get_mut(&key) {
                    slot.expires_at = Some(deadline);
                }
                Ok(Reply::Bool(true))
            }
            Command::Del { keys } => {
                let mut removed = 0;
                for key in keys {
                    self.evict_if_expired(&key);
                    if self.data.contains_key(&key) {
                        self.touch(&key);
                        self.data.remove(&key);
                        removed += 1;
                    }
                }
                Ok(Reply::Int(removed))
            }
        }
    }
}

fn wrong_type(key: &str, expected: &'static str) -> StoreError {
    StoreError::WrongType {
        key: key.to_string(),
        expected,
    }
}

fn window<'s>(members: impl Iterator<Item = &'s str>, limit: Option<Paging>) -> Vec<String> {
    match limit {
        None => members.map(String::from).collect(),
        Some(p) => members
            .skip(p.offset)
            .take(p.count)
            .map(String::from)
            .collect(),
    }
}

/// Process-local implementation of the store contract
pub struct InMemoryStore {
    data: Mutex<Keyspace>,
    batches: AtomicU64,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        InMemoryStore {
            data: Mutex::new(FxHashMap::default()),
            batches: AtomicU64::new(0),
        }
    }

    /// Number of round trips served so far
    pub fn batches_executed(&self) -> u64 {
        self.batches.load(Ordering::Acquire)
    }

    /// True if `key` currently holds a live value
    pub fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.data
            .lock()
            .get(key)
            .map_or(false, |s| s.expires_at.map_or(true, |t| t > now))
    }

    /// Number of live keys
    pub fn key_count(&self) -> usize {
        let now = Instant::now();
        self.data
            .lock()
            .values()
            .filter(|s| s.expires_at.map_or(true, |t| t > now))
            .count()
    }

    /// Remove every key
    pub fn flush(&self) {
        self.data.lock().clear();
    }
}

impl Store for InMemoryStore {
    fn execute(&self, commands: Vec<Command>, mode: ExecMode) -> StoreResult<Vec<Reply>> {
        self.batches.fetch_add(1, Ordering::AcqRel);
        let mut data = self.data.lock();
        let mut batch = Batch {
            data: &mut *data,
            undo: match mode {
                ExecMode::Transaction => Some(UndoLog::default()),
                ExecMode::Pipeline => None,
            },
            now: Instant::now(),
        };

        let mut replies = Vec::with_capacity(commands.len());
        for command in commands {
            let name = command.name();
            match batch.apply(command) {
                Ok(reply) => replies.push(reply),
                Err(e) => {
                    debug!(command = name, error = %e, ?mode, "store batch aborted");
                    batch.rollback();
                    return Err(e);
                }
            }
        }
        Ok(replies)
    }
}
