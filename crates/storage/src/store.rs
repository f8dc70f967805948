//! Store abstraction and pipelined batches
//!
//! [`Store`] is the narrow contract the indexing core needs from its backing
//! key-value system. Implementations must be safe to call concurrently from
//! many threads and processes; all cross-process coordination relies on the
//! atomic commands (`HSetNx`, `HDelIfEq`, `IncrBy`, `HIncrBy`).
//!
//! Timeouts and retries belong to the implementation, never to callers.

use crate::command::{Command, ExecMode, Reply};
use std::sync::Arc;
use std::time::Duration;
use strata_core::{Paging, StoreError, StoreResult, Value};

/// Backing key-value store
///
/// Thread safety: all methods must be safe to call concurrently
/// (requires Send + Sync).
pub trait Store: Send + Sync {
    /// Execute a batch of commands in one round trip
    ///
    /// Returns one reply per command, in order.
    ///
    /// # Errors
    ///
    /// In `Pipeline` mode the first failing command aborts the batch and
    /// earlier commands remain applied. In `Transaction` mode nothing is
    /// applied if any command fails.
    fn execute(&self, commands: Vec<Command>, mode: ExecMode) -> StoreResult<Vec<Reply>>;

    /// Execute a single command
    fn call(&self, command: Command) -> StoreResult<Reply> {
        let name = command.name();
        self.execute(vec![command], ExecMode::Pipeline)?
            .pop()
            .ok_or_else(|| StoreError::Protocol(format!("no reply for {}", name)))
    }
}

impl<S: Store + ?Sized> Store for Arc<S> {
    fn execute(&self, commands: Vec<Command>, mode: ExecMode) -> StoreResult<Vec<Reply>> {
        (**self).execute(commands, mode)
    }
}

/// Accumulates commands for a single round trip
///
/// # Example
///
/// ```
/// use strata_storage::{InMemoryStore, Pipeline};
///
/// let store = InMemoryStore::new();
/// let mut pipe = Pipeline::new();
/// pipe.hset("user:1", vec![("name".into(), "alice".into())]);
/// pipe.zadd("ids:user", vec![("1".into(), 1.0)]);
/// let replies = pipe.execute(&store).unwrap();
/// assert_eq!(replies.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    commands: Vec<Command>,
    mode: ExecMode,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Plain pipeline, no isolation
    pub fn new() -> Self {
        Self::with_mode(ExecMode::Pipeline)
    }

    /// All-or-nothing batch
    pub fn transaction() -> Self {
        Self::with_mode(ExecMode::Transaction)
    }

    /// Batch with an explicit mode
    pub fn with_mode(mode: ExecMode) -> Self {
        Pipeline {
            commands: Vec::new(),
            mode,
        }
    }

    /// Execution mode of this batch
    pub fn mode(&self) -> ExecMode {
        self.mode
    }

    /// Append a command, returning the index of its reply
    pub fn push(&mut self, command: Command) -> usize {
        self.commands.push(command);
        self.commands.len() - 1
    }

    /// Queued commands
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Number of queued commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Queue `HSET`
    pub fn hset(&mut self, key: impl Into<String>, fields: Vec<(String, Value)>) -> usize {
        self.push(Command::HSet {
            key: key.into(),
            fields,
        })
    }

    /// Queue `HMGET`
    pub fn hmget(&mut self, key: impl Into<String>, fields: Vec<String>) -> usize {
        self.push(Command::HMGet {
            key: key.into(),
            fields,
        })
    }

    /// Queue `HGETALL`
    pub fn hgetall(&mut self, key: impl Into<String>) -> usize {
        self.push(Command::HGetAll { key: key.into() })
    }

    /// Queue `ZADD`
    pub fn zadd(&mut self, key: impl Into<String>, members: Vec<(String, f64)>) -> usize {
        self.push(Command::ZAdd {
            key: key.into(),
            members,
        })
    }

    /// Queue `ZREM`
    pub fn zrem(&mut self, key: impl Into<String>, members: Vec<String>) -> usize {
        self.push(Command::ZRem {
            key: key.into(),
            members,
        })
    }

    /// Queue `ZRANGEBYSCORE`
    pub fn zrange_by_score(
        &mut self,
        key: impl Into<String>,
        min: f64,
        max: f64,
        limit: Option<Paging>,
    ) -> usize {
        self.push(Command::ZRangeByScore {
            key: key.into(),
            min,
            max,
            limit,
        })
    }

    /// Queue `EXPIRE`
    pub fn expire(&mut self, key: impl Into<String>, ttl: Duration) -> usize {
        self.push(Command::Expire {
            key: key.into(),
            ttl,
        })
    }

    /// Send every queued command in one round trip
    ///
    /// An empty pipeline returns immediately without touching the store.
    pub fn execute(self, store: &dyn Store) -> StoreResult<Vec<Reply>> {
        if self.commands.is_empty() {
            return Ok(Vec::new());
        }
        let expected = self.commands.len();
        let replies = store.execute(self.commands, self.mode)?;
        if replies.len() != expected {
            return Err(StoreError::Protocol(format!(
                "sent {} commands, got {} replies",
                expected,
                replies.len()
            )));
        }
        Ok(replies)
    }
}
