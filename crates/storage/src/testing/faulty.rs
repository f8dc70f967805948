//! Fault-injecting store wrapper

use crate::command::{Command, ExecMode, Reply};
use crate::store::Store;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use strata_core::{StoreError, StoreResult};
use tracing::debug;

/// Store wrapper that fails one command on demand
///
/// After `fail_after(n)`, the next `n` commands succeed and the one after
/// fails. In pipeline mode the `n` commands preceding the failure inside
/// the same batch are applied first; in transaction mode nothing in the
/// failing batch is applied. The fault fires once.
pub struct FaultyStore<S> {
    inner: S,
    remaining: Mutex<Option<usize>>,
    injected: AtomicUsize,
}

impl<S: Store> FaultyStore<S> {
    /// Wrap a store with no fault armed
    pub fn new(inner: S) -> Self {
        FaultyStore {
            inner,
            remaining: Mutex::new(None),
            injected: AtomicUsize::new(0),
        }
    }

    /// Let `n` more commands through, then fail the next one
    pub fn fail_after(&self, n: usize) {
        *self.remaining.lock() = Some(n);
    }

    /// Disarm a pending fault
    pub fn heal(&self) {
        *self.remaining.lock() = None;
    }

    /// Number of faults injected so far
    pub fn faults_injected(&self) -> usize {
        self.injected.load(Ordering::Acquire)
    }

    /// The wrapped store
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: Store> Store for FaultyStore<S> {
    fn execute(&self, mut commands: Vec<Command>, mode: ExecMode) -> StoreResult<Vec<Reply>> {
        let fail_at = {
            let mut remaining = self.remaining.lock();
            match *remaining {
                Some(n) if n < commands.len() => {
                    *remaining = None;
                    Some(n)
                }
                Some(n) => {
                    *remaining = Some(n - commands.len());
                    None
                }
                None => None,
            }
        };

        let Some(n) = fail_at else {
            return self.inner.execute(commands, mode);
        };

        self.injected.fetch_add(1, Ordering::AcqRel);
        let failed = commands[n].name();
        debug!(command = failed, position = n, "injecting store failure");
        if mode == ExecMode::Pipeline && n > 0 {
            commands.truncate(n);
            self.inner.execute(commands, mode)?;
        }
        Err(StoreError::Unavailable(format!("injected failure at {}", failed)))
    }
}
