//! Blocking per-node write locks.
//!
//! [`LockTable`] grants each node key to at most one transaction at a time.
//! Locks are reentrant for their holder and are only released together,
//! when the holding transaction ends (strict two-phase locking). A waiter
//! blocks on a condition variable until the holder releases or the
//! configured timeout elapses.

use std::collections::HashMap;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::error::StorageError;
use crate::types::NodeKey;

/// Identifies a transaction within one store.
pub type TxnId = u64;

/// Default time a writer waits for a lock before giving up.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub struct LockTable {
    held: Mutex<HashMap<NodeKey, TxnId>>,
    released: Condvar,
    timeout: Duration,
}

impl LockTable {
    pub fn new(timeout: Duration) -> Self {
        LockTable {
            held: Mutex::new(HashMap::new()),
            released: Condvar::new(),
            timeout,
        }
    }

    /// Acquires `key` for `txn`, blocking while another transaction holds it.
    ///
    /// Returns true if the lock was newly granted, false if `txn` already
    /// held it.
    pub fn acquire(&self, txn: TxnId, key: &NodeKey) -> Result<bool, StorageError> {
        let deadline = Instant::now() + self.timeout;
        let mut held = self.held.lock().map_err(|_| StorageError::Poisoned)?;
        loop {
            match held.get(key) {
                None => {
                    held.insert(key.clone(), txn);
                    return Ok(true);
                }
                Some(&owner) if owner == txn => return Ok(false),
                Some(&owner) => {
                    let now = Instant::now();
                    if now >= deadline {
                        tracing::warn!(%key, txn, owner, "lock wait timed out");
                        return Err(StorageError::LockTimeout {
                            key: key.to_string(),
                        });
                    }
                    let (guard, _) = self
                        .released
                        .wait_timeout(held, deadline - now)
                        .map_err(|_| StorageError::Poisoned)?;
                    held = guard;
                }
            }
        }
    }

    /// Releases every key in `keys` held by `txn` and wakes all waiters.
    pub fn release_all(&self, txn: TxnId, keys: &[NodeKey]) {
        if keys.is_empty() {
            return;
        }
        // A poisoned table still has to hand its locks back.
        let mut held = match self.held.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for key in keys {
            if held.get(key) == Some(&txn) {
                held.remove(key);
            }
        }
        drop(held);
        self.released.notify_all();
    }

    /// Returns the transaction currently holding `key`, if any.
    pub fn holder(&self, key: &NodeKey) -> Option<TxnId> {
        self.held.lock().ok().and_then(|held| held.get(key).copied())
    }
}
