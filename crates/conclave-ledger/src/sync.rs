//! Per-key mutual exclusion.
//!
//! Operations on the same session or petition must run one at a time, while
//! operations on different keys must not contend. [`KeyedLocks`] keeps one
//! mutex per active key and drops it once nobody holds or waits for it.

use std::collections::HashMap;
use std::hash::Hash as StdHash;
use std::sync::{Arc, Mutex, PoisonError};

/// Table of per-key mutexes.
///
/// # Example
///
/// ```rust
/// use conclave_ledger::KeyedLocks;
///
/// let locks = KeyedLocks::new();
/// let value = locks.with_lock(&"session-1".to_string(), || 42);
/// assert_eq!(value, 42);
/// assert_eq!(locks.active_keys(), 0);
/// ```
#[derive(Debug)]
pub struct KeyedLocks<K> {
    slots: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + StdHash + Clone> KeyedLocks<K> {
    /// Creates an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` while holding the lock for `key`.
    ///
    /// Calls for the same key run one after another; calls for different
    /// keys only touch the table lock briefly.
    pub fn with_lock<R>(&self, key: &K, f: impl FnOnce() -> R) -> R {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(key.clone()).or_default())
        };

        let result = {
            let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };

        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // Table + this clone: nobody else holds or waits on the slot
        if Arc::strong_count(&slot) == 2 {
            slots.remove(key);
        }
        result
    }

    /// Number of keys currently held or awaited.
    pub fn active_keys(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
