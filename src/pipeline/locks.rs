//! Per-key mutual exclusion.
//!
//! A cycle that cannot immediately acquire a key's lock skips the key for
//! this tick instead of queuing, bounding backlog under slow upstreams.
//! Locks are never held across unrelated keys.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

/// Held for the duration of one key's cycle; dropping releases the key.
pub struct KeyGuard {
    _guard: OwnedMutexGuard<()>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Try to acquire the lock for `key` without waiting. `None` means
    /// another cycle holds it and this one should be skipped.
    pub async fn try_acquire(&self, key: &str) -> Option<KeyGuard> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        lock.try_lock_owned()
            .ok()
            .map(|guard| KeyGuard { _guard: guard })
    }
}

impl Default for KeyedLocks {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_acquire_is_skipped() {
        let locks = KeyedLocks::new();
        let guard = locks.try_acquire("EURUSD:5m").await;
        assert!(guard.is_some());
        assert!(locks.try_acquire("EURUSD:5m").await.is_none());

        drop(guard);
        assert!(locks.try_acquire("EURUSD:5m").await.is_some());
    }

    #[tokio::test]
    async fn different_keys_do_not_contend() {
        let locks = KeyedLocks::new();
        let _a = locks.try_acquire("EURUSD:5m").await.unwrap();
        assert!(locks.try_acquire("EURUSD:30m").await.is_some());
        assert!(locks.try_acquire("USDCAD:5m").await.is_some());
    }

    #[tokio::test]
    async fn simultaneous_attempts_let_exactly_one_through() {
        let locks = Arc::new(KeyedLocks::new());
        // Both guards stay alive until the end of the join, so whichever
        // attempt wins blocks the other.
        let (a, b) = tokio::join!(locks.try_acquire("BTC:1m"), locks.try_acquire("BTC:1m"));
        assert_eq!(a.is_some() as u8 + b.is_some() as u8, 1);
    }
}
