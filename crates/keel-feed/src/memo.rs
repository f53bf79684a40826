//! Per-feed in-memory memoization with single-flight semantics.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

/// A keyed memo cache scoped to one feed instance.
///
/// The first caller for a key runs the lookup; concurrent callers for the
/// same key block on that lookup and share its result instead of issuing a
/// duplicate one. Failed lookups are not cached, so the next caller retries.
pub struct Memo<K, V> {
    cells: Mutex<HashMap<K, Arc<Mutex<Option<V>>>>>,
}

impl<K: Eq + Hash + Clone, V: Clone> Memo<K, V> {
    pub fn new() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }

    /// Get the cached value for `key`, computing it with `init` on a miss.
    pub fn get_or_try_init<E>(
        &self,
        key: &K,
        init: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        let cell = {
            let mut cells = self
                .cells
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            cells.entry(key.clone()).or_default().clone()
        };

        // Holding the cell's own lock (not the map's) for the duration of
        // the lookup is what makes the in-flight request single.
        let mut slot = cell
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(value) = slot.as_ref() {
            return Ok(value.clone());
        }
        let value = init()?;
        *slot = Some(value.clone());
        Ok(value)
    }

    /// Drop the cached value for `key` (used by cache-bypassing retries).
    pub fn invalidate(&self, key: &K) {
        let mut cells = self
            .cells
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        cells.remove(key);
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Default for Memo<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_second_lookup_is_cached() {
        let memo: Memo<String, u32> = Memo::new();
        let calls = AtomicU32::new(0);
        let key = "pkg".to_string();

        for _ in 0..3 {
            let value: Result<u32, ()> = memo.get_or_try_init(&key, || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            });
            assert_eq!(value.unwrap(), 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let memo: Memo<String, u32> = Memo::new();
        let key = "pkg".to_string();

        let first: Result<u32, &str> = memo.get_or_try_init(&key, || Err("down"));
        assert!(first.is_err());
        let second: Result<u32, &str> = memo.get_or_try_init(&key, || Ok(9));
        assert_eq!(second.unwrap(), 9);
    }

    #[test]
    fn test_invalidate() {
        let memo: Memo<String, u32> = Memo::new();
        let key = "pkg".to_string();
        let _: Result<u32, ()> = memo.get_or_try_init(&key, || Ok(1));
        memo.invalidate(&key);
        let value: Result<u32, ()> = memo.get_or_try_init(&key, || Ok(2));
        assert_eq!(value.unwrap(), 2);
    }
}
