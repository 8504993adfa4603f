//! In-memory counter store with threshold-triggered eviction.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::counter::{Millis, WindowCounter};
use super::descriptor::CounterKey;

/// Default store size at which an inline sweep is attempted.
pub const DEFAULT_MAX_STORE_SIZE: usize = 5000;

/// Process-local mapping from (rule, client) to the current window counter.
///
/// The size threshold is soft: reaching it triggers a sweep of expired
/// counters, but live counters are never dropped to make room.
pub struct RateLimitStore {
    /// Counters indexed by rule and client
    entries: DashMap<CounterKey, WindowCounter>,
    /// Size at which the evictor runs
    max_size: usize,
    /// Held while a sweep is in progress
    sweep_lock: Mutex<()>,
}

impl RateLimitStore {
    /// Create an empty store that sweeps once it holds `max_size` counters.
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_size,
            sweep_lock: Mutex::new(()),
        }
    }

    pub fn get(&self, key: &CounterKey) -> Option<WindowCounter> {
        self.entries.get(key).map(|entry| *entry)
    }

    pub fn set(&self, key: CounterKey, counter: WindowCounter) {
        self.entries.insert(key, counter);
    }

    /// Atomically read, transform and write back the counter for `key`.
    ///
    /// The shard holding `key` stays write-locked for the whole call, so
    /// concurrent updates to the same key are serialized. `f` must not touch
    /// the store.
    pub fn update<F>(&self, key: CounterKey, f: F) -> WindowCounter
    where
        F: FnOnce(Option<WindowCounter>) -> WindowCounter,
    {
        match self.entries.entry(key) {
            Entry::Occupied(mut slot) => {
                let next = f(Some(*slot.get()));
                *slot.get_mut() = next;
                next
            }
            Entry::Vacant(slot) => {
                let next = f(None);
                slot.insert(next);
                next
            }
        }
    }

    /// Number of counters currently held, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Remove every counter whose window ended before `now`.
    ///
    /// Returns the number of counters removed.
    pub fn sweep(&self, now: Millis) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, counter| counter.window_reset_at >= now);
        before.saturating_sub(self.entries.len())
    }

    /// Sweep if the store has reached its size threshold.
    ///
    /// Only one sweep runs at a time; callers that find one in progress
    /// return immediately. Returns the number of counters removed, or `None`
    /// when no sweep ran.
    ///
    /// A sweep visits every counter and write-locks each shard in turn. While
    /// the store stays at or above the threshold with only live counters,
    /// every call pays that O(n) cost.
    pub fn evict_if_full(&self, now: Millis) -> Option<usize> {
        if self.entries.len() < self.max_size {
            return None;
        }

        let Some(_guard) = self.sweep_lock.try_lock() else {
            debug!("Sweep already in progress, skipping");
            return None;
        };

        // A sweep that just finished may already have made room
        let size = self.entries.len();
        if size < self.max_size {
            return None;
        }

        let removed = self.sweep(now);
        info!(
            size = size,
            removed = removed,
            max_size = self.max_size,
            "Swept expired rate limit counters"
        );
        Some(removed)
    }

    /// Clear all counters.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for RateLimitStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_STORE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::descriptor::ClientKey;
    use std::sync::Arc;

    fn key(rule: &str, client: &str) -> CounterKey {
        CounterKey::new(Arc::from(rule), ClientKey::new(client))
    }

    #[test]
    fn test_get_and_set() {
        let store = RateLimitStore::new(10);
        assert!(store.is_empty());
        assert!(store.get(&key("r", "a")).is_none());

        store.set(key("r", "a"), WindowCounter::open(0, 1_000));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&key("r", "a")).unwrap().count, 1);

        // Setting the same key replaces rather than duplicates
        store.set(
            key("r", "a"),
            WindowCounter {
                count: 3,
                window_reset_at: 1_000,
            },
        );
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&key("r", "a")).unwrap().count, 3);
    }

    #[test]
    fn test_update_inserts_and_modifies() {
        let store = RateLimitStore::new(10);

        let first = store.update(key("r", "a"), |current| {
            assert!(current.is_none());
            WindowCounter::open(0, 1_000)
        });
        assert_eq!(first.count, 1);

        let second = store.update(key("r", "a"), |current| {
            let mut counter = current.unwrap();
            counter.increment();
            counter
        });
        assert_eq!(second.count, 2);
        assert_eq!(store.get(&key("r", "a")), Some(second));
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let store = RateLimitStore::new(10);
        store.set(key("r", "old"), WindowCounter::open(0, 100));
        store.set(key("r", "edge"), WindowCounter::open(0, 500));
        store.set(key("r", "live"), WindowCounter::open(0, 10_000));

        let removed = store.sweep(500);

        assert_eq!(removed, 1);
        assert!(store.get(&key("r", "old")).is_none());
        // A window ending exactly now is not yet expired
        assert!(store.get(&key("r", "edge")).is_some());
        assert!(store.get(&key("r", "live")).is_some());
    }

    #[test]
    fn test_evict_below_threshold_is_noop() {
        let store = RateLimitStore::new(3);
        store.set(key("r", "a"), WindowCounter::open(0, 1));
        store.set(key("r", "b"), WindowCounter::open(0, 1));

        assert_eq!(store.evict_if_full(1_000), None);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_evict_at_threshold_sweeps() {
        let store = RateLimitStore::new(3);
        store.set(key("r", "a"), WindowCounter::open(0, 1));
        store.set(key("r", "b"), WindowCounter::open(0, 1));
        store.set(key("r", "c"), WindowCounter::open(0, 10_000));

        assert_eq!(store.evict_if_full(1_000), Some(2));
        assert_eq!(store.len(), 1);
        assert!(store.get(&key("r", "c")).is_some());
    }

    #[test]
    fn test_evict_keeps_live_counters_over_threshold() {
        let store = RateLimitStore::new(2);
        store.set(key("r", "a"), WindowCounter::open(0, 10_000));
        store.set(key("r", "b"), WindowCounter::open(0, 10_000));
        store.set(key("r", "c"), WindowCounter::open(0, 10_000));

        assert_eq!(store.evict_if_full(1_000), Some(0));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_evict_skips_while_sweep_in_progress() {
        let store = RateLimitStore::new(3);
        store.set(key("r", "a"), WindowCounter::open(0, 1));
        store.set(key("r", "b"), WindowCounter::open(0, 1));
        store.set(key("r", "c"), WindowCounter::open(0, 1));

        {
            let _sweeping = store.sweep_lock.lock();
            assert_eq!(store.evict_if_full(1_000), None);
            assert_eq!(store.len(), 3);
        }

        // Once the other sweep is done the next caller sweeps normally
        assert_eq!(store.evict_if_full(1_000), Some(3));
        assert!(store.is_empty());
    }

    #[test]
    fn test_clear() {
        let store = RateLimitStore::default();
        assert_eq!(store.max_size(), DEFAULT_MAX_STORE_SIZE);

        store.set(key("r", "a"), WindowCounter::open(0, 1));
        store.clear();
        assert!(store.is_empty());
    }
}
