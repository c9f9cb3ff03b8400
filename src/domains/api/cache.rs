//! Bounded TTL cache for successful read responses.
//!
//! Entries are keyed by the fully resolved request URL. Expired entries are
//! dropped lazily on lookup. When the cache is full the oldest *inserted*
//! entry is evicted (FIFO, not LRU): reads do not refresh an entry's position.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use regex::Regex;
use tracing::debug;

/// Default number of entries held before eviction kicks in.
pub const DEFAULT_CAPACITY: usize = 500;

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
    /// Insertion stamp; matches exactly one slot in the FIFO index.
    seq: u64,
}

#[derive(Debug)]
struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    /// Insertion order. Slots whose key was removed or re-inserted are
    /// skipped lazily and compacted once they outnumber live entries.
    order: VecDeque<(u64, String)>,
    next_seq: u64,
}

impl<V> CacheState<V> {
    fn is_live_slot(&self, seq: u64, key: &str) -> bool {
        self.entries.get(key).is_some_and(|e| e.seq == seq)
    }

    fn evict_oldest(&mut self) {
        while let Some((seq, key)) = self.order.pop_front() {
            if self.is_live_slot(seq, &key) {
                self.entries.remove(&key);
                debug!("Cache evicted oldest entry: {}", key);
                return;
            }
        }
    }

    fn compact(&mut self, capacity: usize) {
        if self.order.len() > capacity.saturating_mul(2) {
            let entries = &self.entries;
            self.order
                .retain(|(seq, key)| entries.get(key).is_some_and(|e| e.seq == *seq));
        }
    }
}

/// Shared response cache, safe to use from concurrent tool calls.
#[derive(Debug)]
pub struct ResponseCache<V = serde_json::Value> {
    state: Mutex<CacheState<V>>,
    capacity: usize,
}

impl<V: Clone> ResponseCache<V> {
    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                order: VecDeque::new(),
                next_seq: 0,
            }),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a live entry. An expired entry is removed and reported absent.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut state = self.lock();
        let expired = match state.entries.get(key) {
            None => return None,
            Some(entry) => Instant::now() > entry.expires_at,
        };

        if expired {
            state.entries.remove(key);
            state.compact(self.capacity);
            return None;
        }

        state.entries.get(key).map(|e| e.value.clone())
    }

    /// Store `value` under `key` for `ttl`.
    ///
    /// A zero ttl stores nothing. Overwriting an existing key keeps its
    /// original insertion position.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }

        let key = key.into();
        let expires_at = Instant::now() + ttl;
        let mut state = self.lock();

        if let Some(entry) = state.entries.get_mut(&key) {
            entry.value = value;
            entry.expires_at = expires_at;
            return;
        }

        if state.entries.len() >= self.capacity {
            state.evict_oldest();
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.order.push_back((seq, key.clone()));
        state.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at,
                seq,
            },
        );
    }

    /// Remove every entry whose key matches `pattern`. Returns the count removed.
    pub fn invalidate_pattern(&self, pattern: &Regex) -> usize {
        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.retain(|key, _| !pattern.is_match(key));
        let removed = before - state.entries.len();
        state.compact(self.capacity);

        if removed > 0 {
            debug!("Invalidated {} cache entries matching {}", removed, pattern);
        }
        removed
    }

    /// Drop all entries.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.order.clear();
    }

    /// Number of stored entries, including ones that expired but were not yet looked up.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<V: Clone> Default for ResponseCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[test]
    fn test_get_after_set() {
        let cache = ResponseCache::new(10);
        cache.set("https://api/v1/a", "value".to_string(), TTL);
        assert_eq!(cache.get("https://api/v1/a"), Some("value".to_string()));
        assert_eq!(cache.get("https://api/v1/missing"), None);
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let cache = ResponseCache::new(10);
        cache.set("k", 1u32, Duration::from_millis(20));
        assert_eq!(cache.get("k"), Some(1));

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get("k"), None);
        // Lazily evicted on the lookup above.
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_ttl_is_not_stored() {
        let cache = ResponseCache::new(10);
        cache.set("k", 1u32, Duration::ZERO);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_eviction_is_insertion_ordered() {
        let cache = ResponseCache::new(2);
        cache.set("A", 'a', TTL);
        cache.set("B", 'b', TTL);
        // Reading A does not protect it: eviction is FIFO, not LRU.
        assert_eq!(cache.get("A"), Some('a'));
        cache.set("C", 'c', TTL);

        assert_eq!(cache.get("A"), None);
        assert_eq!(cache.get("B"), Some('b'));
        assert_eq!(cache.get("C"), Some('c'));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let cache = ResponseCache::new(2);
        cache.set("A", 1, TTL);
        cache.set("B", 2, TTL);
        cache.set("A", 10, TTL);
        assert_eq!(cache.len(), 2);

        cache.set("C", 3, TTL);
        assert_eq!(cache.get("A"), None);
        assert_eq!(cache.get("B"), Some(2));
    }

    #[test]
    fn test_reinserted_key_gets_new_position() {
        let cache = ResponseCache::new(2);
        cache.set("A", 1, TTL);
        cache.set("B", 2, TTL);
        cache.invalidate_pattern(&Regex::new("^A$").unwrap());
        cache.set("A", 1, TTL);

        // B is now the oldest live entry; the stale slot for A is skipped.
        cache.set("C", 3, TTL);
        assert_eq!(cache.get("B"), None);
        assert_eq!(cache.get("A"), Some(1));
        assert_eq!(cache.get("C"), Some(3));
    }

    #[test]
    fn test_invalidate_pattern_only_removes_matches() {
        let cache = ResponseCache::new(10);
        let keys = [
            "https://api.music.apple.com/v1/me/library/playlists/p.1/tracks?limit=100&offset=0",
            "https://api.music.apple.com/v1/me/library/playlists/p.1/tracks?limit=100&offset=100",
            "https://api.music.apple.com/v1/me/library/playlists/p.2/tracks?limit=100&offset=0",
            "https://api.music.apple.com/v1/me/library/songs?limit=25&offset=0",
        ];
        for key in keys {
            cache.set(key, key.len(), TTL);
        }

        let pattern = Regex::new(&regex::escape("/me/library/playlists/p.1")).unwrap();
        assert_eq!(cache.invalidate_pattern(&pattern), 2);

        assert!(cache.get(keys[0]).is_none());
        assert!(cache.get(keys[1]).is_none());
        assert!(cache.get(keys[2]).is_some());
        assert!(cache.get(keys[3]).is_some());
    }

    #[test]
    fn test_clear() {
        let cache = ResponseCache::new(10);
        cache.set("a", 1, TTL);
        cache.set("b", 2, TTL);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn test_index_stays_bounded_under_churn() {
        let cache = ResponseCache::new(4);
        let all = Regex::new(".*").unwrap();
        for round in 0..50 {
            for i in 0..4 {
                cache.set(format!("k{round}-{i}"), i, TTL);
            }
            cache.invalidate_pattern(&all);
        }
        assert!(cache.lock().order.len() <= 8);
    }

    #[test]
    fn test_capacity_floor() {
        let cache: ResponseCache<u8> = ResponseCache::new(0);
        assert_eq!(cache.capacity(), 1);
    }
}
