//! Process-wide read-through cache for query responses.
//!
//! Entries are keyed by the canonical query string and hold the serialized
//! response body. Entries live for a fixed TTL from insertion. When capacity
//! is exceeded the oldest-inserted entry goes first (insertion order, not
//! LRU). Any mutation clears the whole cache via [`QueryCache::invalidate_all`].
//!
//! Serving an expired entry after a query timeout is the caller's decision:
//! [`Lookup::Expired`] hands the entry back so it can be kept as a fallback.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

// ═══════════════════════════════════════════════════════════
// CachedResponse
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub body: String,
    pub status: u16,
    pub created_at: Instant,
}

impl CachedResponse {
    pub fn new(body: String, status: u16) -> Self {
        Self::at(body, status, Instant::now())
    }

    pub fn at(body: String, status: u16, created_at: Instant) -> Self {
        Self {
            body,
            status,
            created_at,
        }
    }
}

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Hit(CachedResponse),
    /// Past TTL. Already removed from the cache.
    Expired(CachedResponse),
    Miss,
}

// ═══════════════════════════════════════════════════════════
// QueryCache
// ═══════════════════════════════════════════════════════════

pub struct QueryCache {
    ttl: Duration,
    capacity: usize,
    entries: HashMap<String, CachedResponse>,
    /// Keys in insertion order, oldest at the front.
    order: VecDeque<String>,
    /// Bumped by every `invalidate_all`.
    generation: u64,
}

impl QueryCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
            generation: 0,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn lookup(&mut self, key: &str) -> Lookup {
        self.lookup_at(key, Instant::now())
    }

    /// Look up `key` as of `now`. An expired entry is dropped on read.
    pub fn lookup_at(&mut self, key: &str, now: Instant) -> Lookup {
        let fresh = match self.entries.get(key) {
            Some(entry) => now.saturating_duration_since(entry.created_at) < self.ttl,
            None => return Lookup::Miss,
        };

        if fresh {
            return match self.entries.get(key) {
                Some(entry) => Lookup::Hit(entry.clone()),
                None => Lookup::Miss,
            };
        }

        match self.remove(key) {
            Some(entry) => {
                tracing::debug!(key, "Cache entry expired");
                Lookup::Expired(entry)
            }
            None => Lookup::Miss,
        }
    }

    /// Store a response. Re-inserting a key counts as a fresh insertion.
    pub fn put(&mut self, key: String, value: CachedResponse) {
        self.remove(&key);
        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                    tracing::debug!(key = %oldest, "Cache evict");
                }
                None => break,
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, value);
    }

    /// Store only if no invalidation has happened since `generation` was read.
    ///
    /// Returns whether the value was stored.
    pub fn put_if_generation(
        &mut self,
        key: String,
        value: CachedResponse,
        generation: u64,
    ) -> bool {
        if generation != self.generation {
            tracing::debug!(key, "Cache store skipped: invalidated while computing");
            return false;
        }
        self.put(key, value);
        true
    }

    /// Drop every entry.
    pub fn invalidate_all(&mut self) {
        let dropped = self.entries.len();
        self.entries.clear();
        self.order.clear();
        self.generation = self.generation.wrapping_add(1);
        tracing::debug!(dropped, generation = self.generation, "Cache invalidate_all");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove(&mut self, key: &str) -> Option<CachedResponse> {
        let entry = self.entries.remove(key)?;
        self.order.retain(|k| k != key);
        Some(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(30);

    fn response(body: &str, at: Instant) -> CachedResponse {
        CachedResponse::at(body.to_string(), 200, at)
    }

    #[test]
    fn empty_cache_misses() {
        let mut cache = QueryCache::new(TTL, 10);
        assert_eq!(cache.lookup("stats"), Lookup::Miss);
        assert!(cache.is_empty());
    }

    #[test]
    fn fresh_entry_hits() {
        let start = Instant::now();
        let mut cache = QueryCache::new(TTL, 10);
        cache.put("stats".into(), response("{}", start));

        match cache.lookup_at("stats", start + Duration::from_secs(29)) {
            Lookup::Hit(entry) => assert_eq!(entry.body, "{}"),
            other => panic!("expected hit, got {other:?}"),
        }
    }

    #[test]
    fn expired_entry_is_returned_once_then_gone() {
        let start = Instant::now();
        let mut cache = QueryCache::new(TTL, 10);
        cache.put("stats".into(), response("{\"old\":1}", start));

        match cache.lookup_at("stats", start + TTL) {
            Lookup::Expired(entry) => assert_eq!(entry.body, "{\"old\":1}"),
            other => panic!("expected expired, got {other:?}"),
        }
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.lookup_at("stats", start + TTL), Lookup::Miss);
    }

    #[test]
    fn capacity_evicts_oldest_inserted_not_least_used() {
        let now = Instant::now();
        let mut cache = QueryCache::new(TTL, 2);
        cache.put("a".into(), response("a", now));
        cache.put("b".into(), response("b", now));

        // Reading "a" does not protect it
        assert!(matches!(cache.lookup_at("a", now), Lookup::Hit(_)));

        cache.put("c".into(), response("c", now));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.lookup_at("a", now), Lookup::Miss);
        assert!(matches!(cache.lookup_at("b", now), Lookup::Hit(_)));
        assert!(matches!(cache.lookup_at("c", now), Lookup::Hit(_)));
    }

    #[test]
    fn reinsert_moves_key_to_the_back() {
        let now = Instant::now();
        let mut cache = QueryCache::new(TTL, 2);
        cache.put("a".into(), response("a1", now));
        cache.put("b".into(), response("b", now));
        cache.put("a".into(), response("a2", now));
        cache.put("c".into(), response("c", now));

        assert_eq!(cache.lookup_at("b", now), Lookup::Miss);
        match cache.lookup_at("a", now) {
            Lookup::Hit(entry) => assert_eq!(entry.body, "a2"),
            other => panic!("expected hit, got {other:?}"),
        }
    }

    #[test]
    fn invalidate_all_clears_and_bumps_generation() {
        let now = Instant::now();
        let mut cache = QueryCache::new(TTL, 10);
        cache.put("a".into(), response("a", now));
        cache.put("b".into(), response("b", now));
        let before = cache.generation();

        cache.invalidate_all();
        assert!(cache.is_empty());
        assert_eq!(cache.generation(), before + 1);
        assert_eq!(cache.lookup_at("a", now), Lookup::Miss);
    }

    #[test]
    fn stale_generation_is_not_stored() {
        let now = Instant::now();
        let mut cache = QueryCache::new(TTL, 10);
        let generation = cache.generation();

        // A mutation lands while the query is computing
        cache.invalidate_all();

        assert!(!cache.put_if_generation("stats".into(), response("old", now), generation));
        assert!(cache.is_empty());

        let current = cache.generation();
        assert!(cache.put_if_generation("stats".into(), response("new", now), current));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn zero_capacity_still_holds_one_entry() {
        let now = Instant::now();
        let mut cache = QueryCache::new(TTL, 0);
        cache.put("a".into(), response("a", now));
        cache.put("b".into(), response("b", now));
        assert_eq!(cache.len(), 1);
        assert!(matches!(cache.lookup_at("b", now), Lookup::Hit(_)));
    }
}
