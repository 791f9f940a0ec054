//! Bounded cache of retrieval results.
//!
//! Keys are normalized query strings, so "Return policy?" and
//! "  return   POLICY " share an entry. When full, the entry inserted least
//! recently is evicted. Re-inserting a key counts as a fresh insertion.

use crate::types::Passage;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};

/// Default number of cached retrievals per session.
pub const DEFAULT_CACHE_CAPACITY: usize = 32;

/// Canonical cache key for a query.
///
/// Lower-cases, drops punctuation and collapses runs of whitespace.
pub fn normalize_query(query: &str) -> String {
    let cleaned: String = query
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A cached retrieval.
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntry {
    pub query_key: String,
    pub passages: Vec<Passage>,
    pub inserted_at: DateTime<Utc>,
    /// Times this entry was served since insertion
    pub hits: u64,
}

/// Hit/miss counters for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Debug, Clone)]
pub struct ResultCache {
    capacity: usize,
    entries: HashMap<String, CacheEntry>,
    /// Keys in insertion order, oldest first
    order: VecDeque<String>,
    hits: u64,
    misses: u64,
}

impl ResultCache {
    /// Create an empty cache. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Look up `query`, counting a hit or a miss.
    pub fn get(&mut self, query: &str) -> Option<&CacheEntry> {
        if self.peek(query).is_some() {
            self.record_hit(query);
        } else {
            self.record_miss(query);
        }
        self.peek(query)
    }

    /// Look up `query` without touching any counter.
    pub fn peek(&self, query: &str) -> Option<&CacheEntry> {
        self.entries.get(&normalize_query(query))
    }

    /// Count a served lookup of `query`. No-op for the per-entry count when
    /// the entry has since been evicted.
    pub fn record_hit(&mut self, query: &str) {
        let key = normalize_query(query);
        self.hits += 1;
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.hits += 1;
            tracing::debug!("Cache hit for '{}' ({} hits)", key, entry.hits);
        }
    }

    pub fn record_miss(&mut self, query: &str) {
        self.misses += 1;
        tracing::debug!("Cache miss for '{}'", normalize_query(query));
    }

    /// Store passages for `query`, evicting the oldest insertion when full.
    pub fn put(&mut self, query: &str, passages: Vec<Passage>) {
        let key = normalize_query(query);

        if self.entries.contains_key(&key) {
            self.order.retain(|k| k != &key);
        }

        self.order.push_back(key.clone());
        self.entries.insert(
            key.clone(),
            CacheEntry {
                query_key: key,
                passages,
                inserted_at: Utc::now(),
                hits: 0,
            },
        );

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
                tracing::debug!("Evicted cache entry '{}'", oldest);
            }
        }
    }

    /// Whether `query` is cached, without touching counters.
    pub fn contains(&self, query: &str) -> bool {
        self.entries.contains_key(&normalize_query(query))
    }

    /// Times the entry for `query` has been served, 0 if absent.
    pub fn hit_count(&self, query: &str) -> u64 {
        self.entries
            .get(&normalize_query(query))
            .map(|e| e.hits)
            .unwrap_or(0)
    }

    /// Drop every entry and reset counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.hits = 0;
        self.misses = 0;
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passages(doc: &str) -> Vec<Passage> {
        vec![Passage::new(doc, format!("{}_chunk_0", doc), 0.9, "text")]
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("How can I return a product?"), "how can i return a product");
        assert_eq!(normalize_query("  Return   POLICY!! "), "return policy");
        assert_eq!(normalize_query("???"), "");
    }

    #[test]
    fn test_equivalent_queries_share_entry() {
        let mut cache = ResultCache::new(4);
        cache.put("Return policy?", passages("returns.pdf"));

        let entry = cache.get("  return   POLICY ").unwrap();
        assert_eq!(entry.query_key, "return policy");
        assert_eq!(entry.passages[0].source.document_id, "returns.pdf");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_hit_and_miss_accounting() {
        let mut cache = ResultCache::new(4);
        assert!(cache.get("shipping").is_none());

        cache.put("shipping", passages("shipping.pdf"));
        assert!(cache.get("shipping").is_some());
        assert!(cache.get("Shipping?").is_some());

        assert_eq!(cache.hit_count("shipping"), 2);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 2,
                misses: 1,
                entries: 1
            }
        );
    }

    #[test]
    fn test_peek_leaves_counters_alone() {
        let mut cache = ResultCache::new(4);
        cache.put("shipping", passages("shipping.pdf"));

        assert!(cache.peek("Shipping?").is_some());
        assert!(cache.peek("returns").is_none());
        assert_eq!(cache.hit_count("shipping"), 0);
        assert_eq!(cache.stats().hits, 0);
        assert_eq!(cache.stats().misses, 0);

        cache.record_hit("shipping");
        cache.record_miss("returns");
        assert_eq!(cache.hit_count("shipping"), 1);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                entries: 1
            }
        );
    }

    #[test]
    fn test_evicts_least_recently_inserted() {
        let mut cache = ResultCache::new(2);
        cache.put("a", passages("a"));
        cache.put("b", passages("b"));

        // Reads do not refresh insertion order
        assert!(cache.get("a").is_some());

        cache.put("c", passages("c"));
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
        assert!(cache.contains("c"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_reinsert_moves_to_back_and_resets_hits() {
        let mut cache = ResultCache::new(2);
        cache.put("a", passages("a"));
        cache.put("b", passages("b"));
        cache.get("a");

        cache.put("a", passages("a2"));
        assert_eq!(cache.hit_count("a"), 0);

        cache.put("c", passages("c"));
        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
    }

    #[test]
    fn test_size_never_exceeds_capacity() {
        let mut cache = ResultCache::new(3);
        for i in 0..20 {
            cache.put(&format!("query {}", i), passages("doc"));
            assert!(cache.len() <= 3);
        }
        assert!(cache.contains("query 19"));
        assert!(!cache.contains("query 16"));
    }

    #[test]
    fn test_clear_resets_entries_and_counters() {
        let mut cache = ResultCache::new(4);
        cache.put("a", passages("a"));
        cache.get("a");
        cache.get("missing");

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.hit_count("a"), 0);
        assert_eq!(cache.stats(), CacheStats::default());
    }
}
