//! Result cache keyed by an input fingerprint
//!
//! Memoizes finished offers so identical requests skip generation. The key
//! is a blake3 digest of a small normalized projection of the input
//! (service name, price, industry). Capacity is bounded with strict FIFO
//! eviction: the oldest insertion goes first, reads do not refresh entries.
//!
//! The check-evict-insert sequence runs under one mutex so concurrent
//! writers cannot lose updates or corrupt the eviction order.

use crate::offer::{Offer, RawInput, SERVICE_KEYS};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub const DEFAULT_CAPACITY: usize = 100;

/// Cache counters and occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub total_requests: u64,
    /// Percentage of lookups that hit, 0-100.
    pub hit_rate: f64,
}

#[derive(Default)]
struct Entries {
    order: VecDeque<String>,
    offers: HashMap<String, Offer>,
}

pub struct OfferCache {
    capacity: usize,
    entries: Mutex<Entries>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for OfferCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl OfferCache {
    /// A cache holding at most `capacity` offers (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(Entries::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up the offer for `input`. Counts exactly one hit or miss.
    pub fn get(&self, input: &RawInput) -> Option<Offer> {
        let key = fingerprint(input);
        let found = self.lock().offers.get(&key).cloned();
        match &found {
            Some(_) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, "cache hit");
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, "cache miss");
            }
        }
        found
    }

    /// Store `offer` under `input`'s fingerprint, evicting the oldest entry
    /// when full. Re-setting an existing key replaces the value in place.
    pub fn set(&self, input: &RawInput, offer: Offer) {
        let key = fingerprint(input);
        let mut entries = self.lock();

        if let Some(slot) = entries.offers.get_mut(&key) {
            *slot = offer;
            return;
        }

        while entries.offers.len() >= self.capacity {
            let Some(oldest) = entries.order.pop_front() else {
                break;
            };
            entries.offers.remove(&oldest);
            tracing::debug!(key = %oldest, "cache eviction");
        }

        entries.order.push_back(key.clone());
        entries.offers.insert(key, offer);
    }

    pub fn len(&self) -> usize {
        self.lock().offers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Hit and miss counters are kept.
    pub fn clear(&self) {
        let mut entries = self.lock();
        entries.order.clear();
        entries.offers.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            size: self.len(),
            capacity: self.capacity,
            hits,
            misses,
            total_requests: total,
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64 * 100.0
            },
        }
    }
}

/// Stable fingerprint of the cache-relevant projection of `input`.
///
/// Keys are serialized in sorted order, so the digest does not depend on
/// the input map's iteration order.
pub fn fingerprint(input: &RawInput) -> String {
    let normalize = |text: Option<String>| text.map(|t| t.trim().to_lowercase()).unwrap_or_default();

    let mut projection: BTreeMap<&str, Value> = BTreeMap::new();
    projection.insert("service", Value::String(normalize(input.text(SERVICE_KEYS))));
    projection.insert("industry", Value::String(normalize(input.text(&["industry"]))));
    projection.insert(
        "price",
        input
            .price_amount()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
    );

    // BTreeMap of strings and numbers always serializes
    let bytes = serde_json::to_vec(&projection).unwrap_or_default();
    format!("blake3:{}", blake3::hash(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fallback;
    use crate::pipeline::OfferRequest;

    fn input(service: &str) -> RawInput {
        RawInput::new().with("service_name", service).with("price", 500)
    }

    fn offer_for(input: &RawInput) -> Offer {
        fallback::whole_pipeline(&OfferRequest::Create(input.clone()), Vec::new(), "t".into())
    }

    #[test]
    fn set_then_get_returns_value() {
        let cache = OfferCache::new(4);
        let key = input("Coaching");
        let offer = offer_for(&key);

        cache.set(&key, offer.clone());
        assert_eq!(cache.get(&key), Some(offer));
    }

    #[test]
    fn fingerprint_normalizes_case_and_whitespace() {
        let a = RawInput::new()
            .with("service_name", "  Coaching ")
            .with("industry", "Health")
            .with("price", 500);
        let b = RawInput::new()
            .with("industry", "health")
            .with("price", "$500")
            .with("service_name", "coaching")
            .with("notes", "ignored by the key");
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert_ne!(fingerprint(&a), fingerprint(&input("Consulting")));
    }

    #[test]
    fn oldest_insertion_is_evicted_first() {
        let cache = OfferCache::new(3);
        let keys: Vec<RawInput> = ["a", "b", "c", "d"].iter().map(|s| input(s)).collect();

        for k in &keys[..3] {
            cache.set(k, offer_for(k));
        }
        // reading "a" does not protect it: eviction is FIFO, not LRU
        assert!(cache.get(&keys[0]).is_some());
        cache.set(&keys[3], offer_for(&keys[3]));

        assert_eq!(cache.len(), 3);
        assert!(cache.get(&keys[0]).is_none());
        assert!(cache.get(&keys[1]).is_some());
        assert!(cache.get(&keys[3]).is_some());
    }

    #[test]
    fn counters_increment_once_per_call() {
        let cache = OfferCache::new(2);
        let k = input("x");
        assert!(cache.get(&k).is_none());
        cache.set(&k, offer_for(&k));
        assert!(cache.get(&k).is_some());
        assert!(cache.get(&k).is_some());

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_requests, 3);
        assert!((stats.hit_rate - 66.666).abs() < 0.01);
    }

    #[test]
    fn resetting_key_keeps_single_entry() {
        let cache = OfferCache::new(2);
        let k = input("x");
        cache.set(&k, offer_for(&k));
        let mut replacement = offer_for(&k);
        replacement.title = "Updated".into();
        cache.set(&k, replacement);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&k).unwrap().title, "Updated");
    }

    #[test]
    fn clear_keeps_counters() {
        let cache = OfferCache::new(2);
        let k = input("x");
        cache.set(&k, offer_for(&k));
        let _ = cache.get(&k);
        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn concurrent_writers_keep_capacity_and_order_consistent() {
        let cache = OfferCache::new(5);
        let offer = offer_for(&input("Seed"));

        std::thread::scope(|scope| {
            for t in 0..8 {
                let cache = &cache;
                let offer = offer.clone();
                scope.spawn(move || {
                    for i in 0..200 {
                        let key = input(&format!("service {} {}", t, i));
                        cache.set(&key, offer.clone());
                        cache.get(&key);
                    }
                });
            }
        });

        assert_eq!(cache.len(), 5);
        let entries = cache.lock();
        assert_eq!(entries.order.len(), entries.offers.len());
        assert!(entries.order.iter().all(|k| entries.offers.contains_key(k)));
        drop(entries);

        let stats = cache.stats();
        assert_eq!(stats.total_requests, 8 * 200);
        assert_eq!(stats.hits + stats.misses, 8 * 200);
    }
}
