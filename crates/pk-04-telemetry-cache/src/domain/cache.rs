//! Bounded TTL key/value store.
//!
//! Values are kept as JSON. Expiry is evaluated against the caller's clock
//! reading, so an expired entry is never returned even before the periodic
//! purge removes it.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use shared_types::CacheStats;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: DateTime<Utc>,
    /// Insertion sequence; the lowest is evicted first.
    seq: u64,
}

/// TTL cache with oldest-inserted eviction at `max_keys`.
#[derive(Debug)]
pub struct TtlCache {
    entries: HashMap<String, CacheEntry>,
    max_keys: usize,
    next_seq: u64,
    hits: u64,
    misses: u64,
}

impl TtlCache {
    pub fn new(max_keys: usize) -> Self {
        Self {
            entries: HashMap::new(),
            max_keys: max_keys.max(1),
            next_seq: 0,
            hits: 0,
            misses: 0,
        }
    }

    pub fn get(&mut self, key: &str, now: DateTime<Utc>) -> Option<Value> {
        match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => {
                self.hits += 1;
                Some(entry.value.clone())
            }
            Some(_) => {
                self.entries.remove(key);
                self.misses += 1;
                None
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn set(&mut self, key: &str, value: Value, ttl: Duration, now: DateTime<Utc>) {
        if !self.entries.contains_key(key) && self.entries.len() >= self.max_keys {
            self.purge_expired(now);
            if self.entries.len() >= self.max_keys {
                self.evict_oldest();
            }
        }
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.next_seq += 1;
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at,
                seq: self.next_seq,
            },
        );
    }

    /// Removes keys containing `pattern`, or everything for `None`.
    pub fn clear(&mut self, pattern: Option<&str>) -> usize {
        let before = self.entries.len();
        match pattern {
            Some(pattern) => self.entries.retain(|key, _| !key.contains(pattern)),
            None => self.entries.clear(),
        }
        before - self.entries.len()
    }

    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.seq)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let lookups = self.hits + self.misses;
        CacheStats {
            keys: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                self.hits as f64 / lookups as f64 * 100.0
            },
        }
    }
}
