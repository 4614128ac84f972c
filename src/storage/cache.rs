// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU response cache for aggregated proposal reads.
//!
//! Entries are JSON values keyed by a string. Proposal mutations invalidate
//! the keys built by [`proposal_key`] and [`dao_proposals_key`].

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;
use serde_json::Value;

struct CacheEntry {
    value: Value,
    inserted_at: Instant,
}

/// In-process LRU cache with a per-entry TTL.
pub struct ResponseCache {
    cache: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

pub fn proposal_key(proposal_id: u64) -> String {
    format!("proposal_{proposal_id}")
}

pub fn dao_proposals_key(dao_id: u64) -> String {
    format!("proposals_dao_{dao_id}")
}

impl ResponseCache {
    /// A zero capacity is treated as one.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Cached value for `key`, or `None` when absent or expired.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut cache = self.cache.lock().ok()?;
        if let Some(entry) = cache.get(key) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.value.clone());
            }
            cache.pop(key);
        }
        None
    }

    pub fn put(&self, key: impl Into<String>, value: Value) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                key.into(),
                CacheEntry {
                    value,
                    inserted_at: Instant::now(),
                },
            );
        }
    }

    /// Evict `key`. Returns whether a live entry was present.
    pub fn invalidate(&self, key: &str) -> bool {
        match self.cache.lock() {
            Ok(mut cache) => cache
                .pop(key)
                .is_some_and(|entry| entry.inserted_at.elapsed() < self.ttl),
            Err(_) => false,
        }
    }
}
