//! Time-boxed memoization of search results.
//!
//! The cache is never a source of truth: clearing it only costs extra search
//! calls. Entries are checked lazily on read, so no background sweep is needed,
//! though `sweep_expired` can be used to bound memory.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::product::CandidateProduct;
use crate::errors::MatchError;
use crate::matching::normalize;
use crate::search::SearchOptions;

/// Default lifetime of cached search results
pub const DEFAULT_SEARCH_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: Vec<CandidateProduct>,
    pub created_at: DateTime<Utc>,
    checksum: String,
}

impl CacheEntry {
    pub fn new(
        key: impl Into<String>,
        value: Vec<CandidateProduct>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let key = key.into();
        let checksum = entry_checksum(&key, &value);
        Self { key, value, created_at, checksum }
    }

    pub fn is_intact(&self) -> bool {
        entry_checksum(&self.key, &self.value) == self.checksum
    }

    fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        // A creation time in the future (clock skew) counts as fresh.
        now.signed_duration_since(self.created_at).to_std().map(|age| age > ttl).unwrap_or(false)
    }
}

fn entry_checksum(key: &str, value: &[CandidateProduct]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(key.as_bytes());
    hasher.update(&[0]);
    hasher.update(&serde_json::to_vec(value).unwrap_or_default());
    hasher.finalize().to_hex().to_string()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
    pub corrupted: u64,
}

#[derive(Debug)]
pub struct SearchCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
    corrupted: AtomicU64,
}

impl Default for SearchCache {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_TTL)
    }
}

impl SearchCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expired: AtomicU64::new(0),
            corrupted: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &str) -> Option<Vec<CandidateProduct>> {
        self.get_at(key, Utc::now())
    }

    /// Like `get`, with an explicit clock. Corrupted entries are logged and read as misses.
    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<Vec<CandidateProduct>> {
        match self.lookup_at(key, now) {
            Ok(found) => found,
            Err(error) => {
                warn!(
                    event_name = "matching.cache.corruption",
                    cache_key = key,
                    error = %error,
                    "discarded corrupted cache entry"
                );
                None
            }
        }
    }

    /// Reads an entry, evicting it when stale or corrupted. Corruption is reported as
    /// `MatchError::CacheCorruption` after the entry has been removed.
    pub fn lookup_at(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<CandidateProduct>>, MatchError> {
        let verdict = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(key) {
                None => Lookup::Missing,
                Some(entry) if !entry.is_intact() => Lookup::Corrupted,
                Some(entry) if entry.is_stale(now, self.ttl) => Lookup::Stale,
                Some(entry) => Lookup::Fresh(entry.value.clone()),
            }
        };

        match verdict {
            Lookup::Fresh(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(value))
            }
            Lookup::Missing => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            Lookup::Stale => {
                self.remove(key);
                self.expired.fetch_add(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(
                    event_name = "matching.cache.expired",
                    cache_key = key,
                    "cache entry expired"
                );
                Ok(None)
            }
            Lookup::Corrupted => {
                self.remove(key);
                self.corrupted.fetch_add(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                Err(MatchError::CacheCorruption { key: key.to_owned() })
            }
        }
    }

    pub fn put(&self, key: impl Into<String>, value: Vec<CandidateProduct>) {
        self.put_at(key, value, Utc::now());
    }

    pub fn put_at(
        &self,
        key: impl Into<String>,
        value: Vec<CandidateProduct>,
        now: DateTime<Utc>,
    ) {
        let entry = CacheEntry::new(key, value, now);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entry.key.clone(), entry);
    }

    /// Drops every stale entry and returns how many were removed.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_stale(now, self.ttl));
        let removed = before - entries.len();
        self.expired.fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Imports previously exported entries as-is; they are verified when read.
    pub fn warm(&self, snapshot: impl IntoIterator<Item = CacheEntry>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for entry in snapshot {
            entries.insert(entry.key.clone(), entry);
        }
    }

    pub fn snapshot(&self) -> Vec<CacheEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut snapshot: Vec<CacheEntry> = entries.values().cloned().collect();
        snapshot.sort_by(|a, b| a.key.cmp(&b.key));
        snapshot
    }

    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            corrupted: self.corrupted.load(Ordering::Relaxed),
        }
    }

    fn remove(&self, key: &str) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).remove(key);
    }
}

enum Lookup {
    Missing,
    Corrupted,
    Stale,
    Fresh(Vec<CandidateProduct>),
}

/// Deterministic key for one search: normalized query, category, brand and retailer
/// qualifiers, then the result limit and confidence floor sent to the provider.
/// Requests that differ in anything the provider sees never share an entry.
pub fn cache_key(query: &str, options: &SearchOptions, retailer: Option<&str>) -> String {
    let qualifier = |value: Option<&str>| value.map(normalize).unwrap_or_default();

    [
        normalize(query),
        qualifier(options.category.as_deref()),
        qualifier(options.brand.as_deref()),
        qualifier(retailer),
        options.max_results.to_string(),
        options.min_confidence.to_string(),
    ]
    .join("|")
}
