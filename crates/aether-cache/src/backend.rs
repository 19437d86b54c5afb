//! Cache backend contract and the in-memory backend.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to serialize/deserialize a cache entry.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Backend storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Operation timed out.
    #[error("operation timed out")]
    Timeout,
}

/// Status of a module cache lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Served from cache.
    Hit,
    /// Not cached; the module ran.
    Miss,
    /// Caching did not apply; the module ran.
    Bypass,
    /// The backend failed; the module ran.
    Error,
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hit => write!(f, "HIT"),
            Self::Miss => write!(f, "MISS"),
            Self::Bypass => write!(f, "BYPASS"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// External cache the coordinator reads and writes.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a value, `None` on miss.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store a value for `ttl`.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;

    /// Remove a value.
    async fn delete(&self, key: &str) -> CacheResult<()>;
}

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// Entries an [`InMemoryBackend`] holds unless told otherwise.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// In-memory backend with per-entry expiry.
///
/// The store is bounded: inserting a new key into a full store first drops
/// expired entries, then the entry closest to expiry.
#[derive(Debug)]
pub struct InMemoryBackend {
    entries: DashMap<String, Entry>,
    max_entries: usize,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }
}

impl InMemoryBackend {
    /// Create a new in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend holding at most `max_entries` entries (at least one).
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    /// Number of stored entries, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Drop expired entries.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
    }

    /// Make room for one more key.
    fn make_room(&self) {
        if self.entries.len() < self.max_entries {
            return;
        }
        self.purge_expired();

        while self.entries.len() >= self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.value().expires_at)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(key) => {
                    tracing::debug!(key = %key, "cache full, evicting entry");
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

#[async_trait]
impl CacheBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();
        let value = match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
            Some(_) => None,
            None => return Ok(None),
        };
        // Expired: the read guard is released above before removal.
        self.entries.remove(key);
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| CacheError::Storage(format!("ttl {:?} out of range", ttl)))?;
        if !self.entries.contains_key(key) {
            self.make_room();
        }
        self.entries
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}
