//! Library cache.
//!
//! The whole library is cached as one snapshot in client-local storage and
//! refreshed lazily: the first access after the snapshot expires fetches a new
//! list and replaces the old one wholesale.
//!
//! Storage layout (two keys, both JSON):
//! - `libraryItems`: the item list
//! - `libraryExpiry`: expiry as epoch seconds
//!
//! Anything in storage that fails to parse is treated as a miss.

use super::storage::KeyValueStore;
use super::CACHE_TTL_SECS;
use crate::error::ClientError;
use crate::models::Item;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

pub const ITEMS_KEY: &str = "libraryItems";
pub const EXPIRY_KEY: &str = "libraryExpiry";

/// Source of "now" in epoch seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// The remote library-listing service.
#[async_trait]
pub trait LibrarySource: Send + Sync {
    async fn fetch_library(&self) -> Result<Vec<Item>, ClientError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub items: Vec<Item>,
    /// Epoch seconds. Older clients wrote fractional seconds.
    pub expires_at: f64,
}

impl CacheEntry {
    pub fn is_valid(&self, now: i64) -> bool {
        !self.items.is_empty() && (now as f64) < self.expires_at
    }
}

pub struct LibraryCache {
    store: Arc<dyn KeyValueStore>,
    source: Arc<dyn LibrarySource>,
    clock: Arc<dyn Clock>,
}

impl LibraryCache {
    pub fn new(store: Arc<dyn KeyValueStore>, source: Arc<dyn LibrarySource>) -> Self {
        Self {
            store,
            source,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Return the cached library if it is still fresh, otherwise fetch,
    /// persist and return a new one.
    ///
    /// A failed fetch leaves storage untouched and hands the error back so the
    /// caller can send the user to the entry route.
    pub async fn get_library(&self) -> Result<Vec<Item>, ClientError> {
        let now = self.clock.now();

        match self.read_entry() {
            Some(entry) if entry.is_valid(now) => {
                tracing::debug!(
                    "Library cache hit: {} items, expires in {}s",
                    entry.items.len(),
                    entry.expires_at as i64 - now
                );
                return Ok(entry.items);
            }
            Some(_) => tracing::debug!("Library cache expired or empty, refetching"),
            None => tracing::debug!("Library cache miss"),
        }

        self.populate(now).await
    }

    /// Drop the persisted snapshot so the next access fetches.
    pub fn clear(&self) -> Result<(), ClientError> {
        self.store.clear()
    }

    async fn populate(&self, now: i64) -> Result<Vec<Item>, ClientError> {
        let items = self.source.fetch_library().await.map_err(|e| {
            tracing::warn!("Failed to fetch library: {}", e);
            e
        })?;

        let expires_at = now + CACHE_TTL_SECS;
        match self.write_entry(&items, expires_at) {
            Ok(()) => tracing::info!("Cached {} library items until {}", items.len(), expires_at),
            Err(e) => {
                tracing::warn!("Failed to persist library cache: {}", e);
                // Half-written state must read as a miss.
                if let Err(e) = self.store.clear() {
                    tracing::warn!("Failed to clear partial library cache: {}", e);
                }
            }
        }

        Ok(items)
    }

    fn read_entry(&self) -> Option<CacheEntry> {
        let raw_items = self.store.get(ITEMS_KEY)?;
        let raw_expiry = self.store.get(EXPIRY_KEY)?;

        let items: Vec<Item> = match serde_json::from_str(&raw_items) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!("Ignoring malformed cached library: {}", e);
                return None;
            }
        };

        let expires_at: f64 = match serde_json::from_str(&raw_expiry) {
            Ok(expiry) => expiry,
            Err(e) => {
                tracing::warn!("Ignoring malformed cache expiry: {}", e);
                return None;
            }
        };

        Some(CacheEntry { items, expires_at })
    }

    fn write_entry(&self, items: &[Item], expires_at: i64) -> Result<(), ClientError> {
        let items = serde_json::to_string(items)
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        self.store.set(ITEMS_KEY, &items)?;
        self.store.set(EXPIRY_KEY, &expires_at.to_string())
    }
}
