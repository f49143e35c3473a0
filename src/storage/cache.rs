//! In-memory cache backend and the prefixing decorator.

use crate::error::StorageError;
use crate::storage::{prefixed, CacheAdapter};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Expired entries are dropped lazily on access.
#[derive(Default)]
pub struct MemoryCache {
    items: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn add(&self, key: &str, delta: i64) -> Result<i64, StorageError> {
        let now = Instant::now();
        let mut items = self.items();
        let (current, expires_at) = match items.get(key).filter(|e| e.live(now)) {
            Some(entry) => (
                entry
                    .value
                    .parse::<i64>()
                    .map_err(|_| StorageError::NotInteger(key.to_string()))?,
                entry.expires_at,
            ),
            None => (0, None),
        };
        let next = current + delta;
        items.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }
}

#[async_trait]
impl CacheAdapter for MemoryCache {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let now = Instant::now();
        let mut items = self.items();
        match items.get(key) {
            Some(entry) if entry.live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                items.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), StorageError> {
        let expires_at = ttl.map(|d| Instant::now() + d);
        self.items().insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), StorageError> {
        self.items().remove(key);
        Ok(())
    }

    async fn increase(&self, key: &str) -> Result<i64, StorageError> {
        self.add(key, 1)
    }

    async fn decrease(&self, key: &str) -> Result<i64, StorageError> {
        self.add(key, -1)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StorageError> {
        if let Some(entry) = self.items().get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }
}

/// View over a shared cache that rewrites every key to `prefix:key`.
#[derive(Clone)]
pub struct PrefixCache {
    prefix: String,
    inner: Arc<dyn CacheAdapter>,
}

impl PrefixCache {
    pub fn new(prefix: impl Into<String>, inner: Arc<dyn CacheAdapter>) -> Self {
        PrefixCache {
            prefix: prefix.into(),
            inner,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn key(&self, key: &str) -> String {
        prefixed(&self.prefix, key)
    }
}

#[async_trait]
impl CacheAdapter for PrefixCache {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(&self.key(key)).await
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), StorageError> {
        self.inner.set(&self.key(key), value, ttl).await
    }

    async fn del(&self, key: &str) -> Result<(), StorageError> {
        self.inner.del(&self.key(key)).await
    }

    async fn increase(&self, key: &str) -> Result<i64, StorageError> {
        self.inner.increase(&self.key(key)).await
    }

    async fn decrease(&self, key: &str) -> Result<i64, StorageError> {
        self.inner.decrease(&self.key(key)).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StorageError> {
        self.inner.expire(&self.key(key), ttl).await
    }
}
