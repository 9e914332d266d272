//! In-process TTL cache.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::trace;

use super::Cache;
use crate::error::Result;

struct Entry {
    value: String,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// A [`Cache`] kept in process memory.
///
/// Expired entries are treated as absent and dropped lazily on the next
/// write to the same key or on [`MemoryCache::purge_expired`].
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every expired entry.
    pub async fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.write().await.retain(|_, e| e.is_live(now));
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        let value = entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone());
        trace!(key, hit = value.is_some(), "Cache lookup");
        Ok(value)
    }

    async fn setex(&self, key: &str, ttl: Duration, value: String) -> Result<()> {
        let entry = Entry {
            value,
            expires_at: Instant::now().checked_add(ttl),
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = MemoryCache::new();
        cache
            .setex("permissions:ban.ban", Duration::from_secs(60), "50".into())
            .await
            .unwrap();

        assert_eq!(
            cache.get("permissions:ban.ban").await.unwrap().as_deref(),
            Some("50")
        );
        assert!(cache.get("permissions:ban.kick").await.unwrap().is_none());
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);
        cache.setex("k", ttl, "1".into()).await.unwrap();
        cache.setex("k", ttl, "2".into()).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_expired_entry_is_absent() {
        let cache = MemoryCache::new();
        cache.setex("k", Duration::ZERO, "1".into()).await.unwrap();

        assert!(cache.get("k").await.unwrap().is_none());
        assert!(cache.is_empty().await);

        cache.purge_expired().await;
        assert!(cache.entries.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_huge_ttl_never_expires() {
        let cache = MemoryCache::new();
        cache
            .setex("k", Duration::from_secs(u64::MAX), "1".into())
            .await
            .unwrap();

        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("1"));
        cache.purge_expired().await;
        assert_eq!(cache.len().await, 1);
    }
}
