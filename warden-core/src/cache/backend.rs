use std::time::Duration;

use async_trait::async_trait;

use crate::{Error, Result};

/// Generic TTL key-value contract the permission cache is written
/// against. String keys and values; values are JSON documents encoded by
/// the caller.
///
/// Implementations do not interpret keys beyond prefix matching in
/// `delete_prefix`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Remove every key starting with `prefix`.
    async fn delete_prefix(&self, prefix: &str) -> Result<()>;

    /// Cheap liveness check for health probes.
    async fn ping(&self) -> Result<()>;
}

#[derive(Clone)]
struct Entry {
    value: String,
    ttl: Duration,
}

struct PerEntryExpiry;

impl moka::Expiry<String, Entry> for PerEntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry,
        _created_at: std::time::Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// In-process backend over a moka cache.
///
/// Each entry carries its own TTL, matching the per-call TTL overrides
/// the permission cache hands down. `max_capacity` is the advisory
/// sizing knob; eviction beyond TTL is moka's LFU.
#[derive(Clone)]
pub struct MemoryCacheBackend {
    cache: moka::future::Cache<String, Entry>,
}

impl MemoryCacheBackend {
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        let cache = moka::future::CacheBuilder::new(max_capacity)
            .expire_after(PerEntryExpiry)
            .support_invalidation_closures()
            .build();
        Self { cache }
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.cache.get(key).await.map(|entry| entry.value))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.cache
            .insert(
                key.to_string(),
                Entry {
                    value: value.to_string(),
                    ttl,
                },
            )
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<()> {
        let prefix = prefix.to_string();
        self.cache
            .invalidate_entries_if(move |key, _| key.starts_with(&prefix))
            .map_err(|e| Error::Internal(format!("Prefix invalidation failed: {e}")))?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for MemoryCacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCacheBackend")
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let backend = MemoryCacheBackend::new(100);

        assert_eq!(backend.get("k1").await.unwrap(), None);

        backend
            .set("k1", "v1", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(backend.get("k1").await.unwrap(), Some("v1".to_string()));

        backend.delete("k1").await.unwrap();
        assert_eq!(backend.get("k1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_per_entry_ttl_expires() {
        let backend = MemoryCacheBackend::new(100);

        backend
            .set("short", "v", Duration::from_millis(50))
            .await
            .unwrap();
        backend
            .set("long", "v", Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(backend.get("short").await.unwrap(), None);
        assert_eq!(backend.get("long").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_delete_prefix() {
        let backend = MemoryCacheBackend::new(100);
        let ttl = Duration::from_secs(60);

        backend.set("app:user:1", "a", ttl).await.unwrap();
        backend.set("app:user:2", "b", ttl).await.unwrap();
        backend.set("other:1", "c", ttl).await.unwrap();

        backend.delete_prefix("app:").await.unwrap();

        assert_eq!(backend.get("app:user:1").await.unwrap(), None);
        assert_eq!(backend.get("app:user:2").await.unwrap(), None);
        assert_eq!(backend.get("other:1").await.unwrap(), Some("c".to_string()));
    }
}
