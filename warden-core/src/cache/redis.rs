use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use crate::Result;

use super::backend::CacheBackend;

/// Redis backend over a multiplexed connection manager.
///
/// The manager reconnects on its own, so transient broker restarts
/// surface as per-operation errors (which the permission cache absorbs)
/// rather than a poisoned client.
#[derive(Clone)]
pub struct RedisCacheBackend {
    conn: ConnectionManager,
}

impl RedisCacheBackend {
    pub async fn new(client: Client) -> Result<Self> {
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    pub async fn from_url(url: &str) -> Result<Self> {
        let client = Client::open(url)?;
        Self::new(client).await
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        // SET EX rejects 0
        let seconds = ttl.as_secs().max(1);
        let _: () = conn.set_ex(key, value, seconds).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let pattern = format!("{prefix}*");
        let mut cursor: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(512)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let _: () = conn.del(keys).await?;
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

impl std::fmt::Debug for RedisCacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheBackend").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "Requires redis"]
    async fn test_round_trip_and_prefix_delete() {
        let backend = RedisCacheBackend::from_url("redis://127.0.0.1:6379")
            .await
            .unwrap();
        let ttl = Duration::from_secs(30);

        backend.set("warden_test:a:1", "x", ttl).await.unwrap();
        backend.set("warden_test:a:2", "y", ttl).await.unwrap();
        backend.set("warden_test:b:1", "z", ttl).await.unwrap();

        assert_eq!(
            backend.get("warden_test:a:1").await.unwrap(),
            Some("x".to_string())
        );

        backend.delete_prefix("warden_test:a:").await.unwrap();
        assert_eq!(backend.get("warden_test:a:1").await.unwrap(), None);
        assert_eq!(backend.get("warden_test:a:2").await.unwrap(), None);
        assert_eq!(
            backend.get("warden_test:b:1").await.unwrap(),
            Some("z".to_string())
        );

        backend.delete_prefix("warden_test:").await.unwrap();
        assert!(backend.ping().await.is_ok());
    }
}
