//! Service initialization and dependency injection

use std::sync::Arc;

use sqlx::PgPool;
use tracing::{info, warn};

use crate::{
    cache::{CacheBackend, MemoryCacheBackend, PermissionCache, RedisCacheBackend},
    repository::PgAuthorizationStore,
    service::{CachedPermissionService, PermissionService},
    Config,
};

/// Container for all initialized services
#[derive(Clone)]
pub struct Services {
    /// Ground-truth resolver (no cache awareness)
    pub resolver: Arc<PermissionService>,
    /// Cache layer with its backend
    pub cache: Arc<PermissionCache>,
    /// The authorization API request handlers should consume
    pub permissions: Arc<CachedPermissionService>,
}

/// Initialize all core services
pub async fn init_services(pool: PgPool, config: &Config) -> Result<Services, anyhow::Error> {
    info!("Initializing services...");

    let store = Arc::new(PgAuthorizationStore::new(pool));
    let resolver = Arc::new(PermissionService::new(store));
    info!("PermissionService initialized");

    let backend = init_cache_backend(config).await?;
    let cache = Arc::new(PermissionCache::new(backend, &config.cache));
    info!(namespace = %config.cache.key_prefix, "PermissionCache initialized");

    let permissions = Arc::new(CachedPermissionService::new(
        resolver.clone(),
        cache.clone(),
    ));
    info!("CachedPermissionService initialized");

    Ok(Services {
        resolver,
        cache,
        permissions,
    })
}

/// Pick the cache backend from configuration: Redis when enabled, the
/// in-process store otherwise.
async fn init_cache_backend(config: &Config) -> Result<Arc<dyn CacheBackend>, anyhow::Error> {
    if config.redis.enabled {
        let backend = RedisCacheBackend::from_url(config.redis_url()).await?;
        info!("Cache backend: Redis at {}", config.redis_url());
        Ok(Arc::new(backend))
    } else {
        warn!("⚠ Redis disabled — permission cache is in-process and not shared across nodes");
        Ok(Arc::new(MemoryCacheBackend::new(config.cache.max_entries)))
    }
}
