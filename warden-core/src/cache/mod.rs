pub mod backend;
pub mod key_builder;
pub mod permission_cache;
pub mod redis;
pub mod stats;

pub use backend::{CacheBackend, MemoryCacheBackend};
pub use key_builder::KeyBuilder;
pub use permission_cache::PermissionCache;
pub use redis::RedisCacheBackend;
pub use stats::{CacheShape, CacheStatistics, CacheStatsCollector};
