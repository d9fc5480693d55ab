//! Permission cache over a TTL key-value backend.
//!
//! Owns the six cache shapes, their TTL classes, invalidation scopes and
//! hit/miss accounting. Every backend fault, serialization failure and
//! timeout is absorbed here: reads degrade to a miss, writes to a no-op.
//! Callers never see a cache error, so authorization can always fall back
//! to the store.

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{de::DeserializeOwned, Serialize};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::{
    config::CacheConfig,
    models::{permission_key, MenuId, PermissionId, RoleId, UserId},
    service::PermissionService,
    Error, Result,
};

use super::{
    backend::CacheBackend,
    key_builder::KeyBuilder,
    stats::{CacheShape, CacheStatistics, CacheStatsCollector},
};

/// Entries whose remaining grant lifetime is shorter than this are not
/// worth writing.
const MIN_POPULATE_TTL: Duration = Duration::from_secs(1);

/// Lifetime of the health probe sentinel.
const HEALTH_PROBE_TTL: Duration = Duration::from_secs(5);

/// TTL for a cache population: the shape default, tightened to the
/// earliest expiry of any grant that contributed to the value. `None`
/// means the window is too small to bother caching.
pub(crate) fn bounded_ttl(
    default_ttl: Duration,
    earliest_expiry: Option<DateTime<Utc>>,
) -> Option<Duration> {
    let Some(expiry) = earliest_expiry else {
        return Some(default_ttl);
    };
    let Ok(remaining) = (expiry - Utc::now()).to_std() else {
        return None;
    };
    if remaining < MIN_POPULATE_TTL {
        return None;
    }
    Some(remaining.min(default_ttl))
}

/// Cache layer for resolved permission data
#[derive(Clone)]
pub struct PermissionCache {
    backend: Arc<dyn CacheBackend>,
    keys: KeyBuilder,
    stats: Arc<CacheStatsCollector>,
    user_ttl: Duration,
    role_ttl: Duration,
    menu_ttl: Duration,
    operation_timeout: Duration,
}

impl std::fmt::Debug for PermissionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionCache")
            .field("namespace", &self.keys.namespace())
            .field("user_ttl", &self.user_ttl)
            .field("role_ttl", &self.role_ttl)
            .field("menu_ttl", &self.menu_ttl)
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}

impl PermissionCache {
    pub fn new(backend: Arc<dyn CacheBackend>, config: &CacheConfig) -> Self {
        Self {
            backend,
            keys: KeyBuilder::from_config(config),
            stats: Arc::new(CacheStatsCollector::new(config.enable_statistics)),
            user_ttl: config.user_ttl(),
            role_ttl: config.role_ttl(),
            menu_ttl: config.menu_ttl(),
            operation_timeout: config.operation_timeout(),
        }
    }

    #[must_use]
    pub const fn user_ttl(&self) -> Duration {
        self.user_ttl
    }

    #[must_use]
    pub const fn role_ttl(&self) -> Duration {
        self.role_ttl
    }

    #[must_use]
    pub const fn menu_ttl(&self) -> Duration {
        self.menu_ttl
    }

    fn timeout_error(&self) -> Error {
        Error::CacheTimeout(self.operation_timeout.as_millis() as u64)
    }

    // ==================== Backend Plumbing ====================

    async fn backend_get(&self, key: &str) -> Option<String> {
        match timeout(self.operation_timeout, self.backend.get(key)).await {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                None
            }
            Err(_) => {
                let e = self.timeout_error();
                warn!(key = %key, error = %e, "Cache read timed out, treating as miss");
                None
            }
        }
    }

    /// Decoded read with hit/miss accounting. Undecodable payloads are
    /// misses, not errors.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let Some(raw) = self.backend_get(key).await else {
            self.stats.record_miss();
            return None;
        };
        match serde_json::from_str(&raw) {
            Ok(value) => {
                self.stats.record_hit();
                Some(value)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                self.stats.record_miss();
                None
            }
        }
    }

    async fn write_json<T>(&self, key: &str, shape: CacheShape, value: &T, ttl: Duration)
    where
        T: Serialize + ?Sized,
    {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %key, error = %e, "Skipping cache write, value failed to serialize");
                return;
            }
        };
        match timeout(self.operation_timeout, self.backend.set(key, &payload, ttl)).await {
            Ok(Ok(())) => {
                self.stats.record_write(shape);
                debug!(key = %key, ttl_seconds = ttl.as_secs(), "Cache entry written");
            }
            Ok(Err(e)) => warn!(key = %key, error = %e, "Cache write failed"),
            Err(_) => {
                let e = self.timeout_error();
                warn!(key = %key, error = %e, "Cache write timed out");
            }
        }
    }

    async fn backend_delete(&self, key: &str) {
        match timeout(self.operation_timeout, self.backend.delete(key)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(key = %key, error = %e, "Cache invalidation failed"),
            Err(_) => {
                let e = self.timeout_error();
                warn!(key = %key, error = %e, "Cache invalidation timed out");
            }
        }
    }

    async fn flush_namespace(&self) {
        let prefix = self.keys.namespace();
        match timeout(self.operation_timeout, self.backend.delete_prefix(prefix)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(prefix = %prefix, error = %e, "Cache namespace flush failed"),
            Err(_) => {
                let e = self.timeout_error();
                warn!(prefix = %prefix, error = %e, "Cache namespace flush timed out");
            }
        }
    }

    // ==================== Per-Shape Reads & Writes ====================

    /// Cached `"resource:action"` keys for a user. Empty on miss.
    pub async fn get_user_permissions(&self, user_id: &UserId) -> Vec<String> {
        let key = self.keys.user_permissions(user_id);
        self.read_json(&key).await.unwrap_or_default()
    }

    /// Empty sets are never written; a cached empty list would be
    /// indistinguishable from a miss anyway.
    pub async fn set_user_permissions(
        &self,
        user_id: &UserId,
        permissions: &[String],
        ttl: Option<Duration>,
    ) {
        if permissions.is_empty() {
            return;
        }
        let key = self.keys.user_permissions(user_id);
        self.write_json(
            &key,
            CacheShape::UserPermissions,
            permissions,
            ttl.unwrap_or(self.user_ttl),
        )
        .await;
    }

    /// Cached role names for a user. Empty on miss.
    pub async fn get_user_roles(&self, user_id: &UserId) -> Vec<String> {
        let key = self.keys.user_roles(user_id);
        self.read_json(&key).await.unwrap_or_default()
    }

    pub async fn set_user_roles(&self, user_id: &UserId, roles: &[String], ttl: Option<Duration>) {
        if roles.is_empty() {
            return;
        }
        let key = self.keys.user_roles(user_id);
        self.write_json(&key, CacheShape::UserRoles, roles, ttl.unwrap_or(self.user_ttl))
            .await;
    }

    /// Cached accessible menu ids for a user. Empty on miss.
    pub async fn get_user_menus(&self, user_id: &UserId) -> Vec<MenuId> {
        let key = self.keys.user_menus(user_id);
        self.read_json(&key).await.unwrap_or_default()
    }

    pub async fn set_user_menus(&self, user_id: &UserId, menu_ids: &[MenuId], ttl: Option<Duration>) {
        if menu_ids.is_empty() {
            return;
        }
        let key = self.keys.user_menus(user_id);
        self.write_json(&key, CacheShape::UserMenus, menu_ids, ttl.unwrap_or(self.menu_ttl))
            .await;
    }

    /// Cached resource → actions map for a user. Empty on miss.
    pub async fn get_user_permission_matrix(
        &self,
        user_id: &UserId,
    ) -> HashMap<String, Vec<String>> {
        let key = self.keys.user_permission_matrix(user_id);
        self.read_json(&key).await.unwrap_or_default()
    }

    pub async fn set_user_permission_matrix(
        &self,
        user_id: &UserId,
        matrix: &HashMap<String, Vec<String>>,
        ttl: Option<Duration>,
    ) {
        if matrix.is_empty() {
            return;
        }
        let key = self.keys.user_permission_matrix(user_id);
        self.write_json(
            &key,
            CacheShape::UserPermissionMatrix,
            matrix,
            ttl.unwrap_or(self.user_ttl),
        )
        .await;
    }

    /// Cached role name → permission keys map for a user. Empty on miss.
    pub async fn get_user_role_matrix(&self, user_id: &UserId) -> HashMap<String, Vec<String>> {
        let key = self.keys.user_role_matrix(user_id);
        self.read_json(&key).await.unwrap_or_default()
    }

    pub async fn set_user_role_matrix(
        &self,
        user_id: &UserId,
        matrix: &HashMap<String, Vec<String>>,
        ttl: Option<Duration>,
    ) {
        if matrix.is_empty() {
            return;
        }
        let key = self.keys.user_role_matrix(user_id);
        self.write_json(
            &key,
            CacheShape::UserRoleMatrix,
            matrix,
            ttl.unwrap_or(self.user_ttl),
        )
        .await;
    }

    /// Cached `"resource:action"` keys for a role. Empty on miss.
    pub async fn get_role_permissions(&self, role_id: &RoleId) -> Vec<String> {
        let key = self.keys.role_permissions(role_id);
        self.read_json(&key).await.unwrap_or_default()
    }

    pub async fn set_role_permissions(
        &self,
        role_id: &RoleId,
        permissions: &[String],
        ttl: Option<Duration>,
    ) {
        if permissions.is_empty() {
            return;
        }
        let key = self.keys.role_permissions(role_id);
        self.write_json(
            &key,
            CacheShape::RolePermissions,
            permissions,
            ttl.unwrap_or(self.role_ttl),
        )
        .await;
    }

    // ==================== Membership Checks ====================

    /// Exact-string membership test against the cached permission list.
    /// A miss is `false`, never an error; disambiguation against the
    /// store is the facade's job.
    pub async fn user_has_permission(
        &self,
        user_id: &UserId,
        resource: &str,
        action: &str,
    ) -> bool {
        let key = permission_key(resource, action);
        self.get_user_permissions(user_id).await.iter().any(|k| *k == key)
    }

    pub async fn role_has_permission(
        &self,
        role_id: &RoleId,
        resource: &str,
        action: &str,
    ) -> bool {
        let key = permission_key(resource, action);
        self.get_role_permissions(role_id).await.iter().any(|k| *k == key)
    }

    // ==================== Bulk Operations ====================

    /// Concurrent lookup for several users. Misses are absent from the
    /// result rather than mapped to empty lists.
    pub async fn get_multiple_user_permissions(
        &self,
        user_ids: &[UserId],
    ) -> HashMap<UserId, Vec<String>> {
        let lookups = user_ids.iter().map(|user_id| async move {
            (user_id.clone(), self.get_user_permissions(user_id).await)
        });
        join_all(lookups)
            .await
            .into_iter()
            .filter(|(_, permissions)| !permissions.is_empty())
            .collect()
    }

    pub async fn set_multiple_user_permissions(
        &self,
        entries: &HashMap<UserId, Vec<String>>,
        ttl: Option<Duration>,
    ) {
        let writes = entries
            .iter()
            .map(|(user_id, permissions)| self.set_user_permissions(user_id, permissions, ttl));
        join_all(writes).await;
    }

    pub async fn get_multiple_role_permissions(
        &self,
        role_ids: &[RoleId],
    ) -> HashMap<RoleId, Vec<String>> {
        let lookups = role_ids.iter().map(|role_id| async move {
            (role_id.clone(), self.get_role_permissions(role_id).await)
        });
        join_all(lookups)
            .await
            .into_iter()
            .filter(|(_, permissions)| !permissions.is_empty())
            .collect()
    }

    pub async fn set_multiple_role_permissions(
        &self,
        entries: &HashMap<RoleId, Vec<String>>,
        ttl: Option<Duration>,
    ) {
        let writes = entries
            .iter()
            .map(|(role_id, permissions)| self.set_role_permissions(role_id, permissions, ttl));
        join_all(writes).await;
    }

    // ==================== Warm-Up ====================

    /// Resolve and populate every user shape for the given ids. Returns
    /// how many users were fully warmed; failed ids are logged and
    /// skipped.
    pub async fn warm_up_users(
        &self,
        resolver: &PermissionService,
        user_ids: &[UserId],
    ) -> usize {
        let mut warmed = 0;
        for user_id in user_ids {
            match self.warm_up_user(resolver, user_id).await {
                Ok(()) => warmed += 1,
                Err(e) => {
                    warn!(user_id = %user_id.as_str(), error = %e, "Skipping user during cache warm-up");
                }
            }
        }
        debug!(warmed, total = user_ids.len(), "User cache warm-up finished");
        warmed
    }

    async fn warm_up_user(&self, resolver: &PermissionService, user_id: &UserId) -> Result<()> {
        let permissions = resolver.effective_user_permissions(user_id).await?;
        if let Some(ttl) = bounded_ttl(self.user_ttl, permissions.earliest_expiry) {
            self.set_user_permissions(user_id, &permissions.keys, Some(ttl)).await;
            self.set_user_permission_matrix(user_id, &permissions.to_matrix(), Some(ttl))
                .await;
        }

        let roles = resolver.user_roles(user_id).await?;
        if let Some(ttl) = bounded_ttl(self.user_ttl, roles.earliest_expiry) {
            self.set_user_roles(user_id, &roles.names, Some(ttl)).await;
        }

        let role_matrix = resolver.user_role_matrix(user_id).await?;
        if let Some(ttl) = bounded_ttl(self.user_ttl, role_matrix.earliest_expiry) {
            self.set_user_role_matrix(user_id, &role_matrix.by_role, Some(ttl)).await;
        }

        let menus = resolver.accessible_menus(user_id).await?;
        if let Some(ttl) = bounded_ttl(self.menu_ttl, menus.earliest_expiry) {
            self.set_user_menus(user_id, &menus.menu_ids, Some(ttl)).await;
        }
        Ok(())
    }

    /// Resolve and populate the permission set of each role.
    pub async fn warm_up_roles(
        &self,
        resolver: &PermissionService,
        role_ids: &[RoleId],
    ) -> usize {
        let mut warmed = 0;
        for role_id in role_ids {
            match resolver.effective_role_permissions(role_id).await {
                Ok(permissions) => {
                    if let Some(ttl) = bounded_ttl(self.role_ttl, permissions.earliest_expiry) {
                        self.set_role_permissions(role_id, &permissions.keys, Some(ttl)).await;
                    }
                    warmed += 1;
                }
                Err(e) => {
                    warn!(role_id = %role_id.as_str(), error = %e, "Skipping role during cache warm-up");
                }
            }
        }
        debug!(warmed, total = role_ids.len(), "Role cache warm-up finished");
        warmed
    }

    // ==================== Invalidation ====================

    /// Drop all five user-scoped keys. Called after any change to the
    /// user's memberships or direct grants.
    pub async fn invalidate_user_cache(&self, user_id: &UserId) {
        let keys = [
            self.keys.user_permissions(user_id),
            self.keys.user_roles(user_id),
            self.keys.user_menus(user_id),
            self.keys.user_permission_matrix(user_id),
            self.keys.user_role_matrix(user_id),
        ];
        join_all(keys.iter().map(|key| self.backend_delete(key))).await;
        debug!(user_id = %user_id.as_str(), "User cache invalidated");
    }

    /// Drop the role's permission set key.
    pub async fn invalidate_role_cache(&self, role_id: &RoleId) {
        self.backend_delete(&self.keys.role_permissions(role_id)).await;
        debug!(role_id = %role_id.as_str(), "Role cache invalidated");
    }

    /// A permission definition change can affect any number of users and
    /// roles, so the whole namespace is flushed instead of tracking
    /// per-definition fan-out.
    pub async fn invalidate_permission_cache(&self, permission_id: &PermissionId) {
        self.flush_namespace().await;
        debug!(
            permission_id = %permission_id.as_str(),
            "Permission definition changed, cache namespace flushed"
        );
    }

    /// Menu definition changes flush the namespace for the same reason.
    pub async fn invalidate_menu_cache(&self, menu_id: &MenuId) {
        self.flush_namespace().await;
        debug!(menu_id = %menu_id.as_str(), "Menu definition changed, cache namespace flushed");
    }

    /// Admin flush of every key under the namespace.
    pub async fn invalidate_all(&self) {
        self.flush_namespace().await;
        debug!("Cache namespace flushed");
    }

    // ==================== Observability ====================

    /// Round-trip liveness probe against the backend.
    pub async fn is_healthy(&self) -> bool {
        let key = self.keys.health_probe();
        let probe = async {
            self.backend.ping().await?;
            self.backend.set(&key, "ok", HEALTH_PROBE_TTL).await?;
            self.backend.get(&key).await
        };
        match timeout(self.operation_timeout, probe).await {
            Ok(Ok(value)) => value.as_deref() == Some("ok"),
            Ok(Err(e)) => {
                warn!(error = %e, "Cache health check failed");
                false
            }
            Err(_) => {
                let e = self.timeout_error();
                warn!(error = %e, "Cache health check timed out");
                false
            }
        }
    }

    /// Process-local counters since this instance was created.
    #[must_use]
    pub fn statistics(&self) -> CacheStatistics {
        self.stats.snapshot()
    }
}
