//! Cache-aside composition of the resolver and the permission cache.
//!
//! Reads consult the cache first and fall back to the resolver; a cached
//! positive answer short-circuits, while a cached negative or a miss is
//! always re-verified against the store, so a stale entry can never produce
//! a false "allow". Mutations go to the store first and then invalidate
//! exactly the keys the change can poison; nothing is ever populated on a
//! write path.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, warn};

use crate::{
    cache::{permission_cache::bounded_ttl, CacheStatistics, PermissionCache},
    models::{Menu, MenuId, Permission, PermissionId, PermissionView, Role, RoleId, UserId},
    service::PermissionService,
    Result,
};

fn views_from_keys(keys: &[String]) -> Vec<PermissionView> {
    keys.iter().filter_map(|key| PermissionView::from_key(key)).collect()
}

/// The authorization API consumed by request handlers and admin tooling
#[derive(Clone)]
pub struct CachedPermissionService {
    resolver: Arc<PermissionService>,
    cache: Arc<PermissionCache>,
}

impl std::fmt::Debug for CachedPermissionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedPermissionService").finish()
    }
}

impl CachedPermissionService {
    pub fn new(resolver: Arc<PermissionService>, cache: Arc<PermissionCache>) -> Self {
        Self { resolver, cache }
    }

    // ==================== Read Path ====================

    /// Two-step permission check. A cached `true` is trusted; a cached
    /// `false` is ambiguous between "denied" and "not cached", so the
    /// store is asked to disambiguate. A store-confirmed `true` refreshes
    /// the user's full permission set so the next check for a different
    /// permission is also a hit.
    pub async fn user_has_permission(
        &self,
        user_id: &UserId,
        resource: &str,
        action: &str,
    ) -> Result<bool> {
        if self.cache.user_has_permission(user_id, resource, action).await {
            return Ok(true);
        }
        if !self
            .resolver
            .user_has_permission(user_id, resource, action)
            .await?
        {
            return Ok(false);
        }
        self.refresh_user_permissions(user_id).await;
        Ok(true)
    }

    pub async fn role_has_permission(
        &self,
        role_id: &RoleId,
        resource: &str,
        action: &str,
    ) -> Result<bool> {
        if self.cache.role_has_permission(role_id, resource, action).await {
            return Ok(true);
        }
        if !self
            .resolver
            .role_has_permission(role_id, resource, action)
            .await?
        {
            return Ok(false);
        }
        self.refresh_role_permissions(role_id).await;
        Ok(true)
    }

    /// Effective permissions for a user, cache-aside.
    pub async fn get_user_permissions(&self, user_id: &UserId) -> Result<Vec<PermissionView>> {
        let cached = self.cache.get_user_permissions(user_id).await;
        if !cached.is_empty() {
            debug!(user_id = %user_id.as_str(), "Serving user permissions from cache");
            return Ok(views_from_keys(&cached));
        }
        let permissions = self.resolver.effective_user_permissions(user_id).await?;
        if let Some(ttl) = bounded_ttl(self.cache.user_ttl(), permissions.earliest_expiry) {
            self.cache
                .set_user_permissions(user_id, &permissions.keys, Some(ttl))
                .await;
        }
        Ok(views_from_keys(&permissions.keys))
    }

    pub async fn get_user_roles(&self, user_id: &UserId) -> Result<Vec<String>> {
        let cached = self.cache.get_user_roles(user_id).await;
        if !cached.is_empty() {
            return Ok(cached);
        }
        let roles = self.resolver.user_roles(user_id).await?;
        if let Some(ttl) = bounded_ttl(self.cache.user_ttl(), roles.earliest_expiry) {
            self.cache.set_user_roles(user_id, &roles.names, Some(ttl)).await;
        }
        Ok(roles.names)
    }

    pub async fn get_user_menus(&self, user_id: &UserId) -> Result<Vec<MenuId>> {
        let cached = self.cache.get_user_menus(user_id).await;
        if !cached.is_empty() {
            return Ok(cached);
        }
        let menus = self.resolver.accessible_menus(user_id).await?;
        if let Some(ttl) = bounded_ttl(self.cache.menu_ttl(), menus.earliest_expiry) {
            self.cache.set_user_menus(user_id, &menus.menu_ids, Some(ttl)).await;
        }
        Ok(menus.menu_ids)
    }

    pub async fn get_user_permission_matrix(
        &self,
        user_id: &UserId,
    ) -> Result<HashMap<String, Vec<String>>> {
        let cached = self.cache.get_user_permission_matrix(user_id).await;
        if !cached.is_empty() {
            return Ok(cached);
        }
        let permissions = self.resolver.effective_user_permissions(user_id).await?;
        let matrix = permissions.to_matrix();
        if let Some(ttl) = bounded_ttl(self.cache.user_ttl(), permissions.earliest_expiry) {
            self.cache
                .set_user_permission_matrix(user_id, &matrix, Some(ttl))
                .await;
        }
        Ok(matrix)
    }

    pub async fn get_user_role_matrix(
        &self,
        user_id: &UserId,
    ) -> Result<HashMap<String, Vec<String>>> {
        let cached = self.cache.get_user_role_matrix(user_id).await;
        if !cached.is_empty() {
            return Ok(cached);
        }
        let matrix = self.resolver.user_role_matrix(user_id).await?;
        if let Some(ttl) = bounded_ttl(self.cache.user_ttl(), matrix.earliest_expiry) {
            self.cache
                .set_user_role_matrix(user_id, &matrix.by_role, Some(ttl))
                .await;
        }
        Ok(matrix.by_role)
    }

    pub async fn get_role_permissions(&self, role_id: &RoleId) -> Result<Vec<PermissionView>> {
        let cached = self.cache.get_role_permissions(role_id).await;
        if !cached.is_empty() {
            return Ok(views_from_keys(&cached));
        }
        let permissions = self.resolver.effective_role_permissions(role_id).await?;
        if let Some(ttl) = bounded_ttl(self.cache.role_ttl(), permissions.earliest_expiry) {
            self.cache
                .set_role_permissions(role_id, &permissions.keys, Some(ttl))
                .await;
        }
        Ok(views_from_keys(&permissions.keys))
    }

    /// Read-through lookup for several users at once. Every input id is
    /// present in the result unless its resolution failed; failures are
    /// logged and omitted without aborting the rest of the batch.
    pub async fn get_multiple_user_permissions(
        &self,
        user_ids: &[UserId],
    ) -> HashMap<UserId, Vec<PermissionView>> {
        let lookups = user_ids.iter().map(|user_id| async move {
            match self.get_user_permissions(user_id).await {
                Ok(views) => Some((user_id.clone(), views)),
                Err(e) => {
                    warn!(user_id = %user_id.as_str(), error = %e, "Skipping user in bulk permission lookup");
                    None
                }
            }
        });
        join_all(lookups).await.into_iter().flatten().collect()
    }

    // Post-decision population; failures only cost the next read a miss.
    async fn refresh_user_permissions(&self, user_id: &UserId) {
        match self.resolver.effective_user_permissions(user_id).await {
            Ok(permissions) => {
                if let Some(ttl) = bounded_ttl(self.cache.user_ttl(), permissions.earliest_expiry) {
                    self.cache
                        .set_user_permissions(user_id, &permissions.keys, Some(ttl))
                        .await;
                }
            }
            Err(e) => {
                warn!(user_id = %user_id.as_str(), error = %e, "Could not refresh cached user permissions");
            }
        }
    }

    async fn refresh_role_permissions(&self, role_id: &RoleId) {
        match self.resolver.effective_role_permissions(role_id).await {
            Ok(permissions) => {
                if let Some(ttl) = bounded_ttl(self.cache.role_ttl(), permissions.earliest_expiry) {
                    self.cache
                        .set_role_permissions(role_id, &permissions.keys, Some(ttl))
                        .await;
                }
            }
            Err(e) => {
                warn!(role_id = %role_id.as_str(), error = %e, "Could not refresh cached role permissions");
            }
        }
    }

    // ==================== Write Path: User Assignments ====================

    /// Grant a permission directly to a user and drop the user's cached
    /// entries. Invalidation only runs when the store reported a change.
    pub async fn assign_permission_to_user(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
        expires_at: Option<DateTime<Utc>>,
        assigned_by: Option<&UserId>,
    ) -> Result<bool> {
        let changed = self
            .resolver
            .assign_permission_to_user(user_id, permission_id, expires_at, assigned_by)
            .await?;
        if changed {
            self.cache.invalidate_user_cache(user_id).await;
        }
        Ok(changed)
    }

    pub async fn revoke_permission_from_user(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
    ) -> Result<bool> {
        let changed = self
            .resolver
            .revoke_permission_from_user(user_id, permission_id)
            .await?;
        if changed {
            self.cache.invalidate_user_cache(user_id).await;
        }
        Ok(changed)
    }

    pub async fn assign_role_to_user(
        &self,
        user_id: &UserId,
        role_id: &RoleId,
        expires_at: Option<DateTime<Utc>>,
        assigned_by: Option<&UserId>,
    ) -> Result<bool> {
        let changed = self
            .resolver
            .assign_role_to_user(user_id, role_id, expires_at, assigned_by)
            .await?;
        if changed {
            self.cache.invalidate_user_cache(user_id).await;
        }
        Ok(changed)
    }

    pub async fn revoke_role_from_user(
        &self,
        user_id: &UserId,
        role_id: &RoleId,
    ) -> Result<bool> {
        let changed = self.resolver.revoke_role_from_user(user_id, role_id).await?;
        if changed {
            self.cache.invalidate_user_cache(user_id).await;
        }
        Ok(changed)
    }

    // ==================== Write Path: Role Assignments ====================

    /// Role mutations invalidate the role's own key and cascade to every
    /// member, since user-scoped entries embed role-derived data.
    pub async fn assign_permission_to_role(
        &self,
        role_id: &RoleId,
        permission_id: &PermissionId,
        expires_at: Option<DateTime<Utc>>,
        assigned_by: Option<&UserId>,
    ) -> Result<bool> {
        let changed = self
            .resolver
            .assign_permission_to_role(role_id, permission_id, expires_at, assigned_by)
            .await?;
        if changed {
            self.invalidate_role_and_members(role_id).await;
        }
        Ok(changed)
    }

    pub async fn revoke_permission_from_role(
        &self,
        role_id: &RoleId,
        permission_id: &PermissionId,
    ) -> Result<bool> {
        let changed = self
            .resolver
            .revoke_permission_from_role(role_id, permission_id)
            .await?;
        if changed {
            self.invalidate_role_and_members(role_id).await;
        }
        Ok(changed)
    }

    pub async fn assign_menu_to_role(
        &self,
        role_id: &RoleId,
        menu_id: &MenuId,
        expires_at: Option<DateTime<Utc>>,
        assigned_by: Option<&UserId>,
    ) -> Result<bool> {
        let changed = self
            .resolver
            .assign_menu_to_role(role_id, menu_id, expires_at, assigned_by)
            .await?;
        if changed {
            self.invalidate_role_and_members(role_id).await;
        }
        Ok(changed)
    }

    pub async fn revoke_menu_from_role(
        &self,
        role_id: &RoleId,
        menu_id: &MenuId,
    ) -> Result<bool> {
        let changed = self.resolver.revoke_menu_from_role(role_id, menu_id).await?;
        if changed {
            self.invalidate_role_and_members(role_id).await;
        }
        Ok(changed)
    }

    async fn invalidate_role_and_members(&self, role_id: &RoleId) {
        self.cache.invalidate_role_cache(role_id).await;
        match self.resolver.users_with_role(role_id).await {
            Ok(members) => {
                let invalidations = members
                    .iter()
                    .map(|user_id| self.cache.invalidate_user_cache(user_id));
                join_all(invalidations).await;
            }
            Err(e) => {
                // TTL expiry remains the backstop for the members
                warn!(role_id = %role_id.as_str(), error = %e, "Could not enumerate role members for invalidation");
            }
        }
    }

    // ==================== Write Path: Definitions ====================

    /// Definition changes can affect any number of cached principals, so
    /// they flush the whole namespace.
    pub async fn create_permission(
        &self,
        resource: String,
        action: String,
        name: String,
        module: Option<String>,
    ) -> Result<Permission> {
        let permission = self
            .resolver
            .create_permission(resource, action, name, module)
            .await?;
        self.cache.invalidate_permission_cache(&permission.id).await;
        Ok(permission)
    }

    pub async fn update_permission(&self, permission: &Permission) -> Result<bool> {
        let changed = self.resolver.update_permission(permission).await?;
        if changed {
            self.cache.invalidate_permission_cache(&permission.id).await;
        }
        Ok(changed)
    }

    pub async fn delete_permission(&self, permission_id: &PermissionId) -> Result<bool> {
        let deleted = self.resolver.delete_permission(permission_id).await?;
        if deleted {
            self.cache.invalidate_permission_cache(permission_id).await;
        }
        Ok(deleted)
    }

    pub async fn create_role(
        &self,
        name: String,
        description: Option<String>,
        priority: i32,
    ) -> Result<Role> {
        let role = self.resolver.create_role(name, description, priority).await?;
        self.cache.invalidate_role_cache(&role.id).await;
        Ok(role)
    }

    pub async fn update_role(&self, role: &Role) -> Result<bool> {
        let changed = self.resolver.update_role(role).await?;
        if changed {
            self.invalidate_role_and_members(&role.id).await;
        }
        Ok(changed)
    }

    /// Delete a role. Members are snapshotted before the store cascades
    /// their assignment rows away, so their entries can still be dropped
    /// afterwards. System-protected roles are refused by the resolver.
    pub async fn delete_role(&self, role_id: &RoleId) -> Result<bool> {
        let members = match self.resolver.users_with_role(role_id).await {
            Ok(members) => members,
            Err(e) => {
                warn!(role_id = %role_id.as_str(), error = %e, "Could not snapshot role members before delete");
                Vec::new()
            }
        };
        let deleted = self.resolver.delete_role(role_id).await?;
        if deleted {
            self.cache.invalidate_role_cache(role_id).await;
            let invalidations = members
                .iter()
                .map(|user_id| self.cache.invalidate_user_cache(user_id));
            join_all(invalidations).await;
        }
        Ok(deleted)
    }

    pub async fn create_menu(&self, menu: Menu) -> Result<Menu> {
        let menu = self.resolver.create_menu(menu).await?;
        self.cache.invalidate_menu_cache(&menu.id).await;
        Ok(menu)
    }

    pub async fn update_menu(&self, menu: &Menu) -> Result<bool> {
        let changed = self.resolver.update_menu(menu).await?;
        if changed {
            self.cache.invalidate_menu_cache(&menu.id).await;
        }
        Ok(changed)
    }

    pub async fn delete_menu(&self, menu_id: &MenuId) -> Result<bool> {
        let deleted = self.resolver.delete_menu(menu_id).await?;
        if deleted {
            self.cache.invalidate_menu_cache(menu_id).await;
        }
        Ok(deleted)
    }

    // ==================== Cache Administration ====================

    pub async fn warm_up_users(&self, user_ids: &[UserId]) -> usize {
        self.cache.warm_up_users(&self.resolver, user_ids).await
    }

    pub async fn warm_up_roles(&self, role_ids: &[RoleId]) -> usize {
        self.cache.warm_up_roles(&self.resolver, role_ids).await
    }

    pub async fn invalidate_user_cache(&self, user_id: &UserId) {
        self.cache.invalidate_user_cache(user_id).await;
    }

    /// Admin-triggered role invalidation cascades to members, same as the
    /// role write paths.
    pub async fn invalidate_role_cache(&self, role_id: &RoleId) {
        self.invalidate_role_and_members(role_id).await;
    }

    pub async fn invalidate_all_cache(&self) {
        self.cache.invalidate_all().await;
    }

    #[must_use]
    pub fn cache_statistics(&self) -> CacheStatistics {
        self.cache.statistics()
    }

    pub async fn is_cache_healthy(&self) -> bool {
        self.cache.is_healthy().await
    }
}
