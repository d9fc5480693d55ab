use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::{
    models::{
        Menu, MenuId, Permission, PermissionId, Role, RoleId, RoleMenuAssignment,
        RolePermissionAssignment, UserId, UserPermissionGrant, UserRoleAssignment,
    },
    Error, Result,
};

use super::AuthorizationStore;

#[derive(Debug, Clone)]
struct AssignmentRow {
    assigned_at: DateTime<Utc>,
    assigned_by: Option<UserId>,
    expires_at: Option<DateTime<Utc>>,
    is_active: bool,
}

impl AssignmentRow {
    fn effective(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Default)]
struct Inner {
    users: HashSet<UserId>,
    permissions: HashMap<PermissionId, Permission>,
    roles: HashMap<RoleId, Role>,
    menus: HashMap<MenuId, Menu>,
    user_roles: HashMap<(UserId, RoleId), AssignmentRow>,
    user_permissions: HashMap<(UserId, PermissionId), AssignmentRow>,
    role_permissions: HashMap<(RoleId, PermissionId), AssignmentRow>,
    role_menus: HashMap<(RoleId, MenuId), AssignmentRow>,
}

/// In-memory authorization store with the same contract as the Postgres
/// implementation, including cascade-on-definition-delete and
/// `Ok(false)` for assignments referencing missing rows.
///
/// User records are externally owned, so principals are registered with
/// [`MemoryAuthorizationStore::add_user`] before assignments reference
/// them.
#[derive(Clone, Default)]
pub struct MemoryAuthorizationStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryAuthorizationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user_id: UserId) {
        self.inner.write().users.insert(user_id);
    }
}

fn new_row(expires_at: Option<DateTime<Utc>>, assigned_by: Option<&UserId>) -> AssignmentRow {
    AssignmentRow {
        assigned_at: Utc::now(),
        assigned_by: assigned_by.cloned(),
        expires_at,
        is_active: true,
    }
}

#[async_trait]
impl AuthorizationStore for MemoryAuthorizationStore {
    // ========== Permission definitions ==========

    async fn permission_by_id(&self, permission_id: &PermissionId) -> Result<Option<Permission>> {
        Ok(self.inner.read().permissions.get(permission_id).cloned())
    }

    async fn insert_permission(&self, permission: &Permission) -> Result<()> {
        let mut inner = self.inner.write();
        let taken = inner.permissions.values().any(|p| {
            p.resource == permission.resource && p.action == permission.action
        });
        if taken {
            return Err(Error::AlreadyExists(
                "Permission with this resource and action already exists".to_string(),
            ));
        }
        inner
            .permissions
            .insert(permission.id.clone(), permission.clone());
        Ok(())
    }

    async fn update_permission(&self, permission: &Permission) -> Result<bool> {
        let mut inner = self.inner.write();
        let taken = inner.permissions.values().any(|p| {
            p.id != permission.id
                && p.resource == permission.resource
                && p.action == permission.action
        });
        if taken {
            return Err(Error::AlreadyExists(
                "Permission with this resource and action already exists".to_string(),
            ));
        }
        match inner.permissions.get_mut(&permission.id) {
            Some(existing) => {
                existing.resource = permission.resource.clone();
                existing.action = permission.action.clone();
                existing.name = permission.name.clone();
                existing.module = permission.module.clone();
                existing.is_active = permission.is_active;
                existing.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_permission(&self, permission_id: &PermissionId) -> Result<bool> {
        let mut inner = self.inner.write();
        let existed = inner.permissions.remove(permission_id).is_some();
        if existed {
            inner.user_permissions.retain(|(_, p), _| p != permission_id);
            inner.role_permissions.retain(|(_, p), _| p != permission_id);
        }
        Ok(existed)
    }

    // ========== Role definitions ==========

    async fn role_by_id(&self, role_id: &RoleId) -> Result<Option<Role>> {
        Ok(self.inner.read().roles.get(role_id).cloned())
    }

    async fn insert_role(&self, role: &Role) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.roles.values().any(|r| r.name == role.name) {
            return Err(Error::AlreadyExists("Role name already taken".to_string()));
        }
        inner.roles.insert(role.id.clone(), role.clone());
        Ok(())
    }

    async fn update_role(&self, role: &Role) -> Result<bool> {
        let mut inner = self.inner.write();
        if inner
            .roles
            .values()
            .any(|r| r.id != role.id && r.name == role.name)
        {
            return Err(Error::AlreadyExists("Role name already taken".to_string()));
        }
        match inner.roles.get_mut(&role.id) {
            Some(existing) => {
                existing.name = role.name.clone();
                existing.description = role.description.clone();
                existing.priority = role.priority;
                existing.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_role(&self, role_id: &RoleId) -> Result<bool> {
        let mut inner = self.inner.write();
        let existed = inner.roles.remove(role_id).is_some();
        if existed {
            inner.user_roles.retain(|(_, r), _| r != role_id);
            inner.role_permissions.retain(|(r, _), _| r != role_id);
            inner.role_menus.retain(|(r, _), _| r != role_id);
        }
        Ok(existed)
    }

    // ========== Menu definitions ==========

    async fn menu_by_id(&self, menu_id: &MenuId) -> Result<Option<Menu>> {
        Ok(self.inner.read().menus.get(menu_id).cloned())
    }

    async fn insert_menu(&self, menu: &Menu) -> Result<()> {
        self.inner.write().menus.insert(menu.id.clone(), menu.clone());
        Ok(())
    }

    async fn update_menu(&self, menu: &Menu) -> Result<bool> {
        let mut inner = self.inner.write();
        match inner.menus.get_mut(&menu.id) {
            Some(existing) => {
                existing.name = menu.name.clone();
                existing.path = menu.path.clone();
                existing.icon = menu.icon.clone();
                existing.parent_id = menu.parent_id.clone();
                existing.required_permission = menu.required_permission.clone();
                existing.sort_order = menu.sort_order;
                existing.is_active = menu.is_active;
                existing.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_menu(&self, menu_id: &MenuId) -> Result<bool> {
        let mut inner = self.inner.write();
        let existed = inner.menus.remove(menu_id).is_some();
        if existed {
            inner.role_menus.retain(|(_, m), _| m != menu_id);
        }
        Ok(existed)
    }

    // ========== Assignment reads ==========

    async fn user_role_assignments(&self, user_id: &UserId) -> Result<Vec<UserRoleAssignment>> {
        let inner = self.inner.read();
        let rows = inner
            .user_roles
            .iter()
            .filter(|((u, _), _)| u == user_id)
            .filter_map(|((u, r), row)| {
                let role = inner.roles.get(r)?;
                Some(UserRoleAssignment {
                    user_id: u.clone(),
                    role_id: r.clone(),
                    role_name: role.name.clone(),
                    assigned_at: row.assigned_at,
                    assigned_by: row.assigned_by.clone(),
                    expires_at: row.expires_at,
                    is_active: row.is_active,
                })
            })
            .collect();
        Ok(rows)
    }

    async fn user_permission_grants(&self, user_id: &UserId) -> Result<Vec<UserPermissionGrant>> {
        let inner = self.inner.read();
        let rows = inner
            .user_permissions
            .iter()
            .filter(|((u, _), _)| u == user_id)
            .filter_map(|((u, p), row)| {
                let permission = inner.permissions.get(p)?;
                Some(UserPermissionGrant {
                    user_id: u.clone(),
                    permission_id: p.clone(),
                    resource: permission.resource.clone(),
                    action: permission.action.clone(),
                    permission_is_active: permission.is_active,
                    assigned_at: row.assigned_at,
                    assigned_by: row.assigned_by.clone(),
                    expires_at: row.expires_at,
                    is_active: row.is_active,
                })
            })
            .collect();
        Ok(rows)
    }

    async fn role_permission_assignments(
        &self,
        role_id: &RoleId,
    ) -> Result<Vec<RolePermissionAssignment>> {
        let inner = self.inner.read();
        let rows = inner
            .role_permissions
            .iter()
            .filter(|((r, _), _)| r == role_id)
            .filter_map(|((r, p), row)| {
                let permission = inner.permissions.get(p)?;
                Some(RolePermissionAssignment {
                    role_id: r.clone(),
                    permission_id: p.clone(),
                    resource: permission.resource.clone(),
                    action: permission.action.clone(),
                    permission_is_active: permission.is_active,
                    assigned_at: row.assigned_at,
                    assigned_by: row.assigned_by.clone(),
                    expires_at: row.expires_at,
                    is_active: row.is_active,
                })
            })
            .collect();
        Ok(rows)
    }

    async fn role_menu_assignments(&self, role_id: &RoleId) -> Result<Vec<RoleMenuAssignment>> {
        let inner = self.inner.read();
        let rows = inner
            .role_menus
            .iter()
            .filter(|((r, _), _)| r == role_id)
            .filter_map(|((r, m), row)| {
                let menu = inner.menus.get(m)?;
                Some(RoleMenuAssignment {
                    role_id: r.clone(),
                    menu_id: m.clone(),
                    menu_is_active: menu.is_active,
                    required_permission: menu.required_permission.clone(),
                    assigned_at: row.assigned_at,
                    assigned_by: row.assigned_by.clone(),
                    expires_at: row.expires_at,
                    is_active: row.is_active,
                })
            })
            .collect();
        Ok(rows)
    }

    async fn users_with_role(&self, role_id: &RoleId) -> Result<Vec<UserId>> {
        let inner = self.inner.read();
        let mut users: Vec<UserId> = inner
            .user_roles
            .keys()
            .filter(|(_, r)| r == role_id)
            .map(|(u, _)| u.clone())
            .collect();
        users.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        users.dedup();
        Ok(users)
    }

    async fn user_permission_exists(
        &self,
        user_id: &UserId,
        resource: &str,
        action: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let inner = self.inner.read();

        let matches = |permission_id: &PermissionId| {
            inner.permissions.get(permission_id).is_some_and(|p| {
                p.is_active && p.resource == resource && p.action == action
            })
        };

        let direct = inner
            .user_permissions
            .iter()
            .any(|((u, p), row)| u == user_id && row.effective(now) && matches(p));
        if direct {
            return Ok(true);
        }

        let via_role = inner
            .user_roles
            .iter()
            .filter(|((u, _), row)| u == user_id && row.effective(now))
            .any(|((_, role_id), _)| {
                inner
                    .role_permissions
                    .iter()
                    .any(|((r, p), row)| r == role_id && row.effective(now) && matches(p))
            });
        Ok(via_role)
    }

    // ========== Assignment mutations ==========

    async fn upsert_user_role(
        &self,
        user_id: &UserId,
        role_id: &RoleId,
        expires_at: Option<DateTime<Utc>>,
        assigned_by: Option<&UserId>,
    ) -> Result<bool> {
        let mut inner = self.inner.write();
        if !inner.users.contains(user_id) || !inner.roles.contains_key(role_id) {
            return Ok(false);
        }
        inner.user_roles.insert(
            (user_id.clone(), role_id.clone()),
            new_row(expires_at, assigned_by),
        );
        Ok(true)
    }

    async fn delete_user_role(&self, user_id: &UserId, role_id: &RoleId) -> Result<bool> {
        Ok(self
            .inner
            .write()
            .user_roles
            .remove(&(user_id.clone(), role_id.clone()))
            .is_some())
    }

    async fn upsert_user_permission(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
        expires_at: Option<DateTime<Utc>>,
        assigned_by: Option<&UserId>,
    ) -> Result<bool> {
        let mut inner = self.inner.write();
        if !inner.users.contains(user_id) || !inner.permissions.contains_key(permission_id) {
            return Ok(false);
        }
        inner.user_permissions.insert(
            (user_id.clone(), permission_id.clone()),
            new_row(expires_at, assigned_by),
        );
        Ok(true)
    }

    async fn delete_user_permission(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
    ) -> Result<bool> {
        Ok(self
            .inner
            .write()
            .user_permissions
            .remove(&(user_id.clone(), permission_id.clone()))
            .is_some())
    }

    async fn upsert_role_permission(
        &self,
        role_id: &RoleId,
        permission_id: &PermissionId,
        expires_at: Option<DateTime<Utc>>,
        assigned_by: Option<&UserId>,
    ) -> Result<bool> {
        let mut inner = self.inner.write();
        if !inner.roles.contains_key(role_id) || !inner.permissions.contains_key(permission_id) {
            return Ok(false);
        }
        inner.role_permissions.insert(
            (role_id.clone(), permission_id.clone()),
            new_row(expires_at, assigned_by),
        );
        Ok(true)
    }

    async fn delete_role_permission(
        &self,
        role_id: &RoleId,
        permission_id: &PermissionId,
    ) -> Result<bool> {
        Ok(self
            .inner
            .write()
            .role_permissions
            .remove(&(role_id.clone(), permission_id.clone()))
            .is_some())
    }

    async fn upsert_role_menu(
        &self,
        role_id: &RoleId,
        menu_id: &MenuId,
        expires_at: Option<DateTime<Utc>>,
        assigned_by: Option<&UserId>,
    ) -> Result<bool> {
        let mut inner = self.inner.write();
        if !inner.roles.contains_key(role_id) || !inner.menus.contains_key(menu_id) {
            return Ok(false);
        }
        inner.role_menus.insert(
            (role_id.clone(), menu_id.clone()),
            new_row(expires_at, assigned_by),
        );
        Ok(true)
    }

    async fn delete_role_menu(&self, role_id: &RoleId, menu_id: &MenuId) -> Result<bool> {
        Ok(self
            .inner
            .write()
            .role_menus
            .remove(&(role_id.clone(), menu_id.clone()))
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn perm(resource: &str, action: &str) -> Permission {
        Permission::new(
            resource.to_string(),
            action.to_string(),
            format!("{resource} {action}"),
            None,
        )
    }

    #[tokio::test]
    async fn test_duplicate_permission_rejected() {
        let store = MemoryAuthorizationStore::new();
        store.insert_permission(&perm("courses", "update")).await.unwrap();
        let err = store
            .insert_permission(&perm("courses", "update"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_assignment_requires_existing_rows() {
        let store = MemoryAuthorizationStore::new();
        let user = UserId::new();
        let role = Role::new("editor".to_string(), None, 10);

        // Neither side exists yet
        assert!(!store
            .upsert_user_role(&user, &role.id, None, None)
            .await
            .unwrap());

        store.insert_role(&role).await.unwrap();
        assert!(!store
            .upsert_user_role(&user, &role.id, None, None)
            .await
            .unwrap());

        store.add_user(user.clone());
        assert!(store
            .upsert_user_role(&user, &role.id, None, None)
            .await
            .unwrap());
        assert_eq!(store.users_with_role(&role.id).await.unwrap(), vec![user]);
    }

    #[tokio::test]
    async fn test_delete_role_cascades_assignments() {
        let store = MemoryAuthorizationStore::new();
        let user = UserId::new();
        store.add_user(user.clone());
        let role = Role::new("editor".to_string(), None, 10);
        store.insert_role(&role).await.unwrap();
        let p = perm("courses", "update");
        store.insert_permission(&p).await.unwrap();
        store.upsert_user_role(&user, &role.id, None, None).await.unwrap();
        store
            .upsert_role_permission(&role.id, &p.id, None, None)
            .await
            .unwrap();

        assert!(store.delete_role(&role.id).await.unwrap());
        assert!(store.user_role_assignments(&user).await.unwrap().is_empty());
        assert!(store
            .role_permission_assignments(&role.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_user_permission_exists_applies_filters() {
        let store = MemoryAuthorizationStore::new();
        let user = UserId::new();
        store.add_user(user.clone());
        let p = perm("reports", "read");
        store.insert_permission(&p).await.unwrap();
        let now = Utc::now();

        // Expired direct grant does not count
        store
            .upsert_user_permission(&user, &p.id, Some(now - Duration::seconds(1)), None)
            .await
            .unwrap();
        assert!(!store
            .user_permission_exists(&user, "reports", "read", now)
            .await
            .unwrap());

        // Live grant through a role does
        let role = Role::new("analyst".to_string(), None, 5);
        store.insert_role(&role).await.unwrap();
        store.upsert_user_role(&user, &role.id, None, None).await.unwrap();
        store
            .upsert_role_permission(&role.id, &p.id, None, None)
            .await
            .unwrap();
        assert!(store
            .user_permission_exists(&user, "reports", "read", now)
            .await
            .unwrap());

        // Deactivating the definition hides it everywhere
        let mut inactive = p.clone();
        inactive.is_active = false;
        assert!(store.update_permission(&inactive).await.unwrap());
        assert!(!store
            .user_permission_exists(&user, "reports", "read", now)
            .await
            .unwrap());
    }
}
