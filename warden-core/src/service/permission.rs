//! Ground-truth permission resolution against the authorization store.
//!
//! Every read here goes to the store; nothing is cached. The cache-aware
//! composition lives in `CachedPermissionService`.

use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use chrono::{DateTime, Utc};

use crate::{
    models::{permission_key, Menu, MenuId, Permission, PermissionId, Role, RoleId, UserId},
    repository::AuthorizationStore,
    Error, Result,
};

/// Resolved `"resource:action"` set for a principal.
///
/// `earliest_expiry` is the minimum `expires_at` over every assignment row
/// that contributed, so cache entries built from this set can be bounded to
/// never outlive a contributing grant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectivePermissions {
    /// Sorted, deduplicated permission keys.
    pub keys: Vec<String>,
    pub earliest_expiry: Option<DateTime<Utc>>,
}

impl EffectivePermissions {
    #[must_use]
    pub fn contains(&self, resource: &str, action: &str) -> bool {
        self.keys.binary_search(&permission_key(resource, action)).is_ok()
    }

    /// Group the flat set by resource for UI consumption.
    #[must_use]
    pub fn to_matrix(&self) -> HashMap<String, Vec<String>> {
        let mut matrix: HashMap<String, Vec<String>> = HashMap::new();
        for key in &self.keys {
            if let Some((resource, action)) = key.split_once(':') {
                matrix
                    .entry(resource.to_string())
                    .or_default()
                    .push(action.to_string());
            }
        }
        matrix
    }
}

/// Names of a user's effective role memberships.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectiveRoles {
    /// Sorted, deduplicated role names.
    pub names: Vec<String>,
    pub earliest_expiry: Option<DateTime<Utc>>,
}

/// Menus reachable through a user's effective memberships.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectiveMenus {
    /// Deduplicated, sorted by id.
    pub menu_ids: Vec<MenuId>,
    pub earliest_expiry: Option<DateTime<Utc>>,
}

/// Role name → that role's effective permission keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectiveRoleMatrix {
    pub by_role: HashMap<String, Vec<String>>,
    pub earliest_expiry: Option<DateTime<Utc>>,
}

fn earlier(
    current: Option<DateTime<Utc>>,
    candidate: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    match (current, candidate) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Permission resolution service
#[derive(Clone)]
pub struct PermissionService {
    store: Arc<dyn AuthorizationStore>,
}

impl std::fmt::Debug for PermissionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionService").finish()
    }
}

impl PermissionService {
    pub fn new(store: Arc<dyn AuthorizationStore>) -> Self {
        Self { store }
    }

    // ==================== Resolution Reads ====================

    /// Union of role-derived permissions and direct grants, with expired
    /// or deactivated rows and inactive definitions filtered out.
    pub async fn effective_user_permissions(
        &self,
        user_id: &UserId,
    ) -> Result<EffectivePermissions> {
        let now = Utc::now();
        let mut keys = BTreeSet::new();
        let mut earliest = None;

        let memberships = self.store.user_role_assignments(user_id).await?;
        for membership in memberships.iter().filter(|m| m.is_effective(now)) {
            let rows = self
                .store
                .role_permission_assignments(&membership.role_id)
                .await?;
            let mut contributed = false;
            for row in rows
                .iter()
                .filter(|r| r.is_effective(now) && r.permission_is_active)
            {
                keys.insert(permission_key(&row.resource, &row.action));
                earliest = earlier(earliest, row.expires_at);
                contributed = true;
            }
            // The membership's own expiry caps everything it contributed
            if contributed {
                earliest = earlier(earliest, membership.expires_at);
            }
        }

        let grants = self.store.user_permission_grants(user_id).await?;
        for grant in grants
            .iter()
            .filter(|g| g.is_effective(now) && g.permission_is_active)
        {
            keys.insert(permission_key(&grant.resource, &grant.action));
            earliest = earlier(earliest, grant.expires_at);
        }

        Ok(EffectivePermissions {
            keys: keys.into_iter().collect(),
            earliest_expiry: earliest,
        })
    }

    /// Targeted existence check, pushed down to the store as a single query.
    pub async fn user_has_permission(
        &self,
        user_id: &UserId,
        resource: &str,
        action: &str,
    ) -> Result<bool> {
        self.store
            .user_permission_exists(user_id, resource, action, Utc::now())
            .await
    }

    pub async fn effective_role_permissions(
        &self,
        role_id: &RoleId,
    ) -> Result<EffectivePermissions> {
        let now = Utc::now();
        let rows = self.store.role_permission_assignments(role_id).await?;
        let mut keys = BTreeSet::new();
        let mut earliest = None;
        for row in rows
            .iter()
            .filter(|r| r.is_effective(now) && r.permission_is_active)
        {
            keys.insert(permission_key(&row.resource, &row.action));
            earliest = earlier(earliest, row.expires_at);
        }
        Ok(EffectivePermissions {
            keys: keys.into_iter().collect(),
            earliest_expiry: earliest,
        })
    }

    pub async fn role_has_permission(
        &self,
        role_id: &RoleId,
        resource: &str,
        action: &str,
    ) -> Result<bool> {
        Ok(self
            .effective_role_permissions(role_id)
            .await?
            .contains(resource, action))
    }

    /// Names of the user's effective role memberships.
    pub async fn user_roles(&self, user_id: &UserId) -> Result<EffectiveRoles> {
        let now = Utc::now();
        let memberships = self.store.user_role_assignments(user_id).await?;
        let mut names = BTreeSet::new();
        let mut earliest = None;
        for membership in memberships.iter().filter(|m| m.is_effective(now)) {
            names.insert(membership.role_name.clone());
            earliest = earlier(earliest, membership.expires_at);
        }
        Ok(EffectiveRoles {
            names: names.into_iter().collect(),
            earliest_expiry: earliest,
        })
    }

    /// Menus the user can see: reachable through an effective membership,
    /// menu row effective, menu definition active, and the menu's
    /// `required_permission` (when set) present in the user's effective
    /// permission set.
    pub async fn accessible_menus(&self, user_id: &UserId) -> Result<EffectiveMenus> {
        let now = Utc::now();
        let permissions = self.effective_user_permissions(user_id).await?;
        let memberships = self.store.user_role_assignments(user_id).await?;

        let mut menu_ids: Vec<MenuId> = Vec::new();
        let mut earliest = None;
        let mut permission_gated = false;

        for membership in memberships.iter().filter(|m| m.is_effective(now)) {
            let rows = self.store.role_menu_assignments(&membership.role_id).await?;
            let mut contributed = false;
            for row in rows
                .iter()
                .filter(|r| r.is_effective(now) && r.menu_is_active)
            {
                if let Some(required) = &row.required_permission {
                    if permissions.keys.binary_search(required).is_err() {
                        continue;
                    }
                    permission_gated = true;
                }
                menu_ids.push(row.menu_id.clone());
                earliest = earlier(earliest, row.expires_at);
                contributed = true;
            }
            if contributed {
                earliest = earlier(earliest, membership.expires_at);
            }
        }

        // A gating permission lapsing revokes menu access too
        if permission_gated {
            earliest = earlier(earliest, permissions.earliest_expiry);
        }

        menu_ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        menu_ids.dedup();
        Ok(EffectiveMenus {
            menu_ids,
            earliest_expiry: earliest,
        })
    }

    /// Effective set grouped by resource.
    pub async fn user_permission_matrix(
        &self,
        user_id: &UserId,
    ) -> Result<HashMap<String, Vec<String>>> {
        Ok(self.effective_user_permissions(user_id).await?.to_matrix())
    }

    /// Role name → effective permission keys, for effective memberships.
    pub async fn user_role_matrix(&self, user_id: &UserId) -> Result<EffectiveRoleMatrix> {
        let now = Utc::now();
        let memberships = self.store.user_role_assignments(user_id).await?;
        let mut by_role = HashMap::new();
        let mut earliest = None;
        for membership in memberships.iter().filter(|m| m.is_effective(now)) {
            let permissions = self.effective_role_permissions(&membership.role_id).await?;
            earliest = earlier(earliest, membership.expires_at);
            earliest = earlier(earliest, permissions.earliest_expiry);
            by_role.insert(membership.role_name.clone(), permissions.keys);
        }
        Ok(EffectiveRoleMatrix {
            by_role,
            earliest_expiry: earliest,
        })
    }

    /// Users holding any assignment row for the role, for invalidation
    /// fan-out.
    pub async fn users_with_role(&self, role_id: &RoleId) -> Result<Vec<UserId>> {
        self.store.users_with_role(role_id).await
    }

    // ==================== Assignment Mutations ====================

    /// Grants a permission directly to a user. Returns false when either
    /// side does not exist.
    pub async fn assign_permission_to_user(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
        expires_at: Option<DateTime<Utc>>,
        assigned_by: Option<&UserId>,
    ) -> Result<bool> {
        self.store
            .upsert_user_permission(user_id, permission_id, expires_at, assigned_by)
            .await
    }

    pub async fn revoke_permission_from_user(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
    ) -> Result<bool> {
        self.store.delete_user_permission(user_id, permission_id).await
    }

    pub async fn assign_role_to_user(
        &self,
        user_id: &UserId,
        role_id: &RoleId,
        expires_at: Option<DateTime<Utc>>,
        assigned_by: Option<&UserId>,
    ) -> Result<bool> {
        self.store
            .upsert_user_role(user_id, role_id, expires_at, assigned_by)
            .await
    }

    pub async fn revoke_role_from_user(&self, user_id: &UserId, role_id: &RoleId) -> Result<bool> {
        self.store.delete_user_role(user_id, role_id).await
    }

    pub async fn assign_permission_to_role(
        &self,
        role_id: &RoleId,
        permission_id: &PermissionId,
        expires_at: Option<DateTime<Utc>>,
        assigned_by: Option<&UserId>,
    ) -> Result<bool> {
        self.store
            .upsert_role_permission(role_id, permission_id, expires_at, assigned_by)
            .await
    }

    pub async fn revoke_permission_from_role(
        &self,
        role_id: &RoleId,
        permission_id: &PermissionId,
    ) -> Result<bool> {
        self.store.delete_role_permission(role_id, permission_id).await
    }

    pub async fn assign_menu_to_role(
        &self,
        role_id: &RoleId,
        menu_id: &MenuId,
        expires_at: Option<DateTime<Utc>>,
        assigned_by: Option<&UserId>,
    ) -> Result<bool> {
        self.store
            .upsert_role_menu(role_id, menu_id, expires_at, assigned_by)
            .await
    }

    pub async fn revoke_menu_from_role(&self, role_id: &RoleId, menu_id: &MenuId) -> Result<bool> {
        self.store.delete_role_menu(role_id, menu_id).await
    }

    // ==================== Definition Mutations ====================

    /// Create a new permission definition
    pub async fn create_permission(
        &self,
        resource: String,
        action: String,
        name: String,
        module: Option<String>,
    ) -> Result<Permission> {
        if resource.is_empty() || action.is_empty() {
            return Err(Error::InvalidInput(
                "Permission resource and action cannot be empty".to_string(),
            ));
        }
        let permission = Permission::new(resource, action, name, module);
        self.store.insert_permission(&permission).await?;
        Ok(permission)
    }

    pub async fn update_permission(&self, permission: &Permission) -> Result<bool> {
        self.store.update_permission(permission).await
    }

    pub async fn delete_permission(&self, permission_id: &PermissionId) -> Result<bool> {
        self.store.delete_permission(permission_id).await
    }

    /// Create a new role
    pub async fn create_role(
        &self,
        name: String,
        description: Option<String>,
        priority: i32,
    ) -> Result<Role> {
        if name.is_empty() {
            return Err(Error::InvalidInput("Role name cannot be empty".to_string()));
        }
        let role = Role::new(name, description, priority);
        self.store.insert_role(&role).await?;
        Ok(role)
    }

    pub async fn update_role(&self, role: &Role) -> Result<bool> {
        self.store.update_role(role).await
    }

    /// Delete a role. System-protected roles are refused before the store
    /// is touched; a missing role is "nothing to do", not an error.
    pub async fn delete_role(&self, role_id: &RoleId) -> Result<bool> {
        let Some(role) = self.store.role_by_id(role_id).await? else {
            return Ok(false);
        };
        if role.is_system {
            return Err(Error::Authorization(format!(
                "System role '{}' cannot be deleted",
                role.name
            )));
        }
        self.store.delete_role(role_id).await
    }

    /// Create a new menu
    pub async fn create_menu(&self, menu: Menu) -> Result<Menu> {
        self.store.insert_menu(&menu).await?;
        Ok(menu)
    }

    pub async fn update_menu(&self, menu: &Menu) -> Result<bool> {
        self.store.update_menu(menu).await
    }

    pub async fn delete_menu(&self, menu_id: &MenuId) -> Result<bool> {
        self.store.delete_menu(menu_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryAuthorizationStore;
    use crate::test_helpers::{MenuFixture, PermissionFixture, RoleFixture};
    use chrono::Duration;

    fn perm(resource: &str, action: &str) -> Permission {
        PermissionFixture::new(resource, action).build()
    }

    fn service_with_store() -> (PermissionService, MemoryAuthorizationStore) {
        let store = MemoryAuthorizationStore::new();
        let service = PermissionService::new(Arc::new(store.clone()));
        (service, store)
    }

    #[tokio::test]
    async fn test_effective_permissions_union_roles_and_grants() {
        let (service, store) = service_with_store();
        let user = UserId::new();
        store.add_user(user.clone());

        let read = perm("courses", "read");
        let update = perm("courses", "update");
        let export = perm("reports", "export");
        for p in [&read, &update, &export] {
            store.insert_permission(p).await.unwrap();
        }

        let editor = RoleFixture::new("editor").build();
        store.insert_role(&editor).await.unwrap();
        store.upsert_user_role(&user, &editor.id, None, None).await.unwrap();
        store
            .upsert_role_permission(&editor.id, &read.id, None, None)
            .await
            .unwrap();
        store
            .upsert_role_permission(&editor.id, &update.id, None, None)
            .await
            .unwrap();
        // Direct grant overlapping with a role grant must not duplicate
        store
            .upsert_user_permission(&user, &update.id, None, None)
            .await
            .unwrap();
        store
            .upsert_user_permission(&user, &export.id, None, None)
            .await
            .unwrap();

        let effective = service.effective_user_permissions(&user).await.unwrap();
        assert_eq!(
            effective.keys,
            vec!["courses:read", "courses:update", "reports:export"]
        );
        assert!(effective.contains("reports", "export"));
        assert!(!effective.contains("reports", "delete"));
        assert_eq!(effective.earliest_expiry, None);
    }

    #[tokio::test]
    async fn test_expired_and_inactive_rows_are_absent() {
        let (service, store) = service_with_store();
        let user = UserId::new();
        store.add_user(user.clone());

        let expired = perm("reports", "export");
        let inactive = perm("reports", "delete");
        store.insert_permission(&expired).await.unwrap();
        store.insert_permission(&inactive).await.unwrap();

        store
            .upsert_user_permission(
                &user,
                &expired.id,
                Some(Utc::now() - Duration::seconds(5)),
                None,
            )
            .await
            .unwrap();
        store
            .upsert_user_permission(&user, &inactive.id, None, None)
            .await
            .unwrap();
        let mut definition = inactive.clone();
        definition.is_active = false;
        store.update_permission(&definition).await.unwrap();

        let effective = service.effective_user_permissions(&user).await.unwrap();
        assert!(effective.keys.is_empty());
        assert!(!service
            .user_has_permission(&user, "reports", "export")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_expired_membership_drops_role_permissions() {
        let (service, store) = service_with_store();
        let user = UserId::new();
        store.add_user(user.clone());
        let p = perm("courses", "update");
        store.insert_permission(&p).await.unwrap();
        let editor = RoleFixture::new("editor").build();
        store.insert_role(&editor).await.unwrap();
        store
            .upsert_role_permission(&editor.id, &p.id, None, None)
            .await
            .unwrap();
        store
            .upsert_user_role(
                &user,
                &editor.id,
                Some(Utc::now() - Duration::seconds(1)),
                None,
            )
            .await
            .unwrap();

        let effective = service.effective_user_permissions(&user).await.unwrap();
        assert!(effective.keys.is_empty());
        let roles = service.user_roles(&user).await.unwrap();
        assert!(roles.names.is_empty());
    }

    #[tokio::test]
    async fn test_earliest_expiry_is_minimum_over_contributors() {
        let (service, store) = service_with_store();
        let user = UserId::new();
        store.add_user(user.clone());
        let a = perm("a", "x");
        let b = perm("b", "y");
        store.insert_permission(&a).await.unwrap();
        store.insert_permission(&b).await.unwrap();

        let soon = Utc::now() + Duration::seconds(30);
        let later = Utc::now() + Duration::seconds(3600);
        store
            .upsert_user_permission(&user, &a.id, Some(later), None)
            .await
            .unwrap();
        store
            .upsert_user_permission(&user, &b.id, Some(soon), None)
            .await
            .unwrap();

        let effective = service.effective_user_permissions(&user).await.unwrap();
        assert_eq!(effective.earliest_expiry, Some(soon));

        // A permanent grant alongside still reports the bounded one
        let c = perm("c", "z");
        store.insert_permission(&c).await.unwrap();
        store.upsert_user_permission(&user, &c.id, None, None).await.unwrap();
        let effective = service.effective_user_permissions(&user).await.unwrap();
        assert_eq!(effective.earliest_expiry, Some(soon));
    }

    #[tokio::test]
    async fn test_membership_expiry_caps_role_derived_permissions() {
        let (service, store) = service_with_store();
        let user = UserId::new();
        store.add_user(user.clone());
        let p = perm("courses", "update");
        store.insert_permission(&p).await.unwrap();
        let editor = RoleFixture::new("editor").build();
        store.insert_role(&editor).await.unwrap();
        store
            .upsert_role_permission(&editor.id, &p.id, None, None)
            .await
            .unwrap();

        let membership_end = Utc::now() + Duration::seconds(60);
        store
            .upsert_user_role(&user, &editor.id, Some(membership_end), None)
            .await
            .unwrap();

        let effective = service.effective_user_permissions(&user).await.unwrap();
        assert_eq!(effective.keys, vec!["courses:update"]);
        assert_eq!(effective.earliest_expiry, Some(membership_end));
    }

    #[tokio::test]
    async fn test_permission_matrix_groups_by_resource() {
        let (service, store) = service_with_store();
        let user = UserId::new();
        store.add_user(user.clone());
        for (r, a) in [("courses", "read"), ("courses", "update"), ("reports", "export")] {
            let p = perm(r, a);
            store.insert_permission(&p).await.unwrap();
            store.upsert_user_permission(&user, &p.id, None, None).await.unwrap();
        }

        let matrix = service.user_permission_matrix(&user).await.unwrap();
        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix["courses"], vec!["read", "update"]);
        assert_eq!(matrix["reports"], vec!["export"]);
    }

    #[tokio::test]
    async fn test_role_matrix_lists_effective_memberships_only() {
        let (service, store) = service_with_store();
        let user = UserId::new();
        store.add_user(user.clone());
        let p = perm("courses", "update");
        store.insert_permission(&p).await.unwrap();

        let editor = RoleFixture::new("editor").build();
        let stale = RoleFixture::new("stale").with_priority(1).build();
        store.insert_role(&editor).await.unwrap();
        store.insert_role(&stale).await.unwrap();
        store
            .upsert_role_permission(&editor.id, &p.id, None, None)
            .await
            .unwrap();
        store.upsert_user_role(&user, &editor.id, None, None).await.unwrap();
        store
            .upsert_user_role(&user, &stale.id, Some(Utc::now() - Duration::seconds(1)), None)
            .await
            .unwrap();

        let matrix = service.user_role_matrix(&user).await.unwrap();
        assert_eq!(matrix.by_role.len(), 1);
        assert_eq!(matrix.by_role["editor"], vec!["courses:update"]);
    }

    #[tokio::test]
    async fn test_accessible_menus_gated_by_required_permission() {
        let (service, store) = service_with_store();
        let user = UserId::new();
        store.add_user(user.clone());

        let p = perm("courses", "read");
        store.insert_permission(&p).await.unwrap();
        let editor = RoleFixture::new("editor").build();
        store.insert_role(&editor).await.unwrap();
        store.upsert_user_role(&user, &editor.id, None, None).await.unwrap();

        let open = MenuFixture::new("Dashboard").with_sort_order(1).build();
        let gated = MenuFixture::new("Courses")
            .with_sort_order(2)
            .requiring("courses:read")
            .build();
        let locked = MenuFixture::new("Admin")
            .with_sort_order(3)
            .requiring("admin:manage")
            .build();
        for m in [&open, &gated, &locked] {
            store.insert_menu(m).await.unwrap();
            store.upsert_role_menu(&editor.id, &m.id, None, None).await.unwrap();
        }

        // Without the gating permission only the open menu shows
        let menus = service.accessible_menus(&user).await.unwrap();
        assert_eq!(menus.menu_ids, vec![open.id.clone()]);

        // Granting it unlocks the gated menu but not the locked one
        store.upsert_user_permission(&user, &p.id, None, None).await.unwrap();
        let menus = service.accessible_menus(&user).await.unwrap();
        let mut expected = vec![open.id.clone(), gated.id.clone()];
        expected.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        assert_eq!(menus.menu_ids, expected);
    }

    #[tokio::test]
    async fn test_inactive_menu_is_hidden() {
        let (service, store) = service_with_store();
        let user = UserId::new();
        store.add_user(user.clone());
        let editor = RoleFixture::new("editor").build();
        store.insert_role(&editor).await.unwrap();
        store.upsert_user_role(&user, &editor.id, None, None).await.unwrap();

        let menu = MenuFixture::new("Hidden").inactive().build();
        store.insert_menu(&menu).await.unwrap();
        store.upsert_role_menu(&editor.id, &menu.id, None, None).await.unwrap();

        let menus = service.accessible_menus(&user).await.unwrap();
        assert!(menus.menu_ids.is_empty());
    }

    #[tokio::test]
    async fn test_mutations_report_missing_targets() {
        let (service, store) = service_with_store();
        let user = UserId::new();
        let ghost_permission = PermissionId::new();
        let ghost_role = RoleId::new();

        assert!(!service
            .assign_permission_to_user(&user, &ghost_permission, None, None)
            .await
            .unwrap());
        assert!(!service
            .assign_role_to_user(&user, &ghost_role, None, None)
            .await
            .unwrap());
        assert!(!service
            .revoke_permission_from_user(&user, &ghost_permission)
            .await
            .unwrap());

        // Once both sides exist the same calls succeed
        store.add_user(user.clone());
        let p = perm("courses", "read");
        store.insert_permission(&p).await.unwrap();
        assert!(service
            .assign_permission_to_user(&user, &p.id, None, None)
            .await
            .unwrap());
        assert!(service
            .revoke_permission_from_user(&user, &p.id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_system_role_cannot_be_deleted() {
        let (service, store) = service_with_store();
        let admin = RoleFixture::new("admin").with_priority(100).system().build();
        store.insert_role(&admin).await.unwrap();

        let err = service.delete_role(&admin.id).await.unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));
        // Still there
        assert!(store.role_by_id(&admin.id).await.unwrap().is_some());

        // Missing role is not an error
        assert!(!service.delete_role(&RoleId::new()).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_permission_validates_and_persists() {
        let (service, _store) = service_with_store();
        let created = service
            .create_permission(
                "courses".to_string(),
                "read".to_string(),
                "Read courses".to_string(),
                Some("lms".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(created.key(), "courses:read");

        let err = service
            .create_permission(String::new(), "read".to_string(), "bad".to_string(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = service
            .create_permission(
                "courses".to_string(),
                "read".to_string(),
                "dup".to_string(),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }
}
