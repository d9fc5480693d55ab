pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    models::{
        Menu, MenuId, Permission, PermissionId, Role, RoleId, RoleMenuAssignment,
        RolePermissionAssignment, UserId, UserPermissionGrant, UserRoleAssignment,
    },
    Result,
};

pub use memory::MemoryAuthorizationStore;
pub use postgres::PgAuthorizationStore;

/// Ground truth for the authorization domain: permission, role and menu
/// definitions plus the four assignment tables.
///
/// Assignment reads return raw rows with no effectiveness filtering;
/// active/expiry predicates are applied by the resolver so every read
/// path follows one rule. Assignment mutations return `Ok(false)` when a
/// referenced principal or definition is missing, never an error.
#[async_trait]
pub trait AuthorizationStore: Send + Sync {
    // ========== Permission definitions ==========

    async fn permission_by_id(&self, permission_id: &PermissionId) -> Result<Option<Permission>>;

    /// Errors with `AlreadyExists` when `(resource, action)` is taken.
    async fn insert_permission(&self, permission: &Permission) -> Result<()>;

    async fn update_permission(&self, permission: &Permission) -> Result<bool>;

    /// Deletes the definition and cascades its assignment rows.
    async fn delete_permission(&self, permission_id: &PermissionId) -> Result<bool>;

    // ========== Role definitions ==========

    async fn role_by_id(&self, role_id: &RoleId) -> Result<Option<Role>>;

    /// Errors with `AlreadyExists` when the role name is taken.
    async fn insert_role(&self, role: &Role) -> Result<()>;

    async fn update_role(&self, role: &Role) -> Result<bool>;

    /// Deletes the definition and cascades its assignment rows. The
    /// system-role guard lives in the resolver, not here.
    async fn delete_role(&self, role_id: &RoleId) -> Result<bool>;

    // ========== Menu definitions ==========

    async fn menu_by_id(&self, menu_id: &MenuId) -> Result<Option<Menu>>;

    async fn insert_menu(&self, menu: &Menu) -> Result<()>;

    async fn update_menu(&self, menu: &Menu) -> Result<bool>;

    async fn delete_menu(&self, menu_id: &MenuId) -> Result<bool>;

    // ========== Assignment reads ==========

    async fn user_role_assignments(&self, user_id: &UserId) -> Result<Vec<UserRoleAssignment>>;

    async fn user_permission_grants(&self, user_id: &UserId) -> Result<Vec<UserPermissionGrant>>;

    async fn role_permission_assignments(
        &self,
        role_id: &RoleId,
    ) -> Result<Vec<RolePermissionAssignment>>;

    async fn role_menu_assignments(&self, role_id: &RoleId) -> Result<Vec<RoleMenuAssignment>>;

    /// Distinct users holding any assignment row for the role,
    /// effective or not. Used for invalidation fan-out, where
    /// over-reporting is harmless.
    async fn users_with_role(&self, role_id: &RoleId) -> Result<Vec<UserId>>;

    /// Targeted existence check: does the user hold `resource:action` at
    /// `now` through an effective membership or an effective direct
    /// grant of an active permission? Applies the same predicates as the
    /// resolver's aggregate reads, pushed store-side so Postgres can
    /// answer with a single `EXISTS`.
    async fn user_permission_exists(
        &self,
        user_id: &UserId,
        resource: &str,
        action: &str,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    // ========== Assignment mutations ==========

    /// Upserts refresh `assigned_at`, `assigned_by` and `expires_at` and
    /// reactivate an existing row.
    async fn upsert_user_role(
        &self,
        user_id: &UserId,
        role_id: &RoleId,
        expires_at: Option<DateTime<Utc>>,
        assigned_by: Option<&UserId>,
    ) -> Result<bool>;

    /// Returns whether a row was removed.
    async fn delete_user_role(&self, user_id: &UserId, role_id: &RoleId) -> Result<bool>;

    async fn upsert_user_permission(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
        expires_at: Option<DateTime<Utc>>,
        assigned_by: Option<&UserId>,
    ) -> Result<bool>;

    async fn delete_user_permission(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
    ) -> Result<bool>;

    async fn upsert_role_permission(
        &self,
        role_id: &RoleId,
        permission_id: &PermissionId,
        expires_at: Option<DateTime<Utc>>,
        assigned_by: Option<&UserId>,
    ) -> Result<bool>;

    async fn delete_role_permission(
        &self,
        role_id: &RoleId,
        permission_id: &PermissionId,
    ) -> Result<bool>;

    async fn upsert_role_menu(
        &self,
        role_id: &RoleId,
        menu_id: &MenuId,
        expires_at: Option<DateTime<Utc>>,
        assigned_by: Option<&UserId>,
    ) -> Result<bool>;

    async fn delete_role_menu(&self, role_id: &RoleId, menu_id: &MenuId) -> Result<bool>;
}
