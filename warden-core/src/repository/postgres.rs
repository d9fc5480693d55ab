use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};

use crate::{
    models::{
        Menu, MenuId, Permission, PermissionId, Role, RoleId, RoleMenuAssignment,
        RolePermissionAssignment, UserId, UserPermissionGrant, UserRoleAssignment,
    },
    Result,
};

use super::AuthorizationStore;

/// Postgres-backed authorization store.
///
/// Assignment tables reference their definitions with `ON DELETE
/// CASCADE`, so deleting a definition removes its rows without extra
/// statements here.
#[derive(Clone)]
pub struct PgAuthorizationStore {
    pool: PgPool,
}

impl PgAuthorizationStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the database pool
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_permission(&self, row: &PgRow) -> Result<Permission> {
        Ok(Permission {
            id: PermissionId::from_string(row.try_get("id")?),
            resource: row.try_get("resource")?,
            action: row.try_get("action")?,
            name: row.try_get("name")?,
            module: row.try_get("module")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_role(&self, row: &PgRow) -> Result<Role> {
        Ok(Role {
            id: RoleId::from_string(row.try_get("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            priority: row.try_get("priority")?,
            is_system: row.try_get("is_system")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_menu(&self, row: &PgRow) -> Result<Menu> {
        let parent_id: Option<String> = row.try_get("parent_id")?;
        Ok(Menu {
            id: MenuId::from_string(row.try_get("id")?),
            name: row.try_get("name")?,
            path: row.try_get("path")?,
            icon: row.try_get("icon")?,
            parent_id: parent_id.map(MenuId::from_string),
            required_permission: row.try_get("required_permission")?,
            sort_order: row.try_get("sort_order")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_user_role(&self, row: &PgRow) -> Result<UserRoleAssignment> {
        let assigned_by: Option<String> = row.try_get("assigned_by")?;
        Ok(UserRoleAssignment {
            user_id: UserId::from_string(row.try_get("user_id")?),
            role_id: RoleId::from_string(row.try_get("role_id")?),
            role_name: row.try_get("role_name")?,
            assigned_at: row.try_get("assigned_at")?,
            assigned_by: assigned_by.map(UserId::from_string),
            expires_at: row.try_get("expires_at")?,
            is_active: row.try_get("is_active")?,
        })
    }

    fn row_to_user_grant(&self, row: &PgRow) -> Result<UserPermissionGrant> {
        let assigned_by: Option<String> = row.try_get("assigned_by")?;
        Ok(UserPermissionGrant {
            user_id: UserId::from_string(row.try_get("user_id")?),
            permission_id: PermissionId::from_string(row.try_get("permission_id")?),
            resource: row.try_get("resource")?,
            action: row.try_get("action")?,
            permission_is_active: row.try_get("permission_is_active")?,
            assigned_at: row.try_get("assigned_at")?,
            assigned_by: assigned_by.map(UserId::from_string),
            expires_at: row.try_get("expires_at")?,
            is_active: row.try_get("is_active")?,
        })
    }

    fn row_to_role_permission(&self, row: &PgRow) -> Result<RolePermissionAssignment> {
        let assigned_by: Option<String> = row.try_get("assigned_by")?;
        Ok(RolePermissionAssignment {
            role_id: RoleId::from_string(row.try_get("role_id")?),
            permission_id: PermissionId::from_string(row.try_get("permission_id")?),
            resource: row.try_get("resource")?,
            action: row.try_get("action")?,
            permission_is_active: row.try_get("permission_is_active")?,
            assigned_at: row.try_get("assigned_at")?,
            assigned_by: assigned_by.map(UserId::from_string),
            expires_at: row.try_get("expires_at")?,
            is_active: row.try_get("is_active")?,
        })
    }

    fn row_to_role_menu(&self, row: &PgRow) -> Result<RoleMenuAssignment> {
        let assigned_by: Option<String> = row.try_get("assigned_by")?;
        Ok(RoleMenuAssignment {
            role_id: RoleId::from_string(row.try_get("role_id")?),
            menu_id: MenuId::from_string(row.try_get("menu_id")?),
            menu_is_active: row.try_get("menu_is_active")?,
            required_permission: row.try_get("required_permission")?,
            assigned_at: row.try_get("assigned_at")?,
            assigned_by: assigned_by.map(UserId::from_string),
            expires_at: row.try_get("expires_at")?,
            is_active: row.try_get("is_active")?,
        })
    }
}

/// Missing principals and definitions surface as foreign-key violations;
/// the assignment contract turns those into `Ok(false)`.
fn is_fk_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23503"))
}

#[async_trait]
impl AuthorizationStore for PgAuthorizationStore {
    // ========== Permission definitions ==========

    async fn permission_by_id(&self, permission_id: &PermissionId) -> Result<Option<Permission>> {
        let row = sqlx::query(
            r"
            SELECT id, resource, action, name, module, is_active, created_at, updated_at
            FROM permissions
            WHERE id = $1
            ",
        )
        .bind(permission_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.row_to_permission(&row)?)),
            None => Ok(None),
        }
    }

    async fn insert_permission(&self, permission: &Permission) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO permissions (id, resource, action, name, module, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(permission.id.as_str())
        .bind(&permission.resource)
        .bind(&permission.action)
        .bind(&permission.name)
        .bind(permission.module.as_ref())
        .bind(permission.is_active)
        .bind(permission.created_at)
        .bind(permission.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_permission(&self, permission: &Permission) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE permissions
            SET resource = $2, action = $3, name = $4, module = $5, is_active = $6, updated_at = $7
            WHERE id = $1
            ",
        )
        .bind(permission.id.as_str())
        .bind(&permission.resource)
        .bind(&permission.action)
        .bind(&permission.name)
        .bind(permission.module.as_ref())
        .bind(permission.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_permission(&self, permission_id: &PermissionId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(permission_id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ========== Role definitions ==========

    async fn role_by_id(&self, role_id: &RoleId) -> Result<Option<Role>> {
        let row = sqlx::query(
            r"
            SELECT id, name, description, priority, is_system, created_at, updated_at
            FROM roles
            WHERE id = $1
            ",
        )
        .bind(role_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.row_to_role(&row)?)),
            None => Ok(None),
        }
    }

    async fn insert_role(&self, role: &Role) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO roles (id, name, description, priority, is_system, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(role.id.as_str())
        .bind(&role.name)
        .bind(role.description.as_ref())
        .bind(role.priority)
        .bind(role.is_system)
        .bind(role.created_at)
        .bind(role.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_role(&self, role: &Role) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE roles
            SET name = $2, description = $3, priority = $4, updated_at = $5
            WHERE id = $1
            ",
        )
        .bind(role.id.as_str())
        .bind(&role.name)
        .bind(role.description.as_ref())
        .bind(role.priority)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_role(&self, role_id: &RoleId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(role_id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ========== Menu definitions ==========

    async fn menu_by_id(&self, menu_id: &MenuId) -> Result<Option<Menu>> {
        let row = sqlx::query(
            r"
            SELECT id, name, path, icon, parent_id, required_permission, sort_order, is_active, created_at, updated_at
            FROM menus
            WHERE id = $1
            ",
        )
        .bind(menu_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.row_to_menu(&row)?)),
            None => Ok(None),
        }
    }

    async fn insert_menu(&self, menu: &Menu) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO menus (id, name, path, icon, parent_id, required_permission, sort_order, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(menu.id.as_str())
        .bind(&menu.name)
        .bind(menu.path.as_ref())
        .bind(menu.icon.as_ref())
        .bind(menu.parent_id.as_ref().map(MenuId::as_str))
        .bind(menu.required_permission.as_ref())
        .bind(menu.sort_order)
        .bind(menu.is_active)
        .bind(menu.created_at)
        .bind(menu.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_menu(&self, menu: &Menu) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE menus
            SET name = $2, path = $3, icon = $4, parent_id = $5, required_permission = $6,
                sort_order = $7, is_active = $8, updated_at = $9
            WHERE id = $1
            ",
        )
        .bind(menu.id.as_str())
        .bind(&menu.name)
        .bind(menu.path.as_ref())
        .bind(menu.icon.as_ref())
        .bind(menu.parent_id.as_ref().map(MenuId::as_str))
        .bind(menu.required_permission.as_ref())
        .bind(menu.sort_order)
        .bind(menu.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_menu(&self, menu_id: &MenuId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM menus WHERE id = $1")
            .bind(menu_id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ========== Assignment reads ==========

    async fn user_role_assignments(&self, user_id: &UserId) -> Result<Vec<UserRoleAssignment>> {
        let rows = sqlx::query(
            r"
            SELECT ur.user_id, ur.role_id, r.name AS role_name,
                   ur.assigned_at, ur.assigned_by, ur.expires_at, ur.is_active
            FROM user_roles ur
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = $1
            ",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|row| self.row_to_user_role(row)).collect()
    }

    async fn user_permission_grants(&self, user_id: &UserId) -> Result<Vec<UserPermissionGrant>> {
        let rows = sqlx::query(
            r"
            SELECT up.user_id, up.permission_id, p.resource, p.action,
                   p.is_active AS permission_is_active,
                   up.assigned_at, up.assigned_by, up.expires_at, up.is_active
            FROM user_permissions up
            JOIN permissions p ON p.id = up.permission_id
            WHERE up.user_id = $1
            ",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|row| self.row_to_user_grant(row)).collect()
    }

    async fn role_permission_assignments(
        &self,
        role_id: &RoleId,
    ) -> Result<Vec<RolePermissionAssignment>> {
        let rows = sqlx::query(
            r"
            SELECT rp.role_id, rp.permission_id, p.resource, p.action,
                   p.is_active AS permission_is_active,
                   rp.assigned_at, rp.assigned_by, rp.expires_at, rp.is_active
            FROM role_permissions rp
            JOIN permissions p ON p.id = rp.permission_id
            WHERE rp.role_id = $1
            ",
        )
        .bind(role_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| self.row_to_role_permission(row))
            .collect()
    }

    async fn role_menu_assignments(&self, role_id: &RoleId) -> Result<Vec<RoleMenuAssignment>> {
        let rows = sqlx::query(
            r"
            SELECT rm.role_id, rm.menu_id, m.is_active AS menu_is_active,
                   m.required_permission,
                   rm.assigned_at, rm.assigned_by, rm.expires_at, rm.is_active
            FROM role_menus rm
            JOIN menus m ON m.id = rm.menu_id
            WHERE rm.role_id = $1
            ",
        )
        .bind(role_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|row| self.row_to_role_menu(row)).collect()
    }

    async fn users_with_role(&self, role_id: &RoleId) -> Result<Vec<UserId>> {
        let rows = sqlx::query("SELECT DISTINCT user_id FROM user_roles WHERE role_id = $1")
            .bind(role_id.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| Ok(UserId::from_string(row.try_get("user_id")?)))
            .collect()
    }

    async fn user_permission_exists(
        &self,
        user_id: &UserId,
        resource: &str,
        action: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let row = sqlx::query(
            r"
            SELECT EXISTS (
                SELECT 1
                FROM user_permissions up
                JOIN permissions p ON p.id = up.permission_id
                WHERE up.user_id = $1
                  AND p.resource = $2
                  AND p.action = $3
                  AND p.is_active
                  AND up.is_active
                  AND (up.expires_at IS NULL OR up.expires_at > $4)
                UNION ALL
                SELECT 1
                FROM user_roles ur
                JOIN role_permissions rp ON rp.role_id = ur.role_id
                JOIN permissions p ON p.id = rp.permission_id
                WHERE ur.user_id = $1
                  AND p.resource = $2
                  AND p.action = $3
                  AND p.is_active
                  AND ur.is_active
                  AND (ur.expires_at IS NULL OR ur.expires_at > $4)
                  AND rp.is_active
                  AND (rp.expires_at IS NULL OR rp.expires_at > $4)
            ) AS granted
            ",
        )
        .bind(user_id.as_str())
        .bind(resource)
        .bind(action)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("granted")?)
    }

    // ========== Assignment mutations ==========

    async fn upsert_user_role(
        &self,
        user_id: &UserId,
        role_id: &RoleId,
        expires_at: Option<DateTime<Utc>>,
        assigned_by: Option<&UserId>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r"
            INSERT INTO user_roles (user_id, role_id, assigned_at, assigned_by, expires_at, is_active)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            ON CONFLICT (user_id, role_id)
            DO UPDATE SET assigned_at = EXCLUDED.assigned_at,
                          assigned_by = EXCLUDED.assigned_by,
                          expires_at = EXCLUDED.expires_at,
                          is_active = TRUE
            ",
        )
        .bind(user_id.as_str())
        .bind(role_id.as_str())
        .bind(Utc::now())
        .bind(assigned_by.map(UserId::as_str))
        .bind(expires_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(done.rows_affected() > 0),
            Err(e) if is_fk_violation(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_user_role(&self, user_id: &UserId, role_id: &RoleId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user_id.as_str())
            .bind(role_id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn upsert_user_permission(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
        expires_at: Option<DateTime<Utc>>,
        assigned_by: Option<&UserId>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r"
            INSERT INTO user_permissions (user_id, permission_id, assigned_at, assigned_by, expires_at, is_active)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            ON CONFLICT (user_id, permission_id)
            DO UPDATE SET assigned_at = EXCLUDED.assigned_at,
                          assigned_by = EXCLUDED.assigned_by,
                          expires_at = EXCLUDED.expires_at,
                          is_active = TRUE
            ",
        )
        .bind(user_id.as_str())
        .bind(permission_id.as_str())
        .bind(Utc::now())
        .bind(assigned_by.map(UserId::as_str))
        .bind(expires_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(done.rows_affected() > 0),
            Err(e) if is_fk_violation(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_user_permission(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
    ) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM user_permissions WHERE user_id = $1 AND permission_id = $2")
                .bind(user_id.as_str())
                .bind(permission_id.as_str())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn upsert_role_permission(
        &self,
        role_id: &RoleId,
        permission_id: &PermissionId,
        expires_at: Option<DateTime<Utc>>,
        assigned_by: Option<&UserId>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r"
            INSERT INTO role_permissions (role_id, permission_id, assigned_at, assigned_by, expires_at, is_active)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            ON CONFLICT (role_id, permission_id)
            DO UPDATE SET assigned_at = EXCLUDED.assigned_at,
                          assigned_by = EXCLUDED.assigned_by,
                          expires_at = EXCLUDED.expires_at,
                          is_active = TRUE
            ",
        )
        .bind(role_id.as_str())
        .bind(permission_id.as_str())
        .bind(Utc::now())
        .bind(assigned_by.map(UserId::as_str))
        .bind(expires_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(done.rows_affected() > 0),
            Err(e) if is_fk_violation(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_role_permission(
        &self,
        role_id: &RoleId,
        permission_id: &PermissionId,
    ) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM role_permissions WHERE role_id = $1 AND permission_id = $2")
                .bind(role_id.as_str())
                .bind(permission_id.as_str())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn upsert_role_menu(
        &self,
        role_id: &RoleId,
        menu_id: &MenuId,
        expires_at: Option<DateTime<Utc>>,
        assigned_by: Option<&UserId>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r"
            INSERT INTO role_menus (role_id, menu_id, assigned_at, assigned_by, expires_at, is_active)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            ON CONFLICT (role_id, menu_id)
            DO UPDATE SET assigned_at = EXCLUDED.assigned_at,
                          assigned_by = EXCLUDED.assigned_by,
                          expires_at = EXCLUDED.expires_at,
                          is_active = TRUE
            ",
        )
        .bind(role_id.as_str())
        .bind(menu_id.as_str())
        .bind(Utc::now())
        .bind(assigned_by.map(UserId::as_str))
        .bind(expires_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(done.rows_affected() > 0),
            Err(e) if is_fk_violation(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_role_menu(&self, role_id: &RoleId, menu_id: &MenuId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM role_menus WHERE role_id = $1 AND menu_id = $2")
            .bind(role_id.as_str())
            .bind(menu_id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    #[tokio::test]
    #[ignore = "Requires database"]
    async fn test_assignment_round_trip() {
        // Integration test placeholder
    }
}
