use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{MenuId, PermissionId, RoleId, UserId};

/// A user's membership in a role, joined with the role name.
///
/// Assignment rows come out of the store raw; effectiveness filtering
/// happens in the resolver so every read path applies the same rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRoleAssignment {
    pub user_id: UserId,
    pub role_id: RoleId,
    pub role_name: String,
    pub assigned_at: DateTime<Utc>,
    pub assigned_by: Option<UserId>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl UserRoleAssignment {
    /// Active and not past its expiry. Expiry is a hard cutoff: a row
    /// expiring exactly at `now` no longer counts.
    #[must_use]
    pub fn is_effective(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.is_none_or(|at| at > now)
    }
}

/// A permission granted directly to a user, joined with the permission's
/// identity fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPermissionGrant {
    pub user_id: UserId,
    pub permission_id: PermissionId,
    pub resource: String,
    pub action: String,
    pub permission_is_active: bool,
    pub assigned_at: DateTime<Utc>,
    pub assigned_by: Option<UserId>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl UserPermissionGrant {
    #[must_use]
    pub fn is_effective(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.is_none_or(|at| at > now)
    }
}

/// A permission granted to a role, joined with the permission's identity
/// fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolePermissionAssignment {
    pub role_id: RoleId,
    pub permission_id: PermissionId,
    pub resource: String,
    pub action: String,
    pub permission_is_active: bool,
    pub assigned_at: DateTime<Utc>,
    pub assigned_by: Option<UserId>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl RolePermissionAssignment {
    #[must_use]
    pub fn is_effective(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.is_none_or(|at| at > now)
    }
}

/// A menu granted to a role, joined with the menu fields the resolver
/// filters on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleMenuAssignment {
    pub role_id: RoleId,
    pub menu_id: MenuId,
    pub menu_is_active: bool,
    pub required_permission: Option<String>,
    pub assigned_at: DateTime<Utc>,
    pub assigned_by: Option<UserId>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl RoleMenuAssignment {
    #[must_use]
    pub fn is_effective(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.is_none_or(|at| at > now)
    }
}
