//! Cache key construction.
//!
//! Every key the permission cache touches is built here, so the layout
//! stays greppable and the full-namespace flush can rely on one prefix.
//!
//! - All keys share a configurable prefix (default: "warden:")
//! - All IDs are nanoid(12) strings
//! - One key shape per resolved artifact

use crate::config::CacheConfig;
use crate::models::{RoleId, UserId};

/// Builder for the permission cache key namespace.
#[derive(Clone)]
pub struct KeyBuilder {
    prefix: String,
}

impl KeyBuilder {
    /// Create a new `KeyBuilder` with the given prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Create `KeyBuilder` from configuration
    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.key_prefix.clone())
    }

    /// The bare prefix, used for full-namespace invalidation.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.prefix
    }

    // ==================== User-scoped shapes ====================

    /// Effective permission keys of a user
    ///
    /// Type: String (JSON array of "resource:action") + TTL
    #[must_use]
    pub fn user_permissions(&self, user_id: &UserId) -> String {
        format!("{}user_permissions:{}", self.prefix, user_id.as_str())
    }

    /// Role names of a user's effective memberships
    ///
    /// Type: String (JSON array) + TTL
    #[must_use]
    pub fn user_roles(&self, user_id: &UserId) -> String {
        format!("{}user_roles:{}", self.prefix, user_id.as_str())
    }

    /// Menu ids accessible to a user
    ///
    /// Type: String (JSON array) + TTL
    #[must_use]
    pub fn user_menus(&self, user_id: &UserId) -> String {
        format!("{}user_menus:{}", self.prefix, user_id.as_str())
    }

    /// Resource -> actions grouping of a user's effective permissions
    ///
    /// Type: String (JSON object) + TTL
    #[must_use]
    pub fn user_permission_matrix(&self, user_id: &UserId) -> String {
        format!("{}user_permission_matrix:{}", self.prefix, user_id.as_str())
    }

    /// Role name -> permission keys grouping for a user's memberships
    ///
    /// Type: String (JSON object) + TTL
    #[must_use]
    pub fn user_role_matrix(&self, user_id: &UserId) -> String {
        format!("{}user_role_matrix:{}", self.prefix, user_id.as_str())
    }

    // ==================== Role-scoped shapes ====================

    /// Effective permission keys of a role
    ///
    /// Type: String (JSON array of "resource:action") + TTL
    #[must_use]
    pub fn role_permissions(&self, role_id: &RoleId) -> String {
        format!("{}role_permissions:{}", self.prefix, role_id.as_str())
    }

    // ==================== Infrastructure ====================

    /// Sentinel key for the health probe round trip
    ///
    /// Type: String + short TTL
    #[must_use]
    pub fn health_probe(&self) -> String {
        format!("{}health_check", self.prefix)
    }
}

impl Default for KeyBuilder {
    fn default() -> Self {
        Self::new("warden:")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_builder_default() {
        let builder = KeyBuilder::default();
        let user = UserId::from_string("u1".to_string());
        let role = RoleId::from_string("r1".to_string());

        assert_eq!(builder.user_permissions(&user), "warden:user_permissions:u1");
        assert_eq!(builder.user_roles(&user), "warden:user_roles:u1");
        assert_eq!(builder.user_menus(&user), "warden:user_menus:u1");
        assert_eq!(
            builder.user_permission_matrix(&user),
            "warden:user_permission_matrix:u1"
        );
        assert_eq!(builder.user_role_matrix(&user), "warden:user_role_matrix:u1");
        assert_eq!(builder.role_permissions(&role), "warden:role_permissions:r1");
        assert_eq!(builder.health_probe(), "warden:health_check");
    }

    #[test]
    fn test_key_builder_custom_prefix() {
        let builder = KeyBuilder::new("prod:authz:");
        let user = UserId::from_string("u1".to_string());

        assert_eq!(
            builder.user_permissions(&user),
            "prod:authz:user_permissions:u1"
        );
        assert_eq!(builder.namespace(), "prod:authz:");
    }
}
