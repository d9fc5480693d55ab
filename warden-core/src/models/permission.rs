use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::PermissionId;

/// Canonical string form of a permission: `"resource:action"`.
///
/// This is the only form that crosses the cache boundary, so resolved
/// permission sets stay comparable regardless of which table a grant
/// came from.
#[must_use]
pub fn permission_key(resource: &str, action: &str) -> String {
    format!("{resource}:{action}")
}

/// A permission definition. Identity for authorization checks is the
/// `(resource, action)` pair, unique across the store; `name` and
/// `module` are display metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub resource: String,
    pub action: String,
    pub name: String,
    pub module: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    #[must_use]
    pub fn new(resource: String, action: String, name: String, module: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: PermissionId::new(),
            resource,
            action,
            name,
            module,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn key(&self) -> String {
        permission_key(&self.resource, &self.action)
    }
}

/// The parsed form of a permission key, returned by aggregate reads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionView {
    pub resource: String,
    pub action: String,
}

impl PermissionView {
    /// Parse `"resource:action"`. The resource must not contain `:`;
    /// the action keeps everything after the first separator.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        let (resource, action) = key.split_once(':')?;
        if resource.is_empty() || action.is_empty() {
            return None;
        }
        Some(Self {
            resource: resource.to_string(),
            action: action.to_string(),
        })
    }

    #[must_use]
    pub fn key(&self) -> String {
        permission_key(&self.resource, &self.action)
    }
}

impl std::fmt::Display for PermissionView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.resource, self.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_key() {
        assert_eq!(permission_key("courses", "update"), "courses:update");
    }

    #[test]
    fn test_new_permission_defaults() {
        let p = Permission::new(
            "reports".to_string(),
            "read".to_string(),
            "Read reports".to_string(),
            Some("reporting".to_string()),
        );
        assert!(p.is_active);
        assert_eq!(p.key(), "reports:read");
        assert_eq!(p.id.as_str().len(), 12);
    }

    #[test]
    fn test_view_round_trip() {
        let view = PermissionView::from_key("courses:update").unwrap();
        assert_eq!(view.resource, "courses");
        assert_eq!(view.action, "update");
        assert_eq!(view.to_string(), "courses:update");
    }

    #[test]
    fn test_view_action_keeps_inner_separator() {
        let view = PermissionView::from_key("files:read:meta").unwrap();
        assert_eq!(view.resource, "files");
        assert_eq!(view.action, "read:meta");
        assert_eq!(view.key(), "files:read:meta");
    }

    #[test]
    fn test_view_rejects_malformed_keys() {
        assert!(PermissionView::from_key("no-separator").is_none());
        assert!(PermissionView::from_key(":action").is_none());
        assert!(PermissionView::from_key("resource:").is_none());
    }
}
