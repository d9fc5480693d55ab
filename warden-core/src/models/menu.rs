use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::MenuId;

/// A navigation entry. Menus are granted to roles; visibility can
/// additionally be gated by `required_permission`, a `"resource:action"`
/// key the user must hold in their effective permission set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Menu {
    pub id: MenuId,
    pub name: String,
    pub path: Option<String>,
    pub icon: Option<String>,
    pub parent_id: Option<MenuId>,
    pub required_permission: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Menu {
    #[must_use]
    pub fn new(name: String, sort_order: i32) -> Self {
        let now = Utc::now();
        Self {
            id: MenuId::new(),
            name,
            path: None,
            icon: None,
            parent_id: None,
            required_permission: None,
            sort_order,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: String) -> Self {
        self.path = Some(path);
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent_id: MenuId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    #[must_use]
    pub fn with_required_permission(mut self, key: String) -> Self {
        self.required_permission = Some(key);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_menu_defaults() {
        let menu = Menu::new("Courses".to_string(), 10);
        assert!(menu.is_active);
        assert!(menu.required_permission.is_none());
        assert!(menu.parent_id.is_none());
    }

    #[test]
    fn test_menu_builders() {
        let parent = MenuId::new();
        let menu = Menu::new("Grades".to_string(), 20)
            .with_path("/grades".to_string())
            .with_parent(parent.clone())
            .with_required_permission("grades:read".to_string());
        assert_eq!(menu.path.as_deref(), Some("/grades"));
        assert_eq!(menu.parent_id, Some(parent));
        assert_eq!(menu.required_permission.as_deref(), Some("grades:read"));
    }
}
