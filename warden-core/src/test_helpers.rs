//! Test helpers and fixtures for warden-core tests
//!
//! Common builders to reduce boilerplate across the test modules.

use crate::models::{Menu, MenuId, Permission, Role, UserId};

/// Create a test user ID
pub fn test_user_id(id: &str) -> UserId {
    UserId::from_string(id.to_string())
}

/// Generate a random user ID for testing
pub fn random_user_id() -> UserId {
    UserId::new()
}

/// Test fixture builder for Permission
pub struct PermissionFixture {
    resource: String,
    action: String,
    name: Option<String>,
    module: Option<String>,
    is_active: bool,
}

impl PermissionFixture {
    pub fn new(resource: &str, action: &str) -> Self {
        Self {
            resource: resource.to_string(),
            action: action.to_string(),
            name: None,
            module: None,
            is_active: true,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_module(mut self, module: &str) -> Self {
        self.module = Some(module.to_string());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn build(self) -> Permission {
        let name = self
            .name
            .unwrap_or_else(|| format!("{} {}", self.resource, self.action));
        let mut permission = Permission::new(self.resource, self.action, name, self.module);
        permission.is_active = self.is_active;
        permission
    }
}

/// Test fixture builder for Role
pub struct RoleFixture {
    name: String,
    description: Option<String>,
    priority: i32,
    is_system: bool,
}

impl RoleFixture {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            priority: 10,
            is_system: false,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn system(mut self) -> Self {
        self.is_system = true;
        self
    }

    pub fn build(self) -> Role {
        let mut role = Role::new(self.name, self.description, self.priority);
        role.is_system = self.is_system;
        role
    }
}

/// Test fixture builder for Menu
pub struct MenuFixture {
    name: String,
    sort_order: i32,
    path: Option<String>,
    parent_id: Option<MenuId>,
    required_permission: Option<String>,
    is_active: bool,
}

impl MenuFixture {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            sort_order: 0,
            path: None,
            parent_id: None,
            required_permission: None,
            is_active: true,
        }
    }

    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    pub fn with_parent(mut self, parent_id: MenuId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn requiring(mut self, permission_key: &str) -> Self {
        self.required_permission = Some(permission_key.to_string());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn build(self) -> Menu {
        let mut menu = Menu::new(self.name, self.sort_order);
        if let Some(path) = self.path {
            menu = menu.with_path(path);
        }
        if let Some(parent_id) = self.parent_id {
            menu = menu.with_parent(parent_id);
        }
        if let Some(required) = self.required_permission {
            menu = menu.with_required_permission(required);
        }
        menu.is_active = self.is_active;
        menu
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_defaults() {
        let permission = PermissionFixture::new("courses", "read").build();
        assert_eq!(permission.key(), "courses:read");
        assert!(permission.is_active);

        let role = RoleFixture::new("admin").system().build();
        assert!(role.is_system);

        let menu = MenuFixture::new("Courses").requiring("courses:read").build();
        assert_eq!(menu.required_permission.as_deref(), Some("courses:read"));
    }
}
