use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::RoleId;

/// A role definition. Roles bundle permissions and menus; users receive
/// them through membership assignments.
///
/// `is_system` marks roles the platform seeds at install time. They can
/// be edited but never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub description: Option<String>,
    pub priority: i32,
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    #[must_use]
    pub fn new(name: String, description: Option<String>, priority: i32) -> Self {
        let now = Utc::now();
        Self {
            id: RoleId::new(),
            name,
            description,
            priority,
            is_system: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_role_is_not_system() {
        let role = Role::new("editor".to_string(), None, 10);
        assert!(!role.is_system);
        assert_eq!(role.name, "editor");
        assert_eq!(role.id.as_str().len(), 12);
    }
}
