pub mod assignment;
pub mod id;
pub mod menu;
pub mod permission;
pub mod role;

pub use assignment::{
    RoleMenuAssignment, RolePermissionAssignment, UserPermissionGrant, UserRoleAssignment,
};
pub use id::{generate_id, MenuId, PermissionId, RoleId, UserId};
pub use menu::Menu;
pub use permission::{permission_key, Permission, PermissionView};
pub use role::Role;
