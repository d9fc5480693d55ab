pub mod cached_permission;
pub mod permission;

pub use cached_permission::CachedPermissionService;
pub use permission::{
    EffectiveMenus, EffectivePermissions, EffectiveRoleMatrix, EffectiveRoles, PermissionService,
};
