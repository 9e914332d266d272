//! Permission levels, named permissions and invocation checks.

pub mod context;
pub mod level;
pub mod model;
pub mod permission;
pub mod resolver;

pub use context::{Actor, InvocationContext};
pub use level::{default_levels, PermissionLevel, PermissionLevels};
pub use model::{PermissionModel, PermissionRow};
pub use permission::{
    check_permission_level, Permission, PermissionDefaults, PermissionGate, PermissionService,
};
pub use resolver::{LevelStrategy, PermissionLevelResolver, RoleStrategy};
