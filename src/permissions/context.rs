//! Invocation context.
//!
//! Every inbound command invocation gets its own [`InvocationContext`]. The
//! permission override lives here, so it is scoped to one invocation and
//! never shared between concurrent ones.

use super::level::{PermissionLevel, PermissionLevels};

/// The user invoking a command, as seen by the permission system.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor {
    /// Platform user id.
    pub id: u64,

    /// Role names the actor holds.
    pub roles: Vec<String>,

    /// Platform permission names the actor holds.
    pub guild_permissions: Vec<String>,
}

impl Actor {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn with_roles(mut self, roles: &[&str]) -> Self {
        self.roles = roles.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn with_guild_permissions(mut self, permissions: &[&str]) -> Self {
        self.guild_permissions = permissions.iter().map(|p| p.to_string()).collect();
        self
    }
}

/// State of one command invocation.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub actor: Actor,

    /// Forced level for this invocation; bypasses actor resolution when set.
    pub permission_override: Option<PermissionLevel>,
}

impl InvocationContext {
    /// A context without override.
    pub fn new(actor: Actor) -> Self {
        Self {
            actor,
            permission_override: None,
        }
    }

    pub fn with_override(mut self, level: PermissionLevel) -> Self {
        self.permission_override = Some(level);
        self
    }

    /// Context that runs with the highest declared level.
    pub fn sudo(self, levels: &PermissionLevels) -> Self {
        self.with_override(levels.max().clone())
    }
}
