//! Named permissions.
//!
//! A [`Permission`] belongs to one extension and resolves lazily to a
//! declared [`PermissionLevel`] through the [`PermissionModel`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::context::InvocationContext;
use super::level::{PermissionLevel, PermissionLevels};
use super::model::{PermissionModel, PermissionRow};
use super::resolver::PermissionLevelResolver;
use crate::error::Result;
use crate::host::{check_fn, Check};

/// A capability of one extension, identified by `<extension>.<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    /// Short name of the owning extension, e.g. `ban`.
    pub extension: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Permission {
    pub fn new(extension: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            name: name.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn fullname(&self) -> String {
        format!("{}.{}", self.extension, self.name)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.extension, self.name)
    }
}

/// Default levels for permissions that have no stored row yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDefaults {
    /// Level used when no override applies.
    pub default_level: i64,

    /// `{extension: {permission_name: level}}`
    #[serde(default)]
    pub overrides: HashMap<String, HashMap<String, i64>>,
}

impl PermissionDefaults {
    pub fn new(default_level: i64) -> Self {
        Self {
            default_level,
            overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, extension: &str, name: &str, level: i64) -> Self {
        self.overrides
            .entry(extension.to_string())
            .or_default()
            .insert(name.to_string(), level);
        self
    }

    pub fn level_for(&self, permission: &Permission) -> i64 {
        self.overrides
            .get(&permission.extension)
            .and_then(|names| names.get(&permission.name))
            .copied()
            .unwrap_or(self.default_level)
    }
}

/// Resolves, updates and checks named permissions.
pub struct PermissionService {
    model: PermissionModel,
    defaults: PermissionDefaults,
    resolver: Arc<PermissionLevelResolver>,
}

impl PermissionService {
    pub fn new(
        model: PermissionModel,
        defaults: PermissionDefaults,
        resolver: Arc<PermissionLevelResolver>,
    ) -> Self {
        Self {
            model,
            defaults,
            resolver,
        }
    }

    pub fn resolver(&self) -> &Arc<PermissionLevelResolver> {
        &self.resolver
    }

    pub fn levels(&self) -> &PermissionLevels {
        self.resolver.levels()
    }

    /// The level currently required by `permission`.
    ///
    /// # Errors
    /// `AlbertoError::UnrecognisedPermissionLevel` when the stored value is
    /// not a declared level.
    pub async fn resolve(&self, permission: &Permission) -> Result<PermissionLevel> {
        let stored = self
            .model
            .get(&permission.fullname(), self.defaults.level_for(permission))
            .await?;
        Ok(self.levels().find(stored)?.clone())
    }

    /// Require `level` for `permission` from now on.
    pub async fn set(&self, permission: &Permission, level: &PermissionLevel) -> Result<()> {
        self.levels().find(level.level)?;
        self.model.set(&permission.fullname(), level.level).await
    }

    /// Whether the invocation meets the level `permission` requires.
    pub async fn check_permissions(
        &self,
        permission: &Permission,
        ctx: &InvocationContext,
    ) -> Result<bool> {
        let required = self.resolve(permission).await?;
        self.resolver.check_permissions(&required, ctx).await
    }

    /// Every stored permission row, sorted by name.
    pub async fn all(&self) -> Result<Vec<PermissionRow>> {
        self.model.all().await
    }

    /// A command check requiring `permission`.
    pub fn check(self: &Arc<Self>, permission: Permission) -> Check {
        let service = Arc::clone(self);
        check_fn(move |ctx| {
            let service = Arc::clone(&service);
            let permission = permission.clone();
            async move { service.check_permissions(&permission, &ctx).await }
        })
    }
}

/// What a command check gates on.
#[derive(Debug, Clone)]
pub enum PermissionGate {
    /// A fixed level.
    Level(PermissionLevel),
    /// A named permission whose level is stored.
    Permission(Permission),
}

impl From<PermissionLevel> for PermissionGate {
    fn from(level: PermissionLevel) -> Self {
        PermissionGate::Level(level)
    }
}

impl From<Permission> for PermissionGate {
    fn from(permission: Permission) -> Self {
        PermissionGate::Permission(permission)
    }
}

/// Build the host check for `gate`.
pub fn check_permission_level(service: &Arc<PermissionService>, gate: impl Into<PermissionGate>) -> Check {
    match gate.into() {
        PermissionGate::Level(level) => service.resolver().check(level),
        PermissionGate::Permission(permission) => service.check(permission),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AlbertoError;
    use crate::permissions::context::Actor;
    use crate::permissions::level::default_levels;
    use crate::permissions::resolver::RoleStrategy;
    use crate::storage::{MemoryCache, MemoryStore, Store};
    use std::time::Duration;

    fn service_with(
        defaults: PermissionDefaults,
    ) -> (Arc<PermissionService>, Arc<MemoryStore<PermissionRow>>) {
        let levels = Arc::new(PermissionLevels::new(default_levels()).unwrap());
        let resolver = Arc::new(PermissionLevelResolver::new(
            Arc::clone(&levels),
            Arc::new(RoleStrategy::new(Arc::clone(&levels))),
        ));
        let store = Arc::new(MemoryStore::<PermissionRow>::new());
        let model = PermissionModel::new(
            Arc::new(MemoryCache::new()),
            store.clone(),
            Duration::from_secs(60),
        );
        (
            Arc::new(PermissionService::new(model, defaults, resolver)),
            store,
        )
    }

    #[test]
    fn test_fullname() {
        let permission = Permission::new("ban", "kick").with_description("Kick members");
        assert_eq!(permission.fullname(), "ban.kick");
        assert_eq!(permission.to_string(), "ban.kick");
    }

    #[test]
    fn test_defaults_prefer_override() {
        let defaults = PermissionDefaults::new(0).with_override("ban", "ban", 50);
        assert_eq!(defaults.level_for(&Permission::new("ban", "ban")), 50);
        assert_eq!(defaults.level_for(&Permission::new("ban", "unban")), 0);
        assert_eq!(defaults.level_for(&Permission::new("kick", "ban")), 0);
    }

    #[tokio::test]
    async fn test_resolve_uses_override_default() {
        let (service, store) = service_with(PermissionDefaults::new(0).with_override("ban", "ban", 100));

        let level = service.resolve(&Permission::new("ban", "ban")).await.unwrap();
        assert_eq!(level.name, "administrator");
        assert_eq!(store.get("ban.ban").await.unwrap().unwrap().level, 100);
    }

    #[tokio::test]
    async fn test_resolve_unrecognised_stored_level() {
        let (service, store) = service_with(PermissionDefaults::new(0));
        store
            .add(PermissionRow {
                permission: "ban.ban".into(),
                level: 42,
            })
            .await
            .unwrap();

        assert!(matches!(
            service.resolve(&Permission::new("ban", "ban")).await,
            Err(AlbertoError::UnrecognisedPermissionLevel(42))
        ));
    }

    #[tokio::test]
    async fn test_set_then_resolve() {
        let (service, _store) = service_with(PermissionDefaults::new(0));
        let permission = Permission::new("mute", "mute");
        let moderator = service.levels().find(50).unwrap().clone();

        service.resolve(&permission).await.unwrap();
        service.set(&permission, &moderator).await.unwrap();
        assert_eq!(service.resolve(&permission).await.unwrap(), moderator);
    }

    #[tokio::test]
    async fn test_set_rejects_undeclared_level() {
        let (service, store) = service_with(PermissionDefaults::new(0));
        let result = service
            .set(&Permission::new("mute", "mute"), &PermissionLevel::new("custom", 7))
            .await;

        assert!(result.is_err());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_check_permission_level_gates() {
        let (service, _store) = service_with(PermissionDefaults::new(50));
        let by_permission = check_permission_level(&service, Permission::new("kick", "kick"));
        let by_level = check_permission_level(&service, service.levels().find(100).unwrap().clone());

        let moderator =
            InvocationContext::new(Actor::new(1).with_guild_permissions(&["KICK_MEMBERS"]));
        let member = InvocationContext::new(Actor::new(2));

        assert!(by_permission(&moderator).await.unwrap());
        assert!(!by_permission(&member).await.unwrap());
        assert!(!by_level(&moderator).await.unwrap());
    }

    #[tokio::test]
    async fn test_all_lists_resolved_permissions() {
        let (service, _store) = service_with(PermissionDefaults::new(0));
        service.resolve(&Permission::new("kick", "kick")).await.unwrap();
        service.resolve(&Permission::new("ban", "ban")).await.unwrap();

        let names: Vec<String> = service
            .all()
            .await
            .unwrap()
            .into_iter()
            .map(|row| row.permission)
            .collect();
        assert_eq!(names, vec!["ban.ban", "kick.kick"]);
    }
}
