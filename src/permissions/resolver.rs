//! Actor level resolution.
//!
//! An invocation's effective level is its override when one is set;
//! otherwise a deployment [`LevelStrategy`] maps the actor to a level.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use super::context::{Actor, InvocationContext};
use super::level::{PermissionLevel, PermissionLevels};
use crate::error::Result;
use crate::host::{check_fn, Check};

/// Maps an actor to its permission level.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LevelStrategy: Send + Sync {
    async fn level_of(&self, actor: &Actor) -> Result<PermissionLevel>;
}

/// Role-based strategy.
///
/// The actor gets the highest declared level whose `roles` or
/// `guild_permissions` it holds, or the lowest level when none match. The
/// configured owner always gets the highest level.
pub struct RoleStrategy {
    levels: Arc<PermissionLevels>,
    owner_id: Option<u64>,
}

impl RoleStrategy {
    pub fn new(levels: Arc<PermissionLevels>) -> Self {
        Self {
            levels,
            owner_id: None,
        }
    }

    pub fn with_owner(mut self, owner_id: Option<u64>) -> Self {
        self.owner_id = owner_id;
        self
    }
}

#[async_trait]
impl LevelStrategy for RoleStrategy {
    async fn level_of(&self, actor: &Actor) -> Result<PermissionLevel> {
        if self.owner_id == Some(actor.id) {
            return Ok(self.levels.max().clone());
        }

        let roles: HashSet<&str> = actor.roles.iter().map(String::as_str).collect();
        let perms: HashSet<&str> = actor
            .guild_permissions
            .iter()
            .map(String::as_str)
            .collect();

        let granted = self.levels.iter().rev().find(|level| {
            level.roles.iter().any(|r| roles.contains(r.as_str()))
                || level
                    .guild_permissions
                    .iter()
                    .any(|p| perms.contains(p.as_str()))
        });

        Ok(granted.unwrap_or_else(|| self.levels.min()).clone())
    }
}

/// Resolves and checks the effective level of an invocation.
pub struct PermissionLevelResolver {
    levels: Arc<PermissionLevels>,
    strategy: Arc<dyn LevelStrategy>,
}

impl PermissionLevelResolver {
    pub fn new(levels: Arc<PermissionLevels>, strategy: Arc<dyn LevelStrategy>) -> Self {
        Self { levels, strategy }
    }

    pub fn levels(&self) -> &PermissionLevels {
        &self.levels
    }

    /// The override if set, else the strategy's level for the actor.
    pub async fn get_permission_level(&self, ctx: &InvocationContext) -> Result<PermissionLevel> {
        if let Some(level) = &ctx.permission_override {
            trace!(actor = ctx.actor.id, level = %level, "Using permission override");
            return Ok(level.clone());
        }
        self.strategy.level_of(&ctx.actor).await
    }

    /// Whether the invocation's level is at least `level`.
    pub async fn check_permissions(
        &self,
        level: &PermissionLevel,
        ctx: &InvocationContext,
    ) -> Result<bool> {
        let actual = self.get_permission_level(ctx).await?;
        Ok(actual.meets(level))
    }

    /// A command check requiring `level`.
    pub fn check(self: &Arc<Self>, level: PermissionLevel) -> Check {
        let resolver = Arc::clone(self);
        check_fn(move |ctx| {
            let resolver = Arc::clone(&resolver);
            let level = level.clone();
            async move { resolver.check_permissions(&level, &ctx).await }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::level::default_levels;

    fn levels() -> Arc<PermissionLevels> {
        Arc::new(PermissionLevels::new(default_levels()).unwrap())
    }

    fn level(value: i64) -> PermissionLevel {
        levels().find(value).unwrap().clone()
    }

    #[tokio::test]
    async fn test_override_takes_precedence() {
        let mut strategy = MockLevelStrategy::new();
        strategy.expect_level_of().never();

        let resolver = PermissionLevelResolver::new(levels(), Arc::new(strategy));
        let ctx = InvocationContext::new(Actor::new(1)).with_override(level(50));

        assert_eq!(resolver.get_permission_level(&ctx).await.unwrap().level, 50);
    }

    #[tokio::test]
    async fn test_strategy_used_without_override() {
        let mut strategy = MockLevelStrategy::new();
        strategy
            .expect_level_of()
            .times(1)
            .returning(|_| Ok(PermissionLevel::new("administrator", 100)));

        let resolver = PermissionLevelResolver::new(levels(), Arc::new(strategy));
        let ctx = InvocationContext::new(Actor::new(1));

        assert_eq!(resolver.get_permission_level(&ctx).await.unwrap().level, 100);
    }

    #[tokio::test]
    async fn test_check_permissions_boundary() {
        let mut strategy = MockLevelStrategy::new();
        strategy
            .expect_level_of()
            .returning(|_| Ok(PermissionLevel::new("moderator", 50)));
        let resolver = PermissionLevelResolver::new(levels(), Arc::new(strategy));
        let ctx = InvocationContext::new(Actor::new(1));

        assert!(resolver.check_permissions(&level(0), &ctx).await.unwrap());
        assert!(resolver.check_permissions(&level(50), &ctx).await.unwrap());
        assert!(!resolver.check_permissions(&level(100), &ctx).await.unwrap());
    }

    #[tokio::test]
    async fn test_role_strategy() {
        let levels = Arc::new(
            PermissionLevels::new(vec![
                PermissionLevel::new("public", 0),
                PermissionLevel::new("team", 10).with_roles(&["Team"]),
                PermissionLevel::new("admin", 100).with_guild_permissions(&["ADMINISTRATOR"]),
            ])
            .unwrap(),
        );
        let strategy = RoleStrategy::new(Arc::clone(&levels)).with_owner(Some(42));

        let nobody = Actor::new(1);
        let team = Actor::new(2).with_roles(&["Team"]);
        let both = Actor::new(3)
            .with_roles(&["Team"])
            .with_guild_permissions(&["ADMINISTRATOR"]);
        let owner = Actor::new(42);

        assert_eq!(strategy.level_of(&nobody).await.unwrap().level, 0);
        assert_eq!(strategy.level_of(&team).await.unwrap().level, 10);
        assert_eq!(strategy.level_of(&both).await.unwrap().level, 100);
        assert_eq!(strategy.level_of(&owner).await.unwrap().level, 100);
    }

    #[tokio::test]
    async fn test_check_closure() {
        let strategy = RoleStrategy::new(levels());
        let resolver = Arc::new(PermissionLevelResolver::new(levels(), Arc::new(strategy)));
        let check = resolver.check(level(50));

        let moderator = InvocationContext::new(Actor::new(1).with_guild_permissions(&["KICK_MEMBERS"]));
        let member = InvocationContext::new(Actor::new(2));
        let sudo = InvocationContext::new(Actor::new(2)).sudo(resolver.levels());

        assert!(check(&moderator).await.unwrap());
        assert!(!check(&member).await.unwrap());
        assert!(check(&sudo).await.unwrap());
    }
}
