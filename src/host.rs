//! Command host surface.
//!
//! Extensions register their commands and listeners through [`CommandHost`].
//! The chat platform framework sits behind this trait; [`CommandRegistry`]
//! is the in-process implementation used by the binary and in tests.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, info, warn};

use crate::error::{AlbertoError, Result};
use crate::permissions::InvocationContext;

/// A predicate the host runs before invoking a command.
pub type Check = Arc<dyn Fn(&InvocationContext) -> BoxFuture<'static, Result<bool>> + Send + Sync>;

/// Build a [`Check`] from an async closure taking an owned context.
pub fn check_fn<F, Fut>(f: F) -> Check
where
    F: Fn(InvocationContext) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<bool>> + Send + 'static,
{
    Arc::new(move |ctx: &InvocationContext| -> BoxFuture<'static, Result<bool>> {
        Box::pin(f(ctx.clone()))
    })
}

/// A command an extension registers.
#[derive(Clone)]
pub struct Command {
    /// Invocation name.
    pub name: String,

    /// Alternative invocation names.
    pub aliases: Vec<String>,

    /// Full name of the extension that registered the command.
    pub extension: String,

    /// Checks run in order before the command.
    pub checks: Vec<Check>,
}

impl Command {
    pub fn new(name: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            extension: extension.into(),
            checks: Vec::new(),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("extension", &self.extension)
            .field("checks", &self.checks.len())
            .finish()
    }
}

/// An event listener an extension registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listener {
    /// Event name, e.g. `startup`.
    pub event: String,

    /// Full name of the extension that registered the listener.
    pub extension: String,
}

impl Listener {
    pub fn new(event: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            extension: extension.into(),
        }
    }
}

/// Registration surface populated by enabled extensions.
pub trait CommandHost: Send {
    fn add_command(&mut self, command: Command) -> Result<()>;

    fn add_listener(&mut self, listener: Listener);
}

/// In-process command host.
#[derive(Default)]
pub struct CommandRegistry {
    /// Map from command name to command.
    commands: HashMap<String, Command>,

    /// Map from alias to command name.
    aliases: HashMap<String, String>,

    listeners: Vec<Listener>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a command by name or alias.
    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(name).or_else(|| {
            self.aliases
                .get(name)
                .and_then(|target| self.commands.get(target))
        })
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    /// Command names, sorted.
    pub fn command_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn listeners(&self) -> &[Listener] {
        &self.listeners
    }

    /// Run the checks of `name` in order, stopping at the first `false`.
    ///
    /// # Errors
    /// - `AlbertoError::Config` if no command is registered under `name`
    /// - any error a check returns
    pub async fn run_checks(&self, name: &str, ctx: &InvocationContext) -> Result<bool> {
        let command = self
            .get(name)
            .ok_or_else(|| AlbertoError::Config(format!("Unknown command '{}'", name)))?;

        for (index, check) in command.checks.iter().enumerate() {
            if !check(ctx).await? {
                debug!(command = %command.name, check = index, actor = ctx.actor.id, "Check failed");
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl CommandHost for CommandRegistry {
    /// Add a command. Names and aliases must be unique across extensions.
    fn add_command(&mut self, command: Command) -> Result<()> {
        for name in std::iter::once(&command.name).chain(command.aliases.iter()) {
            if let Some(existing) = self.get(name) {
                if existing.extension != command.extension {
                    return Err(AlbertoError::Config(format!(
                        "Command name '{}' from extension '{}' conflicts with a command from extension '{}'",
                        name, command.extension, existing.extension
                    )));
                }
                warn!(command = %name, "Replacing command");
            }
        }

        if let Some(replaced) = self.commands.remove(&command.name) {
            for alias in &replaced.aliases {
                if self.aliases.get(alias) == Some(&replaced.name) {
                    self.aliases.remove(alias);
                }
            }
        }
        self.aliases.remove(&command.name);

        for alias in &command.aliases {
            self.aliases.insert(alias.clone(), command.name.clone());
        }
        info!(command = %command.name, extension = %command.extension, "Registered command");
        self.commands.insert(command.name.clone(), command);
        Ok(())
    }

    fn add_listener(&mut self, listener: Listener) {
        debug!(event = %listener.event, extension = %listener.extension, "Registered listener");
        self.listeners.push(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::Actor;

    fn always(value: bool) -> Check {
        check_fn(move |_| async move { Ok(value) })
    }

    fn ctx() -> InvocationContext {
        InvocationContext::new(Actor::new(1))
    }

    #[test]
    fn test_register_and_lookup_by_alias() {
        let mut host = CommandRegistry::new();
        host.add_command(Command::new("delete", "moderation.delete").alias("del"))
            .unwrap();

        assert_eq!(host.command_count(), 1);
        assert_eq!(host.get("del").unwrap().name, "delete");
        assert!(host.get("purge").is_none());
    }

    #[test]
    fn test_name_conflict_between_extensions() {
        let mut host = CommandRegistry::new();
        host.add_command(Command::new("ban", "moderation.ban")).unwrap();

        let err = host
            .add_command(Command::new("ban", "moderation.kick"))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("conflicts"));
        assert!(msg.contains("moderation.ban"));
        assert!(msg.contains("moderation.kick"));
    }

    #[test]
    fn test_replacing_command_drops_its_old_aliases() {
        let mut host = CommandRegistry::new();
        host.add_command(Command::new("delete", "moderation.delete").alias("del"))
            .unwrap();
        host.add_command(Command::new("delete", "moderation.delete").alias("rm"))
            .unwrap();

        assert_eq!(host.command_count(), 1);
        assert!(host.get("del").is_none());
        assert_eq!(host.get("rm").unwrap().name, "delete");
        assert_eq!(host.get("delete").unwrap().aliases, vec!["rm"]);
    }

    #[test]
    fn test_alias_conflict_between_extensions() {
        let mut host = CommandRegistry::new();
        host.add_command(Command::new("delete", "moderation.delete").alias("del"))
            .unwrap();
        assert!(host
            .add_command(Command::new("del", "moderation.kick"))
            .is_err());
    }

    #[tokio::test]
    async fn test_run_checks_stops_at_first_failure() {
        let mut host = CommandRegistry::new();
        host.add_command(
            Command::new("ban", "moderation.ban")
                .check(always(true))
                .check(always(false))
                .check(check_fn(|_| async {
                    Err(AlbertoError::Config("must not run".into()))
                })),
        )
        .unwrap();

        assert!(!host.run_checks("ban", &ctx()).await.unwrap());
    }

    #[tokio::test]
    async fn test_run_checks_all_pass() {
        let mut host = CommandRegistry::new();
        host.add_command(Command::new("kick", "moderation.kick").check(always(true)))
            .unwrap();
        host.add_command(Command::new("ping", "misc.ping")).unwrap();

        assert!(host.run_checks("kick", &ctx()).await.unwrap());
        assert!(host.run_checks("ping", &ctx()).await.unwrap());
    }

    #[tokio::test]
    async fn test_run_checks_unknown_command() {
        let host = CommandRegistry::new();
        assert!(host.run_checks("nope", &ctx()).await.is_err());
    }

    #[test]
    fn test_listeners() {
        let mut host = CommandRegistry::new();
        host.add_listener(Listener::new("startup", "moderation.ban"));
        assert_eq!(host.listeners().len(), 1);
        assert_eq!(host.listeners()[0].event, "startup");
    }
}
