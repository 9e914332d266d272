//! Built-in extensions.
//!
//! The bundled extension set, registered into an [`ExtensionRegistry`] under
//! a given root folder name. Each extension declares its requirements,
//! permissions and command surface; the platform behaviour behind the
//! commands lives in the host.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::error::Result;
use crate::extensions::{
    Extension, ExtensionRegistry, Feature, Requirements, SetupContext, UNIT_SUFFIX,
};
use crate::host::{check_fn, CommandRegistry};
use crate::permissions::{InvocationContext, Permission, PermissionLevels};

/// Name of the command that runs another command with the highest level.
pub const SUDO_COMMAND: &str = "sudo";

/// What gates a built-in command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    /// Permission of the owning extension with this name.
    Permission(&'static str),
    /// Only the configured owner.
    Owner,
}

#[derive(Debug, Clone, Copy)]
struct CommandSpec {
    name: &'static str,
    aliases: &'static [&'static str],
    gate: Gate,
}

/// One bundled extension.
#[derive(Debug, Clone)]
pub struct BuiltinExtension {
    group: &'static str,
    name: &'static str,
    class: &'static str,
    enabled: bool,
    requires: &'static [&'static str],
    permissions: &'static [&'static str],
    features: &'static [Feature],
    commands: &'static [CommandSpec],
    listeners: &'static [&'static str],
}

impl BuiltinExtension {
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.group, self.name)
    }

    fn permission(&self, name: &str) -> Permission {
        Permission::new(self.name, name)
    }
}

impl Extension for BuiltinExtension {
    fn name(&self) -> &str {
        self.class
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn requires(&self) -> Requirements {
        self.requires
            .iter()
            .fold(Requirements::none(), |req, ext| req.with_ext(*ext))
    }

    fn permissions(&self) -> Vec<Permission> {
        self.permissions.iter().map(|p| self.permission(p)).collect()
    }

    fn setup(&self, ctx: &mut SetupContext<'_>) -> Result<()> {
        for spec in self.commands {
            let mut command = ctx.command(spec.name);
            for alias in spec.aliases {
                command = command.alias(*alias);
            }
            command = match spec.gate {
                Gate::Permission(name) => command.check(ctx.require(self.permission(name))),
                Gate::Owner => {
                    let owner_id = ctx.owner_id;
                    command.check(check_fn(move |inv| async move {
                        Ok(owner_id == Some(inv.actor.id))
                    }))
                }
            };
            ctx.add_command(command)?;
        }
        for event in self.listeners {
            ctx.add_listener(event);
        }
        debug!(extension = %self.full_name(), commands = self.commands.len(), "Built-in extension set up");
        Ok(())
    }
}

const NO_COMMANDS: &[CommandSpec] = &[];

/// The bundled extension set.
pub static BUILTIN_EXTENSIONS: &[BuiltinExtension] = &[
    BuiltinExtension {
        group: "moderation",
        name: "ban",
        class: "Ban",
        enabled: true,
        requires: &[],
        permissions: &["ban", "unban", "tempban"],
        features: &[Feature::Colors, Feature::Db, Feature::Permissions, Feature::Settings],
        commands: &[CommandSpec {
            name: "ban",
            aliases: &[],
            gate: Gate::Permission("ban"),
        }],
        listeners: &["startup"],
    },
    BuiltinExtension {
        group: "moderation",
        name: "kick",
        class: "Kick",
        enabled: false,
        requires: &[],
        permissions: &["kick"],
        features: &[Feature::Db, Feature::Permissions],
        commands: NO_COMMANDS,
        listeners: &[],
    },
    BuiltinExtension {
        group: "moderation",
        name: "mute",
        class: "Mute",
        enabled: false,
        requires: &[],
        permissions: &[],
        features: &[Feature::Colors, Feature::Db],
        commands: NO_COMMANDS,
        listeners: &[],
    },
    BuiltinExtension {
        group: "moderation",
        name: "delete",
        class: "Delete",
        enabled: true,
        requires: &[],
        permissions: &["delete"],
        features: &[Feature::Db, Feature::Permissions],
        commands: &[CommandSpec {
            name: "delete",
            aliases: &["del"],
            gate: Gate::Permission("delete"),
        }],
        listeners: &[],
    },
    BuiltinExtension {
        group: "administration",
        name: "permissions",
        class: "Permissions",
        enabled: false,
        requires: &["administration.roles"],
        permissions: &[],
        features: &[],
        commands: NO_COMMANDS,
        listeners: &[],
    },
    BuiltinExtension {
        group: "administration",
        name: "roles",
        class: "Roles",
        enabled: false,
        requires: &[],
        permissions: &[],
        features: &[],
        commands: NO_COMMANDS,
        listeners: &[],
    },
    BuiltinExtension {
        group: "administration",
        name: "sudo",
        class: "Sudo",
        enabled: true,
        requires: &[],
        permissions: &[],
        features: &[],
        commands: &[CommandSpec {
            name: SUDO_COMMAND,
            aliases: &["!!"],
            gate: Gate::Owner,
        }],
        listeners: &["command_completion"],
    },
    BuiltinExtension {
        group: "administration",
        name: "maintenance",
        class: "Maintenance",
        enabled: false,
        requires: &["administration.roles"],
        permissions: &[],
        features: &[],
        commands: NO_COMMANDS,
        listeners: &[],
    },
    BuiltinExtension {
        group: "development",
        name: "config",
        class: "Config",
        enabled: false,
        requires: &[],
        permissions: &[],
        features: &[],
        commands: NO_COMMANDS,
        listeners: &[],
    },
    BuiltinExtension {
        group: "development",
        name: "db",
        class: "DB",
        enabled: false,
        requires: &[],
        permissions: &[],
        features: &[],
        commands: NO_COMMANDS,
        listeners: &[],
    },
    BuiltinExtension {
        group: "settings",
        name: "language",
        class: "Language",
        enabled: false,
        requires: &[],
        permissions: &[],
        features: &[],
        commands: NO_COMMANDS,
        listeners: &[],
    },
];

/// Register every built-in extension module under `folder`.
pub fn register_builtin_extensions(registry: &mut ExtensionRegistry, folder: &str) {
    for builtin in BUILTIN_EXTENSIONS {
        let package = format!("{}.{}", folder, builtin.full_name());
        registry.register_module(package, move |scope| {
            scope.declare(builtin.clone());
            Ok(())
        });
    }
    debug!(folder, count = BUILTIN_EXTENSIONS.len(), "Registered built-in extensions");
}

/// Run the checks of `command` as `sudo <command>`.
///
/// The invocation must pass the checks of the `sudo` command itself; the
/// checks of `command` then run with the override set to the highest
/// declared level. The caller's context is left untouched.
///
/// # Errors
/// `AlbertoError::Config` if `sudo` or `command` is not registered, plus any
/// error a check returns.
pub async fn run_sudo(
    host: &CommandRegistry,
    levels: &PermissionLevels,
    ctx: &InvocationContext,
    command: &str,
) -> Result<bool> {
    if !host.run_checks(SUDO_COMMAND, ctx).await? {
        info!(actor = ctx.actor.id, command, "Refused sudo");
        return Ok(false);
    }

    let elevated = ctx.clone().sudo(levels);
    info!(actor = ctx.actor.id, command, level = %levels.max(), "Running command with sudo");
    host.run_checks(command, &elevated).await
}

/// Create the on-disk layout of the built-in extensions under `root`.
///
/// Existing files are left untouched. Returns the number of files created.
pub fn scaffold_layout(root: &Path) -> Result<usize> {
    let mut created = 0;
    for builtin in BUILTIN_EXTENSIONS {
        let dir = root.join(builtin.group).join(builtin.name);
        fs::create_dir_all(&dir)?;

        let units = std::iter::once(Feature::Ext).chain(builtin.features.iter().copied());
        for feature in units {
            let path = dir.join(format!("{}{}", feature.unit_name(), UNIT_SUFFIX));
            if !path.exists() {
                fs::write(&path, "")?;
                created += 1;
            }
        }
    }
    info!(root = %root.display(), created, "Scaffolded built-in extensions");
    Ok(created)
}
