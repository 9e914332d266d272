//! Extension loading.
//!
//! Discovers the extensions under a root folder, resolves which of them can
//! be enabled and lets every enabled extension register its commands and
//! listeners with the host.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::Result;
use crate::host::{Check, Command, CommandHost, Listener};
use crate::permissions::{check_permission_level, PermissionGate, PermissionService};

use super::discovery::discover_extensions;
use super::inventory::LibraryInventory;
use super::registry::ExtensionRegistry;
use super::requirements::{resolve_extensions, DisableReason, Resolution};
use super::types::ExtensionDescriptor;

/// What an extension sees while registering itself.
pub struct SetupContext<'a> {
    pub host: &'a mut dyn CommandHost,
    pub permissions: Arc<PermissionService>,

    /// Actor id allowed to use owner-only commands.
    pub owner_id: Option<u64>,

    descriptor: &'a ExtensionDescriptor,
}

impl<'a> SetupContext<'a> {
    pub fn new(
        descriptor: &'a ExtensionDescriptor,
        host: &'a mut dyn CommandHost,
        permissions: Arc<PermissionService>,
        owner_id: Option<u64>,
    ) -> Self {
        Self {
            host,
            permissions,
            owner_id,
            descriptor,
        }
    }

    pub fn descriptor(&self) -> &ExtensionDescriptor {
        self.descriptor
    }

    /// A new command owned by the extension being set up.
    pub fn command(&self, name: &str) -> Command {
        Command::new(name, self.descriptor.full_name())
    }

    pub fn add_command(&mut self, command: Command) -> Result<()> {
        self.host.add_command(command)
    }

    pub fn add_listener(&mut self, event: &str) {
        let listener = Listener::new(event, self.descriptor.full_name());
        self.host.add_listener(listener);
    }

    /// A check gating on a level or a named permission.
    pub fn require(&self, gate: impl Into<PermissionGate>) -> Check {
        check_permission_level(&self.permissions, gate)
    }
}

/// Let every enabled extension register with `host`, in full-name order.
///
/// Returns the number of extensions set up.
pub fn setup_extensions(
    resolution: &Resolution,
    host: &mut dyn CommandHost,
    permissions: &Arc<PermissionService>,
    owner_id: Option<u64>,
) -> Result<usize> {
    let mut count = 0;
    for (descriptor, class) in resolution.enabled_classes() {
        info!(extension = %descriptor.full_name(), class = class.name(), "Loading extension");
        let mut ctx = SetupContext::new(descriptor, &mut *host, Arc::clone(permissions), owner_id);
        class.extension.setup(&mut ctx)?;
        count += 1;
    }
    Ok(count)
}

/// Discover, resolve and set up the extensions under `root`.
///
/// # Errors
/// Structural extension errors and setup errors are returned; extensions
/// that fail to load or have unmet requirements are only skipped.
pub fn load_extensions(
    root: &Path,
    registry: &mut ExtensionRegistry,
    inventory: &dyn LibraryInventory,
    host: &mut dyn CommandHost,
    permissions: &Arc<PermissionService>,
    owner_id: Option<u64>,
) -> Result<Resolution> {
    let descriptors = discover_extensions(root)?;
    let resolution = resolve_extensions(registry, inventory, &descriptors)?;

    let mut skipped: Vec<_> = resolution.disabled.iter().collect();
    skipped.sort_by_key(|(desc, _)| desc.full_name());
    for (descriptor, reason) in skipped {
        match reason {
            DisableReason::Disabled => {
                info!(extension = %descriptor.full_name(), "Extension is disabled")
            }
            reason => {
                warn!(extension = %descriptor.full_name(), reason = %reason, "Skipping extension")
            }
        }
    }

    let count = setup_extensions(&resolution, host, permissions, owner_id)?;
    info!(
        loaded = count,
        skipped = resolution.disabled.len(),
        "Extensions loaded"
    );
    Ok(resolution)
}
