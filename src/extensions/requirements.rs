//! Extension requirement checks.
//!
//! Computes which discovered extensions can be enabled. An extension is
//! disabled when it failed to load, does not declare itself enabled, needs a
//! library that is not installed, or (transitively) needs an extension that is
//! disabled or absent. The result is the fixed point of that closure.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use tracing::{debug, info, warn};

use crate::error::{AlbertoError, Result};

use super::inventory::LibraryInventory;
use super::registry::{ExtensionClass, ExtensionRegistry};
use super::types::{ExtensionDescriptor, LibRequirement, VersionOp};

/// Why an extension ended up disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisableReason {
    /// Activating the extension module failed.
    LoadFailed,
    /// The extension does not declare itself enabled.
    Disabled,
    /// A required library is not installed.
    MissingLibrary(String),
    /// A required extension is disabled or absent.
    MissingDependency(String),
}

impl fmt::Display for DisableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisableReason::LoadFailed => write!(f, "failed to load"),
            DisableReason::Disabled => write!(f, "disabled"),
            DisableReason::MissingLibrary(lib) => write!(f, "missing library {}", lib),
            DisableReason::MissingDependency(ext) => write!(f, "missing extension {}", ext),
        }
    }
}

/// Outcome of a resolution pass.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Extensions whose requirements are met.
    pub enabled: HashSet<ExtensionDescriptor>,

    /// Disabled extensions with the first reason found for each.
    pub disabled: HashMap<ExtensionDescriptor, DisableReason>,

    /// Loaded extension classes, for every extension that loaded.
    pub classes: HashMap<ExtensionDescriptor, ExtensionClass>,
}

impl Resolution {
    /// Enabled extensions with their classes, sorted by full name.
    pub fn enabled_classes(&self) -> Vec<(&ExtensionDescriptor, &ExtensionClass)> {
        let mut enabled: Vec<_> = self
            .enabled
            .iter()
            .filter_map(|desc| self.classes.get(desc).map(|class| (desc, class)))
            .collect();
        enabled.sort_by_key(|(desc, _)| desc.full_name());
        enabled
    }
}

/// Order in which the unsatisfied-dependency queue is drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QueueOrder {
    Lifo,
    Fifo,
}

/// Check every extension's requirements and return the enabled subset.
///
/// # Errors
/// Structural errors from loading (`NoExtension`, `TooManyExtensions`,
/// `InvalidRequirement`) abort the whole pass.
pub fn check_extension_requirements<'a, I>(
    registry: &mut ExtensionRegistry,
    inventory: &dyn LibraryInventory,
    extensions: I,
) -> Result<HashSet<ExtensionDescriptor>>
where
    I: IntoIterator<Item = &'a ExtensionDescriptor>,
{
    Ok(resolve_extensions(registry, inventory, extensions)?.enabled)
}

/// Like [`check_extension_requirements`], keeping classes and disable reasons.
pub fn resolve_extensions<'a, I>(
    registry: &mut ExtensionRegistry,
    inventory: &dyn LibraryInventory,
    extensions: I,
) -> Result<Resolution>
where
    I: IntoIterator<Item = &'a ExtensionDescriptor>,
{
    resolve_with_order(registry, inventory, extensions, QueueOrder::Lifo)
}

pub(crate) fn resolve_with_order<'a, I>(
    registry: &mut ExtensionRegistry,
    inventory: &dyn LibraryInventory,
    extensions: I,
    order: QueueOrder,
) -> Result<Resolution>
where
    I: IntoIterator<Item = &'a ExtensionDescriptor>,
{
    let libraries = inventory.installed_libraries();

    let mut extensions: Vec<&ExtensionDescriptor> = extensions.into_iter().collect();
    extensions.sort_by_key(|desc| desc.package());
    extensions.dedup_by(|a, b| a == b);

    let mut classes: HashMap<ExtensionDescriptor, ExtensionClass> = HashMap::new();
    let mut disabled: HashMap<ExtensionDescriptor, DisableReason> = HashMap::new();

    // 1. directly disabled extensions
    for extension in extensions {
        let Some(class) = registry.load_class(extension)? else {
            disabled.insert(extension.clone(), DisableReason::LoadFailed);
            continue;
        };

        if !class.extension.enabled() {
            disabled.insert(extension.clone(), DisableReason::Disabled);
        } else if let Some(lib) = missing_library(extension, &class, &libraries)? {
            disabled.insert(extension.clone(), DisableReason::MissingLibrary(lib));
        }

        classes.insert(extension.clone(), class);
    }

    // 2. reverse dependency edges
    let mut required_by: HashMap<String, Vec<ExtensionDescriptor>> = HashMap::new();
    for (desc, class) in &classes {
        for dep in class.extension.requires().ext {
            required_by.entry(dep).or_default().push(desc.clone());
        }
    }

    // 3. dependencies nobody can satisfy
    let available: HashSet<String> = classes
        .keys()
        .filter(|desc| !disabled.contains_key(*desc))
        .map(|desc| desc.full_name())
        .collect();
    let mut unsatisfied: VecDeque<String> = required_by
        .keys()
        .filter(|dep| !available.contains(*dep))
        .cloned()
        .collect();

    // 4. propagate
    loop {
        let next = match order {
            QueueOrder::Lifo => unsatisfied.pop_back(),
            QueueOrder::Fifo => unsatisfied.pop_front(),
        };
        let Some(dependency) = next else {
            break;
        };
        let Some(dependants) = required_by.get(&dependency) else {
            continue;
        };
        for dependant in dependants {
            if disabled.contains_key(dependant) {
                continue;
            }
            debug!(
                extension = %dependant.full_name(),
                dependency = %dependency,
                "Disabling extension with unmet dependency"
            );
            disabled.insert(
                dependant.clone(),
                DisableReason::MissingDependency(dependency.clone()),
            );
            unsatisfied.push_back(dependant.full_name());
        }
    }

    // 5. everything loaded and not disabled
    let enabled: HashSet<ExtensionDescriptor> = classes
        .keys()
        .filter(|desc| !disabled.contains_key(*desc))
        .cloned()
        .collect();

    info!(
        enabled = enabled.len(),
        disabled = disabled.len(),
        "Resolved extension requirements"
    );

    Ok(Resolution {
        enabled,
        disabled,
        classes,
    })
}

/// First required library missing from `libraries`, if any.
///
/// Version constraints are parsed but not enforced.
fn missing_library(
    extension: &ExtensionDescriptor,
    class: &ExtensionClass,
    libraries: &HashMap<String, String>,
) -> Result<Option<String>> {
    let package = extension.package();
    for requirement in class.extension.requires().lib {
        let requirement = LibRequirement::parse(&requirement, &package)?;
        let Some(installed) = libraries.get(&requirement.name) else {
            return Ok(Some(requirement.name));
        };
        if let Some((op, version)) = &requirement.constraint {
            warn!(
                package = %package,
                library = %requirement.name,
                constraint = %format!("{}{}", op.as_str(), version),
                installed = %installed,
                "Library version constraints are not enforced"
            );
        }
    }
    Ok(None)
}

/// Compare two dotted numeric versions with `op`.
///
/// Missing components count as zero (`1.2` == `1.2.0`). `~=` requires an
/// equal major version and a minor-and-later part of `v1` at least that of
/// `v2`.
///
/// # Errors
/// `AlbertoError::DeveloperArgument` if a component is not a number.
pub fn match_version(v1: &str, op: VersionOp, v2: &str) -> Result<bool> {
    let mut a = parse_version(v1)?;
    let mut b = parse_version(v2)?;

    let len = a.len().max(b.len()).max(2);
    a.resize(len, 0);
    b.resize(len, 0);

    let ordering = a.cmp(&b);
    Ok(match op {
        VersionOp::Eq => ordering == Ordering::Equal,
        VersionOp::Ne => ordering != Ordering::Equal,
        VersionOp::Ge => ordering != Ordering::Less,
        VersionOp::Le => ordering != Ordering::Greater,
        VersionOp::Compatible => a[0] == b[0] && a[1..] >= b[1..],
    })
}

fn parse_version(version: &str) -> Result<Vec<u64>> {
    version
        .split('.')
        .map(|part| {
            part.parse::<u64>().map_err(|_| {
                AlbertoError::DeveloperArgument(format!("invalid version '{}'", version))
            })
        })
        .collect()
}
