//! Extension registry for AlbertoX3
//!
//! Extensions are compiled into the binary. Every extension module registers
//! an activator under its package path (`folder.group.name`); activating a
//! discovered descriptor runs that activator, which declares the module's
//! extension implementation(s) through a [`ModuleScope`]. The registry then
//! answers which implementations belong to which packages.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{AlbertoError, Result};
use crate::permissions::Permission;

use super::loader::SetupContext;
use super::types::{ExtensionDescriptor, Requirements};

/// An extension implementation.
///
/// Everything except `name` has a default: an extension that does not
/// declare itself enabled stays disabled, and one that declares no
/// requirements needs nothing.
pub trait Extension: Send + Sync {
    /// Implementation name, used in logs.
    fn name(&self) -> &str;

    /// Whether the extension wants to be enabled. Unmet requirements may
    /// still disable it.
    fn enabled(&self) -> bool {
        false
    }

    fn requires(&self) -> Requirements {
        Requirements::none()
    }

    /// Permissions this extension gates its commands behind.
    fn permissions(&self) -> Vec<Permission> {
        Vec::new()
    }

    /// Register commands and listeners with the host.
    fn setup(&self, _ctx: &mut SetupContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// An extension implementation together with the package that declared it.
#[derive(Clone)]
pub struct ExtensionClass {
    pub package: String,
    pub extension: Arc<dyn Extension>,
}

impl ExtensionClass {
    pub fn name(&self) -> &str {
        self.extension.name()
    }
}

impl fmt::Debug for ExtensionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionClass")
            .field("package", &self.package)
            .field("name", &self.extension.name())
            .field("enabled", &self.extension.enabled())
            .finish()
    }
}

/// Handed to an activator so the module can declare its implementations.
pub struct ModuleScope<'a> {
    package: &'a str,
    declared: &'a mut Vec<ExtensionClass>,
}

impl ModuleScope<'_> {
    /// Package the activator runs for.
    pub fn package(&self) -> &str {
        self.package
    }

    /// Declare an extension implementation provided by this package.
    pub fn declare<E: Extension + 'static>(&mut self, extension: E) {
        self.declare_arc(Arc::new(extension));
    }

    pub fn declare_arc(&mut self, extension: Arc<dyn Extension>) {
        debug!(package = %self.package, extension = %extension.name(), "Declared extension class");
        self.declared.push(ExtensionClass {
            package: self.package.to_string(),
            extension,
        });
    }
}

/// Module activator: runs once per package, may fail for any reason.
pub type Activator = Arc<dyn Fn(&mut ModuleScope<'_>) -> anyhow::Result<()> + Send + Sync>;

/// Process-scoped registry of extension modules and their declared classes.
#[derive(Default)]
pub struct ExtensionRegistry {
    /// Map from package path to the module's activator.
    modules: HashMap<String, Activator>,

    /// Packages whose activator already ran successfully.
    activated: HashSet<String>,

    /// Classes declared by activated modules, in declaration order.
    classes: Vec<ExtensionClass>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the activator of the module living at `package`.
    ///
    /// Registering the same package again replaces the activator; classes it
    /// already declared stay.
    pub fn register_module<F>(&mut self, package: impl Into<String>, activator: F)
    where
        F: Fn(&mut ModuleScope<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let package = package.into();
        if self.modules.insert(package.clone(), Arc::new(activator)).is_some() {
            warn!(package = %package, "Replaced extension module activator");
        }
    }

    /// Whether a module is registered for `package`.
    pub fn has_module(&self, package: &str) -> bool {
        self.modules.contains_key(package)
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Activate the module backing `descriptor`.
    ///
    /// Activation is cached: a package whose activator succeeded is not run
    /// again. A failing activator leaves no classes behind.
    ///
    /// # Errors
    /// `AlbertoError::Activation` if no module is registered for the package
    /// or its activator fails.
    pub fn activate(&mut self, descriptor: &ExtensionDescriptor) -> Result<()> {
        let package = descriptor.package();
        if self.activated.contains(&package) {
            return Ok(());
        }

        let activator = self
            .modules
            .get(&package)
            .cloned()
            .ok_or_else(|| AlbertoError::Activation {
                package: package.clone(),
                source: anyhow::anyhow!("no extension module registered for this package"),
            })?;

        let mut declared = Vec::new();
        let mut scope = ModuleScope {
            package: &package,
            declared: &mut declared,
        };
        activator(&mut scope).map_err(|source| AlbertoError::Activation {
            package: package.clone(),
            source,
        })?;

        self.classes.extend(declared);
        self.activated.insert(package);
        Ok(())
    }

    /// Every declared class whose package belongs to one of `descriptors`.
    pub fn classes_of<'a, I>(&self, descriptors: I) -> Vec<ExtensionClass>
    where
        I: IntoIterator<Item = &'a ExtensionDescriptor>,
    {
        let packages: HashSet<String> = descriptors.into_iter().map(|d| d.package()).collect();
        self.classes
            .iter()
            .filter(|class| packages.contains(&class.package))
            .cloned()
            .collect()
    }

    /// Every class declared so far.
    pub fn classes(&self) -> &[ExtensionClass] {
        &self.classes
    }

    /// Activate `descriptor` and return its single extension class.
    ///
    /// Returns `Ok(None)` when activation fails: that is an environmental
    /// problem and only disables the extension.
    ///
    /// # Errors
    /// - `AlbertoError::NoExtension` if the package declared no class
    /// - `AlbertoError::TooManyExtensions` if it declared more than one
    pub fn load_class(&mut self, descriptor: &ExtensionDescriptor) -> Result<Option<ExtensionClass>> {
        if let Err(e) = self.activate(descriptor) {
            warn!(
                package = %descriptor.package(),
                error = %e,
                "Something unexpected happened while loading extension"
            );
            return Ok(None);
        }

        let mut classes = self.classes_of([descriptor]);
        match classes.len() {
            0 => Err(AlbertoError::NoExtension {
                package: descriptor.package(),
            }),
            1 => Ok(classes.pop()),
            count => Err(AlbertoError::TooManyExtensions {
                package: descriptor.package(),
                count,
            }),
        }
    }
}

/// Every permission declared by `classes`, in class order.
pub fn collect_permissions(classes: &[ExtensionClass]) -> Vec<Permission> {
    classes
        .iter()
        .flat_map(|class| class.extension.permissions())
        .collect()
}
