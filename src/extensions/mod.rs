//! Extension system for AlbertoX3
//!
//! Extensions live on disk as `<root>/<group>/<name>/ext.rs` plus optional
//! feature units. Discovery turns that layout into descriptors, the registry
//! maps descriptors to compiled extension implementations, and requirement
//! checking decides which extensions are enabled.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use albertox3::extensions::{discover_extensions, resolve_extensions, ExtensionRegistry, StaticInventory};
//!
//! let mut registry = ExtensionRegistry::new();
//! let descriptors = discover_extensions(Path::new("./extensions")).unwrap();
//! let resolution = resolve_extensions(&mut registry, &StaticInventory::default(), &descriptors).unwrap();
//! println!("{} enabled", resolution.enabled.len());
//! ```

pub mod discovery;
pub mod inventory;
pub mod loader;
pub mod registry;
pub mod requirements;
pub mod types;

pub use discovery::{discover_extensions, UNIT_SUFFIX};
pub use inventory::{CommandInventory, LibraryInventory, StaticInventory};
pub use loader::{load_extensions, setup_extensions, SetupContext};
pub use registry::{collect_permissions, Extension, ExtensionClass, ExtensionRegistry, ModuleScope};
pub use requirements::{
    check_extension_requirements, match_version, resolve_extensions, DisableReason, Resolution,
};
pub use types::{
    ExtensionDescriptor, Feature, Features, LibRequirement, Requirements, VersionOp,
};
