//! AlbertoX3 - core of a modular chat bot framework
//!
//! Extensions are discovered from a folder layout, checked against their
//! library and extension requirements, and set up against a command host.
//! Commands are gated by permission levels resolved per invocation.

pub mod builtin;
pub mod config;
pub mod error;
pub mod extensions;
pub mod host;
pub mod permissions;
pub mod storage;
pub mod utils;

pub use config::Config;
pub use error::{AlbertoError, Result};
pub use extensions::{
    discover_extensions, load_extensions, resolve_extensions, Extension, ExtensionDescriptor,
    ExtensionRegistry,
};
pub use host::{Check, Command, CommandHost, CommandRegistry};
pub use permissions::{
    check_permission_level, InvocationContext, Permission, PermissionLevel, PermissionService,
};
