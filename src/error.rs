//! Error types for AlbertoX3
//!
//! This module defines all error types used throughout the AlbertoX3 core.
//! Uses `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.
//!
//! Errors fall into two families. Structural and developer errors
//! (`NoExtension`, `TooManyExtensions`, `InvalidRequirement`,
//! `UnrecognisedPermissionLevel`, ...) are propagated immediately.
//! Operational errors (`Activation`) are caught where they happen and turned
//! into a disabled extension.

use thiserror::Error;

/// The primary error type for AlbertoX3 operations.
#[derive(Error, Debug)]
pub enum AlbertoError {
    /// An extension package was activated but declared no extension class.
    #[error("No extension class could be found in {package}!")]
    NoExtension { package: String },

    /// An extension package declared more than one extension class.
    #[error("Too many extension classes found in {package}! ({count} declared)")]
    TooManyExtensions { package: String, count: usize },

    /// A library requirement string could not be parsed.
    #[error("Invalid library requirement '{requirement}' in {package}")]
    InvalidRequirement { package: String, requirement: String },

    /// Activating an extension package failed (missing module, failing activator).
    #[error("Failed to activate {package}: {source}")]
    Activation {
        package: String,
        #[source]
        source: anyhow::Error,
    },

    /// A stored or configured level has no matching declared permission level.
    #[error("Permission level {0} not found!")]
    UnrecognisedPermissionLevel(i64),

    /// A declared permission level is out of range.
    #[error("Permission level has to be at least 0 and not {0}!")]
    InvalidPermissionLevel(i64),

    /// A value could not be coerced into a boolean.
    #[error("Unable to assign {0} to either true or false!")]
    UnrecognisedBoolean(String),

    /// Invalid argument combination supplied by calling code.
    #[error("Developer argument error: {0}")]
    DeveloperArgument(String),

    /// User input rejected by an argument converter.
    #[error("Bad argument: {0}")]
    BadArgument(String),

    /// A future failed while racing others in `gather_any`.
    #[error("An error occurred in future {index} while gathering: {source}")]
    GatherAny {
        index: usize,
        #[source]
        source: Box<AlbertoError>,
    },

    /// Configuration-related errors (invalid config, unreadable folders, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cache collaborator failures or malformed cached values
    #[error("Cache error: {0}")]
    Cache(String),

    /// Persistent store failures
    #[error("Store error: {0}")]
    Store(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AlbertoError {
    /// Whether this error comes from a malformed extension package.
    ///
    /// Structural errors abort dependency resolution instead of disabling
    /// the offending extension.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            AlbertoError::NoExtension { .. }
                | AlbertoError::TooManyExtensions { .. }
                | AlbertoError::InvalidRequirement { .. }
        )
    }
}

/// A specialized `Result` type for AlbertoX3 operations.
pub type Result<T> = std::result::Result<T, AlbertoError>;
