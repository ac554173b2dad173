// src/error.rs

//! Crate-wide error type and result alias
//!
//! Every terminal error carries the offending identifier (package id, file
//! path, dependency chain) in its display output so CLI and IDE layers can
//! render an actionable message without re-deriving context.

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by repositories, the planner, and the package manager
#[derive(Debug, Error)]
pub enum Error {
    /// Empty identifiers, self-referential dependencies, malformed input
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Malformed version or version range string
    #[error("invalid version string '{input}': {reason}")]
    VersionParse { input: String, reason: String },

    /// Requested id/version absent from the queried repository
    #[error("unable to find package '{id}'")]
    PackageNotFound { id: String },

    /// Uninstall or update target absent from the local repository
    #[error("package '{id}' is not installed")]
    PackageNotInstalled { id: String },

    /// The planner detected a cycle while resolving transitive dependencies
    #[error("circular dependency detected: {}", .chain.join(" -> "))]
    DependencyCycle { chain: Vec<String> },

    /// Uninstall blocked by packages that still depend on the target
    #[error("unable to uninstall '{id}' because {} depend(s) on it", .dependents.join(", "))]
    DependentsExist { id: String, dependents: Vec<String> },

    /// A repository in an aggregate failed to answer a query
    #[error("repository '{name}' is unavailable: {reason}")]
    RepositoryUnavailable { name: String, reason: String },

    /// Unpack/delete against the project file system failed
    #[error("file system operation failed: {0}")]
    FileSystem(#[from] std::io::Error),

    /// A package or reference manifest could not be serialized or parsed
    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for an invalid-argument error naming the empty parameter
    pub fn empty_argument(name: &str) -> Self {
        Error::InvalidArgument(format!("'{}' must not be empty", name))
    }
}
