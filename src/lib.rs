// src/lib.rs

//! Wharf Package Manager
//!
//! Project-level package manager: resolves, fetches, installs, updates,
//! uninstalls, and merges versioned packages into a target file tree,
//! tracking installed state and satisfying inter-package dependency
//! constraints.
//!
//! # Architecture
//!
//! - Repositories: source, local (installed state + reference manifest),
//!   machine cache, and ordered aggregates, behind one query contract
//! - Planner: deterministic dependency walker producing ordered
//!   install/uninstall plans, pure over both repositories
//! - Orchestrator: applies plans to the project file system and local
//!   repository, reconciling installs against the machine cache by content
//!   hash, rolling registration back on partial failure
//! - Merger: folds independently-authored packages into one, surfacing
//!   conflicts as data instead of picking winners silently

pub mod archive;
mod error;
pub mod filesystem;
pub mod hash;
pub mod manager;
pub mod merge;
pub mod package;
pub mod planner;
pub mod progress;
pub mod repository;
pub mod restore;
pub mod version;

pub use error::{Error, Result};
pub use filesystem::{DiskFileSystem, PathResolver, ProjectFileSystem};
pub use hash::{ContentHash, Hasher};
pub use manager::PackageManager;
pub use merge::{MergeConflict, PackageMerger};
pub use package::{
    DependencySet, FrameworkAssemblyReference, FrameworkName, PackageDependency, PackageFile,
    PackageIdentity, PackageModel,
};
pub use planner::{
    InstallOperation, InstallOptions, InstallPlanner, OperationKind, UninstallOptions,
};
pub use progress::{CallbackObserver, LogObserver, OperationEvent, OperationObserver};
pub use repository::{
    AggregateRepository, CacheLookup, LocalRepository, MachineCache, MemoryRepository,
    PackageReference, ReferenceTracking, Repository,
};
pub use restore::{
    missing_references, restore_missing, spawn_restore, BackgroundRestore, RestoreSummary,
};
pub use version::{parse_version, VersionRange};
