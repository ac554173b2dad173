// src/repository/mod.rs

//! Repository abstraction over collections of packages
//!
//! A repository stores zero or more packages, queryable by id, id+range,
//! and prerelease/unlisted visibility. Implementations:
//! - `MemoryRepository`: in-process store (source double, building block)
//! - `LocalRepository`: installed packages plus the reference manifest
//! - `MachineCache`: process-wide disk cache with hash-based staleness
//! - `AggregateRepository`: ordered first-match over several repositories
//!
//! Mutation is idempotent by contract: adding a present identity and
//! removing an absent one are both no-ops, so callers never need existence
//! pre-checks.

mod aggregate;
mod cache;
mod local;
mod memory;
mod references;

pub use aggregate::AggregateRepository;
pub use cache::{CacheLookup, MachineCache};
pub use local::LocalRepository;
pub use memory::MemoryRepository;
pub use references::{PackageReference, ReferenceFile, REFERENCES_FILE_NAME};

use crate::error::{Error, Result};
use crate::package::{FrameworkName, PackageIdentity, PackageModel};
use crate::version::VersionRange;
use semver::Version;

/// Capability a repository may expose for tracking declared references
///
/// The local repository implements this; plain stores do not. Callers query
/// it through [`Repository::reference_tracking`] instead of downcasting.
pub trait ReferenceTracking {
    /// Record a reference, replacing any record with the same id+version
    fn register_reference(
        &mut self,
        id: &str,
        version: &Version,
        target_framework: Option<FrameworkName>,
        development_dependency: bool,
    ) -> Result<()>;

    /// Drop the reference for id+version; absent records are a no-op
    fn unregister_reference(&mut self, id: &str, version: &Version) -> Result<()>;

    /// The declared references, in manifest order
    fn references(&self) -> Result<Vec<PackageReference>>;
}

/// Storage/query contract shared by every repository kind
pub trait Repository: Send {
    /// Name used in logs and aggregate failure reports
    fn name(&self) -> &str;

    /// Highest version of `id` satisfying `range` among eligible candidates
    ///
    /// Prerelease versions are eligible when `allow_prerelease` is set or
    /// the range itself names a prerelease bound; unlisted packages only
    /// when `allow_unlisted` is set. Not-found is `Ok(None)`, never an
    /// error; an empty id is `InvalidArgument`.
    fn find_package(
        &self,
        id: &str,
        range: Option<&VersionRange>,
        allow_prerelease: bool,
        allow_unlisted: bool,
    ) -> Result<Option<PackageModel>>;

    /// Point-in-time snapshot of every package in the repository
    fn get_packages(&self) -> Result<Vec<PackageModel>>;

    /// Add a package; adding an already-present identity is a no-op
    fn add_package(&mut self, package: PackageModel) -> Result<()>;

    /// Remove a package; removing an absent identity is a no-op
    fn remove_package(&mut self, identity: &PackageIdentity) -> Result<()>;

    /// Check for any (or one exact) version of `id`
    fn exists(&self, id: &str, version: Option<&Version>) -> Result<bool> {
        let range = version.map(|v| VersionRange::exact(v.clone()));
        Ok(self
            .find_package(id, range.as_ref(), true, true)?
            .is_some())
    }

    /// Materialize the full content of one exact package
    ///
    /// This is the download seam: metadata queries go through
    /// [`Repository::find_package`], content retrieval through here. The
    /// default delegates; remote-backed implementations override it with
    /// the actual transfer.
    fn fetch_package(&self, identity: &PackageIdentity) -> Result<Option<PackageModel>> {
        let range = VersionRange::exact(identity.version().clone());
        self.find_package(identity.id(), Some(&range), true, true)
    }

    /// Typed capability query for reference tracking (none by default)
    fn reference_tracking(&mut self) -> Option<&mut dyn ReferenceTracking> {
        None
    }
}

/// Shared candidate selection for list-backed repositories
///
/// Returns the highest eligible version of `id` satisfying `range`.
pub(crate) fn select_package(
    candidates: &[PackageModel],
    id: &str,
    range: Option<&VersionRange>,
    allow_prerelease: bool,
    allow_unlisted: bool,
) -> Result<Option<PackageModel>> {
    if id.trim().is_empty() {
        return Err(Error::empty_argument("package id"));
    }

    let allow_prerelease =
        allow_prerelease || range.is_some_and(VersionRange::permits_prerelease);

    let mut best: Option<&PackageModel> = None;
    for candidate in candidates {
        if !candidate.id.eq_ignore_ascii_case(id) {
            continue;
        }
        if !candidate.listed && !allow_unlisted {
            continue;
        }
        let Some(version) = candidate.version.as_ref() else {
            continue;
        };
        if !version.pre.is_empty() && !allow_prerelease {
            continue;
        }
        if let Some(range) = range {
            if !range.satisfies(version) {
                continue;
            }
        }
        let better = match best.and_then(|b| b.version.as_ref()) {
            Some(best_version) => version > best_version,
            None => true,
        };
        if better {
            best = Some(candidate);
        }
    }

    Ok(best.cloned())
}
