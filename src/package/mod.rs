// src/package/mod.rs

//! In-memory package representation
//!
//! A `PackageModel` carries a package's metadata (scalars, authors/owners,
//! tags), its dependency declarations, framework assembly references, and
//! payload files. Identity is `(id, version)` with a case-insensitive id,
//! totally ordered so identities can key sets and maps.
//!
//! The model is a plain mutable value with exclusive ownership: whichever
//! component constructed it (a repository load, the merger, a test fixture)
//! mutates it alone; persisted forms are produced through the archive
//! module.

pub mod dependency;
pub mod files;
pub mod framework;

pub use dependency::{DependencySet, FrameworkAssemblyReference, PackageDependency};
pub use files::PackageFile;
pub use framework::FrameworkName;

use crate::error::{Error, Result};
use crate::hash::{ContentHash, Hasher};
use semver::Version;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher as StdHasher};

/// A package's identity: case-insensitive id plus version
#[derive(Debug, Clone)]
pub struct PackageIdentity {
    id: String,
    version: Version,
}

impl PackageIdentity {
    /// Create an identity; empty id is an invalid argument
    pub fn new(id: impl Into<String>, version: Version) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::empty_argument("package id"));
        }
        Ok(Self { id, version })
    }

    /// The id as originally written
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Case-insensitive id comparison against a bare string
    pub fn id_matches(&self, other: &str) -> bool {
        self.id.eq_ignore_ascii_case(other)
    }
}

impl PartialEq for PackageIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.id.eq_ignore_ascii_case(&other.id) && self.version == other.version
    }
}

impl Eq for PackageIdentity {}

impl Hash for PackageIdentity {
    fn hash<H: StdHasher>(&self, state: &mut H) {
        self.id.to_ascii_lowercase().hash(state);
        self.version.hash(state);
    }
}

impl Ord for PackageIdentity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id
            .to_ascii_lowercase()
            .cmp(&other.id.to_ascii_lowercase())
            .then_with(|| self.version.cmp(&other.version))
    }
}

impl PartialOrd for PackageIdentity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.version)
    }
}

/// Split a whitespace-delimited tag string into deduplicated tokens
///
/// Token comparison is case-sensitive and insertion order is preserved.
pub fn split_tags(tags: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for token in tags.split_whitespace() {
        if !seen.iter().any(|t: &String| t == token) {
            seen.push(token.to_string());
        }
    }
    seen
}

/// Join tag tokens back into the external whitespace-delimited form
pub fn join_tags(tags: &[String]) -> String {
    tags.join(" ")
}

/// A package's metadata, dependency declarations, and payload files
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PackageModel {
    pub id: String,
    pub version: Option<Version>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub release_notes: Option<String>,
    pub copyright: Option<String>,
    pub language: Option<String>,
    pub license_url: Option<String>,
    pub project_url: Option<String>,
    pub icon_url: Option<String>,
    pub require_license_acceptance: bool,
    /// Recorded in the reference manifest; excluded from packaging output
    pub development_dependency: bool,
    /// Unlisted packages are hidden from queries unless explicitly requested
    pub listed: bool,
    /// Individual tag tokens, deduplicated, insertion-ordered
    pub tags: Vec<String>,
    pub authors: Vec<String>,
    pub owners: Vec<String>,
    pub dependency_sets: Vec<DependencySet>,
    pub framework_references: Vec<FrameworkAssemblyReference>,
    pub files: Vec<PackageFile>,
    /// SHA-256 fingerprint, present once the package has been materialized
    pub content_hash: Option<ContentHash>,
}

impl PackageModel {
    /// Create a package with the only two required fields
    pub fn new(id: impl Into<String>, version: Version) -> Self {
        Self {
            id: id.into(),
            version: Some(version),
            listed: true,
            ..Default::default()
        }
    }

    /// The package's identity; fails when id or version is missing
    pub fn identity(&self) -> Result<PackageIdentity> {
        let version = self.version.clone().ok_or_else(|| {
            Error::InvalidArgument(format!("package '{}' has no version", self.id))
        })?;
        PackageIdentity::new(self.id.clone(), version)
    }

    /// True when the version carries a prerelease label
    pub fn is_prerelease(&self) -> bool {
        self.version.as_ref().is_some_and(|v| !v.pre.is_empty())
    }

    /// Replace tags from the external whitespace-delimited form
    pub fn set_tags(&mut self, tags: &str) {
        self.tags = split_tags(tags);
    }

    /// Tags in the external whitespace-delimited form
    pub fn tags_string(&self) -> String {
        join_tags(&self.tags)
    }

    /// Dependency sets applying to the given target framework, in
    /// declaration order
    pub fn dependency_sets_for(&self, target: Option<&FrameworkName>) -> Vec<&DependencySet> {
        self.dependency_sets
            .iter()
            .filter(|set| set.applies_to(target))
            .collect()
    }

    /// Enforce the structural invariants a well-formed package must hold
    ///
    /// - id and version present
    /// - no self-referential dependency (case-insensitive)
    /// - dependency ids unique within each set
    /// - framework reference assembly names unique (case-insensitive)
    /// - file paths unique (case-insensitive)
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::empty_argument("package id"));
        }
        if self.version.is_none() {
            return Err(Error::InvalidArgument(format!(
                "package '{}' has no version",
                self.id
            )));
        }

        for set in &self.dependency_sets {
            for (index, dep) in set.dependencies.iter().enumerate() {
                if dep.id.eq_ignore_ascii_case(&self.id) {
                    return Err(Error::InvalidArgument(format!(
                        "package '{}' cannot depend on itself",
                        self.id
                    )));
                }
                if set.dependencies[..index]
                    .iter()
                    .any(|earlier| earlier.id.eq_ignore_ascii_case(&dep.id))
                {
                    return Err(Error::InvalidArgument(format!(
                        "package '{}' declares dependency '{}' twice for one target framework",
                        self.id, dep.id
                    )));
                }
            }
        }

        for (index, reference) in self.framework_references.iter().enumerate() {
            if self.framework_references[..index]
                .iter()
                .any(|earlier| earlier.name_matches(&reference.assembly_name))
            {
                return Err(Error::InvalidArgument(format!(
                    "package '{}' declares assembly reference '{}' twice",
                    self.id, reference.assembly_name
                )));
            }
        }

        for (index, file) in self.files.iter().enumerate() {
            if self.files[..index]
                .iter()
                .any(|earlier| earlier.path_matches(&file.path))
            {
                return Err(Error::InvalidArgument(format!(
                    "package '{}' carries file '{}' twice",
                    self.id, file.path
                )));
            }
        }

        Ok(())
    }

    /// Deterministic SHA-256 fingerprint over identity and file contents
    ///
    /// Files are folded in sorted by case-folded path so enumeration order
    /// never changes the fingerprint.
    pub fn content_fingerprint(&self) -> ContentHash {
        let mut hasher = Hasher::new();
        hasher.update(self.id.to_ascii_lowercase().as_bytes());
        if let Some(version) = &self.version {
            hasher.update(version.to_string().as_bytes());
        }

        let mut order: Vec<usize> = (0..self.files.len()).collect();
        order.sort_by_key(|&i| self.files[i].path.to_ascii_lowercase());
        for i in order {
            let file = &self.files[i];
            hasher.update(file.path.to_ascii_lowercase().as_bytes());
            hasher.update(&(file.content.len() as u64).to_le_bytes());
            hasher.update(&file.content);
        }

        hasher.finalize()
    }

    /// Fill in `content_hash` from the current file set
    pub fn seal(&mut self) {
        self.content_hash = Some(self.content_fingerprint());
    }
}
