// src/package/dependency.rs

//! Dependency declarations
//!
//! A package declares its requirements as dependency sets: each set targets
//! an optional framework and lists the packages required when that framework
//! applies. Framework assembly references name platform assemblies the
//! consuming project must reference.

use crate::error::{Error, Result};
use crate::package::framework::FrameworkName;
use crate::version::VersionRange;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A dependency on another package, optionally constrained to a range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDependency {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_range: Option<VersionRange>,
}

impl PackageDependency {
    /// Unconstrained dependency on any version of `id`
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::empty_argument("dependency id"));
        }
        Ok(Self {
            id,
            version_range: None,
        })
    }

    /// Dependency constrained to a version range
    pub fn with_range(id: impl Into<String>, range: VersionRange) -> Result<Self> {
        let mut dep = Self::new(id)?;
        dep.version_range = Some(range);
        Ok(dep)
    }

    /// Check whether a candidate version satisfies this dependency
    pub fn matches(&self, version: &Version) -> bool {
        match &self.version_range {
            Some(range) => range.satisfies(version),
            None => true,
        }
    }
}

impl fmt::Display for PackageDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version_range {
            Some(range) => write!(f, "{} ({})", self.id, range),
            None => write!(f, "{}", self.id),
        }
    }
}

/// A group of dependencies applying to one target framework
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_framework: Option<FrameworkName>,
    pub dependencies: Vec<PackageDependency>,
}

impl DependencySet {
    /// Empty set for the given target framework (none = applies everywhere)
    pub fn new(target_framework: Option<FrameworkName>) -> Self {
        Self {
            target_framework,
            dependencies: Vec::new(),
        }
    }

    /// Set with an initial dependency list
    pub fn with_dependencies(
        target_framework: Option<FrameworkName>,
        dependencies: Vec<PackageDependency>,
    ) -> Self {
        Self {
            target_framework,
            dependencies,
        }
    }

    /// Whether this set applies when installing into `target`
    ///
    /// A set without a target framework applies to every project; a project
    /// without a known framework takes every set.
    pub fn applies_to(&self, target: Option<&FrameworkName>) -> bool {
        match (&self.target_framework, target) {
            (None, _) => true,
            (Some(_), None) => true,
            (Some(set_fx), Some(project_fx)) => set_fx == project_fx,
        }
    }
}

/// A platform assembly reference with the frameworks it supports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkAssemblyReference {
    pub assembly_name: String,
    #[serde(default)]
    pub supported_frameworks: Vec<FrameworkName>,
}

impl FrameworkAssemblyReference {
    /// Reference supported on every framework
    pub fn new(assembly_name: impl Into<String>) -> Result<Self> {
        let assembly_name = assembly_name.into();
        if assembly_name.trim().is_empty() {
            return Err(Error::empty_argument("assembly name"));
        }
        Ok(Self {
            assembly_name,
            supported_frameworks: Vec::new(),
        })
    }

    /// Reference restricted to the given frameworks
    pub fn with_frameworks(
        assembly_name: impl Into<String>,
        supported_frameworks: Vec<FrameworkName>,
    ) -> Result<Self> {
        let mut reference = Self::new(assembly_name)?;
        reference.supported_frameworks = supported_frameworks;
        Ok(reference)
    }

    /// Case-insensitive assembly name comparison
    pub fn name_matches(&self, other: &str) -> bool {
        self.assembly_name.eq_ignore_ascii_case(other)
    }
}
