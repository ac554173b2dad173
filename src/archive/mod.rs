// src/archive/mod.rs

//! Package stream capability
//!
//! The physical container format is an external collaborator; this module
//! realizes its contract as a directory layout: a `manifest.json` describing
//! the package plus the payload files stored beside it. Open-for-read yields
//! a full `PackageModel`; open-for-write accepts one and produces the
//! layout. No resolution or merge logic lives here.
//!
//! Manifest writes go through a temp-file-then-rename step so a crashed
//! write never leaves a half-parseable manifest behind.

use crate::error::{Error, Result};
use crate::hash::ContentHash;
use crate::package::{
    split_tags, DependencySet, FrameworkAssemblyReference, PackageFile, PackageModel,
};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// File name of the package manifest inside a package directory
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

fn default_listed() -> bool {
    true
}

/// Serialized form of a package's metadata
///
/// Tags round-trip through their external whitespace-delimited form; file
/// entries carry paths only, with content stored beside the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub id: String,
    pub version: Version,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub require_license_acceptance: bool,
    #[serde(default)]
    pub development_dependency: bool,
    #[serde(default = "default_listed")]
    pub listed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub owners: Vec<String>,
    #[serde(default)]
    pub dependency_sets: Vec<DependencySet>,
    #[serde(default)]
    pub framework_references: Vec<FrameworkAssemblyReference>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

impl Manifest {
    /// Build the manifest for a package
    pub fn from_model(package: &PackageModel) -> Result<Self> {
        let identity = package.identity()?;
        Ok(Self {
            id: identity.id().to_string(),
            version: identity.version().clone(),
            title: package.title.clone(),
            description: package.description.clone(),
            summary: package.summary.clone(),
            release_notes: package.release_notes.clone(),
            copyright: package.copyright.clone(),
            language: package.language.clone(),
            license_url: package.license_url.clone(),
            project_url: package.project_url.clone(),
            icon_url: package.icon_url.clone(),
            require_license_acceptance: package.require_license_acceptance,
            development_dependency: package.development_dependency,
            listed: package.listed,
            tags: if package.tags.is_empty() {
                None
            } else {
                Some(package.tags_string())
            },
            authors: package.authors.clone(),
            owners: package.owners.clone(),
            dependency_sets: package.dependency_sets.clone(),
            framework_references: package.framework_references.clone(),
            files: package.files.iter().map(|f| f.path.clone()).collect(),
            content_hash: package.content_hash.as_ref().map(|h| h.as_str().to_string()),
        })
    }

    /// Rebuild the in-memory model, leaving files for the caller to load
    pub fn into_model(self) -> Result<PackageModel> {
        let content_hash = match self.content_hash {
            Some(hex) => Some(ContentHash::parse(hex).map_err(|e| {
                Error::InvalidArgument(format!("manifest for '{}': {}", self.id, e))
            })?),
            None => None,
        };

        Ok(PackageModel {
            id: self.id,
            version: Some(self.version),
            title: self.title,
            description: self.description,
            summary: self.summary,
            release_notes: self.release_notes,
            copyright: self.copyright,
            language: self.language,
            license_url: self.license_url,
            project_url: self.project_url,
            icon_url: self.icon_url,
            require_license_acceptance: self.require_license_acceptance,
            development_dependency: self.development_dependency,
            listed: self.listed,
            tags: self.tags.as_deref().map(split_tags).unwrap_or_default(),
            authors: self.authors,
            owners: self.owners,
            dependency_sets: self.dependency_sets,
            framework_references: self.framework_references,
            files: Vec::new(),
            content_hash,
        })
    }
}

/// Write `value` as JSON at `path` via a temp file and rename
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Serialize a package into `dir` (manifest plus payload files)
///
/// The directory is created if absent. The package is validated first so a
/// structurally broken model never reaches disk.
pub fn save_package(dir: &Path, package: &PackageModel) -> Result<()> {
    package.validate()?;
    write_package(dir, package)
}

/// Serialize without structural validation
///
/// The merger saves through here: merged output may legitimately carry
/// duplicate dependency ids for one target framework, which `validate`
/// rejects for ordinary packages.
pub(crate) fn write_package(dir: &Path, package: &PackageModel) -> Result<()> {
    fs::create_dir_all(dir)?;
    for file in &package.files {
        let dest = dir.join(&file.path);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&dest, &file.content)?;
    }

    let manifest = Manifest::from_model(package)?;
    write_json_atomic(&dir.join(MANIFEST_FILE_NAME), &manifest)?;
    debug!("saved package {} to {}", package.id, dir.display());
    Ok(())
}

/// Load a package (manifest plus payload files) from `dir`
pub fn load_package(dir: &Path) -> Result<PackageModel> {
    let manifest_path = dir.join(MANIFEST_FILE_NAME);
    let data = fs::read(&manifest_path)?;
    let manifest: Manifest = serde_json::from_slice(&data)?;

    let paths = manifest.files.clone();
    let mut package = manifest.into_model()?;
    for path in paths {
        let content = fs::read(dir.join(&path))?;
        package.files.push(PackageFile::new(path, content)?);
    }
    Ok(package)
}

/// Check whether `dir` holds a readable package manifest
pub fn package_exists(dir: &Path) -> bool {
    dir.join(MANIFEST_FILE_NAME).is_file()
}
