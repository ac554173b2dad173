// src/repository/references.rs

//! Package reference manifest
//!
//! The reference manifest records the caller's declared intent: the ordered
//! list of packages a project says it uses, distinct from what is currently
//! unpacked on disk. Restore reads it to find what is missing; install and
//! uninstall keep it in step with the package store.
//!
//! Writes go through a temp-file-then-rename step so a crash never leaves a
//! torn manifest.

use crate::archive::write_json_atomic;
use crate::error::Result;
use crate::package::FrameworkName;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// File name of the reference manifest inside a local repository
pub const REFERENCES_FILE_NAME: &str = "references.json";

/// One declared package reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageReference {
    pub id: String,
    pub version: Version,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_framework: Option<FrameworkName>,
    #[serde(default)]
    pub development_dependency: bool,
}

impl PackageReference {
    pub fn new(id: impl Into<String>, version: Version) -> Self {
        Self {
            id: id.into(),
            version,
            target_framework: None,
            development_dependency: false,
        }
    }

    /// Case-insensitive match against an id+version pair
    pub fn matches(&self, id: &str, version: &Version) -> bool {
        self.id.eq_ignore_ascii_case(id) && self.version == *version
    }
}

/// The on-disk reference manifest
#[derive(Debug, Clone)]
pub struct ReferenceFile {
    path: PathBuf,
}

impl ReferenceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read all references in manifest order; an absent file is empty
    pub fn read(&self) -> Result<Vec<PackageReference>> {
        match fs::read(&self.path) {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the manifest contents atomically
    pub fn write(&self, references: &[PackageReference]) -> Result<()> {
        write_json_atomic(&self.path, &references)
    }

    /// Append a reference, replacing any record with the same id+version
    pub fn add(&self, reference: PackageReference) -> Result<()> {
        let mut references = self.read()?;
        references.retain(|r| !r.matches(&reference.id, &reference.version));
        references.push(reference);
        self.write(&references)
    }

    /// Remove the record for id+version; returns whether one was present
    pub fn remove(&self, id: &str, version: &Version) -> Result<bool> {
        let mut references = self.read()?;
        let before = references.len();
        references.retain(|r| !r.matches(id, version));
        if references.len() == before {
            return Ok(false);
        }
        self.write(&references)?;
        Ok(true)
    }

    /// Check for a record matching id+version
    pub fn contains(&self, id: &str, version: &Version) -> Result<bool> {
        Ok(self.read()?.iter().any(|r| r.matches(id, version)))
    }
}
