// src/repository/local.rs

//! Local repository: the record of installed packages
//!
//! Installed packages live unpacked under the repository root, one
//! directory per id+version, each carrying its own manifest. Beside them
//! sits the reference manifest (`references.json`) recording the caller's
//! declared intent. "Currently unpacked on disk" is derived by scanning the
//! store; the reference list is authoritative for what the project wants.

use super::{
    select_package, PackageReference, ReferenceFile, ReferenceTracking, Repository,
    REFERENCES_FILE_NAME,
};
use crate::archive;
use crate::error::Result;
use crate::package::{FrameworkName, PackageIdentity, PackageModel};
use crate::version::VersionRange;
use semver::Version;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Disk-backed repository of installed packages plus a reference manifest
pub struct LocalRepository {
    name: String,
    root: PathBuf,
    references: ReferenceFile,
}

impl LocalRepository {
    /// Open (or initialize) a local repository rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let references = ReferenceFile::new(root.join(REFERENCES_FILE_NAME));
        Ok(Self {
            name: "local".to_string(),
            root,
            references,
        })
    }

    /// The directory a package's content lives in
    pub fn package_dir(&self, identity: &PackageIdentity) -> PathBuf {
        self.root
            .join(format!("{}.{}", identity.id(), identity.version()))
    }

    /// The repository root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan the store for package directories, skipping unreadable entries
    fn load_all(&self) -> Result<Vec<PackageModel>> {
        let mut packages = Vec::new();
        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| std::io::Error::other(e.to_string()))?;
            if !entry.file_type().is_dir() {
                continue;
            }
            if !archive::package_exists(entry.path()) {
                continue;
            }
            match archive::load_package(entry.path()) {
                Ok(package) => packages.push(package),
                Err(e) => {
                    warn!(
                        "skipping unreadable package at {}: {}",
                        entry.path().display(),
                        e
                    );
                }
            }
        }
        Ok(packages)
    }
}

impl Repository for LocalRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn find_package(
        &self,
        id: &str,
        range: Option<&VersionRange>,
        allow_prerelease: bool,
        allow_unlisted: bool,
    ) -> Result<Option<PackageModel>> {
        let packages = self.load_all()?;
        select_package(&packages, id, range, allow_prerelease, allow_unlisted)
    }

    fn get_packages(&self) -> Result<Vec<PackageModel>> {
        self.load_all()
    }

    fn add_package(&mut self, package: PackageModel) -> Result<()> {
        package.validate()?;
        let identity = package.identity()?;
        let dir = self.package_dir(&identity);
        if archive::package_exists(&dir) {
            debug!("local repository already holds {}, skipping add", identity);
            return Ok(());
        }
        archive::save_package(&dir, &package)
    }

    fn remove_package(&mut self, identity: &PackageIdentity) -> Result<()> {
        let dir = self.package_dir(identity);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
            debug!("removed {} from local repository", identity);
        }
        Ok(())
    }

    fn reference_tracking(&mut self) -> Option<&mut dyn ReferenceTracking> {
        Some(self)
    }
}

impl ReferenceTracking for LocalRepository {
    fn register_reference(
        &mut self,
        id: &str,
        version: &Version,
        target_framework: Option<FrameworkName>,
        development_dependency: bool,
    ) -> Result<()> {
        let mut reference = PackageReference::new(id, version.clone());
        reference.target_framework = target_framework;
        reference.development_dependency = development_dependency;
        self.references.add(reference)
    }

    fn unregister_reference(&mut self, id: &str, version: &Version) -> Result<()> {
        self.references.remove(id, version)?;
        Ok(())
    }

    fn references(&self) -> Result<Vec<PackageReference>> {
        self.references.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::PackageFile;
    use crate::version::parse_version;

    fn package(id: &str, version: &str) -> PackageModel {
        let mut package = PackageModel::new(id, parse_version(version).unwrap());
        package
            .files
            .push(PackageFile::new("content/readme.txt", b"hello".to_vec()).unwrap());
        package.seal();
        package
    }

    fn identity(id: &str, version: &str) -> PackageIdentity {
        PackageIdentity::new(id, parse_version(version).unwrap()).unwrap()
    }

    #[test]
    fn test_add_find_remove_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut repo = LocalRepository::new(dir.path()).unwrap();

        repo.add_package(package("A", "1.0.0")).unwrap();
        assert!(repo.exists("a", None).unwrap());

        let found = repo.find_package("A", None, false, false).unwrap().unwrap();
        assert_eq!(found.files.len(), 1);

        repo.remove_package(&identity("A", "1.0.0")).unwrap();
        assert!(!repo.exists("A", None).unwrap());
    }

    #[test]
    fn test_add_is_idempotent_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut repo = LocalRepository::new(dir.path()).unwrap();

        repo.add_package(package("A", "1.0.0")).unwrap();
        repo.add_package(package("A", "1.0.0")).unwrap();
        assert_eq!(repo.get_packages().unwrap().len(), 1);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut repo = LocalRepository::new(dir.path()).unwrap();
        assert!(repo.remove_package(&identity("A", "1.0.0")).is_ok());
    }

    #[test]
    fn test_snapshot_survives_later_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let mut repo = LocalRepository::new(dir.path()).unwrap();
        repo.add_package(package("A", "1.0.0")).unwrap();

        let snapshot = repo.get_packages().unwrap();
        repo.remove_package(&identity("A", "1.0.0")).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert!(repo.get_packages().unwrap().is_empty());
    }

    #[test]
    fn test_reference_tracking_capability() {
        let dir = tempfile::tempdir().unwrap();
        let mut repo = LocalRepository::new(dir.path()).unwrap();

        let tracking = repo.reference_tracking().unwrap();
        tracking
            .register_reference("A", &parse_version("1.0.0").unwrap(), None, false)
            .unwrap();
        assert_eq!(tracking.references().unwrap().len(), 1);

        tracking
            .unregister_reference("a", &parse_version("1.0.0").unwrap())
            .unwrap();
        assert!(tracking.references().unwrap().is_empty());
    }

    #[test]
    fn test_versions_of_one_id_are_distinct_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut repo = LocalRepository::new(dir.path()).unwrap();

        repo.add_package(package("A", "1.0.0")).unwrap();
        repo.add_package(package("A", "2.0.0")).unwrap();

        assert_eq!(repo.get_packages().unwrap().len(), 2);
        let found = repo.find_package("A", None, false, false).unwrap().unwrap();
        assert_eq!(found.version, Some(parse_version("2.0.0").unwrap()));
    }
}
