// src/repository/memory.rs

//! In-memory repository
//!
//! Backs source repositories in tests and serves as the building block for
//! anything that holds a plain package list.

use super::{select_package, Repository};
use crate::error::Result;
use crate::package::{PackageIdentity, PackageModel};
use crate::version::VersionRange;
use tracing::debug;

/// A repository holding its packages in memory
#[derive(Debug, Default)]
pub struct MemoryRepository {
    name: String,
    packages: Vec<PackageModel>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::with_name("memory")
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            packages: Vec::new(),
        }
    }

    /// Number of packages currently held
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl Repository for MemoryRepository {
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
        select_package(&self.packages, id, range, allow_prerelease, allow_unlisted)
    }

    fn get_packages(&self) -> Result<Vec<PackageModel>> {
        Ok(self.packages.clone())
    }

    fn add_package(&mut self, package: PackageModel) -> Result<()> {
        package.validate()?;
        let identity = package.identity()?;
        if self
            .packages
            .iter()
            .any(|p| p.identity().is_ok_and(|existing| existing == identity))
        {
            debug!("{} already holds {}, skipping add", self.name, identity);
            return Ok(());
        }
        self.packages.push(package);
        Ok(())
    }

    fn remove_package(&mut self, identity: &PackageIdentity) -> Result<()> {
        self.packages
            .retain(|p| !p.identity().is_ok_and(|existing| existing == *identity));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::parse_version;

    fn package(id: &str, version: &str) -> PackageModel {
        PackageModel::new(id, parse_version(version).unwrap())
    }

    fn identity(id: &str, version: &str) -> PackageIdentity {
        PackageIdentity::new(id, parse_version(version).unwrap()).unwrap()
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut repo = MemoryRepository::new();
        repo.add_package(package("A", "1.0.0")).unwrap();
        repo.add_package(package("A", "1.0.0")).unwrap();
        assert_eq!(repo.get_packages().unwrap().len(), 1);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut repo = MemoryRepository::new();
        assert!(repo.remove_package(&identity("A", "1.0.0")).is_ok());
    }

    #[test]
    fn test_exists_with_and_without_version() {
        let mut repo = MemoryRepository::new();
        repo.add_package(package("A", "1.0.0")).unwrap();

        assert!(repo.exists("A", None).unwrap());
        assert!(repo
            .exists("a", Some(&parse_version("1.0.0").unwrap()))
            .unwrap());
        assert!(!repo
            .exists("A", Some(&parse_version("2.0.0").unwrap()))
            .unwrap());
        assert!(!repo.exists("B", None).unwrap());
    }

    #[test]
    fn test_fetch_package_returns_exact_version() {
        let mut repo = MemoryRepository::new();
        repo.add_package(package("A", "1.0.0")).unwrap();
        repo.add_package(package("A", "2.0.0")).unwrap();

        let fetched = repo.fetch_package(&identity("A", "1.0.0")).unwrap().unwrap();
        assert_eq!(fetched.version, Some(parse_version("1.0.0").unwrap()));
    }

    #[test]
    fn test_add_rejects_invalid_package() {
        let mut repo = MemoryRepository::new();
        let mut bad = package("A", "1.0.0");
        bad.id = String::new();
        assert!(repo.add_package(bad).is_err());
    }
}
