// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use semver::Version;
use wharf::{
    DependencySet, DiskFileSystem, LocalRepository, MemoryRepository, PackageDependency,
    PackageFile, PackageManager, PackageModel, PathResolver, Repository,
};

/// Route tracing output through the test harness; safe to call repeatedly
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

/// Parse a version string, panicking on bad fixtures
pub fn v(s: &str) -> Version {
    wharf::parse_version(s).unwrap()
}

/// Build a sealed package with one content file and optional dependencies
pub fn build_package(id: &str, version: &str, dependencies: &[&str]) -> PackageModel {
    let mut package = PackageModel::new(id, v(version));
    package.description = Some(format!("test package {}", id));
    package.authors = vec!["tester".to_string()];
    package
        .files
        .push(PackageFile::new("content/file.txt", format!("{} {}", id, version).into_bytes()).unwrap());
    package
        .files
        .push(PackageFile::new(format!("lib/{}.dll", id.to_lowercase()), b"assembly".to_vec()).unwrap());
    if !dependencies.is_empty() {
        package.dependency_sets.push(DependencySet::with_dependencies(
            None,
            dependencies
                .iter()
                .map(|dep| PackageDependency::new(*dep).unwrap())
                .collect(),
        ));
    }
    package.seal();
    package
}

/// A source repository pre-loaded with the given packages
pub fn source_with(packages: Vec<PackageModel>) -> MemoryRepository {
    let mut source = MemoryRepository::with_name("source");
    for package in packages {
        source.add_package(package).unwrap();
    }
    source
}

/// A package manager over a disk-backed local repository and project tree
///
/// Lays out `<root>/packages` for the local store and `<root>/project` for
/// the project file system.
pub fn disk_manager(root: &std::path::Path, source: MemoryRepository) -> PackageManager {
    init_logging();
    let local = LocalRepository::new(root.join("packages")).unwrap();
    let project = DiskFileSystem::new(root.join("project")).unwrap();
    PackageManager::new(
        Box::new(source),
        PathResolver::new(),
        Box::new(project),
        Box::new(local),
    )
}
