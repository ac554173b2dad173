// src/repository/aggregate.rs

//! Aggregate repository
//!
//! Wraps an ordered list of repositories and answers queries with the first
//! match. When `ignore_failing_repositories` is set, a repository that
//! errors is logged and skipped; otherwise the first failure aborts the
//! whole query as `RepositoryUnavailable`.

use super::Repository;
use crate::error::{Error, Result};
use crate::package::{PackageIdentity, PackageModel};
use crate::version::VersionRange;
use std::collections::HashSet;
use tracing::warn;

/// Ordered first-match view over several repositories
pub struct AggregateRepository {
    name: String,
    repositories: Vec<Box<dyn Repository>>,
    ignore_failing_repositories: bool,
}

impl AggregateRepository {
    pub fn new(repositories: Vec<Box<dyn Repository>>) -> Self {
        Self {
            name: "aggregate".to_string(),
            repositories,
            ignore_failing_repositories: false,
        }
    }

    /// Skip (and log) repositories that fail instead of aborting the query
    pub fn ignore_failing_repositories(mut self, ignore: bool) -> Self {
        self.ignore_failing_repositories = ignore;
        self
    }

    fn unavailable(repo: &dyn Repository, source: &Error) -> Error {
        Error::RepositoryUnavailable {
            name: repo.name().to_string(),
            reason: source.to_string(),
        }
    }
}

impl Repository for AggregateRepository {
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
        if id.trim().is_empty() {
            return Err(Error::empty_argument("package id"));
        }

        for repo in &self.repositories {
            match repo.find_package(id, range, allow_prerelease, allow_unlisted) {
                Ok(Some(package)) => return Ok(Some(package)),
                Ok(None) => continue,
                Err(e) if self.ignore_failing_repositories => {
                    warn!("repository '{}' failed during find, skipping: {}", repo.name(), e);
                }
                Err(e) => return Err(Self::unavailable(repo.as_ref(), &e)),
            }
        }
        Ok(None)
    }

    fn get_packages(&self) -> Result<Vec<PackageModel>> {
        // First repository wins for duplicate identities
        let mut seen: HashSet<PackageIdentity> = HashSet::new();
        let mut packages = Vec::new();

        for repo in &self.repositories {
            match repo.get_packages() {
                Ok(batch) => {
                    for package in batch {
                        if let Ok(identity) = package.identity() {
                            if seen.insert(identity) {
                                packages.push(package);
                            }
                        }
                    }
                }
                Err(e) if self.ignore_failing_repositories => {
                    warn!(
                        "repository '{}' failed during enumeration, skipping: {}",
                        repo.name(),
                        e
                    );
                }
                Err(e) => return Err(Self::unavailable(repo.as_ref(), &e)),
            }
        }
        Ok(packages)
    }

    fn add_package(&mut self, _package: PackageModel) -> Result<()> {
        Err(Error::InvalidArgument(
            "aggregate repository is read-only".to_string(),
        ))
    }

    fn remove_package(&mut self, _identity: &PackageIdentity) -> Result<()> {
        Err(Error::InvalidArgument(
            "aggregate repository is read-only".to_string(),
        ))
    }

    fn fetch_package(&self, identity: &PackageIdentity) -> Result<Option<PackageModel>> {
        for repo in &self.repositories {
            match repo.fetch_package(identity) {
                Ok(Some(package)) => return Ok(Some(package)),
                Ok(None) => continue,
                Err(e) if self.ignore_failing_repositories => {
                    warn!("repository '{}' failed during fetch, skipping: {}", repo.name(), e);
                }
                Err(e) => return Err(Self::unavailable(repo.as_ref(), &e)),
            }
        }
        Ok(None)
    }
}
