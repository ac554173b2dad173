// src/planner/mod.rs

//! Install planning: the dependency walker
//!
//! Given an install, uninstall, or update request plus the source and local
//! repositories, the planner produces an ordered sequence of operations for
//! the orchestrator to apply. Planning is pure: it reads both repositories
//! and mutates neither, and any failure aborts with no partial plan.
//!
//! Ordering rules:
//! - install plans emit dependencies before the packages that need them;
//! - uninstall plans emit dependents before their dependencies;
//! - traversal is deterministic, visiting dependencies in declaration order
//!   and scheduling each identity at most once.

use crate::error::{Error, Result};
use crate::package::{FrameworkName, PackageIdentity, PackageModel};
use crate::repository::{select_package, Repository};
use crate::version::VersionRange;
use semver::Version;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use tracing::debug;

/// What an operation does to its package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Install,
    Uninstall,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Install => write!(f, "install"),
            OperationKind::Uninstall => write!(f, "uninstall"),
        }
    }
}

/// One step of a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOperation {
    pub kind: OperationKind,
    pub package: PackageIdentity,
}

impl InstallOperation {
    pub fn install(package: PackageIdentity) -> Self {
        Self {
            kind: OperationKind::Install,
            package,
        }
    }

    pub fn uninstall(package: PackageIdentity) -> Self {
        Self {
            kind: OperationKind::Uninstall,
            package,
        }
    }
}

impl fmt::Display for InstallOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.package)
    }
}

/// Options governing an install walk
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Plan only the root package, no dependency traversal
    pub ignore_dependencies: bool,
    /// Let prerelease versions satisfy resolution
    pub allow_prerelease: bool,
    /// The project's target framework; dependency sets that do not apply
    /// to it are skipped
    pub target_framework: Option<FrameworkName>,
}

/// Options governing an uninstall walk
#[derive(Debug, Clone, Default)]
pub struct UninstallOptions {
    /// Remove even when other installed packages still depend on the target
    pub force_remove: bool,
    /// Also remove dependencies no surviving package references
    pub remove_dependencies: bool,
}

/// Computes operation plans against a source and a local repository
pub struct InstallPlanner<'a> {
    source: &'a dyn Repository,
    local: &'a dyn Repository,
}

impl<'a> InstallPlanner<'a> {
    pub fn new(source: &'a dyn Repository, local: &'a dyn Repository) -> Self {
        Self { source, local }
    }

    /// Plan installing `id` (optionally constrained) with its dependencies
    pub fn plan_install(
        &self,
        id: &str,
        range: Option<&VersionRange>,
        options: &InstallOptions,
    ) -> Result<Vec<InstallOperation>> {
        // An exact request may name an unlisted version deliberately
        let allow_unlisted = range.is_some_and(VersionRange::is_exact);
        let root = self
            .source
            .find_package(id, range, options.allow_prerelease, allow_unlisted)?
            .ok_or_else(|| Error::PackageNotFound { id: id.to_string() })?;

        if options.ignore_dependencies {
            return Ok(vec![InstallOperation::install(root.identity()?)]);
        }

        let mut walk = InstallWalk {
            planner: self,
            options,
            on_path: Vec::new(),
            visited: HashSet::new(),
            scheduled: HashSet::new(),
            operations: Vec::new(),
        };
        walk.visit(&root, false)?;
        debug!("install plan for '{}': {} step(s)", id, walk.operations.len());
        Ok(walk.operations)
    }

    /// Plan uninstalling `id` (optionally one exact version)
    pub fn plan_uninstall(
        &self,
        id: &str,
        version: Option<&Version>,
        options: &UninstallOptions,
    ) -> Result<Vec<InstallOperation>> {
        let range = version.map(|v| VersionRange::exact(v.clone()));
        let target = self
            .local
            .find_package(id, range.as_ref(), true, true)?
            .ok_or_else(|| Error::PackageNotInstalled { id: id.to_string() })?;
        let target_identity = target.identity()?;

        let installed = self.local.get_packages()?;
        let mut removed: HashSet<PackageIdentity> = HashSet::new();
        removed.insert(target_identity.clone());

        if !options.force_remove {
            let dependents = dependents_of(&installed, &target_identity, &removed);
            if !dependents.is_empty() {
                return Err(Error::DependentsExist {
                    id: target_identity.id().to_string(),
                    dependents: dependents.iter().map(|d| d.to_string()).collect(),
                });
            }
        }

        let mut operations = vec![InstallOperation::uninstall(target_identity)];

        if options.remove_dependencies {
            // Breadth-first from the target, re-checking "still referenced"
            // against the shrinking survivor set after every removal
            let mut queue: VecDeque<PackageModel> =
                resolve_local_dependencies(&installed, &target)?.into();
            while let Some(candidate) = queue.pop_front() {
                let identity = candidate.identity()?;
                if removed.contains(&identity) {
                    continue;
                }
                let still_referenced =
                    !dependents_of(&installed, &identity, &removed).is_empty();
                if still_referenced {
                    continue;
                }
                removed.insert(identity.clone());
                operations.push(InstallOperation::uninstall(identity));
                queue.extend(resolve_local_dependencies(&installed, &candidate)?);
            }
        }

        debug!("uninstall plan for '{}': {} step(s)", id, operations.len());
        Ok(operations)
    }

    /// Plan updating `id` to the highest eligible source version
    ///
    /// The combined plan uninstalls the installed version and installs the
    /// new one, walking dependencies only when `update_dependencies` is
    /// set. No eligible newer version yields an empty plan (a no-op, not an
    /// error).
    pub fn plan_update(
        &self,
        id: &str,
        update_dependencies: bool,
        allow_prerelease: bool,
        target_framework: Option<FrameworkName>,
    ) -> Result<Vec<InstallOperation>> {
        let installed = self
            .local
            .find_package(id, None, true, true)?
            .ok_or_else(|| Error::PackageNotInstalled { id: id.to_string() })?;
        let installed_identity = installed.identity()?;

        let Some(newest) = self.source.find_package(id, None, allow_prerelease, false)? else {
            debug!("no source candidate for '{}', nothing to update", id);
            return Ok(Vec::new());
        };
        let newest_identity = newest.identity()?;
        if newest_identity.version() <= installed_identity.version() {
            debug!(
                "'{}' is already at {} (source offers {}), nothing to update",
                id,
                installed_identity.version(),
                newest_identity.version()
            );
            return Ok(Vec::new());
        }

        // Dependents are expected to be satisfied by the incoming version
        let mut operations = vec![InstallOperation::uninstall(installed_identity)];
        let range = VersionRange::exact(newest_identity.version().clone());
        let install_options = InstallOptions {
            ignore_dependencies: !update_dependencies,
            allow_prerelease,
            target_framework,
        };
        operations.extend(self.plan_install(id, Some(&range), &install_options)?);
        Ok(operations)
    }
}

/// State of one install traversal
struct InstallWalk<'a, 'b> {
    planner: &'b InstallPlanner<'a>,
    options: &'b InstallOptions,
    /// Ids on the current recursion path, for cycle reporting
    on_path: Vec<String>,
    /// Ids whose subtree has been walked (case-folded)
    visited: HashSet<String>,
    scheduled: HashSet<PackageIdentity>,
    operations: Vec<InstallOperation>,
}

impl InstallWalk<'_, '_> {
    /// Walk `package`'s dependencies, then schedule it unless it is already
    /// satisfied locally (`satisfied_locally` packages are walked so their
    /// missing transitive dependencies are repaired, but never re-added)
    fn visit(&mut self, package: &PackageModel, satisfied_locally: bool) -> Result<()> {
        let identity = package.identity()?;
        self.on_path.push(identity.id().to_string());
        self.visited.insert(identity.id().to_ascii_lowercase());

        for set in package.dependency_sets_for(self.options.target_framework.as_ref()) {
            for dependency in &set.dependencies {
                let key = dependency.id.to_ascii_lowercase();
                if self
                    .on_path
                    .iter()
                    .any(|id| id.eq_ignore_ascii_case(&dependency.id))
                {
                    let mut chain = self.on_path.clone();
                    chain.push(dependency.id.clone());
                    return Err(Error::DependencyCycle { chain });
                }
                if self.visited.contains(&key) {
                    continue;
                }

                let range = dependency.version_range.as_ref();
                // A local package satisfying the constraint is not re-added,
                // but its subtree is still walked
                if let Some(local_match) =
                    self.planner.local.find_package(&dependency.id, range, true, true)?
                {
                    self.visit(&local_match, true)?;
                    continue;
                }

                let resolved = self
                    .planner
                    .source
                    .find_package(&dependency.id, range, self.options.allow_prerelease, false)?
                    .ok_or_else(|| Error::PackageNotFound {
                        id: dependency.id.clone(),
                    })?;
                self.visit(&resolved, false)?;
            }
        }

        self.on_path.pop();

        if !satisfied_locally && !self.scheduled.contains(&identity) {
            self.scheduled.insert(identity.clone());
            self.operations.push(InstallOperation::install(identity));
        }
        Ok(())
    }
}

/// Installed packages (outside `removed`) whose dependency sets still
/// reference `identity`
fn dependents_of(
    installed: &[PackageModel],
    identity: &PackageIdentity,
    removed: &HashSet<PackageIdentity>,
) -> Vec<PackageIdentity> {
    let mut dependents = Vec::new();
    for package in installed {
        let Ok(package_identity) = package.identity() else {
            continue;
        };
        if package_identity == *identity || removed.contains(&package_identity) {
            continue;
        }
        let references_target = package.dependency_sets.iter().any(|set| {
            set.dependencies.iter().any(|dep| {
                dep.id.eq_ignore_ascii_case(identity.id()) && dep.matches(identity.version())
            })
        });
        if references_target {
            dependents.push(package_identity);
        }
    }
    dependents
}

/// Resolve `package`'s direct dependencies against the installed snapshot,
/// in declaration order
fn resolve_local_dependencies(
    installed: &[PackageModel],
    package: &PackageModel,
) -> Result<Vec<PackageModel>> {
    let mut resolved = Vec::new();
    for set in &package.dependency_sets {
        for dependency in &set.dependencies {
            if let Some(found) = select_package(
                installed,
                &dependency.id,
                dependency.version_range.as_ref(),
                true,
                true,
            )? {
                resolved.push(found);
            }
        }
    }
    Ok(resolved)
}
