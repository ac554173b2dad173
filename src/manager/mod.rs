// src/manager/mod.rs

//! Package manager orchestration
//!
//! `PackageManager` drives the planner, applies each planned operation to
//! the project file system and the local repository, reconciles installs
//! against the machine cache, and reports applied operations to observers.
//!
//! Failure discipline: a file-system failure while unpacking a package
//! propagates immediately and the package is never registered as installed
//! (partial file writes stay behind, best-effort only). Registration of the
//! package and its reference manifest entry succeed or roll back together.
//! Writes to one local repository are serialized by the caller; this
//! orchestrator performs them sequentially within a call.

use crate::archive::{Manifest, MANIFEST_FILE_NAME};
use crate::error::{Error, Result};
use crate::filesystem::{PathResolver, ProjectFileSystem};
use crate::package::{FrameworkName, PackageIdentity, PackageModel};
use crate::planner::{
    InstallOperation, InstallOptions, InstallPlanner, OperationKind, UninstallOptions,
};
use crate::progress::{OperationEvent, OperationObserver};
use crate::repository::{CacheLookup, MachineCache, Repository};
use crate::version::VersionRange;
use semver::Version;
use tracing::{debug, info, warn};

/// Orchestrates installs, uninstalls, and updates against a project
pub struct PackageManager {
    source: Box<dyn Repository>,
    local: Box<dyn Repository>,
    cache: Option<MachineCache>,
    file_system: Box<dyn ProjectFileSystem>,
    path_resolver: PathResolver,
    target_framework: Option<FrameworkName>,
    observers: Vec<Box<dyn OperationObserver>>,
}

impl PackageManager {
    /// Create a manager over its four required collaborators
    ///
    /// Caching is skipped entirely until a machine cache is attached with
    /// [`PackageManager::with_cache`].
    pub fn new(
        source: Box<dyn Repository>,
        path_resolver: PathResolver,
        file_system: Box<dyn ProjectFileSystem>,
        local: Box<dyn Repository>,
    ) -> Self {
        Self {
            source,
            local,
            cache: None,
            file_system,
            path_resolver,
            target_framework: None,
            observers: Vec::new(),
        }
    }

    /// Attach a machine cache for the install fast-path
    pub fn with_cache(mut self, cache: MachineCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Constrain dependency walks to the project's target framework
    pub fn with_target_framework(mut self, framework: FrameworkName) -> Self {
        self.target_framework = Some(framework);
        self
    }

    /// Register an observer for applied operations
    pub fn add_observer(&mut self, observer: Box<dyn OperationObserver>) {
        self.observers.push(observer);
    }

    /// The local repository (installed state)
    pub fn local_repository(&self) -> &dyn Repository {
        self.local.as_ref()
    }

    /// Mutable access to the local repository, for reference queries
    pub fn local_repository_mut(&mut self) -> &mut dyn Repository {
        self.local.as_mut()
    }

    /// The source repository packages are resolved from
    pub fn source_repository(&self) -> &dyn Repository {
        self.source.as_ref()
    }

    /// Install `id` (optionally one exact version) with its dependencies
    pub fn install_package(
        &mut self,
        id: &str,
        version: Option<&Version>,
        ignore_dependencies: bool,
        allow_prerelease: bool,
    ) -> Result<()> {
        if id.trim().is_empty() {
            return Err(Error::empty_argument("package id"));
        }

        let range = version.map(|v| VersionRange::exact(v.clone()));
        let options = InstallOptions {
            ignore_dependencies,
            allow_prerelease,
            target_framework: self.target_framework.clone(),
        };
        let plan = InstallPlanner::new(self.source.as_ref(), self.local.as_ref())
            .plan_install(id, range.as_ref(), &options)?;

        info!("installing '{}': {} step(s)", id, plan.len());
        self.apply(&plan)
    }

    /// Uninstall `id` (optionally one exact version)
    pub fn uninstall_package(
        &mut self,
        id: &str,
        version: Option<&Version>,
        force_remove: bool,
        remove_dependencies: bool,
    ) -> Result<()> {
        if id.trim().is_empty() {
            return Err(Error::empty_argument("package id"));
        }

        let options = UninstallOptions {
            force_remove,
            remove_dependencies,
        };
        let plan = InstallPlanner::new(self.source.as_ref(), self.local.as_ref())
            .plan_uninstall(id, version, &options)?;

        info!("uninstalling '{}': {} step(s)", id, plan.len());
        self.apply(&plan)
    }

    /// Update `id` to the highest eligible source version
    ///
    /// The combined uninstall+install plan is applied sequentially and is
    /// not transactional across the boundary: a reinstall failure surfaces
    /// the error and leaves the package uninstalled.
    pub fn update_package(
        &mut self,
        id: &str,
        update_dependencies: bool,
        allow_prerelease: bool,
    ) -> Result<()> {
        if id.trim().is_empty() {
            return Err(Error::empty_argument("package id"));
        }

        let plan = InstallPlanner::new(self.source.as_ref(), self.local.as_ref()).plan_update(
            id,
            update_dependencies,
            allow_prerelease,
            self.target_framework.clone(),
        )?;

        if plan.is_empty() {
            info!("'{}' is up to date", id);
            return Ok(());
        }
        info!("updating '{}': {} step(s)", id, plan.len());
        self.apply(&plan)
    }

    fn apply(&mut self, plan: &[InstallOperation]) -> Result<()> {
        for operation in plan {
            match operation.kind {
                OperationKind::Install => self.execute_install(&operation.package)?,
                OperationKind::Uninstall => self.execute_uninstall(&operation.package)?,
            }
        }
        Ok(())
    }

    /// Unpack one package into the project and register it as installed
    fn execute_install(&mut self, identity: &PackageIdentity) -> Result<()> {
        let package = self.resolve_package(identity)?;

        // Unpack payload files; any failure leaves the package unregistered
        for file in &package.files {
            let path = self.path_resolver.package_file_path(identity, &file.path);
            self.file_system.add_file(&path, &file.content)?;
        }
        // Keep a manifest copy beside the payload so the install root is
        // self-describing
        let manifest = Manifest::from_model(&package)?;
        let manifest_path = self
            .path_resolver
            .package_dir(identity)
            .join(MANIFEST_FILE_NAME);
        self.file_system
            .add_file(&manifest_path, &serde_json::to_vec_pretty(&manifest)?)?;

        self.local.add_package(package.clone())?;
        if let Some(tracking) = self.local.reference_tracking() {
            let registered = tracking.register_reference(
                identity.id(),
                identity.version(),
                self.target_framework.clone(),
                package.development_dependency,
            );
            if let Err(e) = registered {
                // Keep the package/reference pair atomic
                if let Err(rollback) = self.local.remove_package(identity) {
                    warn!("rollback of {} after reference failure also failed: {}", identity, rollback);
                }
                return Err(e);
            }
        }

        self.notify(OperationKind::Install, identity);
        Ok(())
    }

    /// Remove one package's files and registration
    fn execute_uninstall(&mut self, identity: &PackageIdentity) -> Result<()> {
        // Delete files first: a file-system failure must leave the package
        // still registered
        let removed = self.local.fetch_package(identity)?;
        if let Some(package) = &removed {
            for file in &package.files {
                let path = self.path_resolver.package_file_path(identity, &file.path);
                self.file_system.delete_file(&path)?;
            }
            let manifest_path = self
                .path_resolver
                .package_dir(identity)
                .join(MANIFEST_FILE_NAME);
            self.file_system.delete_file(&manifest_path)?;
        }

        self.local.remove_package(identity)?;
        if let Some(tracking) = self.local.reference_tracking() {
            let unregistered = tracking.unregister_reference(identity.id(), identity.version());
            if let Err(e) = unregistered {
                // Keep the package/reference pair atomic
                if let Some(package) = removed {
                    if let Err(rollback) = self.local.add_package(package) {
                        warn!(
                            "rollback of {} after reference failure also failed: {}",
                            identity, rollback
                        );
                    }
                }
                return Err(e);
            }
        }

        self.notify(OperationKind::Uninstall, identity);
        Ok(())
    }

    /// Resolve a planned package's content, preferring the machine cache
    ///
    /// Cache reconciliation: a cached copy whose content hash matches the
    /// source's is used as-is; a stale copy is evicted; a miss fetches from
    /// source, fills the cache, and re-reads it so later installs hit. Any
    /// cache failure degrades to the source copy.
    fn resolve_package(&mut self, identity: &PackageIdentity) -> Result<PackageModel> {
        if self.cache.is_none() {
            return self.fetch_from_source(identity);
        }

        let exact = VersionRange::exact(identity.version().clone());
        let source_hash = self
            .source
            .find_package(identity.id(), Some(&exact), true, true)?
            .and_then(|metadata| metadata.content_hash);

        if let Some(cache) = self.cache.as_mut() {
            match cache.lookup(identity, source_hash.as_ref()) {
                CacheLookup::Hit(package) => {
                    debug!("cache hit for {}", identity);
                    return Ok(package);
                }
                CacheLookup::Stale => {
                    debug!("cache entry for {} is stale, evicting", identity);
                    cache.evict(identity);
                }
                CacheLookup::Miss => {}
            }
        }

        let fetched = self.fetch_from_source(identity)?;

        if let Some(cache) = self.cache.as_mut() {
            if let Err(e) = cache.add_package(fetched.clone()) {
                warn!("failed to cache {}: {}", identity, e);
                return Ok(fetched);
            }
            if let CacheLookup::Hit(package) =
                cache.lookup(identity, fetched.content_hash.as_ref())
            {
                return Ok(package);
            }
        }
        Ok(fetched)
    }

    fn fetch_from_source(&self, identity: &PackageIdentity) -> Result<PackageModel> {
        self.source
            .fetch_package(identity)?
            .ok_or_else(|| Error::PackageNotFound {
                id: identity.id().to_string(),
            })
    }

    fn notify(&self, kind: OperationKind, identity: &PackageIdentity) {
        let event = OperationEvent::new(kind, identity.clone());
        for observer in &self.observers {
            observer.on_operation(&event);
        }
    }
}
