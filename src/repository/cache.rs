// src/repository/cache.rs

//! Machine-wide package cache
//!
//! A process-wide, disk-backed cache of previously downloaded packages.
//! Entries are added opportunistically during installs and never expire
//! except by explicit removal or a cache clear. Staleness is decided by
//! content hash: when the source exposes a fingerprint and the cached entry
//! does not match it, the entry is evicted and the source copy wins.
//!
//! The cache is an explicitly constructed, injected instance; there is no
//! global accessor. Its failure mode is always degradation: a corrupt or
//! unwritable cache turns every lookup into a miss and every add into a
//! logged no-op, never a failed install.

use super::{select_package, Repository};
use crate::archive;
use crate::error::Result;
use crate::hash::ContentHash;
use crate::package::{PackageIdentity, PackageModel};
use crate::version::VersionRange;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

const INDEX_FILE_NAME: &str = "index.json";
const LOCK_FILE_NAME: &str = ".lock";

/// Outcome of a cache consultation for one exact package
#[derive(Debug)]
pub enum CacheLookup {
    /// Usable cached copy
    Hit(PackageModel),
    /// Entry present but its content hash no longer matches the source
    Stale,
    /// No entry (or the cache could not be read)
    Miss,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    id: String,
    version: semver::Version,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content_hash: Option<String>,
    added_at: DateTime<Utc>,
}

impl CacheEntry {
    fn matches(&self, identity: &PackageIdentity) -> bool {
        self.id.eq_ignore_ascii_case(identity.id()) && self.version == *identity.version()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CacheIndex {
    entries: Vec<CacheEntry>,
}

/// Disk-backed machine cache repository
pub struct MachineCache {
    name: String,
    root: PathBuf,
}

impl MachineCache {
    /// Open (or initialize) a cache rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            name: "machine-cache".to_string(),
            root,
        })
    }

    /// Open the per-user default cache location
    pub fn with_default_location() -> Result<Self> {
        let base = dirs::cache_dir().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no user cache directory available",
            )
        })?;
        Self::new(base.join("wharf").join("packages"))
    }

    /// The cache root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn package_dir(&self, identity: &PackageIdentity) -> PathBuf {
        self.root
            .join(format!("{}.{}", identity.id(), identity.version()))
    }

    /// Take the advisory store lock for the duration of a mutation
    fn lock_store(&self) -> Result<fs::File> {
        let lock = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.root.join(LOCK_FILE_NAME))?;
        lock.lock_exclusive()?;
        Ok(lock)
    }

    fn read_index(&self) -> CacheIndex {
        let path = self.root.join(INDEX_FILE_NAME);
        match fs::read(&path) {
            Ok(data) => match serde_json::from_slice(&data) {
                Ok(index) => index,
                Err(e) => {
                    warn!("cache index unreadable ({}), rebuilding from store", e);
                    self.rebuild_index()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => self.rebuild_index(),
            Err(e) => {
                warn!("cache index unreadable ({}), rebuilding from store", e);
                self.rebuild_index()
            }
        }
    }

    fn write_index(&self, index: &CacheIndex) -> Result<()> {
        archive::write_json_atomic(&self.root.join(INDEX_FILE_NAME), index)
    }

    /// Reconstruct the index by scanning package manifests in the store
    fn rebuild_index(&self) -> CacheIndex {
        let mut index = CacheIndex::default();
        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .flatten()
        {
            if !entry.file_type().is_dir() || !archive::package_exists(entry.path()) {
                continue;
            }
            match archive::load_package(entry.path()) {
                Ok(package) => {
                    if let Ok(identity) = package.identity() {
                        index.entries.push(CacheEntry {
                            id: identity.id().to_string(),
                            version: identity.version().clone(),
                            content_hash: package
                                .content_hash
                                .as_ref()
                                .map(|h| h.as_str().to_string()),
                            added_at: Utc::now(),
                        });
                    }
                }
                Err(e) => warn!(
                    "skipping unreadable cache entry at {}: {}",
                    entry.path().display(),
                    e
                ),
            }
        }
        index
    }

    /// Consult the cache for one exact package
    ///
    /// When `source_hash` is given, the cached entry must carry the same
    /// fingerprint to count as a hit; an entry with no recorded hash cannot
    /// be verified and reads as stale. Every cache failure reads as a miss.
    pub fn lookup(
        &self,
        identity: &PackageIdentity,
        source_hash: Option<&ContentHash>,
    ) -> CacheLookup {
        let index = self.read_index();
        let Some(entry) = index.entries.iter().find(|e| e.matches(identity)) else {
            return CacheLookup::Miss;
        };

        if let Some(expected) = source_hash {
            match &entry.content_hash {
                Some(cached) if cached == expected.as_str() => {}
                _ => {
                    debug!("cache entry for {} is stale", identity);
                    return CacheLookup::Stale;
                }
            }
        }

        match archive::load_package(&self.package_dir(identity)) {
            Ok(package) => CacheLookup::Hit(package),
            Err(e) => {
                warn!("cached copy of {} unreadable ({}), treating as miss", identity, e);
                CacheLookup::Miss
            }
        }
    }

    /// Drop one entry, best-effort; eviction failure is logged, not raised
    pub fn evict(&mut self, identity: &PackageIdentity) {
        if let Err(e) = self.remove_package(identity) {
            warn!("failed to evict {} from cache: {}", identity, e);
        }
    }

    /// Remove every entry from the cache
    pub fn clear(&mut self) -> Result<()> {
        let _lock = self.lock_store()?;
        let index = self.read_index();
        for entry in &index.entries {
            let dir = self
                .root
                .join(format!("{}.{}", entry.id, entry.version));
            if dir.exists() {
                fs::remove_dir_all(&dir)?;
            }
        }
        self.write_index(&CacheIndex::default())
    }
}

impl Repository for MachineCache {
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
        let packages = self.get_packages()?;
        select_package(&packages, id, range, allow_prerelease, allow_unlisted)
    }

    fn get_packages(&self) -> Result<Vec<PackageModel>> {
        let index = self.read_index();
        let mut packages = Vec::new();
        for entry in &index.entries {
            let dir = self
                .root
                .join(format!("{}.{}", entry.id, entry.version));
            match archive::load_package(&dir) {
                Ok(package) => packages.push(package),
                Err(e) => warn!("skipping unreadable cache entry {}: {}", dir.display(), e),
            }
        }
        Ok(packages)
    }

    fn add_package(&mut self, package: PackageModel) -> Result<()> {
        package.validate()?;
        let identity = package.identity()?;

        let _lock = self.lock_store()?;
        let mut index = self.read_index();
        if index.entries.iter().any(|e| e.matches(&identity)) {
            debug!("cache already holds {}, skipping add", identity);
            return Ok(());
        }

        archive::save_package(&self.package_dir(&identity), &package)?;
        index.entries.push(CacheEntry {
            id: identity.id().to_string(),
            version: identity.version().clone(),
            content_hash: package
                .content_hash
                .as_ref()
                .map(|h| h.as_str().to_string()),
            added_at: Utc::now(),
        });
        self.write_index(&index)?;
        debug!("cached {}", identity);
        Ok(())
    }

    fn remove_package(&mut self, identity: &PackageIdentity) -> Result<()> {
        let _lock = self.lock_store()?;
        let mut index = self.read_index();
        index.entries.retain(|e| !e.matches(identity));

        let dir = self.package_dir(identity);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        self.write_index(&index)
    }
}
