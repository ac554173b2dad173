// src/filesystem/mod.rs

//! Project file system capability and install path layout
//!
//! The orchestrator never touches the disk directly: it goes through the
//! `ProjectFileSystem` trait, so IDE integrations and tests can substitute
//! their own implementations. `DiskFileSystem` is the real-tree
//! implementation; `PathResolver` derives the per-package install root from
//! a package's identity.

use crate::error::Result;
use crate::package::PackageIdentity;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File operations the orchestrator performs against a project tree
///
/// Failures propagate as-is; no retry or recovery happens at this seam.
pub trait ProjectFileSystem: Send {
    /// The project root every relative path resolves against
    fn root(&self) -> &Path;

    /// Write a file, creating parent directories as needed
    fn add_file(&mut self, path: &Path, content: &[u8]) -> Result<()>;

    /// Check for a file relative to the root
    fn file_exists(&self, path: &Path) -> bool;

    /// Delete a file; deleting an absent file is not an error
    fn delete_file(&mut self, path: &Path) -> Result<()>;
}

/// `ProjectFileSystem` over a real directory tree
pub struct DiskFileSystem {
    root: PathBuf,
}

impl DiskFileSystem {
    /// Create a file system rooted at `root`, creating it if absent
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.exists() {
            fs::create_dir_all(&root)?;
            debug!("created project root {}", root.display());
        }
        Ok(Self { root })
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl ProjectFileSystem for DiskFileSystem {
    fn root(&self) -> &Path {
        &self.root
    }

    fn add_file(&mut self, path: &Path, content: &[u8]) -> Result<()> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, content)?;
        debug!("wrote {}", target.display());
        Ok(())
    }

    fn file_exists(&self, path: &Path) -> bool {
        self.resolve(path).is_file()
    }

    fn delete_file(&mut self, path: &Path) -> Result<()> {
        let target = self.resolve(path);
        match fs::remove_file(&target) {
            Ok(()) => {
                debug!("deleted {}", target.display());
                // Prune now-empty parent directories up to the root,
                // best-effort
                let mut parent = target.parent();
                while let Some(dir) = parent {
                    if dir == self.root || fs::remove_dir(dir).is_err() {
                        break;
                    }
                    parent = dir.parent();
                }
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Derives per-package install paths from package identities
///
/// A package installs under `{id}.{version}` relative to the project root,
/// and its payload files keep their archive-relative paths below that.
#[derive(Debug, Clone, Default)]
pub struct PathResolver;

impl PathResolver {
    pub fn new() -> Self {
        Self
    }

    /// Directory name a package unpacks into
    pub fn package_dir_name(&self, identity: &PackageIdentity) -> String {
        format!("{}.{}", identity.id(), identity.version())
    }

    /// Root-relative install directory for a package
    pub fn package_dir(&self, identity: &PackageIdentity) -> PathBuf {
        PathBuf::from(self.package_dir_name(identity))
    }

    /// Root-relative path of one payload file within a package's directory
    pub fn package_file_path(&self, identity: &PackageIdentity, file_path: &str) -> PathBuf {
        self.package_dir(identity).join(file_path)
    }
}
