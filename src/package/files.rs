// src/package/files.rs

//! Package payload files
//!
//! A package file is an archive-relative path plus its content bytes. Paths
//! compare case-insensitively; a package never holds two files whose paths
//! collide under that comparison.

use crate::error::{Error, Result};

/// A single file carried by a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageFile {
    /// Archive-relative path, forward slashes
    pub path: String,
    /// Raw content bytes
    pub content: Vec<u8>,
}

impl PackageFile {
    /// Create a package file
    ///
    /// The path must be archive-relative: absolute paths and `..` components
    /// are rejected so a package can never write outside its install root.
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Result<Self> {
        let path = path.into();
        if path.trim().is_empty() {
            return Err(Error::empty_argument("file path"));
        }
        if path.starts_with('/') || path.starts_with('\\') {
            return Err(Error::InvalidArgument(format!(
                "file path '{}' must be archive-relative",
                path
            )));
        }
        if path.split(['/', '\\']).any(|part| part == "..") {
            return Err(Error::InvalidArgument(format!(
                "file path '{}' must not contain '..'",
                path
            )));
        }
        Ok(Self {
            path,
            content: content.into(),
        })
    }

    /// Case-insensitive path comparison
    pub fn path_matches(&self, other: &str) -> bool {
        self.path.eq_ignore_ascii_case(other)
    }
}
