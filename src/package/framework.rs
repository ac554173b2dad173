// src/package/framework.rs

//! Target framework identifiers
//!
//! A framework name describes the runtime/platform a dependency set or
//! assembly reference applies to. Names compare case-insensitively.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A case-insensitive target framework identifier
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameworkName(String);

impl FrameworkName {
    /// Create a framework name; empty input is an invalid argument
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::empty_argument("framework name"));
        }
        Ok(Self(name))
    }

    /// The name as originally written
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for FrameworkName {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for FrameworkName {}

impl Hash for FrameworkName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_ascii_lowercase().hash(state);
    }
}

impl fmt::Display for FrameworkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FrameworkName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}
