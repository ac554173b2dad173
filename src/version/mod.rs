// src/version/mod.rs

//! Version range handling and constraint satisfaction
//!
//! Package versions are semantic versions (`major.minor.patch` with an
//! optional prerelease label; a release always sorts above any prerelease
//! sharing its numbers). A `VersionRange` constrains the versions a
//! dependency accepts, using interval notation:
//!
//! - "1.0"       → 1.0.0 <= x          (minimum, inclusive)
//! - "[1.0]"     → x == 1.0.0          (exact)
//! - "[1.0,2.0)" → 1.0.0 <= x < 2.0.0
//! - "(,1.0]"    → x <= 1.0.0          (maximum only)
//!
//! An unbounded range (no minimum, no maximum) matches everything.

use crate::error::{Error, Result};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An interval constraint over semantic versions
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VersionRange {
    pub min_version: Option<Version>,
    pub min_inclusive: bool,
    pub max_version: Option<Version>,
    pub max_inclusive: bool,
}

impl VersionRange {
    /// The unbounded range: matches every version
    pub fn any() -> Self {
        Self::default()
    }

    /// Match exactly one version
    pub fn exact(version: Version) -> Self {
        Self {
            min_version: Some(version.clone()),
            min_inclusive: true,
            max_version: Some(version),
            max_inclusive: true,
        }
    }

    /// Match the given version or anything above it
    pub fn at_least(version: Version) -> Self {
        Self {
            min_version: Some(version),
            min_inclusive: true,
            max_version: None,
            max_inclusive: false,
        }
    }

    /// Parse interval notation
    ///
    /// A bare version string is a minimum-inclusive constraint; bracketed
    /// forms spell out both bounds. Empty input is the unbounded range.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if s.is_empty() || s == "*" {
            return Ok(Self::any());
        }

        let starts_bracketed = s.starts_with('[') || s.starts_with('(');
        let ends_bracketed = s.ends_with(']') || s.ends_with(')');

        if !starts_bracketed && !ends_bracketed {
            // Bare version: minimum, inclusive
            let version = parse_version(s)?;
            return Ok(Self::at_least(version));
        }

        if !starts_bracketed || !ends_bracketed {
            return Err(Error::VersionParse {
                input: s.to_string(),
                reason: "unbalanced interval brackets".to_string(),
            });
        }

        let min_inclusive = s.starts_with('[');
        let max_inclusive = s.ends_with(']');
        let inner = &s[1..s.len() - 1];

        let (min_str, max_str) = match inner.find(',') {
            Some(pos) => (&inner[..pos], &inner[pos + 1..]),
            None => {
                // "[1.0]" is an exact match; "(1.0)" excludes its only point
                if !min_inclusive || !max_inclusive {
                    return Err(Error::VersionParse {
                        input: s.to_string(),
                        reason: "single-version interval must be inclusive".to_string(),
                    });
                }
                return Ok(Self::exact(parse_version(inner.trim())?));
            }
        };

        let min_version = match min_str.trim() {
            "" => None,
            v => Some(parse_version(v)?),
        };
        let max_version = match max_str.trim() {
            "" => None,
            v => Some(parse_version(v)?),
        };

        if min_version.is_none() && max_version.is_none() {
            return Err(Error::VersionParse {
                input: s.to_string(),
                reason: "interval has no bounds".to_string(),
            });
        }

        Ok(Self {
            min_version,
            min_inclusive,
            max_version,
            max_inclusive,
        })
    }

    /// Check if a version satisfies this range
    ///
    /// Pure predicate; an unbounded range accepts everything.
    pub fn satisfies(&self, version: &Version) -> bool {
        if let Some(ref min) = self.min_version {
            let ok = if self.min_inclusive {
                version >= min
            } else {
                version > min
            };
            if !ok {
                return false;
            }
        }

        if let Some(ref max) = self.max_version {
            let ok = if self.max_inclusive {
                version <= max
            } else {
                version < max
            };
            if !ok {
                return false;
            }
        }

        true
    }

    /// True when either bound carries a prerelease label
    ///
    /// A range that names a prerelease opts its query into prerelease
    /// candidates even when the caller did not ask for them.
    pub fn permits_prerelease(&self) -> bool {
        self.min_version
            .as_ref()
            .is_some_and(|v| !v.pre.is_empty())
            || self
                .max_version
                .as_ref()
                .is_some_and(|v| !v.pre.is_empty())
    }

    /// True when the range is the unbounded "match everything" range
    pub fn is_unbounded(&self) -> bool {
        self.min_version.is_none() && self.max_version.is_none()
    }

    /// True when the range pins exactly one version
    pub fn is_exact(&self) -> bool {
        self.min_inclusive
            && self.max_inclusive
            && self.min_version.is_some()
            && self.min_version == self.max_version
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.min_version, &self.max_version) {
            (None, None) => write!(f, "*"),
            (Some(min), Some(max)) if min == max && self.min_inclusive && self.max_inclusive => {
                write!(f, "[{}]", min)
            }
            (Some(min), None) if self.min_inclusive => write!(f, "{}", min),
            (min, max) => {
                write!(f, "{}", if self.min_inclusive { '[' } else { '(' })?;
                if let Some(v) = min {
                    write!(f, "{}", v)?;
                }
                write!(f, ",")?;
                if let Some(v) = max {
                    write!(f, "{}", v)?;
                }
                write!(f, "{}", if self.max_inclusive { ']' } else { ')' })
            }
        }
    }
}

impl FromStr for VersionRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Parse a semantic version, padding missing minor/patch components
///
/// Interval notation commonly abbreviates "1.0" for "1.0.0".
pub fn parse_version(s: &str) -> Result<Version> {
    let s = s.trim();
    if let Ok(v) = Version::parse(s) {
        return Ok(v);
    }

    // Split off any prerelease label before counting components
    let (numbers, pre) = match s.find('-') {
        Some(pos) => (&s[..pos], &s[pos..]),
        None => (s, ""),
    };

    let padded = match numbers.split('.').count() {
        1 => format!("{}.0.0{}", numbers, pre),
        2 => format!("{}.0{}", numbers, pre),
        _ => s.to_string(),
    };

    Version::parse(&padded).map_err(|e| Error::VersionParse {
        input: s.to_string(),
        reason: e.to_string(),
    })
}
