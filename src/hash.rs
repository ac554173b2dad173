// src/hash.rs

//! SHA-256 content fingerprints for package staleness checks
//!
//! The machine cache decides whether a cached package can stand in for a
//! freshly resolved source package by comparing content fingerprints. A
//! fingerprint is the SHA-256 digest of the package's identity plus its
//! file set, so two packages with the same id/version but different bytes
//! never alias each other.

use sha2::{Digest, Sha256};
use std::fmt;
use std::io::{self, Read};

/// A SHA-256 hash value as a lowercase hex string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash {
    value: String,
}

/// Fingerprint parsing errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    /// Hash string has wrong length for SHA-256
    InvalidLength { expected: usize, got: usize },
    /// Hash string contains invalid hex characters
    InvalidHex(String),
}

impl fmt::Display for HashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLength { expected, got } => {
                write!(f, "invalid hash length: expected {}, got {}", expected, got)
            }
            Self::InvalidHex(s) => write!(f, "invalid hex in hash: {}", s),
        }
    }
}

impl std::error::Error for HashError {}

impl ContentHash {
    /// Hex length of a SHA-256 digest
    pub const HEX_LEN: usize = 64;

    /// Parse a hash from its hex representation
    pub fn parse(value: impl Into<String>) -> Result<Self, HashError> {
        let value = value.into();
        if value.len() != Self::HEX_LEN {
            return Err(HashError::InvalidLength {
                expected: Self::HEX_LEN,
                got: value.len(),
            });
        }
        if !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(HashError::InvalidHex(value));
        }
        Ok(Self {
            value: value.to_lowercase(),
        })
    }

    fn new_unchecked(value: String) -> Self {
        Self { value }
    }

    /// The hash value as a hex string
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Incremental SHA-256 hasher
pub struct Hasher {
    state: Sha256,
}

impl Hasher {
    /// Create a new hasher
    pub fn new() -> Self {
        Self {
            state: Sha256::new(),
        }
    }

    /// Update the hasher with more data
    pub fn update(&mut self, data: &[u8]) {
        self.state.update(data);
    }

    /// Finalize and return the hash
    pub fn finalize(self) -> ContentHash {
        ContentHash::new_unchecked(format!("{:x}", self.state.finalize()))
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute the hash of a byte slice
pub fn hash_bytes(data: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    ContentHash::new_unchecked(format!("{:x}", hasher.finalize()))
}

/// Compute the hash of data from a reader
///
/// Streams the content to avoid loading it entirely into memory.
pub fn hash_reader<R: Read>(reader: &mut R) -> io::Result<ContentHash> {
    let mut hasher = Hasher::new();
    let mut buffer = [0u8; 8192];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finalize())
}
