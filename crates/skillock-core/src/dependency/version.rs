//! Semantic version values used as graph vertices.
//!
//! Parsing follows SemVer 2.0.0 syntax via the `semver` crate. Ordering only
//! looks at the `(major, minor, patch)` triple: pre-release and build
//! suffixes are accepted but ignored for precedence, so `1.0.0-alpha` and
//! `1.0.0` compare as the same release. Downstream lockfiles rely on this.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use skillock_types::error::VersionError;

/// A parsed `major.minor.patch[-pre][+build]` version.
///
/// Equality and hashing use the exact version string, so two nodes that
/// differ only by suffix remain distinct identities. `Ord` sorts by triple
/// first and falls back to the string for a total, deterministic order.
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    triple: (u64, u64, u64),
}

impl Version {
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        let parsed = semver::Version::parse(trimmed)
            .map_err(|_| VersionError::InvalidVersion(input.to_string()))?;
        Ok(Self {
            raw: trimmed.to_string(),
            triple: (parsed.major, parsed.minor, parsed.patch),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The `(major, minor, patch)` triple used for precedence.
    pub fn triple(&self) -> (u64, u64, u64) {
        self.triple
    }

    pub fn major(&self) -> u64 {
        self.triple.0
    }

    pub fn minor(&self) -> u64 {
        self.triple.1
    }

    pub fn patch(&self) -> u64 {
        self.triple.2
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.triple
            .cmp(&other.triple)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
