//! Lockfile domain types.
//!
//! Defines the entries of `skill-lock.json`: locked skills, the metadata
//! section, trust levels, and the structured diff between two lockfiles.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Locked skill entries
// ---------------------------------------------------------------------------

/// The fully resolved state of one skill: exact version, content integrity,
/// capabilities, resolved dependency versions, and trust metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LockedSkill {
    pub name: String,
    pub version: String,
    /// Content hash in `sha256:<64 hex>` form; empty when no content was seen.
    pub integrity: String,
    /// Source format identifier (e.g. "claude", "mcp", "openclaw").
    pub format: String,
    /// Capabilities as `resource:ACCESS`, kept sorted and deduplicated.
    pub capabilities: Vec<String>,
    /// Dependency name -> resolved version.
    pub dependencies: BTreeMap<String, String>,
    pub trust_score: Option<f64>,
    pub trust_level: Option<String>,
    pub source_path: Option<String>,
}

impl LockedSkill {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    pub fn with_integrity(mut self, integrity: impl Into<String>) -> Self {
        self.integrity = integrity.into();
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self.normalize();
        self
    }

    pub fn with_dependency(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.dependencies.insert(name.into(), version.into());
        self
    }

    /// Attach a trust score and the level derived from it. Scores are
    /// clamped to `[0, 1]`; NaN is not a score and leaves the entry unscored.
    pub fn with_trust_score(mut self, score: f64) -> Self {
        if score.is_nan() {
            return self;
        }
        let score = score.clamp(0.0, 1.0);
        self.trust_score = Some(score);
        self.trust_level = Some(TrustLevel::from_score(score).to_string());
        self
    }

    pub fn with_source_path(mut self, path: impl Into<String>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    /// Sort and deduplicate capabilities.
    pub fn normalize(&mut self) {
        self.capabilities.sort();
        self.capabilities.dedup();
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// How the locked set was produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    #[default]
    Sat,
    Manual,
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sat => write!(f, "sat"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// Aggregate information about a lockfile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockfileMetadata {
    /// Expected number of entries; a mismatch signals an incomplete write.
    pub total_skills: usize,
    pub resolution_strategy: ResolutionStrategy,
    /// Capability bound applied during resolution. `None` means unbounded.
    pub allowed_capabilities: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Trust levels
// ---------------------------------------------------------------------------

/// Graduated trust level derived from a trust score in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrustLevel {
    Unsigned,
    Signed,
    CommunityVerified,
    FormallyVerified,
}

impl TrustLevel {
    const FORMALLY_VERIFIED_THRESHOLD: f64 = 0.75;
    const COMMUNITY_VERIFIED_THRESHOLD: f64 = 0.50;
    const SIGNED_THRESHOLD: f64 = 0.25;

    pub fn from_score(score: f64) -> Self {
        if score >= Self::FORMALLY_VERIFIED_THRESHOLD {
            Self::FormallyVerified
        } else if score >= Self::COMMUNITY_VERIFIED_THRESHOLD {
            Self::CommunityVerified
        } else if score >= Self::SIGNED_THRESHOLD {
            Self::Signed
        } else {
            Self::Unsigned
        }
    }
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsigned => write!(f, "UNSIGNED"),
            Self::Signed => write!(f, "SIGNED"),
            Self::CommunityVerified => write!(f, "COMMUNITY_VERIFIED"),
            Self::FormallyVerified => write!(f, "FORMALLY_VERIFIED"),
        }
    }
}

// ---------------------------------------------------------------------------
// Diff types
// ---------------------------------------------------------------------------

/// A single field-level difference for a skill present in both lockfiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum FieldChange {
    Version { old: String, new: String },
    Integrity { old: String, new: String },
    Capabilities { old: Vec<String>, new: Vec<String> },
    TrustScore { old: Option<f64>, new: Option<f64> },
}

/// A field change attributed to a named skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillChange {
    pub name: String,
    #[serde(flatten)]
    pub change: FieldChange,
}

/// Structured comparison of two lockfiles (old vs. new).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LockfileDiff {
    /// Names present only in the newer lockfile, sorted.
    pub added: Vec<String>,
    /// Names present only in the older lockfile, sorted.
    pub removed: Vec<String>,
    pub changed: Vec<SkillChange>,
}

impl LockfileDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}
