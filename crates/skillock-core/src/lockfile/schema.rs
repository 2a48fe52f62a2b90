//! On-disk shape of `skill-lock.json`.
//!
//! Fields are declared in alphabetical order so serialized keys come out
//! sorted, and every field has a default so older or hand-edited lockfiles
//! still load.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use skillock_types::lockfile::{LockedSkill, LockfileMetadata, ResolutionStrategy};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct LockfileDocument {
    #[serde(default)]
    pub generated_at: String,
    #[serde(default)]
    pub generated_by: String,
    #[serde(default)]
    pub integrity_algorithm: String,
    #[serde(default)]
    pub lockfile_version: String,
    #[serde(default)]
    pub metadata: MetadataDocument,
    #[serde(default)]
    pub provenance: String,
    #[serde(default)]
    pub skills: BTreeMap<String, SkillEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct MetadataDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_capabilities: Option<Vec<String>>,
    #[serde(default)]
    pub resolution_strategy: ResolutionStrategy,
    /// Absent in some older lockfiles; the entry count is used instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_skills: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct SkillEntry {
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub integrity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_score: Option<f64>,
    #[serde(default)]
    pub version: String,
}

impl MetadataDocument {
    pub fn from_metadata(metadata: &LockfileMetadata) -> Self {
        Self {
            allowed_capabilities: metadata.allowed_capabilities.as_ref().map(|caps| {
                let mut caps = caps.clone();
                caps.sort();
                caps.dedup();
                caps
            }),
            resolution_strategy: metadata.resolution_strategy,
            total_skills: Some(metadata.total_skills),
        }
    }

    pub fn into_metadata(self, entry_count: usize) -> LockfileMetadata {
        LockfileMetadata {
            total_skills: self.total_skills.unwrap_or(entry_count),
            resolution_strategy: self.resolution_strategy,
            allowed_capabilities: self.allowed_capabilities,
        }
    }
}

impl SkillEntry {
    pub fn from_skill(skill: &LockedSkill) -> Self {
        let mut capabilities = skill.capabilities.clone();
        capabilities.sort();
        capabilities.dedup();
        Self {
            capabilities,
            dependencies: skill.dependencies.clone(),
            format: skill.format.clone(),
            integrity: skill.integrity.clone(),
            source_path: skill.source_path.clone().filter(|path| !path.is_empty()),
            trust_level: skill.trust_level.clone(),
            trust_score: skill.trust_score,
            version: skill.version.clone(),
        }
    }

    pub fn into_skill(self, name: String) -> LockedSkill {
        LockedSkill {
            name,
            version: self.version,
            integrity: self.integrity,
            format: self.format,
            capabilities: self.capabilities,
            dependencies: self.dependencies,
            trust_score: self.trust_score,
            trust_level: self.trust_level,
            source_path: self.source_path.filter(|path| !path.is_empty()),
        }
    }
}
