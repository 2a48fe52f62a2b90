//! The skill lockfile (`skill-lock.json`).
//!
//! A [`Lockfile`] captures the exact resolved state of an agent's skills:
//! versions, content integrity, capabilities, resolved dependency versions,
//! and trust metadata. Serialization is deterministic: entries and keys are
//! sorted, so two lockfiles with the same content render to byte-identical
//! JSON apart from `generated_at`.

mod factory;
mod ops;
mod schema;

pub use factory::LockfileSources;

use std::collections::BTreeMap;

use chrono::Utc;

use skillock_types::error::LockfileError;
use skillock_types::lockfile::{LockedSkill, LockfileMetadata};

use crate::service::hash::ContentHasher;

use schema::{LockfileDocument, MetadataDocument, SkillEntry};

/// Schema version written to and expected from `lockfile_version`.
pub const LOCKFILE_VERSION: &str = "1.0";
/// Integrity algorithm tag recorded in the document header.
pub const INTEGRITY_ALGORITHM: &str = "sha256";
pub const GENERATED_BY: &str = "skillock";
/// Tool provenance tag embedded in every lockfile.
pub const PROVENANCE: &str = concat!("skillock/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lockfile {
    skills: BTreeMap<String, LockedSkill>,
    metadata: LockfileMetadata,
}

impl Lockfile {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Skill management ---------------------------------------------------

    /// Add an entry, replacing any entry with the same name, and keep
    /// `metadata.total_skills` in step.
    pub fn add_skill(&mut self, mut skill: LockedSkill) {
        skill.normalize();
        self.skills.insert(skill.name.clone(), skill);
        self.metadata.total_skills = self.skills.len();
    }

    pub fn get_skill(&self, name: &str) -> Option<&LockedSkill> {
        self.skills.get(name)
    }

    pub fn skill_count(&self) -> usize {
        self.skills.len()
    }

    /// Entry names, sorted.
    pub fn skill_names(&self) -> Vec<&str> {
        self.skills.keys().map(String::as_str).collect()
    }

    /// Entries in name order.
    pub fn skills(&self) -> impl Iterator<Item = &LockedSkill> {
        self.skills.values()
    }

    pub fn metadata(&self) -> &LockfileMetadata {
        &self.metadata
    }

    /// Replace the metadata wholesale. `total_skills` is taken as given, so
    /// a mismatch shows up in [`validate`](Self::validate).
    pub fn set_metadata(&mut self, metadata: LockfileMetadata) {
        self.metadata = metadata;
    }

    // -- Integrity ----------------------------------------------------------

    /// Whether `content` hashes to the integrity recorded for `name`.
    /// Accepts text or raw bytes. Unknown skills never verify.
    pub fn verify_integrity(
        &self,
        hasher: &dyn ContentHasher,
        name: &str,
        content: impl AsRef<[u8]>,
    ) -> bool {
        self.skills
            .get(name)
            .is_some_and(|skill| hasher.compute_integrity(content.as_ref()) == skill.integrity)
    }

    // -- Serialization ------------------------------------------------------

    fn document(&self, generated_at: &str) -> LockfileDocument {
        LockfileDocument {
            generated_at: generated_at.to_string(),
            generated_by: GENERATED_BY.to_string(),
            integrity_algorithm: INTEGRITY_ALGORITHM.to_string(),
            lockfile_version: LOCKFILE_VERSION.to_string(),
            metadata: MetadataDocument::from_metadata(&self.metadata),
            provenance: PROVENANCE.to_string(),
            skills: self
                .skills
                .iter()
                .map(|(name, skill)| (name.clone(), SkillEntry::from_skill(skill)))
                .collect(),
        }
    }

    /// The canonical JSON object, stamped with the current UTC time.
    pub fn to_dict(&self) -> serde_json::Value {
        self.to_dict_at(&Utc::now().to_rfc3339())
    }

    pub fn to_dict_at(&self, generated_at: &str) -> serde_json::Value {
        // Only string keys and finite-or-null numbers: cannot fail.
        serde_json::to_value(self.document(generated_at)).unwrap_or_default()
    }

    /// Pretty-printed canonical JSON, stamped with the current UTC time.
    pub fn to_json(&self) -> Result<String, LockfileError> {
        self.to_json_at(&Utc::now().to_rfc3339())
    }

    /// Pretty-printed canonical JSON with a caller-chosen `generated_at`.
    pub fn to_json_at(&self, generated_at: &str) -> Result<String, LockfileError> {
        Ok(serde_json::to_string_pretty(&self.document(generated_at))?)
    }

    /// Rebuild a lockfile from its JSON object form. Missing fields take
    /// their defaults; a missing `total_skills` falls back to the entry
    /// count.
    pub fn from_dict(value: serde_json::Value) -> Result<Self, LockfileError> {
        let document: LockfileDocument = serde_json::from_value(value)?;
        Ok(Self::from_document(document))
    }

    pub fn from_json(json: &str) -> Result<Self, LockfileError> {
        let document: LockfileDocument = serde_json::from_str(json)?;
        Ok(Self::from_document(document))
    }

    fn from_document(document: LockfileDocument) -> Self {
        if !document.lockfile_version.is_empty() && document.lockfile_version != LOCKFILE_VERSION {
            tracing::warn!(
                found = %document.lockfile_version,
                expected = LOCKFILE_VERSION,
                "lockfile was written with a different schema version"
            );
        }

        let skills: BTreeMap<String, LockedSkill> = document
            .skills
            .into_iter()
            .map(|(name, entry)| (name.clone(), entry.into_skill(name)))
            .collect();
        let metadata = document.metadata.into_metadata(skills.len());
        Self { skills, metadata }
    }
}
