//! Skill records handed over by the discovery layer.
//!
//! Parsers and the static analyzer live outside this workspace. They describe
//! each discovered skill with a [`ParsedSkill`]: identity, source format, raw
//! content for integrity hashing, and declared relationships with other
//! skills. Constraint strings are kept raw here and validated when the
//! dependency graph is built.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A declared relationship with another skill: `skill_name` matching
/// `constraint` (e.g. `">=1.0.0,<2.0.0"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredRelation {
    pub skill_name: String,
    #[serde(default = "default_constraint")]
    pub constraint: String,
}

fn default_constraint() -> String {
    "*".to_string()
}

impl DeclaredRelation {
    pub fn new(skill_name: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            skill_name: skill_name.into(),
            constraint: constraint.into(),
        }
    }
}

/// One skill as discovered and parsed from disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSkill {
    pub name: String,
    pub version: String,
    /// Source format identifier (e.g. "claude", "mcp", "openclaw").
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub source_path: String,
    /// Raw file content, hashed into the lockfile integrity field.
    #[serde(default)]
    pub raw_content: String,
    /// Capabilities declared by the skill author, as `resource:ACCESS`.
    #[serde(default)]
    pub declared_capabilities: Vec<String>,
    /// Capabilities inferred by static analysis, as `resource:ACCESS`.
    #[serde(default)]
    pub inferred_capabilities: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<DeclaredRelation>,
    #[serde(default)]
    pub conflicts: Vec<DeclaredRelation>,
}

impl ParsedSkill {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    /// Union of declared and inferred capabilities, sorted and deduplicated.
    pub fn capabilities(&self) -> BTreeSet<String> {
        self.declared_capabilities
            .iter()
            .chain(self.inferred_capabilities.iter())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_merge_declared_and_inferred() {
        let mut skill = ParsedSkill::new("weather-api", "1.2.3");
        skill.declared_capabilities = vec!["network:READ".into(), "filesystem:READ".into()];
        skill.inferred_capabilities = vec!["network:READ".into(), "shell:WRITE".into()];

        let caps: Vec<String> = skill.capabilities().into_iter().collect();
        assert_eq!(caps, vec!["filesystem:READ", "network:READ", "shell:WRITE"]);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{
            "name": "summarizer",
            "version": "0.3.0",
            "dependencies": [{"skill_name": "tokenizer"}]
        }"#;
        let skill: ParsedSkill = serde_json::from_str(json).unwrap();
        assert_eq!(skill.name, "summarizer");
        assert!(skill.format.is_empty());
        assert!(skill.conflicts.is_empty());
        assert_eq!(skill.dependencies[0].constraint, "*");
    }
}
