//! Configuration types for skillock.
//!
//! `SkillockConfig` represents the `skillock.toml` file that controls the
//! resolver search bound, the lockfile name, and the default capability
//! bound.

use serde::{Deserialize, Serialize};

/// Top-level configuration. All fields have sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillockConfig {
    /// Maximum number of search decisions before resolution gives up with a
    /// "timed out" failure.
    #[serde(default = "default_max_decisions")]
    pub max_decisions: u64,

    /// File name of the lockfile written next to the skills.
    #[serde(default = "default_lockfile_name")]
    pub lockfile_name: String,

    /// Capability bound (`resource:ACCESS` strings) applied to every
    /// installed skill. `None` means unbounded.
    #[serde(default)]
    pub allowed_capabilities: Option<Vec<String>>,
}

fn default_max_decisions() -> u64 {
    100_000
}

fn default_lockfile_name() -> String {
    "skill-lock.json".to_string()
}

impl Default for SkillockConfig {
    fn default() -> Self {
        Self {
            max_decisions: default_max_decisions(),
            lockfile_name: default_lockfile_name(),
            allowed_capabilities: None,
        }
    }
}
