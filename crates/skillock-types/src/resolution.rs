//! Outcome of a dependency resolution request.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of resolving a set of root requirements against a skill graph.
///
/// A successful resolution maps each installed skill name to exactly one
/// version. A failed resolution carries human-readable explanations and no
/// installed skills. Unsatisfiable requests are an ordinary outcome, not an
/// error; callers branch on [`Resolution::is_success`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    success: bool,
    installed: BTreeMap<String, String>,
    conflicts: Vec<String>,
}

impl Resolution {
    /// A satisfying assignment: skill name -> resolved version.
    pub fn satisfied(installed: BTreeMap<String, String>) -> Self {
        Self {
            success: true,
            installed,
            conflicts: Vec::new(),
        }
    }

    /// A failed resolution. An empty explanation list is replaced by a
    /// generic message so failures are never silent.
    pub fn unsatisfiable(mut conflicts: Vec<String>) -> Self {
        if conflicts.is_empty() {
            conflicts.push(
                "resolution failed: no satisfying assignment exists".to_string(),
            );
        }
        Self {
            success: false,
            installed: BTreeMap::new(),
            conflicts,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn installed(&self) -> &BTreeMap<String, String> {
        &self.installed
    }

    /// Resolved version of `name`, if it was installed.
    pub fn version_of(&self, name: &str) -> Option<&str> {
        self.installed.get(name).map(String::as_str)
    }

    pub fn conflicts(&self) -> &[String] {
        &self.conflicts
    }
}
