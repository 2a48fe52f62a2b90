//! Validation, diffing, and install ordering over a loaded lockfile.

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graph::DiGraph;

use skillock_types::error::LockfileError;
use skillock_types::lockfile::{FieldChange, LockfileDiff, SkillChange};

use crate::dependency::dfs::back_edges;

use super::{INTEGRITY_ALGORITHM, Lockfile};

fn is_valid_integrity(integrity: &str) -> bool {
    integrity
        .strip_prefix(INTEGRITY_ALGORITHM)
        .and_then(|rest| rest.strip_prefix(':'))
        .is_some_and(|hex| {
            hex.len() == 64 && hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        })
}

impl Lockfile {
    /// Internal consistency problems, one message each. An empty list means
    /// the lockfile is valid.
    ///
    /// Checks, in order: every dependency is itself locked, the locked
    /// dependency graph is acyclic, non-empty integrity strings are
    /// `sha256:<64 lowercase hex>`, `total_skills` matches the entry count,
    /// no version is empty, and trust scores lie in `[0, 1]`.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for skill in self.skills.values() {
            for dep in skill.dependencies.keys() {
                if !self.skills.contains_key(dep) {
                    errors.push(format!(
                        "skill '{}' depends on '{dep}' which is not in the lockfile",
                        skill.name
                    ));
                }
            }
        }

        let names: Vec<&str> = self.skills.keys().map(String::as_str).collect();
        let position: HashMap<&str, usize> =
            names.iter().enumerate().map(|(i, name)| (*name, i)).collect();
        let adjacency: Vec<Vec<usize>> = self
            .skills
            .values()
            .map(|skill| {
                skill
                    .dependencies
                    .keys()
                    .filter_map(|dep| position.get(dep.as_str()).copied())
                    .collect()
            })
            .collect();
        for (from, to) in back_edges(&adjacency) {
            errors.push(format!(
                "circular dependency detected involving '{}' and '{}'",
                names[from], names[to]
            ));
        }

        for skill in self.skills.values() {
            if !skill.integrity.is_empty() && !is_valid_integrity(&skill.integrity) {
                errors.push(format!(
                    "skill '{}' has invalid integrity hash format: '{}'",
                    skill.name, skill.integrity
                ));
            }
        }

        if self.metadata.total_skills != self.skills.len() {
            errors.push(format!(
                "metadata total_skills ({}) does not match actual count ({})",
                self.metadata.total_skills,
                self.skills.len()
            ));
        }

        for skill in self.skills.values() {
            if skill.version.is_empty() {
                errors.push(format!("skill '{}' has empty version string", skill.name));
            }
        }

        for skill in self.skills.values() {
            match skill.trust_score {
                Some(score) if !(0.0..=1.0).contains(&score) => errors.push(format!(
                    "skill '{}' has trust_score {score} outside [0, 1]",
                    skill.name
                )),
                _ => {}
            }
        }

        errors
    }

    /// Field-level differences from `self` (older) to `other` (newer).
    pub fn diff(&self, other: &Lockfile) -> LockfileDiff {
        let added = other
            .skills
            .keys()
            .filter(|name| !self.skills.contains_key(*name))
            .cloned()
            .collect();
        let removed = self
            .skills
            .keys()
            .filter(|name| !other.skills.contains_key(*name))
            .cloned()
            .collect();

        let mut changed = Vec::new();
        for (name, old) in &self.skills {
            let Some(new) = other.skills.get(name) else {
                continue;
            };
            let mut push = |change| {
                changed.push(SkillChange {
                    name: name.clone(),
                    change,
                })
            };

            if old.version != new.version {
                push(FieldChange::Version {
                    old: old.version.clone(),
                    new: new.version.clone(),
                });
            }
            if old.integrity != new.integrity {
                push(FieldChange::Integrity {
                    old: old.integrity.clone(),
                    new: new.integrity.clone(),
                });
            }
            let (mut old_caps, mut new_caps) = (old.capabilities.clone(), new.capabilities.clone());
            old_caps.sort();
            old_caps.dedup();
            new_caps.sort();
            new_caps.dedup();
            if old_caps != new_caps {
                push(FieldChange::Capabilities {
                    old: old_caps,
                    new: new_caps,
                });
            }
            if old.trust_score != new.trust_score {
                push(FieldChange::TrustScore {
                    old: old.trust_score,
                    new: new.trust_score,
                });
            }
        }

        LockfileDiff {
            added,
            removed,
            changed,
        }
    }

    /// Locked skill names with every dependency before its dependents.
    /// Dependencies missing from the lockfile are ignored.
    pub fn install_order(&self) -> Result<Vec<String>, LockfileError> {
        let mut graph = DiGraph::<&str, ()>::new();
        let indices: HashMap<&str, _> = self
            .skills
            .keys()
            .map(|name| (name.as_str(), graph.add_node(name.as_str())))
            .collect();

        for skill in self.skills.values() {
            let from = indices[skill.name.as_str()];
            for dep in skill.dependencies.keys() {
                if let Some(&to) = indices.get(dep.as_str()) {
                    // Edge from skill -> dependency
                    graph.add_edge(from, to, ());
                }
            }
        }

        match toposort(&graph, None) {
            // toposort yields dependents before dependencies; reverse it.
            Ok(sorted) => Ok(sorted.into_iter().rev().map(|idx| graph[idx].to_string()).collect()),
            Err(cycle) => Err(LockfileError::Cycle(graph[cycle.node_id()].to_string())),
        }
    }
}
