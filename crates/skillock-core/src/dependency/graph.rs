//! The Agent Dependency Graph (ADG).
//!
//! Nodes live in an arena indexed by position; a per-name index keeps each
//! skill's versions sorted newest first so every traversal is deterministic.
//! Edges are declared as constraints, not pinned versions: a dependency edge
//! points at every existing version of the target that satisfies it.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;

use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;

use skillock_types::error::GraphError;
use skillock_types::skill::ParsedSkill;

use super::constraint::{SkillConflict, SkillDependency, VersionConstraint};
use super::dfs::back_edges;
use super::version::Version;

/// Identity of a node: `(name, version)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SkillKey {
    pub name: String,
    pub version: String,
}

impl SkillKey {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for SkillKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// A specific skill at a specific version, with its outgoing edges and the
/// capabilities (`resource:ACCESS`) it needs at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillNode {
    pub name: String,
    pub version: Version,
    pub dependencies: Vec<SkillDependency>,
    pub conflicts: Vec<SkillConflict>,
    pub capabilities: BTreeSet<String>,
}

impl SkillNode {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
            dependencies: Vec::new(),
            conflicts: Vec::new(),
            capabilities: BTreeSet::new(),
        }
    }

    pub fn with_dependency(mut self, skill_name: impl Into<String>, constraint: VersionConstraint) -> Self {
        self.dependencies.push(SkillDependency::new(skill_name, constraint));
        self
    }

    pub fn with_conflict(mut self, skill_name: impl Into<String>, constraint: VersionConstraint) -> Self {
        self.conflicts.push(SkillConflict::new(skill_name, constraint));
        self
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    pub fn key(&self) -> SkillKey {
        SkillKey::new(self.name.clone(), self.version.as_str())
    }

    /// Build a node from a discovered skill, validating its version and
    /// every declared constraint.
    pub fn from_parsed(skill: &ParsedSkill) -> Result<Self, GraphError> {
        let version = Version::parse(&skill.version).map_err(|source| GraphError::InvalidVersion {
            name: skill.name.clone(),
            source,
        })?;

        let constraint = |raw: &str| {
            VersionConstraint::parse(raw).map_err(|source| GraphError::InvalidConstraint {
                name: skill.name.clone(),
                version: skill.version.clone(),
                source,
            })
        };

        let mut node = Self::new(skill.name.clone(), version);
        for dep in &skill.dependencies {
            node.dependencies
                .push(SkillDependency::new(dep.skill_name.clone(), constraint(&dep.constraint)?));
        }
        for conflict in &skill.conflicts {
            node.conflicts
                .push(SkillConflict::new(conflict.skill_name.clone(), constraint(&conflict.constraint)?));
        }
        node.capabilities = skill.capabilities();
        Ok(node)
    }
}

/// The dependency graph for an agent's skill installation.
///
/// Not internally synchronized: concurrent mutation must be serialized by
/// the caller. Resolution only borrows the graph immutably.
#[derive(Debug, Clone, Default)]
pub struct AgentDependencyGraph {
    nodes: Vec<SkillNode>,
    index: HashMap<SkillKey, usize>,
    /// name -> node ids, newest version first.
    by_name: BTreeMap<String, Vec<usize>>,
}

impl AgentDependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate a graph from discovered skills.
    pub fn from_parsed_skills<'a, I>(skills: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = &'a ParsedSkill>,
    {
        let mut graph = Self::new();
        for skill in skills {
            graph.add_node(SkillNode::from_parsed(skill)?);
        }
        tracing::debug!(
            skills = graph.by_name.len(),
            nodes = graph.nodes.len(),
            "built dependency graph from parsed skills"
        );
        Ok(graph)
    }

    /// Add a node. A node with the same `(name, version)` is replaced.
    pub fn add_node(&mut self, node: SkillNode) {
        let key = node.key();
        if let Some(&id) = self.index.get(&key) {
            self.nodes[id] = node;
            return;
        }

        let id = self.nodes.len();
        let ids = self.by_name.entry(node.name.clone()).or_default();
        let pos = ids
            .iter()
            .position(|&other| self.nodes[other].version < node.version)
            .unwrap_or(ids.len());
        ids.insert(pos, id);
        self.nodes.push(node);
        self.index.insert(key, id);
    }

    pub fn get_node(&self, name: &str, version: &str) -> Option<&SkillNode> {
        self.index
            .get(&SkillKey::new(name, version))
            .map(|&id| &self.nodes[id])
    }

    /// Available versions of `name`, newest first. Empty for unknown skills.
    pub fn get_versions(&self, name: &str) -> Vec<&Version> {
        self.versions_of(name).map(|node| &node.version).collect()
    }

    /// Dependency edges of a node; empty if the node does not exist.
    pub fn get_dependencies(&self, name: &str, version: &str) -> &[SkillDependency] {
        self.get_node(name, version)
            .map(|node| node.dependencies.as_slice())
            .unwrap_or(&[])
    }

    /// Conflict edges of a node; empty if the node does not exist.
    pub fn get_conflicts(&self, name: &str, version: &str) -> &[SkillConflict] {
        self.get_node(name, version)
            .map(|node| node.conflicts.as_slice())
            .unwrap_or(&[])
    }

    /// The set S of skill names, sorted.
    pub fn skills(&self) -> Vec<&str> {
        self.by_name.keys().map(String::as_str).collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes, by name ascending then version descending.
    pub fn iter(&self) -> impl Iterator<Item = &SkillNode> {
        self.by_name
            .values()
            .flat_map(|ids| ids.iter().map(|&id| &self.nodes[id]))
    }

    /// Nodes of `name` whose version satisfies `constraint`, newest first.
    pub fn candidates<'g>(
        &'g self,
        name: &str,
        constraint: &'g VersionConstraint,
    ) -> impl Iterator<Item = &'g SkillNode> + use<'g> {
        self.versions_of(name)
            .filter(move |node| constraint.matches(&node.version))
    }

    fn versions_of<'g>(&'g self, name: &str) -> impl Iterator<Item = &'g SkillNode> + use<'g> {
        self.by_name
            .get(name)
            .into_iter()
            .flatten()
            .map(|&id| &self.nodes[id])
    }

    fn candidate_ids(&self, dep: &SkillDependency) -> Vec<usize> {
        self.by_name
            .get(&dep.skill_name)
            .into_iter()
            .flatten()
            .copied()
            .filter(|&id| dep.constraint.matches(&self.nodes[id].version))
            .collect()
    }

    /// Version-level adjacency: node id -> ids of every satisfying
    /// dependency version.
    fn adjacency(&self) -> Vec<Vec<usize>> {
        self.nodes
            .iter()
            .map(|node| {
                node.dependencies
                    .iter()
                    .flat_map(|dep| self.candidate_ids(dep))
                    .collect()
            })
            .collect()
    }

    /// Breadth-first closure over dependency edges from `(name, version)`.
    ///
    /// Each dependency contributes every existing version that satisfies its
    /// constraint: the candidate set the resolver chooses among. The root
    /// itself is excluded.
    pub fn transitive_dependencies(&self, name: &str, version: &str) -> BTreeSet<SkillKey> {
        let root = SkillKey::new(name, version);
        let Some(&root_id) = self.index.get(&root) else {
            return BTreeSet::new();
        };

        let mut seen = vec![false; self.nodes.len()];
        seen[root_id] = true;
        let mut queue = VecDeque::from([root_id]);
        let mut closure = BTreeSet::new();

        while let Some(id) = queue.pop_front() {
            for dep in &self.nodes[id].dependencies {
                for target in self.candidate_ids(dep) {
                    if !seen[target] {
                        seen[target] = true;
                        closure.insert(self.nodes[target].key());
                        queue.push_back(target);
                    }
                }
            }
        }

        closure
    }

    /// Whether any dependency path over skill-versions loops back on itself.
    pub fn has_cycle(&self) -> bool {
        !back_edges(&self.adjacency()).is_empty()
    }

    /// Name-level cycles: each strongly connected group of skills that
    /// depend on one another, as a sorted list of names. Self-dependencies
    /// are reported as single-element groups.
    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        let mut graph = DiGraph::<&str, ()>::new();
        let mut ids = BTreeMap::new();
        for name in self.by_name.keys() {
            ids.insert(name.as_str(), graph.add_node(name.as_str()));
        }
        for node in &self.nodes {
            for dep in &node.dependencies {
                let from = ids[node.name.as_str()];
                let to = *ids
                    .entry(dep.skill_name.as_str())
                    .or_insert_with(|| graph.add_node(dep.skill_name.as_str()));
                graph.update_edge(from, to, ());
            }
        }

        let mut cycles: Vec<Vec<String>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut names: Vec<String> = scc.iter().map(|&ix| graph[ix].to_string()).collect();
                names.sort();
                names
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Reverse transitive closure of known-vulnerable skill-versions.
    ///
    /// Maps every node that depends, directly or transitively, on a
    /// vulnerable node to the sorted list of vulnerable nodes reaching it.
    /// Vulnerable nodes themselves are not reported as affected.
    pub fn propagate_vulnerabilities(
        &self,
        vulnerable: &BTreeSet<SkillKey>,
    ) -> BTreeMap<SkillKey, Vec<SkillKey>> {
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
        for (from, targets) in self.adjacency().into_iter().enumerate() {
            for to in targets {
                dependents[to].push(from);
            }
        }

        let mut affected: BTreeMap<SkillKey, BTreeSet<SkillKey>> = BTreeMap::new();
        for vuln in vulnerable {
            let Some(&start) = self.index.get(vuln) else {
                continue;
            };
            let mut seen = vec![false; self.nodes.len()];
            let mut queue = VecDeque::from([start]);
            while let Some(id) = queue.pop_front() {
                for &dependent in &dependents[id] {
                    if seen[dependent] {
                        continue;
                    }
                    seen[dependent] = true;
                    let key = self.nodes[dependent].key();
                    if vulnerable.contains(&key) {
                        continue;
                    }
                    affected.entry(key).or_default().insert(vuln.clone());
                    queue.push_back(dependent);
                }
            }
        }

        affected
            .into_iter()
            .map(|(key, roots)| (key, roots.into_iter().collect()))
            .collect()
    }
}
