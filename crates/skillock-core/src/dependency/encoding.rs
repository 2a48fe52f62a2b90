//! CNF encoding of a resolution request.
//!
//! One boolean variable per skill-version in the graph. Clauses are emitted
//! family by family in a fixed order (root, uniqueness, dependency, conflict,
//! capability) and, within a family, in graph order, so the same request
//! always produces the same clause list.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use super::constraint::VersionConstraint;
use super::graph::{AgentDependencyGraph, SkillKey};

/// A variable or its negation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Literal {
    pub var: usize,
    pub positive: bool,
}

impl Literal {
    pub fn positive(var: usize) -> Self {
        Self { var, positive: true }
    }

    pub fn negative(var: usize) -> Self {
        Self {
            var,
            positive: false,
        }
    }

    pub fn is_true_under(&self, assignment: &[bool]) -> bool {
        assignment.get(self.var).copied().unwrap_or(false) == self.positive
    }
}

/// The constraint family a clause belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClauseFamily {
    Root,
    Uniqueness,
    Dependency,
    Conflict,
    Capability,
}

impl fmt::Display for ClauseFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Root => "root",
            Self::Uniqueness => "uniqueness",
            Self::Dependency => "dependency",
            Self::Conflict => "conflict",
            Self::Capability => "capability",
        };
        f.write_str(name)
    }
}

/// Where a clause came from, kept so failures can be explained in terms of
/// skills rather than variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClauseOrigin {
    /// At least one version of `skill` matching `constraint`.
    Root {
        skill: String,
        constraint: VersionConstraint,
    },
    /// Not both `first` and `second` (same skill name).
    Uniqueness { first: SkillKey, second: SkillKey },
    /// `dependent` implies some version of `skill` matching `constraint`.
    Dependency {
        dependent: SkillKey,
        skill: String,
        constraint: VersionConstraint,
    },
    /// Not both `source` and `target`.
    Conflict { source: SkillKey, target: SkillKey },
    /// `skill` needs capabilities outside the bound.
    Capability { skill: SkillKey, excess: Vec<String> },
}

impl ClauseOrigin {
    pub fn family(&self) -> ClauseFamily {
        match self {
            Self::Root { .. } => ClauseFamily::Root,
            Self::Uniqueness { .. } => ClauseFamily::Uniqueness,
            Self::Dependency { .. } => ClauseFamily::Dependency,
            Self::Conflict { .. } => ClauseFamily::Conflict,
            Self::Capability { .. } => ClauseFamily::Capability,
        }
    }
}

/// A disjunction of literals. An empty clause is unsatisfiable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub literals: Vec<Literal>,
    pub origin: ClauseOrigin,
}

impl Clause {
    fn new(literals: Vec<Literal>, origin: ClauseOrigin) -> Self {
        let mut deduped: Vec<Literal> = Vec::with_capacity(literals.len());
        for literal in literals {
            if !deduped.contains(&literal) {
                deduped.push(literal);
            }
        }
        Self {
            literals: deduped,
            origin,
        }
    }

    pub fn family(&self) -> ClauseFamily {
        self.origin.family()
    }

    pub fn is_satisfied_by(&self, assignment: &[bool]) -> bool {
        self.literals.iter().any(|lit| lit.is_true_under(assignment))
    }
}

/// Variables and clauses for one resolution request.
#[derive(Debug, Clone, Default)]
pub struct SatEncoding {
    variables: Vec<SkillKey>,
    index: HashMap<SkillKey, usize>,
    clauses: Vec<Clause>,
}

impl SatEncoding {
    pub fn build(
        graph: &AgentDependencyGraph,
        requirements: &BTreeMap<String, VersionConstraint>,
        allowed_capabilities: Option<&BTreeSet<String>>,
    ) -> Self {
        let variables: Vec<SkillKey> = graph.iter().map(|node| node.key()).collect();
        let index: HashMap<SkillKey, usize> = variables
            .iter()
            .cloned()
            .enumerate()
            .map(|(var, key)| (key, var))
            .collect();
        let var_of = |name: &str, version: &str| index[&SkillKey::new(name, version)];

        let mut clauses = Vec::new();

        for (skill, constraint) in requirements {
            let literals = graph
                .candidates(skill, constraint)
                .map(|node| Literal::positive(var_of(&node.name, node.version.as_str())))
                .collect();
            clauses.push(Clause::new(
                literals,
                ClauseOrigin::Root {
                    skill: skill.clone(),
                    constraint: constraint.clone(),
                },
            ));
        }

        for name in graph.skills() {
            let versions = graph.get_versions(name);
            for (i, first) in versions.iter().enumerate() {
                for second in &versions[i + 1..] {
                    clauses.push(Clause::new(
                        vec![
                            Literal::negative(var_of(name, first.as_str())),
                            Literal::negative(var_of(name, second.as_str())),
                        ],
                        ClauseOrigin::Uniqueness {
                            first: SkillKey::new(name, first.as_str()),
                            second: SkillKey::new(name, second.as_str()),
                        },
                    ));
                }
            }
        }

        for node in graph.iter() {
            let dependent = node.key();
            let x = index[&dependent];
            for dep in &node.dependencies {
                let mut literals = vec![Literal::negative(x)];
                literals.extend(
                    graph
                        .candidates(&dep.skill_name, &dep.constraint)
                        .map(|target| Literal::positive(var_of(&target.name, target.version.as_str()))),
                );
                clauses.push(Clause::new(
                    literals,
                    ClauseOrigin::Dependency {
                        dependent: dependent.clone(),
                        skill: dep.skill_name.clone(),
                        constraint: dep.constraint.clone(),
                    },
                ));
            }
        }

        for node in graph.iter() {
            let source = node.key();
            let x = index[&source];
            for conflict in &node.conflicts {
                for target in graph.candidates(&conflict.skill_name, &conflict.constraint) {
                    let target = target.key();
                    clauses.push(Clause::new(
                        vec![Literal::negative(x), Literal::negative(index[&target])],
                        ClauseOrigin::Conflict {
                            source: source.clone(),
                            target,
                        },
                    ));
                }
            }
        }

        if let Some(allowed) = allowed_capabilities {
            for node in graph.iter() {
                let excess: Vec<String> = node.capabilities.difference(allowed).cloned().collect();
                if excess.is_empty() {
                    continue;
                }
                let skill = node.key();
                clauses.push(Clause::new(
                    vec![Literal::negative(index[&skill])],
                    ClauseOrigin::Capability { skill, excess },
                ));
            }
        }

        Self {
            variables,
            index,
            clauses,
        }
    }

    /// Skill-version behind each variable, in variable order.
    pub fn variables(&self) -> &[SkillKey] {
        &self.variables
    }

    pub fn variable(&self, key: &SkillKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn clauses_in(&self, family: ClauseFamily) -> impl Iterator<Item = &Clause> {
        self.clauses.iter().filter(move |clause| clause.family() == family)
    }

    /// Whether a full assignment satisfies every clause.
    pub fn is_satisfied_by(&self, assignment: &[bool]) -> bool {
        assignment.len() == self.variables.len()
            && self.clauses.iter().all(|clause| clause.is_satisfied_by(assignment))
    }

    /// The skill-versions set to true by an assignment.
    pub fn selected<'a>(&'a self, assignment: &'a [bool]) -> impl Iterator<Item = &'a SkillKey> + 'a {
        self.variables
            .iter()
            .zip(assignment)
            .filter(|(_, chosen)| **chosen)
            .map(|(key, _)| key)
    }
}
