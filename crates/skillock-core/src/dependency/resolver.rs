//! SAT-based dependency resolution.
//!
//! A request (root requirements plus an optional capability bound) is
//! encoded as CNF over the graph's skill-versions, then searched with DPLL.
//! The outcome is always a [`Resolution`]: an installation set on success, or
//! human-readable explanations when no consistent set exists.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use skillock_types::config::SkillockConfig;
use skillock_types::error::ConstraintError;
use skillock_types::resolution::Resolution;

use super::constraint::VersionConstraint;
use super::encoding::{ClauseOrigin, Literal, SatEncoding};
use super::graph::AgentDependencyGraph;
use super::solver::{Explanation, Role, Solver, Verdict};

/// Default cap on search decisions.
pub const DEFAULT_MAX_DECISIONS: u64 = 100_000;

/// Resolves root requirements against an [`AgentDependencyGraph`].
///
/// The resolver only borrows the graph. Calling [`resolve`](Self::resolve)
/// twice with the same inputs yields the same [`Resolution`].
#[derive(Debug, Clone)]
pub struct DependencyResolver<'g> {
    graph: &'g AgentDependencyGraph,
    requirements: BTreeMap<String, VersionConstraint>,
    allowed_capabilities: Option<BTreeSet<String>>,
    max_decisions: u64,
}

impl<'g> DependencyResolver<'g> {
    pub fn new(graph: &'g AgentDependencyGraph) -> Self {
        Self {
            graph,
            requirements: BTreeMap::new(),
            allowed_capabilities: None,
            max_decisions: DEFAULT_MAX_DECISIONS,
        }
    }

    /// A resolver using the search bound and capability bound from config.
    pub fn from_config(graph: &'g AgentDependencyGraph, config: &SkillockConfig) -> Self {
        let resolver = Self::new(graph).with_max_decisions(config.max_decisions);
        match &config.allowed_capabilities {
            Some(allowed) => resolver.with_allowed_capabilities(allowed.iter().cloned()),
            None => resolver,
        }
    }

    /// Require some version of `name` matching `constraint`. A second
    /// requirement on the same name replaces the first.
    pub fn with_requirement(mut self, name: impl Into<String>, constraint: VersionConstraint) -> Self {
        self.requirements.insert(name.into(), constraint);
        self
    }

    /// Like [`with_requirement`](Self::with_requirement), parsing the
    /// constraint first.
    pub fn require(self, name: impl Into<String>, constraint: &str) -> Result<Self, ConstraintError> {
        let constraint = VersionConstraint::parse(constraint)?;
        Ok(self.with_requirement(name, constraint))
    }

    pub fn with_requirements<I, N>(mut self, requirements: I) -> Self
    where
        I: IntoIterator<Item = (N, VersionConstraint)>,
        N: Into<String>,
    {
        for (name, constraint) in requirements {
            self.requirements.insert(name.into(), constraint);
        }
        self
    }

    /// Require every skill in the graph at any version.
    pub fn require_all(mut self) -> Self {
        for name in self.graph.skills() {
            self.requirements
                .entry(name.to_string())
                .or_insert_with(VersionConstraint::any);
        }
        self
    }

    /// Forbid any skill-version whose capabilities are not all in `allowed`.
    pub fn with_allowed_capabilities<I, S>(mut self, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_capabilities = Some(allowed.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_max_decisions(mut self, max_decisions: u64) -> Self {
        self.max_decisions = max_decisions;
        self
    }

    pub fn requirements(&self) -> &BTreeMap<String, VersionConstraint> {
        &self.requirements
    }

    pub fn allowed_capabilities(&self) -> Option<&BTreeSet<String>> {
        self.allowed_capabilities.as_ref()
    }

    /// The CNF encoding of this request.
    pub fn encode(&self) -> SatEncoding {
        SatEncoding::build(
            self.graph,
            &self.requirements,
            self.allowed_capabilities.as_ref(),
        )
    }

    /// Search for a consistent installation set.
    pub fn resolve(&self) -> Resolution {
        let encoding = self.encode();
        tracing::debug!(
            variables = encoding.variables().len(),
            clauses = encoding.clauses().len(),
            roots = self.requirements.len(),
            "encoded resolution request"
        );

        let report = Solver::new(&encoding, self.max_decisions).solve();
        tracing::debug!(
            decisions = report.stats.decisions,
            propagations = report.stats.propagations,
            conflicts = report.stats.conflicts,
            "search finished"
        );

        match report.verdict {
            Verdict::Satisfiable(model) => {
                let installed: BTreeMap<String, String> = encoding
                    .selected(&model)
                    .map(|key| (key.name.clone(), key.version.clone()))
                    .collect();
                tracing::info!(installed = installed.len(), "resolution succeeded");
                Resolution::satisfied(installed)
            }
            Verdict::Unsatisfiable => {
                let messages = self.explain(&encoding, &report.explanations);
                tracing::warn!(conflicts = messages.len(), "resolution is unsatisfiable");
                Resolution::unsatisfiable(messages)
            }
            Verdict::Exhausted => {
                tracing::warn!(max_decisions = self.max_decisions, "resolution search bound reached");
                Resolution::unsatisfiable(vec![format!(
                    "resolution timed out after {} decisions",
                    self.max_decisions
                )])
            }
        }
    }

    /// One message per distinct clause involved in a conflict, in the order
    /// the search met them.
    fn explain(&self, encoding: &SatEncoding, explanations: &[Explanation]) -> Vec<String> {
        let mut seen = HashSet::new();
        explanations
            .iter()
            .filter_map(|explanation| self.describe(encoding, explanation))
            .filter(|message| seen.insert(message.clone()))
            .collect()
    }

    fn describe(&self, encoding: &SatEncoding, explanation: &Explanation) -> Option<String> {
        let clause = &encoding.clauses()[explanation.clause];
        let no_candidates = clause.literals.iter().all(|lit| !lit.positive);

        match (&clause.origin, explanation.role) {
            (ClauseOrigin::Root { skill, constraint }, Role::Violated) => {
                let available: Vec<&str> = self
                    .graph
                    .get_versions(skill)
                    .into_iter()
                    .map(|v| v.as_str())
                    .collect();
                Some(if available.is_empty() {
                    format!("skill '{skill}' is not available in the graph")
                } else if no_candidates {
                    format!(
                        "no version of '{skill}' satisfies constraint '{constraint}' (available: {})",
                        available.join(", ")
                    )
                } else {
                    format!(
                        "root requirement {skill} matching {constraint} cannot be satisfied together with the other constraints"
                    )
                })
            }
            (ClauseOrigin::Root { .. }, Role::Implied(_)) => None,

            (ClauseOrigin::Uniqueness { first, second }, Role::Violated) => {
                Some(format!("cannot install {first} and {second} together"))
            }
            (ClauseOrigin::Uniqueness { .. }, Role::Implied(_)) => None,

            (
                ClauseOrigin::Dependency {
                    dependent,
                    skill,
                    constraint,
                },
                role,
            ) => Some(match role {
                _ if no_candidates => format!(
                    "{dependent} requires {skill} matching {constraint} but no such version exists"
                ),
                Role::Implied(Literal { var, positive: true }) => format!(
                    "{} is required by {dependent} ({constraint})",
                    encoding.variables()[var]
                ),
                Role::Implied(_) => format!(
                    "{dependent} requires {skill} matching {constraint} but every matching version is excluded"
                ),
                Role::Violated => format!(
                    "{dependent} requires {skill} matching {constraint} but no compatible version can be selected"
                ),
            }),

            (ClauseOrigin::Conflict { source, target }, _) => {
                Some(format!("{source} conflicts with {target}"))
            }

            (ClauseOrigin::Capability { skill, excess }, _) => Some(format!(
                "{skill} requires capabilities outside the allowed set: {}",
                excess.join(", ")
            )),
        }
    }
}
