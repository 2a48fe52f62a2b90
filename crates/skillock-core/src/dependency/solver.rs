//! DPLL search over a [`SatEncoding`]: unit propagation with chronological
//! backtracking.
//!
//! Branching only ever sets a variable to true, picked from a clause that the
//! "everything else false" completion would leave unsatisfied. When no such
//! clause is left, unassigned variables are false. This keeps the search
//! from installing skills nothing asks for, and because candidate literals
//! are listed newest first, the first branch tried is always the newest
//! admissible version.

use std::collections::{HashSet, VecDeque};

use super::encoding::{Clause, Literal, SatEncoding};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Verdict {
    Satisfiable(Vec<bool>),
    Unsatisfiable,
    /// The decision budget ran out before the search finished.
    Exhausted,
}

/// Why a clause shows up in a failure explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Role {
    /// Every literal of the clause was false.
    Violated,
    /// The clause forced this literal during propagation.
    Implied(Literal),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Explanation {
    pub clause: usize,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SearchStats {
    pub decisions: u64,
    pub propagations: u64,
    pub conflicts: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct SearchReport {
    pub verdict: Verdict,
    /// Clauses involved in conflicts, deduplicated, in encounter order.
    /// Empty unless the verdict is `Unsatisfiable`: backtracking is
    /// chronological, so an exhausted tree means every recorded conflict
    /// refuted one of its branches.
    pub explanations: Vec<Explanation>,
    pub stats: SearchStats,
}

enum ClauseState {
    Satisfied,
    Conflict,
    Unit(Literal),
    Unresolved,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    var: usize,
    trail_len: usize,
    flipped: bool,
}

pub(crate) struct Solver<'e> {
    clauses: &'e [Clause],
    occurs: Vec<Vec<usize>>,
    assignment: Vec<Option<bool>>,
    reason: Vec<Option<usize>>,
    trail: Vec<usize>,
    /// Next trail position to propagate from.
    head: usize,
    frames: Vec<Frame>,
    max_decisions: u64,
    stats: SearchStats,
    explanations: Vec<Explanation>,
    explained: HashSet<Explanation>,
}

impl<'e> Solver<'e> {
    pub fn new(encoding: &'e SatEncoding, max_decisions: u64) -> Self {
        let vars = encoding.variables().len();
        let clauses = encoding.clauses();
        let mut occurs = vec![Vec::new(); vars];
        for (idx, clause) in clauses.iter().enumerate() {
            for lit in &clause.literals {
                occurs[lit.var].push(idx);
            }
        }

        Self {
            clauses,
            occurs,
            assignment: vec![None; vars],
            reason: vec![None; vars],
            trail: Vec::with_capacity(vars),
            head: 0,
            frames: Vec::new(),
            max_decisions,
            stats: SearchStats::default(),
            explanations: Vec::new(),
            explained: HashSet::new(),
        }
    }

    pub fn solve(mut self) -> SearchReport {
        let verdict = self.search();
        let explanations = match verdict {
            Verdict::Unsatisfiable => self.explanations,
            Verdict::Satisfiable(_) | Verdict::Exhausted => Vec::new(),
        };
        SearchReport {
            verdict,
            explanations,
            stats: self.stats,
        }
    }

    fn search(&mut self) -> Verdict {
        let mut conflict = self.initial_propagation();

        loop {
            if let Some(clause) = conflict {
                self.stats.conflicts += 1;
                self.explain(clause);
                if !self.backtrack() {
                    return Verdict::Unsatisfiable;
                }
                conflict = self.propagate();
                continue;
            }

            let Some(var) = self.pick_branch() else {
                let model = self.assignment.iter().map(|v| v.unwrap_or(false)).collect();
                return Verdict::Satisfiable(model);
            };

            if self.stats.decisions >= self.max_decisions {
                return Verdict::Exhausted;
            }
            self.stats.decisions += 1;
            self.frames.push(Frame {
                var,
                trail_len: self.trail.len(),
                flipped: false,
            });
            self.assign(Literal::positive(var), None);
            conflict = self.propagate();
        }
    }

    /// Visit every clause once so unit and empty clauses fire even when they
    /// share no variable with anything assigned.
    fn initial_propagation(&mut self) -> Option<usize> {
        for idx in 0..self.clauses.len() {
            match self.evaluate(idx) {
                ClauseState::Conflict => return Some(idx),
                ClauseState::Unit(lit) => {
                    self.stats.propagations += 1;
                    self.assign(lit, Some(idx));
                }
                ClauseState::Satisfied | ClauseState::Unresolved => {}
            }
            if let Some(conflict) = self.propagate() {
                return Some(conflict);
            }
        }
        None
    }

    fn propagate(&mut self) -> Option<usize> {
        while self.head < self.trail.len() {
            let var = self.trail[self.head];
            self.head += 1;
            for i in 0..self.occurs[var].len() {
                let idx = self.occurs[var][i];
                match self.evaluate(idx) {
                    ClauseState::Conflict => return Some(idx),
                    ClauseState::Unit(lit) => {
                        self.stats.propagations += 1;
                        self.assign(lit, Some(idx));
                    }
                    ClauseState::Satisfied | ClauseState::Unresolved => {}
                }
            }
        }
        None
    }

    fn evaluate(&self, idx: usize) -> ClauseState {
        let mut unassigned = None;
        let mut open = 0;
        for lit in &self.clauses[idx].literals {
            match self.assignment[lit.var] {
                Some(value) if value == lit.positive => return ClauseState::Satisfied,
                Some(_) => {}
                None => {
                    open += 1;
                    unassigned.get_or_insert(*lit);
                }
            }
        }
        match (open, unassigned) {
            (0, _) => ClauseState::Conflict,
            (1, Some(lit)) => ClauseState::Unit(lit),
            _ => ClauseState::Unresolved,
        }
    }

    fn assign(&mut self, lit: Literal, reason: Option<usize>) {
        self.assignment[lit.var] = Some(lit.positive);
        self.reason[lit.var] = reason;
        self.trail.push(lit.var);
    }

    /// Pop decisions until one can be flipped to false. Returns false when
    /// the search space is exhausted.
    fn backtrack(&mut self) -> bool {
        while let Some(frame) = self.frames.pop() {
            for var in self.trail.drain(frame.trail_len..) {
                self.assignment[var] = None;
                self.reason[var] = None;
            }
            self.head = self.trail.len();
            if !frame.flipped {
                self.frames.push(Frame {
                    flipped: true,
                    ..frame
                });
                self.assign(Literal::negative(frame.var), None);
                return true;
            }
        }
        false
    }

    /// The next variable to set true: the first unassigned positive literal
    /// of the clause that is falsified by the all-false completion and has
    /// the fewest such literals. Ties go to the earliest clause.
    fn pick_branch(&self) -> Option<usize> {
        let mut best: Option<(usize, Literal)> = None;
        'clauses: for clause in self.clauses {
            let mut candidates = 0;
            let mut first = None;
            for lit in &clause.literals {
                match (self.assignment[lit.var], lit.positive) {
                    (Some(value), _) if value == lit.positive => continue 'clauses,
                    (None, false) => continue 'clauses,
                    (None, true) => {
                        candidates += 1;
                        first.get_or_insert(*lit);
                    }
                    (Some(_), _) => {}
                }
            }
            if let Some(lit) = first {
                if best.is_none_or(|(count, _)| candidates < count) {
                    best = Some((candidates, lit));
                }
            }
        }
        best.map(|(_, lit)| lit.var)
    }

    /// Record the violated clause plus every clause in its implication cone,
    /// breadth first through the reason of each falsified literal.
    fn explain(&mut self, violated: usize) {
        let mut visited = HashSet::from([violated]);
        let mut queue = VecDeque::from([(violated, Role::Violated)]);

        while let Some((clause, role)) = queue.pop_front() {
            let entry = Explanation { clause, role };
            if self.explained.insert(entry) {
                self.explanations.push(entry);
            }
            for lit in &self.clauses[clause].literals {
                let Some(reason) = self.reason[lit.var] else {
                    continue;
                };
                let Some(value) = self.assignment[lit.var] else {
                    continue;
                };
                if visited.insert(reason) {
                    let implied = Literal {
                        var: lit.var,
                        positive: value,
                    };
                    queue.push_back((reason, Role::Implied(implied)));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::*;
    use crate::dependency::constraint::VersionConstraint;
    use crate::dependency::encoding::{ClauseFamily, ClauseOrigin};
    use crate::dependency::graph::{AgentDependencyGraph, SkillNode};
    use crate::dependency::version::Version;

    fn node(name: &str, version: &str) -> SkillNode {
        SkillNode::new(name, Version::parse(version).unwrap())
    }

    fn c(s: &str) -> VersionConstraint {
        VersionConstraint::parse(s).unwrap()
    }

    fn encode(g: &AgentDependencyGraph, roots: &[(&str, &str)]) -> SatEncoding {
        let roots: BTreeMap<String, VersionConstraint> =
            roots.iter().map(|(n, r)| (n.to_string(), c(r))).collect();
        SatEncoding::build(g, &roots, None)
    }

    fn selected(enc: &SatEncoding, model: &[bool]) -> Vec<String> {
        enc.selected(model).map(ToString::to_string).collect()
    }

    #[test]
    fn test_empty_problem_is_satisfiable() {
        let enc = encode(&AgentDependencyGraph::new(), &[]);
        let report = Solver::new(&enc, 10).solve();
        assert_eq!(report.verdict, Verdict::Satisfiable(Vec::new()));
        assert_eq!(report.stats.decisions, 0);
    }

    #[test]
    fn test_prefers_newest_and_leaves_unrequested_false() {
        let mut g = AgentDependencyGraph::new();
        for ver in ["1.0.0", "1.1.0", "2.0.0"] {
            g.add_node(node("a", ver));
        }
        g.add_node(node("unused", "1.0.0"));
        let enc = encode(&g, &[("a", "^1.0.0")]);

        let Verdict::Satisfiable(model) = Solver::new(&enc, 100).solve().verdict else {
            panic!("expected a model");
        };
        assert!(enc.is_satisfied_by(&model));
        assert_eq!(selected(&enc, &model), vec!["a@1.1.0"]);
    }

    #[test]
    fn test_backtracks_past_newest_when_it_conflicts() {
        let mut g = AgentDependencyGraph::new();
        g.add_node(node("a", "1.0.0").with_dependency("b", c("*")).with_conflict("b", c(">=2.0.0")));
        g.add_node(node("b", "2.0.0"));
        g.add_node(node("b", "1.0.0"));
        let enc = encode(&g, &[("a", "*")]);

        let report = Solver::new(&enc, 100).solve();
        let Verdict::Satisfiable(model) = report.verdict else {
            panic!("expected a model");
        };
        assert_eq!(selected(&enc, &model), vec!["a@1.0.0", "b@1.0.0"]);
    }

    #[test]
    fn test_backtracking_through_decisions() {
        // b@2 rules out every c, so the first branch fails and b@1 is used.
        let mut g = AgentDependencyGraph::new();
        g.add_node(node("a", "1.0.0").with_dependency("b", c("*")).with_dependency("c", c("*")));
        g.add_node(node("b", "2.0.0").with_conflict("c", c("*")));
        g.add_node(node("b", "1.0.0"));
        g.add_node(node("c", "2.0.0"));
        g.add_node(node("c", "1.0.0"));
        let enc = encode(&g, &[("a", "*")]);

        let report = Solver::new(&enc, 100).solve();
        let Verdict::Satisfiable(model) = report.verdict else {
            panic!("expected a model");
        };
        assert!(enc.is_satisfied_by(&model));
        assert_eq!(selected(&enc, &model), vec!["a@1.0.0", "b@1.0.0", "c@2.0.0"]);
        assert_eq!(report.stats.conflicts, 1);
        assert_eq!(report.stats.decisions, 2);
        // The refuted b@2.0.0 branch leaves nothing behind.
        assert!(report.explanations.is_empty());
    }

    #[test]
    fn test_unsat_after_branching_explains_every_refuted_branch() {
        // b@2.0.0 is decided first and refuted; b@1.0.0 is then implied and
        // fails too. Both refutations belong in the report.
        let mut g = AgentDependencyGraph::new();
        g.add_node(node("a", "1.0.0").with_dependency("b", c("*")).with_dependency("c", c("*")));
        g.add_node(node("b", "2.0.0").with_conflict("c", c("*")));
        g.add_node(node("b", "1.0.0").with_conflict("c", c("*")));
        g.add_node(node("c", "2.0.0"));
        g.add_node(node("c", "1.0.0"));
        let enc = encode(&g, &[("a", "*")]);

        let report = Solver::new(&enc, 100).solve();
        assert_eq!(report.verdict, Verdict::Unsatisfiable);
        assert_eq!(report.stats.decisions, 1);
        assert_eq!(report.stats.conflicts, 2);

        let conflicts: BTreeSet<String> = report
            .explanations
            .iter()
            .filter_map(|e| match &enc.clauses()[e.clause].origin {
                ClauseOrigin::Conflict { source, target } => Some(format!("{source}>{target}")),
                _ => None,
            })
            .collect();
        assert!(conflicts.contains("b@2.0.0>c@2.0.0"), "{conflicts:?}");
        assert!(conflicts.contains("b@1.0.0>c@1.0.0"), "{conflicts:?}");
    }

    #[test]
    fn test_unsat_explains_implication_cone() {
        let mut g = AgentDependencyGraph::new();
        g.add_node(node("a", "1.0.0").with_dependency("x", c("==1.0.0")));
        g.add_node(node("b", "1.0.0").with_dependency("x", c("==2.0.0")));
        g.add_node(node("x", "1.0.0"));
        g.add_node(node("x", "2.0.0"));
        let enc = encode(&g, &[("a", "*"), ("b", "*")]);

        let report = Solver::new(&enc, 100).solve();
        assert_eq!(report.verdict, Verdict::Unsatisfiable);
        assert_eq!(report.stats.decisions, 0);

        let families: BTreeSet<ClauseFamily> = report
            .explanations
            .iter()
            .map(|e| enc.clauses()[e.clause].family())
            .collect();
        assert!(families.contains(&ClauseFamily::Dependency));
        assert!(families.contains(&ClauseFamily::Root));
        assert!(matches!(report.explanations[0].role, Role::Violated));
    }

    #[test]
    fn test_decision_budget_is_enforced() {
        let mut g = AgentDependencyGraph::new();
        g.add_node(node("a", "1.0.0").with_dependency("b", c("*")));
        g.add_node(node("b", "2.0.0"));
        g.add_node(node("b", "1.0.0"));
        let enc = encode(&g, &[("a", "*")]);

        let report = Solver::new(&enc, 0).solve();
        assert_eq!(report.verdict, Verdict::Exhausted);
        assert!(report.explanations.is_empty());
    }

    #[test]
    fn test_mutually_conflicting_roots_are_unsat() {
        let mut g = AgentDependencyGraph::new();
        g.add_node(node("p", "1.0.0").with_dependency("slot", c("*")).with_conflict("q", c("*")));
        g.add_node(node("q", "1.0.0").with_dependency("slot", c("*")));
        g.add_node(node("slot", "1.0.0"));
        g.add_node(node("slot", "2.0.0"));
        let enc = encode(&g, &[("p", "*"), ("q", "*")]);

        let report = Solver::new(&enc, 1_000).solve();
        assert_eq!(report.verdict, Verdict::Unsatisfiable);
        assert!(!report.explanations.is_empty());
    }
}
