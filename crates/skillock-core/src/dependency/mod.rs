//! Agent Dependency Graph and SAT-based dependency resolution.
//!
//! The graph is the 5-tuple ADG = (S, V, D, C, Cap): skill names, available
//! versions per skill, dependency edges, conflict edges, and per-version
//! capability requirements. The resolver encodes a request over the graph as
//! CNF clauses and searches for a satisfying assignment.

pub mod constraint;
pub mod encoding;
pub mod graph;
pub mod resolver;
pub mod version;

pub(crate) mod dfs;
mod solver;

pub use constraint::{SkillConflict, SkillDependency, VersionConstraint};
pub use encoding::{Clause, ClauseFamily, ClauseOrigin, Literal, SatEncoding};
pub use graph::{AgentDependencyGraph, SkillKey, SkillNode};
pub use resolver::DependencyResolver;
pub use version::Version;
