//! Version constraints, dependency edges, and conflict edges.
//!
//! Supported atoms: `==`, `!=`, `>=`, `<=`, `>`, `<`, caret `^`, tilde `~`,
//! plus the wildcard `*`. Atoms joined by commas form a conjunction, e.g.
//! `>=1.0.0,<2.0.0`. Constraints are parsed eagerly so a stored constraint is
//! always well-formed.

use std::fmt;
use std::str::FromStr;

use skillock_types::error::{ConstraintError, VersionError};

use super::version::Version;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Eq,
    Ne,
    Ge,
    Le,
    Gt,
    Lt,
    Caret,
    Tilde,
}

impl Operator {
    /// Two-character operators come first so `>=` is not read as `>`.
    const PREFIXES: [(&'static str, Operator); 8] = [
        ("==", Operator::Eq),
        ("!=", Operator::Ne),
        (">=", Operator::Ge),
        ("<=", Operator::Le),
        (">", Operator::Gt),
        ("<", Operator::Lt),
        ("^", Operator::Caret),
        ("~", Operator::Tilde),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Atom {
    op: Operator,
    target: (u64, u64, u64),
}

impl Atom {
    fn parse(raw: &str, atom: &str) -> Result<Self, ConstraintError> {
        let invalid = || ConstraintError::InvalidConstraint {
            raw: raw.to_string(),
            atom: atom.to_string(),
        };

        let (op, rest) = Operator::PREFIXES
            .iter()
            .find_map(|(prefix, op)| atom.strip_prefix(prefix).map(|rest| (*op, rest)))
            .ok_or_else(|| invalid())?;
        let target = Version::parse(rest).map_err(|_| invalid())?;

        Ok(Self {
            op,
            target: target.triple(),
        })
    }

    fn matches(&self, v: (u64, u64, u64)) -> bool {
        let t = self.target;
        match self.op {
            Operator::Eq => v == t,
            Operator::Ne => v != t,
            Operator::Ge => v >= t,
            Operator::Le => v <= t,
            Operator::Gt => v > t,
            Operator::Lt => v < t,
            Operator::Caret if t.0 == 0 => v.0 == 0 && v.1 == t.1 && v >= t,
            Operator::Caret => v.0 == t.0 && v >= t,
            Operator::Tilde => v.0 == t.0 && v.1 == t.1 && v >= t,
        }
    }
}

/// A declarative version requirement such as `^1.2.0` or `>=1.0.0,<2.0.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    raw: String,
    atoms: Vec<Atom>,
}

impl VersionConstraint {
    /// Parse a constraint, failing on the first malformed atom.
    pub fn parse(raw: &str) -> Result<Self, ConstraintError> {
        let trimmed = raw.trim();
        if trimmed == "*" {
            return Ok(Self::any());
        }

        let atoms = trimmed
            .split(',')
            .map(str::trim)
            .filter(|atom| !atom.is_empty())
            .map(|atom| Atom::parse(raw, atom))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: raw.to_string(),
            atoms,
        })
    }

    /// The wildcard constraint `*`.
    pub fn any() -> Self {
        Self {
            raw: "*".to_string(),
            atoms: Vec::new(),
        }
    }

    /// The constraint as authored.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Check a version string against every atom.
    pub fn satisfies(&self, version: &str) -> Result<bool, VersionError> {
        let version = Version::parse(version)?;
        Ok(self.matches(&version))
    }

    /// Check an already-parsed version against every atom.
    pub fn matches(&self, version: &Version) -> bool {
        let triple = version.triple();
        self.atoms.iter().all(|atom| atom.matches(triple))
    }
}

impl FromStr for VersionConstraint {
    type Err = ConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// "Installing this skill-version requires `skill_name` matching
/// `constraint`."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillDependency {
    pub skill_name: String,
    pub constraint: VersionConstraint,
}

impl SkillDependency {
    pub fn new(skill_name: impl Into<String>, constraint: VersionConstraint) -> Self {
        Self {
            skill_name: skill_name.into(),
            constraint,
        }
    }
}

/// "This skill-version cannot be installed next to any version of
/// `skill_name` matching `constraint`."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillConflict {
    pub skill_name: String,
    pub constraint: VersionConstraint,
}

impl SkillConflict {
    pub fn new(skill_name: impl Into<String>, constraint: VersionConstraint) -> Self {
        Self {
            skill_name: skill_name.into(),
            constraint,
        }
    }
}
