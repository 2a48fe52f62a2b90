use std::path::PathBuf;

use thiserror::Error;

/// A version string that is not `major.minor.patch[-pre][+build]`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("invalid semantic version: '{0}'")]
    InvalidVersion(String),
}

/// Errors raised while parsing a version constraint expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    #[error("invalid constraint atom '{atom}' in '{raw}'")]
    InvalidConstraint { raw: String, atom: String },

    #[error(transparent)]
    InvalidVersion(#[from] VersionError),
}

/// Errors raised while populating a dependency graph from discovered skills.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("skill '{name}': {source}")]
    InvalidVersion {
        name: String,
        #[source]
        source: VersionError,
    },

    #[error("skill '{name}@{version}': {source}")]
    InvalidConstraint {
        name: String,
        version: String,
        #[source]
        source: ConstraintError,
    },
}

/// Errors from lockfile construction and persistence.
#[derive(Debug, Error)]
pub enum LockfileError {
    #[error("cannot create lockfile from failed resolution: {}", .conflicts.join("; "))]
    FailedResolution { conflicts: Vec<String> },

    #[error("lockfile I/O error at '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt lockfile: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("circular dependency involving skill '{0}'")]
    Cycle(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_error_display() {
        let err = VersionError::InvalidVersion("1.0".to_string());
        assert_eq!(err.to_string(), "invalid semantic version: '1.0'");
    }

    #[test]
    fn test_constraint_error_display() {
        let err = ConstraintError::InvalidConstraint {
            raw: ">=1.0.0,=>2".to_string(),
            atom: "=>2".to_string(),
        };
        assert_eq!(err.to_string(), "invalid constraint atom '=>2' in '>=1.0.0,=>2'");
    }

    #[test]
    fn test_graph_error_carries_skill_identity() {
        let err = GraphError::InvalidConstraint {
            name: "weather".to_string(),
            version: "1.0.0".to_string(),
            source: ConstraintError::InvalidConstraint {
                raw: "~>1".to_string(),
                atom: "~>1".to_string(),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("weather@1.0.0"));
        assert!(msg.contains("~>1"));
    }

    #[test]
    fn test_failed_resolution_lists_conflicts() {
        let err = LockfileError::FailedResolution {
            conflicts: vec!["a conflicts with b".to_string(), "c missing".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "cannot create lockfile from failed resolution: a conflicts with b; c missing"
        );
    }
}
