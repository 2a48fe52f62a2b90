//! End-to-end locking: discovered skills in, `skill-lock.json` out.
//!
//! Builds the dependency graph, resolves it under the configured bounds,
//! turns the resolution into a lockfile, and writes it next to the skills.
//! An unsatisfiable request is reported as [`LockOutcome::Unsatisfiable`]
//! rather than an error; malformed input, I/O failures and a corrupt
//! existing lockfile are errors.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use skillock_core::dependency::{AgentDependencyGraph, DependencyResolver, VersionConstraint};
use skillock_core::lockfile::{Lockfile, LockfileSources};
use skillock_core::service::hash::ContentHasher;
use skillock_core::service::store::LockfileStore;
use skillock_types::config::SkillockConfig;
use skillock_types::lockfile::LockfileDiff;
use skillock_types::skill::ParsedSkill;

use crate::crypto::hash::Sha256ContentHasher;
use crate::lockfile::FsLockfileStore;

/// Inputs for one lock run.
#[derive(Debug, Clone, Default)]
pub struct LockRequest {
    pub skills: Vec<ParsedSkill>,
    /// Root requirements as `(name, constraint)`. Empty means every
    /// discovered skill at any version.
    pub requirements: Vec<(String, String)>,
    /// Trust score per skill name, from the trust engine.
    pub trust_scores: BTreeMap<String, f64>,
}

#[derive(Debug)]
pub enum LockOutcome {
    Locked {
        path: PathBuf,
        lockfile: Lockfile,
        /// Changes against the lockfile previously at `path`, if there was one.
        diff: Option<LockfileDiff>,
    },
    Unsatisfiable {
        conflicts: Vec<String>,
    },
}

/// Resolve `request` and write the lockfile into `output_dir`.
pub fn lock_skills(
    request: &LockRequest,
    config: &SkillockConfig,
    output_dir: &Path,
) -> anyhow::Result<LockOutcome> {
    lock_skills_with(
        request,
        config,
        output_dir,
        &Sha256ContentHasher::new(),
        &FsLockfileStore::new(),
    )
}

/// [`lock_skills`] with explicit hashing and storage adapters.
pub fn lock_skills_with(
    request: &LockRequest,
    config: &SkillockConfig,
    output_dir: &Path,
    hasher: &dyn ContentHasher,
    store: &dyn LockfileStore,
) -> anyhow::Result<LockOutcome> {
    let graph = AgentDependencyGraph::from_parsed_skills(&request.skills)
        .context("Failed to build dependency graph from discovered skills")?;

    let mut resolver = DependencyResolver::from_config(&graph, config);
    if request.requirements.is_empty() {
        resolver = resolver.require_all();
    } else {
        for (name, raw) in &request.requirements {
            let constraint = VersionConstraint::parse(raw)
                .with_context(|| format!("Invalid root requirement '{name} {raw}'"))?;
            resolver = resolver.with_requirement(name.clone(), constraint);
        }
    }

    let resolution = resolver.resolve();
    if !resolution.is_success() {
        tracing::warn!(
            conflicts = resolution.conflicts().len(),
            "skills cannot be locked"
        );
        return Ok(LockOutcome::Unsatisfiable {
            conflicts: resolution.conflicts().to_vec(),
        });
    }

    let parsed: BTreeMap<String, ParsedSkill> = request
        .skills
        .iter()
        .filter(|skill| resolution.version_of(&skill.name) == Some(skill.version.trim()))
        .map(|skill| (skill.name.clone(), skill.clone()))
        .collect();

    let mut sources = LockfileSources::new()
        .with_graph(&graph)
        .with_parsed_skills(&parsed)
        .with_trust_scores(&request.trust_scores);
    if let Some(allowed) = &config.allowed_capabilities {
        sources = sources.with_allowed_capabilities(allowed);
    }
    let lockfile = Lockfile::from_resolution(&resolution, sources, hasher)
        .context("Failed to build lockfile from resolution")?;

    let path = FsLockfileStore::lockfile_path(output_dir, &config.lockfile_name);
    // Only a missing file means "no previous lockfile". One that cannot be
    // read or parsed stops the run before it is overwritten.
    let diff = if path.exists() {
        let previous = store
            .read(&path)
            .with_context(|| format!("Failed to read previous lockfile at {}", path.display()))?;
        Some(previous.diff(&lockfile))
    } else {
        None
    };

    store
        .write(&path, &lockfile)
        .with_context(|| format!("Failed to write lockfile to {}", path.display()))?;

    tracing::info!(
        path = %path.display(),
        skills = lockfile.skill_count(),
        "locked skills"
    );
    Ok(LockOutcome::Locked {
        path,
        lockfile,
        diff,
    })
}

/// Read a lockfile back and report its consistency problems.
pub fn check_lockfile(path: &Path) -> anyhow::Result<Vec<String>> {
    let lockfile = FsLockfileStore::new()
        .read(path)
        .with_context(|| format!("Failed to read lockfile at {}", path.display()))?;
    Ok(lockfile.validate())
}

/// Verify current skill contents against the integrity recorded in a
/// lockfile. Returns the names whose content no longer matches, sorted.
/// Skills missing from the lockfile count as mismatches.
pub fn verify_skills(path: &Path, skills: &[ParsedSkill]) -> anyhow::Result<Vec<String>> {
    let lockfile = FsLockfileStore::new()
        .read(path)
        .with_context(|| format!("Failed to read lockfile at {}", path.display()))?;
    let hasher = Sha256ContentHasher::new();

    let mut tampered: Vec<String> = skills
        .iter()
        .filter(|skill| !lockfile.verify_integrity(&hasher, &skill.name, &skill.raw_content))
        .map(|skill| skill.name.clone())
        .collect();
    tampered.sort();
    tampered.dedup();
    Ok(tampered)
}
