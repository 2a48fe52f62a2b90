//! Building a lockfile from a successful resolution.

use std::collections::BTreeMap;

use skillock_types::error::LockfileError;
use skillock_types::lockfile::{LockedSkill, LockfileMetadata, ResolutionStrategy};
use skillock_types::resolution::Resolution;
use skillock_types::skill::ParsedSkill;

use crate::dependency::AgentDependencyGraph;
use crate::service::hash::ContentHasher;

use super::Lockfile;

/// Optional enrichment inputs for [`Lockfile::from_resolution`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LockfileSources<'a> {
    graph: Option<&'a AgentDependencyGraph>,
    trust_scores: Option<&'a BTreeMap<String, f64>>,
    parsed_skills: Option<&'a BTreeMap<String, ParsedSkill>>,
    allowed_capabilities: Option<&'a [String]>,
}

impl<'a> LockfileSources<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capabilities and resolved dependency versions come from graph nodes.
    pub fn with_graph(mut self, graph: &'a AgentDependencyGraph) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Trust score per skill name.
    pub fn with_trust_scores(mut self, scores: &'a BTreeMap<String, f64>) -> Self {
        self.trust_scores = Some(scores);
        self
    }

    /// Format, source path, and content for integrity, per skill name.
    pub fn with_parsed_skills(mut self, skills: &'a BTreeMap<String, ParsedSkill>) -> Self {
        self.parsed_skills = Some(skills);
        self
    }

    /// The capability bound the resolution ran under.
    pub fn with_allowed_capabilities(mut self, allowed: &'a [String]) -> Self {
        self.allowed_capabilities = Some(allowed);
        self
    }
}

impl Lockfile {
    /// Create a lockfile from the output of
    /// [`DependencyResolver::resolve`](crate::dependency::DependencyResolver::resolve).
    ///
    /// Fails if the resolution was unsuccessful. Each installed skill is
    /// enriched from whichever sources are present; without a graph the
    /// parsed skill's declared and inferred capabilities are used.
    pub fn from_resolution(
        resolution: &Resolution,
        sources: LockfileSources<'_>,
        hasher: &dyn ContentHasher,
    ) -> Result<Self, LockfileError> {
        if !resolution.is_success() {
            return Err(LockfileError::FailedResolution {
                conflicts: resolution.conflicts().to_vec(),
            });
        }

        let mut lockfile = Lockfile::new();
        for (name, version) in resolution.installed() {
            let mut skill = LockedSkill::new(name.clone(), version.clone());
            let parsed = sources.parsed_skills.and_then(|skills| skills.get(name));

            match sources.graph.and_then(|graph| graph.get_node(name, version)) {
                Some(node) => {
                    skill.capabilities = node.capabilities.iter().cloned().collect();
                    for dep in &node.dependencies {
                        if let Some(dep_version) = resolution.version_of(&dep.skill_name) {
                            skill
                                .dependencies
                                .insert(dep.skill_name.clone(), dep_version.to_string());
                        }
                    }
                }
                None => {
                    if let Some(parsed) = parsed {
                        skill.capabilities = parsed.capabilities().into_iter().collect();
                    }
                }
            }

            if let Some(parsed) = parsed {
                skill.format = parsed.format.clone();
                if !parsed.source_path.is_empty() {
                    skill.source_path = Some(parsed.source_path.clone());
                }
                if !parsed.raw_content.is_empty() {
                    skill.integrity = hasher.compute_integrity(parsed.raw_content.as_bytes());
                }
            }

            if let Some(&score) = sources.trust_scores.and_then(|scores| scores.get(name)) {
                skill = skill.with_trust_score(score);
            }

            lockfile.add_skill(skill);
        }

        lockfile.set_metadata(LockfileMetadata {
            total_skills: lockfile.skill_count(),
            resolution_strategy: ResolutionStrategy::Sat,
            allowed_capabilities: sources.allowed_capabilities.map(|caps| {
                let mut caps = caps.to_vec();
                caps.sort();
                caps.dedup();
                caps
            }),
        });

        tracing::debug!(skills = lockfile.skill_count(), "built lockfile from resolution");
        Ok(lockfile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::{DependencyResolver, SkillNode, Version, VersionConstraint};
    use crate::lockfile::tests::FakeHasher;

    fn graph() -> AgentDependencyGraph {
        let mut g = AgentDependencyGraph::new();
        g.add_node(
            SkillNode::new("weather", Version::parse("1.2.0").unwrap())
                .with_dependency("http", VersionConstraint::parse("^1.0.0").unwrap())
                .with_capability("network:READ"),
        );
        g.add_node(SkillNode::new("http", Version::parse("1.4.0").unwrap()).with_capability("network:READ"));
        g
    }

    fn parsed() -> BTreeMap<String, ParsedSkill> {
        let mut weather = ParsedSkill::new("weather", "1.2.0");
        weather.format = "mcp".into();
        weather.source_path = "skills/weather/server.json".into();
        weather.raw_content = "{\"name\": \"weather\"}".into();
        weather.inferred_capabilities = vec!["filesystem:READ".into()];
        let http = ParsedSkill::new("http", "1.4.0");
        BTreeMap::from([("weather".to_string(), weather), ("http".to_string(), http)])
    }

    #[test]
    fn test_failed_resolution_is_rejected() {
        let res = Resolution::unsatisfiable(vec!["a@1.0.0 conflicts with b@1.0.0".into()]);
        let err = Lockfile::from_resolution(&res, LockfileSources::new(), &FakeHasher).unwrap_err();
        assert!(matches!(err, LockfileError::FailedResolution { ref conflicts } if conflicts.len() == 1));
    }

    #[test]
    fn test_enriched_from_all_sources() {
        let g = graph();
        let res = DependencyResolver::new(&g).require("weather", "*").unwrap().resolve();
        assert!(res.is_success(), "{:?}", res.conflicts());

        let skills = parsed();
        let scores = BTreeMap::from([("weather".to_string(), 0.6)]);
        let allowed = vec!["network:READ".to_string()];
        let sources = LockfileSources::new()
            .with_graph(&g)
            .with_parsed_skills(&skills)
            .with_trust_scores(&scores)
            .with_allowed_capabilities(&allowed);
        let lf = Lockfile::from_resolution(&res, sources, &FakeHasher).unwrap();

        assert_eq!(lf.skill_names(), vec!["http", "weather"]);
        let weather = lf.get_skill("weather").unwrap();
        assert_eq!(weather.version, "1.2.0");
        assert_eq!(weather.format, "mcp");
        assert_eq!(weather.capabilities, vec!["network:READ"]);
        assert_eq!(
            weather.dependencies,
            BTreeMap::from([("http".to_string(), "1.4.0".to_string())])
        );
        assert_eq!(weather.integrity, FakeHasher.compute_integrity(b"{\"name\": \"weather\"}"));
        assert_eq!(weather.trust_level.as_deref(), Some("COMMUNITY_VERIFIED"));
        assert_eq!(weather.source_path.as_deref(), Some("skills/weather/server.json"));

        let http = lf.get_skill("http").unwrap();
        assert!(http.integrity.is_empty());
        assert!(http.source_path.is_none());
        assert!(http.trust_score.is_none());

        assert_eq!(lf.metadata().allowed_capabilities.as_deref(), Some(&allowed[..]));
        assert_eq!(lf.validate(), Vec::<String>::new());
    }

    #[test]
    fn test_without_graph_uses_parsed_capabilities() {
        let res = Resolution::satisfied(BTreeMap::from([("weather".to_string(), "1.2.0".to_string())]));
        let skills = parsed();
        let lf = Lockfile::from_resolution(
            &res,
            LockfileSources::new().with_parsed_skills(&skills),
            &FakeHasher,
        )
        .unwrap();
        let weather = lf.get_skill("weather").unwrap();
        assert_eq!(weather.capabilities, vec!["filesystem:READ"]);
        assert!(weather.dependencies.is_empty());
        assert!(lf.metadata().allowed_capabilities.is_none());
    }

    #[test]
    fn test_bare_resolution() {
        let res = Resolution::satisfied(BTreeMap::from([("solo".to_string(), "0.1.0".to_string())]));
        let lf = Lockfile::from_resolution(&res, LockfileSources::new(), &FakeHasher).unwrap();
        let solo = lf.get_skill("solo").unwrap();
        assert_eq!(solo.version, "0.1.0");
        assert!(solo.format.is_empty());
        assert!(solo.capabilities.is_empty());
        assert_eq!(lf.metadata().total_skills, 1);
    }
}
