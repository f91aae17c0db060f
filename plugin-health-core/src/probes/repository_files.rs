//! Probes looking for well-known files in the plugin repository.

use std::path::{Path, PathBuf};

use crate::context::ProbeContext;
use crate::error::Result;
use crate::plugin::Plugin;
use crate::probe::Probe;
use crate::result::ProbeResult;

use super::{SOURCE_REQUIREMENTS, repository_checkout};

/// Validation of the content of a located file.
#[derive(Debug, Clone, Copy)]
pub struct ContentCheck {
    /// Whether the file content is acceptable for the plugin.
    pub accepts: fn(&Plugin, &str) -> bool,
    /// FAILURE message when the content is rejected.
    pub rejected: &'static str,
}

/// What file to look for and how to report it.
#[derive(Debug, Clone, Copy)]
pub struct FileRule {
    /// Probe key.
    pub key: &'static str,
    /// Probe description.
    pub description: &'static str,
    /// Probe version.
    pub version: u32,
    /// Directory to search, relative to the repository root.
    pub search_root: &'static str,
    /// Directory levels searched below `search_root`; 1 means direct children only.
    pub max_depth: usize,
    /// Predicate on the file name.
    pub matches: fn(&str) -> bool,
    /// Optional content validation; one accepted matching file is enough.
    pub content: Option<ContentCheck>,
    /// SUCCESS message.
    pub found: &'static str,
    /// FAILURE message when no file matches.
    pub missing: &'static str,
}

impl FileRule {
    /// Dependabot configuration under `.github`.
    pub fn dependabot() -> Self {
        Self {
            key: "dependabot",
            description: "Checks if Dependabot is configured on the plugin repository.",
            version: 1,
            search_root: ".github",
            max_depth: 1,
            matches: |name| name.starts_with("dependabot"),
            content: None,
            found: "Dependabot is configured.",
            missing: "Dependabot is not configured.",
        }
    }

    /// Renovate configuration at the root or under `.github`.
    pub fn renovate() -> Self {
        Self {
            key: "renovate",
            description: "Checks if Renovate is configured on the plugin repository.",
            version: 2,
            search_root: "",
            max_depth: 2,
            matches: |name| {
                matches!(
                    name,
                    "renovate.json" | "renovate.json5" | ".renovaterc" | ".renovaterc.json"
                )
            },
            content: None,
            found: "Renovate is configured.",
            missing: "Renovate is not configured.",
        }
    }

    /// `CONTRIBUTING.md` or `CONTRIBUTING.adoc`, any case.
    pub fn contributing_guidelines() -> Self {
        Self {
            key: "contributing-guidelines",
            description: "Checks for a CONTRIBUTING.md or CONTRIBUTING.adoc file in the repository.",
            version: 1,
            search_root: "",
            max_depth: 2,
            matches: |name| {
                name.eq_ignore_ascii_case("CONTRIBUTING.md")
                    || name.eq_ignore_ascii_case("CONTRIBUTING.adoc")
            },
            content: None,
            found: "Contributing guidelines found.",
            missing: "No contributing guidelines found.",
        }
    }

    /// A `Jenkinsfile` at the repository root.
    pub fn jenkinsfile() -> Self {
        Self {
            key: "jenkinsfile",
            description: "Checks for a Jenkinsfile configuring continuous integration of the plugin.",
            version: 1,
            search_root: "",
            max_depth: 1,
            matches: |name| name == "Jenkinsfile",
            content: None,
            found: "Jenkinsfile found.",
            missing: "No Jenkinsfile found.",
        }
    }

    /// A `CODEOWNERS` file naming the plugin's developer team.
    pub fn code_ownership() -> Self {
        Self {
            key: "code-ownership",
            description: "Checks that a CODEOWNERS file assigns the plugin developer team.",
            version: 2,
            search_root: "",
            max_depth: 2,
            matches: |name| name == "CODEOWNERS",
            content: Some(ContentCheck {
                accepts: |plugin, content| {
                    let team = format!("@jenkinsci/{}-plugin-developers", plugin.name);
                    content.lines().any(|line| line.contains(&team))
                },
                rejected: "CODEOWNERS file is not set correctly.",
            }),
            found: "CODEOWNERS file is valid.",
            missing: "No CODEOWNERS file found in plugin repository.",
        }
    }

    /// Release Drafter configuration under `.github`.
    pub fn release_drafter() -> Self {
        Self {
            key: "release-drafter",
            description: "Checks if Release Drafter is configured on the plugin repository.",
            version: 1,
            search_root: ".github",
            max_depth: 1,
            matches: |name| matches!(name, "release-drafter.yml" | "release-drafter.yaml"),
            content: None,
            found: "Release Drafter is configured.",
            missing: "Release Drafter is not configured.",
        }
    }

    /// A GitHub workflow calling the shared JEP-229 continuous delivery workflow.
    pub fn continuous_delivery() -> Self {
        Self {
            key: "jep-229",
            description: "Checks if JEP-229 continuous delivery is enabled on the plugin.",
            version: 1,
            search_root: ".github/workflows",
            max_depth: 1,
            matches: |name| name.ends_with(".yml") || name.ends_with(".yaml"),
            content: Some(ContentCheck {
                accepts: |_, content| {
                    content.lines().any(|line| {
                        line.trim_start()
                            .trim_start_matches("- ")
                            .strip_prefix("uses:")
                            .is_some_and(|target| {
                                target
                                    .trim()
                                    .trim_matches(|c: char| c == '\'' || c == '"')
                                    .starts_with(CD_WORKFLOW)
                            })
                    })
                },
                rejected: "Could not find JEP-229 workflow definition.",
            }),
            found: "JEP-229 workflow definition found.",
            missing: "Plugin has no GitHub Action configured.",
        }
    }
}

const CD_WORKFLOW: &str = "jenkins-infra/github-reusable-workflows/.github/workflows/maven-cd.yml";

/// Source-related probe driven by a [`FileRule`].
#[derive(Debug, Clone, Copy)]
pub struct RepositoryFileProbe {
    rule: FileRule,
}

impl RepositoryFileProbe {
    /// Create a probe for `rule`.
    pub fn new(rule: FileRule) -> Self {
        Self { rule }
    }
}

impl Probe for RepositoryFileProbe {
    fn key(&self) -> &str {
        self.rule.key
    }

    fn description(&self) -> &str {
        self.rule.description
    }

    fn schema_version(&self) -> u32 {
        self.rule.version
    }

    fn is_source_code_related(&self) -> bool {
        true
    }

    fn requirements(&self) -> &[&'static str] {
        SOURCE_REQUIREMENTS
    }

    fn check(&self, plugin: &Plugin, context: &mut ProbeContext) -> Result<ProbeResult> {
        let repository = repository_checkout(plugin, context)?;
        let root = if self.rule.search_root.is_empty() {
            repository
        } else {
            repository.join(self.rule.search_root)
        };

        let files = context.file_system().list_files(&root, self.rule.max_depth)?;
        let candidates: Vec<&PathBuf> = files
            .iter()
            .filter(|path| file_name_matches(path, self.rule.matches))
            .collect();
        if candidates.is_empty() {
            return Ok(self.failure(self.rule.missing));
        }

        if let Some(check) = self.rule.content {
            for file in candidates {
                let content = context.file_system().read_to_string(file)?;
                if (check.accepts)(plugin, &content) {
                    return Ok(self.success(self.rule.found));
                }
            }
            return Ok(self.failure(check.rejected));
        }
        Ok(self.success(self.rule.found))
    }
}

fn file_name_matches(path: &Path, matches: fn(&str) -> bool) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(matches)
}

#[cfg(test)]
mod tests {
    use super::{FileRule, RepositoryFileProbe};
    use crate::context::testing::Fixture;
    use crate::error::HealthError;
    use crate::fs::MockFileSystem;
    use crate::plugin::Plugin;
    use crate::probe::Probe;
    use crate::result::{ProbeResult, ResultStatus};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    fn plugin() -> Plugin {
        let mut plugin = Plugin::new("mailer").with_scm("https://github.com/jenkinsci/mailer-plugin");
        plugin.record(ProbeResult::success("scm", 1, "valid"));
        plugin.record(ProbeResult::success("last-commit-date", 1, "2024-03-14T09:26:53Z"));
        plugin
    }

    fn apply(rule: FileRule, file_system: MockFileSystem) -> ProbeResult {
        let factory = Fixture {
            file_system: Arc::new(file_system),
            ..Fixture::default()
        }
        .factory();
        let plugin = plugin();
        let mut context = factory.context_for(&plugin);
        context.publish_repository_path("/repo").expect("publish checkout");
        RepositoryFileProbe::new(rule).apply(&plugin, &mut context)
    }

    #[test]
    fn dependabot_is_searched_under_github_folder() {
        let mut file_system = MockFileSystem::new();
        file_system
            .expect_list_files()
            .withf(|root: &Path, depth: &usize| root == Path::new("/repo/.github") && *depth == 1)
            .times(1)
            .returning(|_, _| Ok(vec![PathBuf::from("/repo/.github/dependabot.yml")]));

        let result = apply(FileRule::dependabot(), file_system);
        assert_eq!(result.status(), ResultStatus::Success);
        assert_eq!(result.message_text(), "Dependabot is configured.");
        assert_eq!(result.id(), "dependabot");
    }

    #[test]
    fn missing_file_is_a_failure() {
        let mut file_system = MockFileSystem::new();
        file_system
            .expect_list_files()
            .returning(|_, _| Ok(vec![PathBuf::from("/repo/README.md"), PathBuf::from("/repo/pom.xml")]));

        let result = apply(FileRule::jenkinsfile(), file_system);
        assert_eq!(result.status(), ResultStatus::Failure);
        assert_eq!(result.message_text(), "No Jenkinsfile found.");
    }

    #[test]
    fn contributing_guide_matches_any_case() {
        let mut file_system = MockFileSystem::new();
        file_system
            .expect_list_files()
            .withf(|root: &Path, depth: &usize| root == Path::new("/repo") && *depth == 2)
            .returning(|_, _| Ok(vec![PathBuf::from("/repo/docs/Contributing.adoc")]));

        let result = apply(FileRule::contributing_guidelines(), file_system);
        assert_eq!(result.status(), ResultStatus::Success);
    }

    #[test]
    fn code_owners_must_name_the_plugin_team() {
        let mut file_system = MockFileSystem::new();
        file_system
            .expect_list_files()
            .returning(|_, _| Ok(vec![PathBuf::from("/repo/.github/CODEOWNERS")]));
        file_system
            .expect_read_to_string()
            .withf(|path: &Path| path == Path::new("/repo/.github/CODEOWNERS"))
            .returning(|_| Ok("* @jenkinsci/mailer-plugin-developers\n".to_string()));
        let result = apply(FileRule::code_ownership(), file_system);
        assert_eq!(result.status(), ResultStatus::Success);
        assert_eq!(result.schema_version(), 2);

        let mut file_system = MockFileSystem::new();
        file_system
            .expect_list_files()
            .returning(|_, _| Ok(vec![PathBuf::from("/repo/CODEOWNERS")]));
        file_system
            .expect_read_to_string()
            .returning(|_| Ok("* @someone-else\n".to_string()));
        let result = apply(FileRule::code_ownership(), file_system);
        assert_eq!(result.status(), ResultStatus::Failure);
        assert_eq!(result.message_text(), "CODEOWNERS file is not set correctly.");
    }

    #[test]
    fn continuous_delivery_needs_the_shared_workflow_in_any_file() {
        let mut file_system = MockFileSystem::new();
        file_system
            .expect_list_files()
            .withf(|root: &Path, depth: &usize| root == Path::new("/repo/.github/workflows") && *depth == 1)
            .returning(|_, _| {
                Ok(vec![
                    PathBuf::from("/repo/.github/workflows/README.md"),
                    PathBuf::from("/repo/.github/workflows/cd.yaml"),
                    PathBuf::from("/repo/.github/workflows/codeql.yml"),
                ])
            });
        file_system
            .expect_read_to_string()
            .withf(|path: &Path| path == Path::new("/repo/.github/workflows/cd.yaml"))
            .returning(|_| {
                Ok("jobs:\n  maven-cd:\n    uses: jenkins-infra/github-reusable-workflows/.github/workflows/maven-cd.yml@v1\n".to_string())
            });
        file_system
            .expect_read_to_string()
            .withf(|path: &Path| path == Path::new("/repo/.github/workflows/codeql.yml"))
            .returning(|_| Ok("jobs:\n  analyze:\n    uses: github/codeql-action/analyze@v3\n".to_string()));
        let result = apply(FileRule::continuous_delivery(), file_system);
        assert_eq!(result.status(), ResultStatus::Success);
        assert_eq!(result.id(), "jep-229");

        let mut file_system = MockFileSystem::new();
        file_system
            .expect_list_files()
            .returning(|_, _| Ok(vec![PathBuf::from("/repo/.github/workflows/codeql.yml")]));
        file_system
            .expect_read_to_string()
            .returning(|_| Ok("jobs:\n  analyze:\n    uses: github/codeql-action/analyze@v3\n".to_string()));
        let result = apply(FileRule::continuous_delivery(), file_system);
        assert_eq!(result.message_text(), "Could not find JEP-229 workflow definition.");

        let mut file_system = MockFileSystem::new();
        file_system.expect_list_files().returning(|_, _| Ok(Vec::new()));
        let result = apply(FileRule::continuous_delivery(), file_system);
        assert_eq!(result.message_text(), "Plugin has no GitHub Action configured.");
    }

    #[test]
    fn release_drafter_accepts_both_yaml_extensions() {
        let mut file_system = MockFileSystem::new();
        file_system
            .expect_list_files()
            .withf(|root: &Path, _: &usize| root == Path::new("/repo/.github"))
            .returning(|_, _| Ok(vec![PathBuf::from("/repo/.github/release-drafter.yaml")]));
        let result = apply(FileRule::release_drafter(), file_system);
        assert_eq!(result.message_text(), "Release Drafter is configured.");
    }

    #[test]
    fn listing_failure_is_an_error() {
        let mut file_system = MockFileSystem::new();
        file_system.expect_list_files().returning(|_, _| {
            Err(HealthError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "denied",
            )))
        });

        let result = apply(FileRule::renovate(), file_system);
        assert_eq!(result.status(), ResultStatus::Error);
        assert!(result.message_text().starts_with("io: "));
    }

    #[test]
    fn unmet_source_requirements_skip_the_filesystem() {
        let factory = Fixture::default().factory();
        let plugin = Plugin::new("mailer");
        let mut context = factory.context_for(&plugin);
        let result = RepositoryFileProbe::new(FileRule::jenkinsfile()).apply(&plugin, &mut context);
        assert_eq!(result.status(), ResultStatus::Error);
        assert_eq!(result.message_text(), "requirement scm not satisfied");
    }
}
