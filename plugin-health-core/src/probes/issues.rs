//! Issue trackers declared by the plugin and their open issues.

use crate::context::{IssueTrackers, ProbeContext};
use crate::error::Result;
use crate::plugin::Plugin;
use crate::probe::Probe;
use crate::result::ProbeResult;

use super::{PublicationProbe, ScmLinkProbe, repository_name};

const GITHUB_TRACKER: &str = "github";
const JIRA_TRACKER: &str = "jira";

/// Publishes the issue trackers the update-center lists for the plugin.
#[derive(Debug, Clone, Copy, Default)]
pub struct IssueTrackerDetectionProbe;

impl IssueTrackerDetectionProbe {
    /// Probe key.
    pub const KEY: &'static str = "issue-tracker-detection";
}

impl Probe for IssueTrackerDetectionProbe {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn description(&self) -> &str {
        "Detects the issue trackers declared by the plugin in the update-center."
    }

    fn requirements(&self) -> &[&'static str] {
        &[PublicationProbe::KEY]
    }

    fn check(&self, plugin: &Plugin, context: &mut ProbeContext) -> Result<ProbeResult> {
        let trackers: IssueTrackers = context
            .catalog()
            .plugin(&plugin.name)
            .map(|entry| {
                entry
                    .issue_trackers
                    .iter()
                    .filter_map(|tracker| {
                        let url = tracker.view_url.as_deref()?.trim();
                        (!tracker.kind.is_empty() && !url.is_empty())
                            .then(|| (tracker.kind.to_lowercase(), url.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        if trackers.is_empty() {
            return Ok(self.failure(format!(
                "No issue tracker data available for {} plugin in Update Center.",
                plugin.name
            )));
        }
        let kinds: Vec<&str> = trackers.keys().map(String::as_str).collect();
        let message = format!("Issues are tracked in {}.", kinds.join(" and "));
        context.publish_issue_trackers(trackers)?;
        Ok(self.success(message))
    }
}

/// Open issue count on the hosting platform.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitHubOpenIssuesProbe;

impl GitHubOpenIssuesProbe {
    /// Probe key.
    pub const KEY: &'static str = "github-open-issues";
}

impl Probe for GitHubOpenIssuesProbe {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn description(&self) -> &str {
        "Counts the open GitHub issues of the plugin repository."
    }

    fn requirements(&self) -> &[&'static str] {
        &[ScmLinkProbe::KEY, IssueTrackerDetectionProbe::KEY]
    }

    fn check(&self, plugin: &Plugin, context: &mut ProbeContext) -> Result<ProbeResult> {
        if tracker_url(context, GITHUB_TRACKER).is_none() {
            return Ok(self.failure(format!(
                "GitHub issues are not used by {} plugin.",
                plugin.name
            )));
        }
        let repository = context.hosting().repository(repository_name(context)?)?;
        Ok(self.success(repository.open_issues_count))
    }
}

/// Open issue count on the Jira component of the plugin.
#[derive(Debug, Clone, Copy, Default)]
pub struct JiraOpenIssuesProbe;

impl JiraOpenIssuesProbe {
    /// Probe key.
    pub const KEY: &'static str = "jira-open-issues";
}

impl Probe for JiraOpenIssuesProbe {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn description(&self) -> &str {
        "Counts the open Jira issues of the plugin component."
    }

    fn requirements(&self) -> &[&'static str] {
        &[ScmLinkProbe::KEY, IssueTrackerDetectionProbe::KEY]
    }

    fn check(&self, plugin: &Plugin, context: &mut ProbeContext) -> Result<ProbeResult> {
        let Some(view_url) = tracker_url(context, JIRA_TRACKER) else {
            return Ok(self.failure(format!(
                "JIRA issues not found in Update Center for {} plugin.",
                plugin.name
            )));
        };
        let count = context.issues().open_jira_issues(&view_url)?;
        Ok(self.success(count))
    }
}

fn tracker_url(context: &ProbeContext, kind: &str) -> Option<String> {
    context
        .issue_trackers()
        .and_then(|trackers| trackers.get(kind))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::{GitHubOpenIssuesProbe, IssueTrackerDetectionProbe, JiraOpenIssuesProbe};
    use crate::catalog::{Catalog, CatalogPlugin, IssueTracker};
    use crate::context::ProbeContext;
    use crate::context::testing::Fixture;
    use crate::error::HealthError;
    use crate::hosting::{MockHostingClient, Repository};
    use crate::issues::MockIssueTrackerClient;
    use crate::plugin::Plugin;
    use crate::probe::Probe;
    use crate::result::{ProbeResult, ResultStatus};
    use std::sync::Arc;

    const JIRA_VIEW: &str = "https://issues.jenkins.io/issues/?jql=component=15525";

    fn catalog(trackers: Vec<IssueTracker>) -> Catalog {
        let mut catalog = Catalog::default();
        catalog.plugins.insert(
            "mailer".to_string(),
            CatalogPlugin {
                name: "mailer".to_string(),
                issue_trackers: trackers,
                ..CatalogPlugin::default()
            },
        );
        catalog
    }

    fn tracker(kind: &str, view_url: Option<&str>) -> IssueTracker {
        IssueTracker {
            kind: kind.to_string(),
            view_url: view_url.map(str::to_string),
            report_url: None,
        }
    }

    fn plugin() -> Plugin {
        let mut plugin = Plugin::new("mailer").with_scm("https://github.com/jenkinsci/mailer-plugin");
        for key in ["update-center-plugin-publication", "scm"] {
            plugin.record(ProbeResult::success(key, 1, "ok"));
        }
        plugin
    }

    /// Context with issue trackers detected, as after the detection step of a pass.
    fn detected(fixture: Fixture, plugin: &mut Plugin) -> ProbeContext {
        let factory = fixture.factory();
        let mut context = factory.context_for(plugin);
        let detection = IssueTrackerDetectionProbe.apply(plugin, &mut context);
        plugin.record(detection);
        context
    }

    #[test]
    fn detection_publishes_trackers_with_view_urls() {
        let mut plugin = plugin();
        let fixture = Fixture {
            catalog: catalog(vec![
                tracker("jira", Some(JIRA_VIEW)),
                tracker("github", Some("https://github.com/jenkinsci/mailer-plugin/issues")),
                tracker("gitlab", None),
            ]),
            ..Fixture::default()
        };
        let context = detected(fixture, &mut plugin);

        let result = plugin.result("issue-tracker-detection").expect("detection");
        assert_eq!(result.status(), ResultStatus::Success);
        assert_eq!(result.message_text(), "Issues are tracked in github and jira.");
        let trackers = context.issue_trackers().expect("published");
        assert_eq!(trackers.len(), 2);
        assert_eq!(trackers.get("jira").map(String::as_str), Some(JIRA_VIEW));
    }

    #[test]
    fn detection_without_trackers_fails() {
        let mut plugin = plugin();
        let fixture = Fixture {
            catalog: catalog(Vec::new()),
            ..Fixture::default()
        };
        let context = detected(fixture, &mut plugin);

        let result = plugin.result("issue-tracker-detection").expect("detection");
        assert_eq!(result.status(), ResultStatus::Failure);
        assert_eq!(
            result.message_text(),
            "No issue tracker data available for mailer plugin in Update Center."
        );
        assert!(context.issue_trackers().is_none());
    }

    #[test]
    fn github_count_comes_from_the_repository() {
        let mut hosting = MockHostingClient::new();
        hosting
            .expect_repository()
            .withf(|name: &str| name == "jenkinsci/mailer-plugin")
            .returning(|name| {
                Ok(Repository {
                    name: name.to_string(),
                    archived: false,
                    default_branch: "master".to_string(),
                    open_issues_count: 12,
                })
            });
        let mut plugin = plugin();
        let fixture = Fixture {
            hosting: Arc::new(hosting),
            catalog: catalog(vec![tracker(
                "github",
                Some("https://github.com/jenkinsci/mailer-plugin/issues"),
            )]),
            ..Fixture::default()
        };
        let mut context = detected(fixture, &mut plugin);

        let result = GitHubOpenIssuesProbe.apply(&plugin, &mut context);
        assert_eq!(result.status(), ResultStatus::Success);
        assert_eq!(result.message().as_u64(), Some(12));

        let jira = JiraOpenIssuesProbe.apply(&plugin, &mut context);
        assert_eq!(jira.status(), ResultStatus::Failure);
        assert_eq!(
            jira.message_text(),
            "JIRA issues not found in Update Center for mailer plugin."
        );
    }

    #[test]
    fn jira_count_uses_the_declared_view_url() {
        let mut issues = MockIssueTrackerClient::new();
        issues
            .expect_open_jira_issues()
            .withf(|view_url: &str| view_url == JIRA_VIEW)
            .times(1)
            .returning(|_| Ok(7));
        let mut hosting = MockHostingClient::new();
        hosting.expect_repository().never();
        let mut plugin = plugin();
        let fixture = Fixture {
            hosting: Arc::new(hosting),
            issues: Arc::new(issues),
            catalog: catalog(vec![tracker("jira", Some(JIRA_VIEW))]),
            ..Fixture::default()
        };
        let mut context = detected(fixture, &mut plugin);

        let result = JiraOpenIssuesProbe.apply(&plugin, &mut context);
        assert_eq!(result.status(), ResultStatus::Success);
        assert_eq!(result.message().as_u64(), Some(7));

        let github = GitHubOpenIssuesProbe.apply(&plugin, &mut context);
        assert_eq!(github.status(), ResultStatus::Failure);
    }

    #[test]
    fn jira_failures_become_errors() {
        let mut issues = MockIssueTrackerClient::new();
        issues
            .expect_open_jira_issues()
            .returning(|_| Err(HealthError::Http("jira api error: unknown component".to_string())));
        let mut plugin = plugin();
        let fixture = Fixture {
            issues: Arc::new(issues),
            catalog: catalog(vec![tracker("jira", Some(JIRA_VIEW))]),
            ..Fixture::default()
        };
        let mut context = detected(fixture, &mut plugin);

        let result = JiraOpenIssuesProbe.apply(&plugin, &mut context);
        assert_eq!(result.status(), ResultStatus::Error);
        assert_eq!(result.message_text(), "http: jira api error: unknown component");
    }

    #[test]
    fn counts_need_a_detected_tracker() {
        let plugin = plugin();
        let factory = Fixture::default().factory();
        let mut context = factory.context_for(&plugin);
        let result = GitHubOpenIssuesProbe.apply(&plugin, &mut context);
        assert_eq!(result.status(), ResultStatus::Error);
        assert_eq!(
            result.message_text(),
            "requirement issue-tracker-detection not satisfied"
        );
    }
}
