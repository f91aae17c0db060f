//! Open pull request counts.

use serde_json::Value;

use crate::context::ProbeContext;
use crate::error::Result;
use crate::hosting::PullRequest;
use crate::plugin::Plugin;
use crate::probe::Probe;
use crate::result::ProbeResult;

use super::{ScmLinkProbe, repository_name};

const DEPENDENCY_LABEL: &str = "dependencies";
const DEPENDENCY_BOTS: &[&str] = &["dependabot[bot]", "renovate[bot]"];

/// Which open pull requests a [`PullRequestProbe`] counts.
#[derive(Debug, Clone, Copy)]
pub struct PullRequestFilter {
    /// Probe key.
    pub key: &'static str,
    /// Probe description.
    pub description: &'static str,
    /// Whether a pull request is counted.
    pub accepts: fn(&PullRequest) -> bool,
}

impl PullRequestFilter {
    /// Every open pull request.
    pub fn all() -> Self {
        Self {
            key: "pull-request",
            description: "Counts the open pull requests of the plugin repository.",
            accepts: |_| true,
        }
    }

    /// Open pull requests updating dependencies.
    pub fn dependency_updates() -> Self {
        Self {
            key: "dependency-pull-request",
            description: "Counts the open dependency update pull requests of the plugin repository.",
            accepts: |pull_request| {
                pull_request.labels.iter().any(|label| label == DEPENDENCY_LABEL)
                    || DEPENDENCY_BOTS.contains(&pull_request.author.as_str())
            },
        }
    }
}

/// Counts the open pull requests accepted by a [`PullRequestFilter`].
#[derive(Debug, Clone, Copy)]
pub struct PullRequestProbe {
    filter: PullRequestFilter,
}

impl PullRequestProbe {
    /// Create a probe for `filter`.
    pub fn new(filter: PullRequestFilter) -> Self {
        Self { filter }
    }
}

impl Probe for PullRequestProbe {
    fn key(&self) -> &str {
        self.filter.key
    }

    fn description(&self) -> &str {
        self.filter.description
    }

    fn requirements(&self) -> &[&'static str] {
        &[ScmLinkProbe::KEY]
    }

    fn check(&self, _plugin: &Plugin, context: &mut ProbeContext) -> Result<ProbeResult> {
        let name = repository_name(context)?;
        let count = context
            .hosting()
            .pull_requests(name)?
            .iter()
            .filter(|pull_request| (self.filter.accepts)(pull_request))
            .count();
        Ok(self.success(Value::from(count)))
    }
}
