//! Hosting-platform state of the plugin repository.

use crate::context::ProbeContext;
use crate::error::Result;
use crate::plugin::Plugin;
use crate::probe::Probe;
use crate::result::ProbeResult;

use super::{ScmLinkProbe, repository_name};

/// Whether the hosted repository is archived.
#[derive(Debug, Clone, Copy, Default)]
pub struct RepositoryArchivedProbe;

impl RepositoryArchivedProbe {
    /// Probe key.
    pub const KEY: &'static str = "repository-archived";
}

impl Probe for RepositoryArchivedProbe {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn description(&self) -> &str {
        "Checks if the plugin repository is archived on the hosting platform."
    }

    fn requirements(&self) -> &[&'static str] {
        &[ScmLinkProbe::KEY]
    }

    fn check(&self, _plugin: &Plugin, context: &mut ProbeContext) -> Result<ProbeResult> {
        let repository = context.hosting().repository(repository_name(context)?)?;
        Ok(if repository.archived {
            self.failure("The plugin repository is archived.")
        } else {
            self.success("The plugin repository is not archived.")
        })
    }
}

/// Status of the checks reported on the default branch.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBranchBuildProbe;

impl DefaultBranchBuildProbe {
    /// Probe key.
    pub const KEY: &'static str = "default-branch-build";
}

impl Probe for DefaultBranchBuildProbe {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn description(&self) -> &str {
        "Checks that the builds of the default branch are passing."
    }

    fn requirements(&self) -> &[&'static str] {
        &[ScmLinkProbe::KEY]
    }

    fn check(&self, plugin: &Plugin, context: &mut ProbeContext) -> Result<ProbeResult> {
        let name = repository_name(context)?;
        let catalog_branch = context
            .catalog()
            .plugin(&plugin.name)
            .and_then(|entry| entry.default_branch.clone())
            .filter(|branch| !branch.trim().is_empty());
        let branch = match catalog_branch {
            Some(branch) => branch,
            None => context.hosting().repository(name)?.default_branch,
        };

        let runs = context.hosting().check_runs(name, &branch)?;
        let completed: Vec<_> = runs.iter().filter(|run| run.is_completed()).collect();
        if completed.is_empty() {
            return Ok(self.failure(format!("No completed build on {branch}.")));
        }
        let failing: Vec<&str> = completed
            .iter()
            .filter(|run| !run.is_passing())
            .map(|run| run.name.as_str())
            .collect();
        Ok(if failing.is_empty() {
            self.success(format!("All {} builds on {branch} passed.", completed.len()))
        } else {
            self.failure(format!("Failing builds on {branch}: {}.", failing.join(", ")))
        })
    }
}
