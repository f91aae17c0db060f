//! Concrete probes and the default registration list.

use std::path::PathBuf;
use std::sync::Arc;

use crate::context::ProbeContext;
use crate::error::{HealthError, Result};
use crate::plugin::Plugin;
use crate::probe::Probe;

mod descriptor;
mod documentation;
mod issues;
mod last_commit;
mod pull_requests;
mod repository_files;
mod repository_status;
mod scm_link;
mod update_center;

pub use descriptor::{BomProbe, JenkinsCoreVersionProbe, ParentPomProbe};
pub use documentation::DocumentationMigrationProbe;
pub use issues::{GitHubOpenIssuesProbe, IssueTrackerDetectionProbe, JiraOpenIssuesProbe};
pub use last_commit::LastCommitDateProbe;
pub use pull_requests::{PullRequestFilter, PullRequestProbe};
pub use repository_files::{ContentCheck, FileRule, RepositoryFileProbe};
pub use repository_status::{DefaultBranchBuildProbe, RepositoryArchivedProbe};
pub use scm_link::ScmLinkProbe;
pub use update_center::{
    DeprecationProbe, KnownSecurityVulnerabilityProbe, PopularityProbe, PublicationProbe,
    UpForAdoptionProbe,
};

/// Requirements shared by every probe reading the checked-out sources.
pub(crate) const SOURCE_REQUIREMENTS: &[&str] = &[ScmLinkProbe::KEY, LastCommitDateProbe::KEY];

/// Every probe shipped with the crate, in registration order.
pub fn default_probes() -> Vec<Arc<dyn Probe>> {
    vec![
        Arc::new(PublicationProbe),
        Arc::new(DeprecationProbe),
        Arc::new(UpForAdoptionProbe),
        Arc::new(PopularityProbe),
        Arc::new(KnownSecurityVulnerabilityProbe),
        Arc::new(IssueTrackerDetectionProbe),
        Arc::new(ScmLinkProbe),
        Arc::new(LastCommitDateProbe),
        Arc::new(RepositoryFileProbe::new(FileRule::dependabot())),
        Arc::new(RepositoryFileProbe::new(FileRule::renovate())),
        Arc::new(RepositoryFileProbe::new(FileRule::contributing_guidelines())),
        Arc::new(RepositoryFileProbe::new(FileRule::jenkinsfile())),
        Arc::new(RepositoryFileProbe::new(FileRule::code_ownership())),
        Arc::new(RepositoryFileProbe::new(FileRule::release_drafter())),
        Arc::new(RepositoryFileProbe::new(FileRule::continuous_delivery())),
        Arc::new(ParentPomProbe),
        Arc::new(BomProbe),
        Arc::new(JenkinsCoreVersionProbe),
        Arc::new(RepositoryArchivedProbe),
        Arc::new(PullRequestProbe::new(PullRequestFilter::all())),
        Arc::new(PullRequestProbe::new(PullRequestFilter::dependency_updates())),
        Arc::new(DefaultBranchBuildProbe),
        Arc::new(GitHubOpenIssuesProbe),
        Arc::new(JiraOpenIssuesProbe),
        Arc::new(DocumentationMigrationProbe),
    ]
}

/// Local checkout of the plugin repository, cloning it if nobody did yet this pass.
pub(crate) fn repository_checkout(plugin: &Plugin, context: &mut ProbeContext) -> Result<PathBuf> {
    if let Some(path) = context.repository_path() {
        return Ok(path.to_path_buf());
    }
    let scm = plugin
        .scm
        .as_deref()
        .ok_or_else(|| HealthError::Other(format!("{} has no SCM URL", plugin.name)))?;
    context.checkout(scm)
}

/// Directory holding the plugin sources inside its checkout.
pub(crate) fn plugin_sources(plugin: &Plugin, context: &mut ProbeContext) -> Result<PathBuf> {
    let checkout = repository_checkout(plugin, context)?;
    Ok(match context.sub_folder() {
        Some(folder) => checkout.join(folder),
        None => checkout,
    })
}

/// `org/name` of the hosted repository, published from the SCM URL.
pub(crate) fn repository_name(context: &ProbeContext) -> Result<&str> {
    context.repository_name().ok_or_else(|| {
        HealthError::Other(format!(
            "no repository name published for {}",
            context.plugin_name()
        ))
    })
}
