//! Date of the latest change to the plugin sources.

use chrono::SecondsFormat;

use crate::context::ProbeContext;
use crate::error::Result;
use crate::plugin::Plugin;
use crate::probe::Probe;
use crate::result::ProbeResult;

use super::{ScmLinkProbe, repository_checkout};

/// Clones the repository and publishes the date of the last commit touching the plugin.
#[derive(Debug, Clone, Copy, Default)]
pub struct LastCommitDateProbe;

impl LastCommitDateProbe {
    /// Probe key.
    pub const KEY: &'static str = "last-commit-date";
}

impl Probe for LastCommitDateProbe {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn description(&self) -> &str {
        "Registers the date of the last commit on the plugin sources."
    }

    fn requirements(&self) -> &[&'static str] {
        &[ScmLinkProbe::KEY]
    }

    fn check(&self, plugin: &Plugin, context: &mut ProbeContext) -> Result<ProbeResult> {
        let checkout = repository_checkout(plugin, context)?;
        let Some(date) = context.scm().last_commit(&checkout, context.sub_folder())? else {
            return Ok(self.failure("No commit touches the plugin sources."));
        };
        context.publish_last_commit_date(date)?;
        Ok(self.success(date.to_rfc3339_opts(SecondsFormat::Secs, true)))
    }
}
