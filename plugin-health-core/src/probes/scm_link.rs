//! Validation of the plugin's source repository URL.

use crate::context::ProbeContext;
use crate::error::{HealthError, Result};
use crate::hosting::GITHUB_HOST;
use crate::plugin::Plugin;
use crate::probe::Probe;
use crate::result::ProbeResult;
use crate::scm::ScmLink;

use super::PublicationProbe;

/// Validates the SCM URL against the hosting platform and publishes the
/// repository name and sub-folder.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScmLinkProbe;

impl ScmLinkProbe {
    /// Probe key.
    pub const KEY: &'static str = "scm";
}

impl Probe for ScmLinkProbe {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn description(&self) -> &str {
        "Validates with the hosting platform that the plugin SCM link points to an existing repository."
    }

    fn requires_release(&self) -> bool {
        true
    }

    fn requirements(&self) -> &[&'static str] {
        &[PublicationProbe::KEY]
    }

    fn check(&self, plugin: &Plugin, context: &mut ProbeContext) -> Result<ProbeResult> {
        let Some(scm) = plugin.scm.as_deref().filter(|scm| !scm.trim().is_empty()) else {
            return Ok(self.failure("The plugin SCM link is empty."));
        };
        let Some(link) = ScmLink::parse(scm) else {
            return Ok(self.failure(format!("SCM link {scm} is not a hosted repository URL.")));
        };
        if link.host != GITHUB_HOST {
            return Ok(self.failure(format!("SCM link {scm} is not hosted on {GITHUB_HOST}.")));
        }
        match context.hosting().repository(&link.repository) {
            Ok(_) => {}
            Err(HealthError::NotFound(_)) => {
                return Ok(self.failure("The plugin SCM link is invalid."));
            }
            Err(err) => return Err(err),
        }

        context.publish_repository_name(link.repository.as_str())?;
        if let Some(folder) = &link.sub_folder {
            context.publish_sub_folder(folder.as_path())?;
        }
        Ok(self.success("The plugin SCM link is valid."))
    }
}
