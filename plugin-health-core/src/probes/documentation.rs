//! Location of the plugin documentation.

use crate::context::ProbeContext;
use crate::error::Result;
use crate::plugin::Plugin;
use crate::probe::Probe;
use crate::result::ProbeResult;

use super::ScmLinkProbe;

/// Whether the documentation lives in the plugin repository.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentationMigrationProbe;

impl DocumentationMigrationProbe {
    /// Probe key.
    pub const KEY: &'static str = "documentation-migration";
}

impl Probe for DocumentationMigrationProbe {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn description(&self) -> &str {
        "Checks that the plugin documentation was migrated to the plugin repository."
    }

    fn requires_release(&self) -> bool {
        true
    }

    fn requirements(&self) -> &[&'static str] {
        &[ScmLinkProbe::KEY]
    }

    fn check(&self, plugin: &Plugin, context: &mut ProbeContext) -> Result<ProbeResult> {
        let Some(links) = context.documentation_links().filter(|links| !links.is_empty()) else {
            return Ok(self.error("No link to documentation can be confirmed."));
        };
        let Some(link) = links.get(&plugin.name) else {
            return Ok(self.failure("The plugin is not listed in the documentation source."));
        };
        Ok(match plugin.scm.as_deref() {
            Some(scm) if is_within(link, scm) => {
                self.success("Documentation is located in the plugin repository.")
            }
            _ => self.failure("Documentation is not located in the plugin repository."),
        })
    }
}

/// Whether `link` points at `repository` or below it.
fn is_within(link: &str, repository: &str) -> bool {
    let repository = repository.trim_end_matches('/');
    link.trim_end_matches('/')
        .strip_prefix(repository)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}
