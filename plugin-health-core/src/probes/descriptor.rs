//! Probes reading the plugin build descriptor.

use crate::context::ProbeContext;
use crate::descriptor::BuildDescriptor;
use crate::error::Result;
use crate::plugin::Plugin;
use crate::probe::Probe;
use crate::result::ProbeResult;

use super::{SOURCE_REQUIREMENTS, plugin_sources};

const PLUGIN_PARENT_GROUP: &str = "org.jenkins-ci.plugins";
const PLUGIN_PARENT_ARTIFACT: &str = "plugin";
const BOM_GROUP: &str = "io.jenkins.tools.bom";
const CORE_VERSION_PROPERTY: &str = "jenkins.version";

fn read_descriptor(plugin: &Plugin, context: &mut ProbeContext) -> Result<BuildDescriptor> {
    let sources = plugin_sources(plugin, context)?;
    context.descriptors().read(&sources)
}

/// Whether the build inherits from the plugin parent POM.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParentPomProbe;

impl ParentPomProbe {
    /// Probe key.
    pub const KEY: &'static str = "parent-pom";
}

impl Probe for ParentPomProbe {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn description(&self) -> &str {
        "Checks that the plugin build inherits from the plugin parent POM and reports its version."
    }

    fn is_source_code_related(&self) -> bool {
        true
    }

    fn requirements(&self) -> &[&'static str] {
        SOURCE_REQUIREMENTS
    }

    fn check(&self, plugin: &Plugin, context: &mut ProbeContext) -> Result<ProbeResult> {
        let descriptor = read_descriptor(plugin, context)?;
        Ok(match descriptor.parent {
            Some(parent)
                if parent.group_id == PLUGIN_PARENT_GROUP
                    && parent.artifact_id == PLUGIN_PARENT_ARTIFACT =>
            {
                self.success(parent.version.unwrap_or_else(|| "unknown".to_string()))
            }
            Some(parent) => self.failure(format!(
                "The build inherits from {}:{} instead of the plugin parent POM.",
                parent.group_id, parent.artifact_id
            )),
            None => self.failure("The build does not declare a parent POM."),
        })
    }
}

/// Whether dependency versions are managed by the plugin BOM.
#[derive(Debug, Clone, Copy, Default)]
pub struct BomProbe;

impl BomProbe {
    /// Probe key.
    pub const KEY: &'static str = "bom";
}

impl Probe for BomProbe {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn description(&self) -> &str {
        "Checks that the plugin imports the plugin BOM to manage its dependency versions."
    }

    fn is_source_code_related(&self) -> bool {
        true
    }

    fn requirements(&self) -> &[&'static str] {
        SOURCE_REQUIREMENTS
    }

    fn check(&self, plugin: &Plugin, context: &mut ProbeContext) -> Result<ProbeResult> {
        let descriptor = read_descriptor(plugin, context)?;
        let bom = descriptor.dependency_management.iter().find(|dependency| {
            dependency.coordinates.group_id == BOM_GROUP
                && dependency.coordinates.artifact_id.starts_with("bom-")
                && dependency.scope.as_deref() == Some("import")
        });
        Ok(match bom {
            Some(dependency) => self.success(dependency.coordinates.artifact_id.clone()),
            None => self.failure("The plugin does not use the plugin BOM."),
        })
    }
}

/// Minimum core version the plugin builds against.
#[derive(Debug, Clone, Copy, Default)]
pub struct JenkinsCoreVersionProbe;

impl JenkinsCoreVersionProbe {
    /// Probe key.
    pub const KEY: &'static str = "jenkins-core-version";
}

impl Probe for JenkinsCoreVersionProbe {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn description(&self) -> &str {
        "Reports the minimum core version declared by the plugin build."
    }

    fn is_source_code_related(&self) -> bool {
        true
    }

    fn requirements(&self) -> &[&'static str] {
        SOURCE_REQUIREMENTS
    }

    fn check(&self, plugin: &Plugin, context: &mut ProbeContext) -> Result<ProbeResult> {
        let descriptor = read_descriptor(plugin, context)?;
        Ok(match descriptor.property(CORE_VERSION_PROPERTY) {
            Some(version) => self.success(version),
            None => self.failure(format!("No {CORE_VERSION_PROPERTY} property declared.")),
        })
    }
}
