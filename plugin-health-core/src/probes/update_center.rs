//! Probes reading the update-center catalog only.

use serde_json::Value;

use crate::context::ProbeContext;
use crate::error::{HealthError, Result};
use crate::plugin::Plugin;
use crate::probe::Probe;
use crate::result::ProbeResult;

const ADOPTION_LABEL: &str = "adopt-this-plugin";
const DEPRECATED_LABEL: &str = "deprecated";

/// Whether the update-center still distributes the plugin.
#[derive(Debug, Clone, Copy, Default)]
pub struct PublicationProbe;

impl PublicationProbe {
    /// Probe key.
    pub const KEY: &'static str = "update-center-plugin-publication";
}

impl Probe for PublicationProbe {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn description(&self) -> &str {
        "Checks if the plugin is still published by the update-center."
    }

    fn check(&self, plugin: &Plugin, context: &mut ProbeContext) -> Result<ProbeResult> {
        Ok(match context.catalog().plugin(&plugin.name) {
            Some(_) => self.success("This plugin is still actively published by the update-center."),
            None => self.failure("This plugin's publication has been stopped by the update-center."),
        })
    }
}

/// Whether the plugin is marked deprecated.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeprecationProbe;

impl DeprecationProbe {
    /// Probe key.
    pub const KEY: &'static str = "deprecation";
}

impl Probe for DeprecationProbe {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn description(&self) -> &str {
        "Checks if the plugin is marked as deprecated by the update-center."
    }

    fn requirements(&self) -> &[&'static str] {
        &[PublicationProbe::KEY]
    }

    fn check(&self, plugin: &Plugin, context: &mut ProbeContext) -> Result<ProbeResult> {
        let catalog = context.catalog();
        if let Some(deprecation) = catalog.deprecation(&plugin.name) {
            return Ok(self.failure(format!("This plugin is deprecated: {}", deprecation.url)));
        }
        let entry = catalog.plugin(&plugin.name).ok_or_else(|| not_published(plugin))?;
        Ok(if entry.has_label(DEPRECATED_LABEL) {
            self.failure("This plugin is marked as deprecated.")
        } else {
            self.success("This plugin is NOT deprecated.")
        })
    }
}

/// Whether the plugin is looking for a new maintainer.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpForAdoptionProbe;

impl UpForAdoptionProbe {
    /// Probe key.
    pub const KEY: &'static str = "up-for-adoption";
}

impl Probe for UpForAdoptionProbe {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn description(&self) -> &str {
        "Checks if the plugin is up for adoption."
    }

    fn requirements(&self) -> &[&'static str] {
        &[PublicationProbe::KEY]
    }

    fn check(&self, plugin: &Plugin, context: &mut ProbeContext) -> Result<ProbeResult> {
        let entry = context
            .catalog()
            .plugin(&plugin.name)
            .ok_or_else(|| not_published(plugin))?;
        Ok(if entry.has_label(ADOPTION_LABEL) {
            self.failure("This plugin is up for adoption.")
        } else {
            self.success("This plugin is not up for adoption.")
        })
    }
}

/// Popularity figure published by the update-center.
#[derive(Debug, Clone, Copy, Default)]
pub struct PopularityProbe;

impl PopularityProbe {
    /// Probe key.
    pub const KEY: &'static str = "popularity";
}

impl Probe for PopularityProbe {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn description(&self) -> &str {
        "Reports the popularity of the plugin as published by the update-center."
    }

    fn requirements(&self) -> &[&'static str] {
        &[PublicationProbe::KEY]
    }

    fn check(&self, plugin: &Plugin, context: &mut ProbeContext) -> Result<ProbeResult> {
        let entry = context
            .catalog()
            .plugin(&plugin.name)
            .ok_or_else(|| not_published(plugin))?;
        Ok(self.success(Value::from(entry.popularity)))
    }
}

/// Whether the installed version is named by an active security warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct KnownSecurityVulnerabilityProbe;

impl KnownSecurityVulnerabilityProbe {
    /// Probe key.
    pub const KEY: &'static str = "known-security-vulnerability";
}

impl Probe for KnownSecurityVulnerabilityProbe {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn description(&self) -> &str {
        "Checks if the latest release of the plugin is affected by a published security warning."
    }

    fn requirements(&self) -> &[&'static str] {
        &[PublicationProbe::KEY]
    }

    fn check(&self, plugin: &Plugin, context: &mut ProbeContext) -> Result<ProbeResult> {
        let catalog = context.catalog();
        let entry = catalog.plugin(&plugin.name).ok_or_else(|| not_published(plugin))?;
        let version = plugin
            .version
            .as_deref()
            .or(entry.version.as_deref())
            .ok_or_else(|| HealthError::Other(format!("{} has no published version", plugin.name)))?;
        let warnings = catalog.active_warnings(&plugin.name, version)?;
        if warnings.is_empty() {
            return Ok(self.success("No known security vulnerability."));
        }
        let ids: Vec<&str> = warnings.iter().map(|warning| warning.id.as_str()).collect();
        Ok(self.failure(ids.join(", ")))
    }
}

fn not_published(plugin: &Plugin) -> HealthError {
    HealthError::Other(format!("{} is not in the update-center", plugin.name))
}

#[cfg(test)]
mod tests {
    use super::{
        DeprecationProbe, KnownSecurityVulnerabilityProbe, PopularityProbe, PublicationProbe,
        UpForAdoptionProbe,
    };
    use crate::catalog::Catalog;
    use crate::context::testing::Fixture;
    use crate::plugin::Plugin;
    use crate::probe::Probe;
    use crate::result::{ProbeResult, ResultStatus};
    use serde_json::json;

    fn catalog() -> Catalog {
        Catalog::from_json(
            &json!({
                "plugins": {
                    "mailer": {"name": "mailer", "version": "472.vf7c289a_4b_420", "popularity": 182000, "labels": ["notifier"]},
                    "credentials": {"name": "credentials", "version": "1087.v16065d268466"},
                    "script-security": {"name": "script-security", "version": "1.74"},
                    "old-timer": {"name": "old-timer", "labels": ["adopt-this-plugin"]},
                    "legacy": {"name": "legacy", "labels": ["deprecated"]},
                    "retired": {"name": "retired"}
                },
                "deprecations": {
                    "retired": {"url": "https://example.com/retired"}
                },
                "warnings": [
                    {
                        "id": "SECURITY-3090",
                        "type": "plugin",
                        "name": "credentials",
                        "url": "https://www.jenkins.io/security/advisory/2023-09-06/",
                        "versions": [{"lastVersion": "1271.v54b_1c2c6388a_", "pattern": "(1[01]|12[0-6])[0-9]{2}[.].*"}]
                    },
                    {
                        "id": "SECURITY-3091",
                        "type": "plugin",
                        "name": "credentials",
                        "versions": [{"pattern": "10[0-9]{2}[.].*"}]
                    },
                    {
                        "id": "SECURITY-1",
                        "type": "plugin",
                        "name": "script-security",
                        "versions": [{"pattern": "(1"}]
                    },
                    {
                        "id": "CORE-1",
                        "type": "core",
                        "name": "mailer",
                        "versions": [{"pattern": ".*"}]
                    }
                ]
            })
            .to_string(),
        )
        .expect("catalog")
    }

    fn apply(probe: &dyn Probe, name: &str) -> ProbeResult {
        let factory = Fixture {
            catalog: catalog(),
            ..Fixture::default()
        }
        .factory();
        let mut plugin = Plugin::new(name);
        plugin.record(ProbeResult::success(PublicationProbe::KEY, 1, "published"));
        let mut context = factory.context_for(&plugin);
        probe.apply(&plugin, &mut context)
    }

    #[test]
    fn publication_follows_catalog_membership() {
        let published = apply(&PublicationProbe, "mailer");
        assert_eq!(published.status(), ResultStatus::Success);
        assert_eq!(
            published.message_text(),
            "This plugin is still actively published by the update-center."
        );

        let stopped = apply(&PublicationProbe, "gone");
        assert_eq!(stopped.status(), ResultStatus::Failure);
        assert_eq!(
            stopped.message_text(),
            "This plugin's publication has been stopped by the update-center."
        );
    }

    #[test]
    fn deprecation_uses_notices_and_labels() {
        assert_eq!(apply(&DeprecationProbe, "mailer").message_text(), "This plugin is NOT deprecated.");

        let noticed = apply(&DeprecationProbe, "retired");
        assert_eq!(noticed.status(), ResultStatus::Failure);
        assert!(noticed.message_text().ends_with("https://example.com/retired"));

        assert_eq!(apply(&DeprecationProbe, "legacy").status(), ResultStatus::Failure);
    }

    #[test]
    fn adoption_label_is_a_failure() {
        let result = apply(&UpForAdoptionProbe, "old-timer");
        assert_eq!(result.status(), ResultStatus::Failure);
        assert_eq!(result.message_text(), "This plugin is up for adoption.");
        assert_eq!(apply(&UpForAdoptionProbe, "mailer").status(), ResultStatus::Success);
    }

    #[test]
    fn popularity_is_a_number() {
        let result = apply(&PopularityProbe, "mailer");
        assert_eq!(result.status(), ResultStatus::Success);
        assert_eq!(result.message().as_u64(), Some(182000));
    }

    #[test]
    fn catalog_probes_error_when_plugin_vanished() {
        let result = apply(&PopularityProbe, "gone");
        assert_eq!(result.status(), ResultStatus::Error);
        assert_eq!(result.message_text(), "other: gone is not in the update-center");
    }

    #[test]
    fn affected_release_lists_every_warning() {
        let affected = apply(&KnownSecurityVulnerabilityProbe, "credentials");
        assert_eq!(affected.status(), ResultStatus::Failure);
        assert_eq!(affected.message_text(), "SECURITY-3090, SECURITY-3091");

        let clean = apply(&KnownSecurityVulnerabilityProbe, "mailer");
        assert_eq!(clean.status(), ResultStatus::Success);
        assert_eq!(clean.message_text(), "No known security vulnerability.");
    }

    #[test]
    fn recorded_release_wins_over_catalog_version() {
        let factory = Fixture {
            catalog: catalog(),
            ..Fixture::default()
        }
        .factory();
        let mut plugin = Plugin::new("credentials");
        plugin.version = Some("1311.vcf0a_900b_37c2".to_string());
        plugin.record(ProbeResult::success(PublicationProbe::KEY, 1, "published"));
        let mut context = factory.context_for(&plugin);
        let result = KnownSecurityVulnerabilityProbe.apply(&plugin, &mut context);
        assert_eq!(result.status(), ResultStatus::Success);
    }

    #[test]
    fn broken_warning_pattern_is_an_error() {
        let result = apply(&KnownSecurityVulnerabilityProbe, "script-security");
        assert_eq!(result.status(), ResultStatus::Error);
        assert!(result.message_text().contains("SECURITY-1 has an invalid version pattern"));
    }
}
