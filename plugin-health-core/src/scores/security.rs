use crate::probes::KnownSecurityVulnerabilityProbe;
use crate::scoring::{CategoryScoring, ComponentResult, Resolution, usable};

const ADVISORIES: &str = "https://www.jenkins.io/security/advisories/";

/// Published security warnings against the latest release.
pub fn security() -> CategoryScoring {
    CategoryScoring::new(
        "security",
        1.0,
        1,
        "Scores the plugin on the security warnings affecting its latest release.",
    )
    .with_rule("Known security vulnerabilities", 1, |_, results, weight| {
        // Unknown exposure counts as exposed.
        Ok(match usable(results, KnownSecurityVulnerabilityProbe::KEY) {
            Some(result) if result.is_success() => {
                ComponentResult::new(100, weight, "No security warning affects the latest release.")
            }
            Some(result) => ComponentResult::new(
                0,
                weight,
                "The latest release is affected by published security warnings.",
            )
            .with_reason(result.message_text())
            .with_resolution(Resolution::new("Read the security advisories", ADVISORIES)),
            None => ComponentResult::new(0, weight, "The security warnings could not be checked."),
        })
    })
}
