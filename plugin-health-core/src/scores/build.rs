use crate::probes::{BomProbe, ParentPomProbe};
use crate::scoring::CategoryScoring;

use super::verdict;

/// Use of the shared build infrastructure.
pub fn build_configuration() -> CategoryScoring {
    CategoryScoring::new(
        "build-configuration",
        0.5,
        1,
        "Scores the plugin on its use of the plugin parent POM and BOM.",
    )
    .with_rule("Parent POM", 2, |_, results, weight| {
        let component = verdict(
            results,
            ParentPomProbe::KEY,
            weight,
            "The build inherits from the plugin parent POM.",
            "The build does not inherit from the plugin parent POM.",
        );
        Ok(match results.get(ParentPomProbe::KEY) {
            Some(result) if result.is_success() => {
                component.with_reason(format!("Parent POM version {}.", result.message_text()))
            }
            _ => component,
        })
    })
    .with_rule("Plugin BOM", 1, |_, results, weight| {
        Ok(verdict(
            results,
            BomProbe::KEY,
            weight,
            "Dependency versions are managed by the plugin BOM.",
            "Dependency versions are not managed by the plugin BOM.",
        ))
    })
}
