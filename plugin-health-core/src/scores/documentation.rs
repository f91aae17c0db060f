use crate::probes::DocumentationMigrationProbe;
use crate::scoring::CategoryScoring;

use super::verdict_with_help;

/// Contributor and user documentation of the plugin.
pub fn documentation() -> CategoryScoring {
    CategoryScoring::new(
        "documentation",
        0.5,
        1,
        "Scores the plugin on its contributing guide and documentation location.",
    )
    .with_rule("Contributing guide", 2, |_, results, weight| {
        Ok(verdict_with_help(
            results,
            "contributing-guidelines",
            weight,
            (
                "The plugin has a contributing guide.",
                "The plugin has no contributing guide.",
            ),
            (
                "See why and how to add a contributing guide",
                "https://www.jenkins.io/doc/developer/tutorial-improve/add-a-contributing-guide/",
            ),
        ))
    })
    .with_rule("Documentation location", 4, |_, results, weight| {
        Ok(verdict_with_help(
            results,
            DocumentationMigrationProbe::KEY,
            weight,
            (
                "The documentation is kept with the plugin sources.",
                "The documentation is not kept with the plugin sources.",
            ),
            (
                "See how to migrate the documentation to the plugin repository",
                "https://www.jenkins.io/doc/developer/tutorial-improve/migrate-documentation-to-github/",
            ),
        ))
    })
}
