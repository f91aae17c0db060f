//! Scoring of the repository automation setup.

use crate::error::{HealthError, Result};
use crate::plugin::{Plugin, ProbeResults};
use crate::probes::DefaultBranchBuildProbe;
use crate::scoring::{CategoryScoring, ComponentResult, Resolution, usable};

use super::verdict;

const DEPENDABOT: &str = "dependabot";
const RENOVATE: &str = "renovate";
const DEPENDENCY_PULL_REQUESTS: &str = "dependency-pull-request";
const JENKINSFILE: &str = "jenkinsfile";
const CODE_OWNERSHIP: &str = "code-ownership";

/// Continuous integration, dependency automation and ownership of the repository.
pub fn repository_configuration() -> CategoryScoring {
    CategoryScoring::new(
        "repository-configuration",
        0.5,
        1,
        "Scores the automation configured on the plugin repository.",
    )
    .with_rule("Continuous integration", 65, |_, results, weight| {
        Ok(verdict(
            results,
            JENKINSFILE,
            weight,
            "The plugin is built by continuous integration.",
            "The plugin has no Jenkinsfile.",
        ))
    })
    .with_rule("Dependency bot", 15, dependency_bot)
    .with_rule("Pending dependency updates", 15, pending_dependency_updates)
    .with_rule("Code ownership", 5, |_, results, weight| {
        Ok(verdict(
            results,
            CODE_OWNERSHIP,
            weight,
            "The plugin team owns the code.",
            "Code ownership is not configured for the plugin team.",
        ))
    })
    .with_rule("Default branch build", 0, |_, results, weight| {
        Ok(verdict(
            results,
            DefaultBranchBuildProbe::KEY,
            weight,
            "The default branch builds.",
            "The default branch does not build.",
        ))
    })
}

fn dependency_bot(_: &Plugin, results: &ProbeResults, weight: u32) -> Result<ComponentResult> {
    let configured: Vec<&str> = [DEPENDABOT, RENOVATE]
        .into_iter()
        .filter(|key| usable(results, key).is_some_and(|result| result.is_success()))
        .collect();
    Ok(if configured.is_empty() {
        ComponentResult::new(0, weight, "No dependency bot is configured.")
    } else {
        ComponentResult::new(
            100,
            weight,
            format!("Dependency updates are automated by {}.", configured.join(" and ")),
        )
    })
}

fn pending_dependency_updates(
    plugin: &Plugin,
    results: &ProbeResults,
    weight: u32,
) -> Result<ComponentResult> {
    let Some(result) = usable(results, DEPENDENCY_PULL_REQUESTS).filter(|result| result.is_success())
    else {
        return Ok(ComponentResult::new(
            0,
            0,
            "Open dependency update pull requests cannot be counted.",
        ));
    };
    let count = result.message().as_u64().ok_or_else(|| {
        HealthError::Other(format!(
            "dependency pull request count {} is not a number",
            result.message()
        ))
    })?;
    if count == 0 {
        return Ok(ComponentResult::new(
            100,
            weight,
            "No dependency update pull request is waiting.",
        ));
    }
    let component = ComponentResult::new(
        0,
        weight,
        format!("{count} dependency update pull requests are open."),
    );
    Ok(match plugin.scm.as_deref() {
        Some(scm) => component.with_resolution(Resolution::new(
            "See the open pull requests of the plugin",
            format!(
                "{}/pulls?q=is%3Aopen+is%3Apr+label%3Adependencies",
                scm.trim_end_matches('/')
            ),
        )),
        None => component,
    })
}
