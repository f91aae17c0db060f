//! Scorings over update-center facts and maintenance activity.

use chrono::{DateTime, Utc};

use crate::error::{HealthError, Result};
use crate::plugin::{Plugin, ProbeResults};
use crate::probes::{
    DeprecationProbe, LastCommitDateProbe, PublicationProbe, RepositoryArchivedProbe,
    UpForAdoptionProbe,
};
use crate::scoring::{CategoryScoring, ComponentResult, usable};

use super::verdict;

/// Whether the update-center still distributes the plugin.
pub fn publication() -> CategoryScoring {
    CategoryScoring::new(
        "update-center-plugin-publication",
        1.0,
        1,
        "Scores the plugin on whether the update-center still publishes it.",
    )
    .with_rule("Plugin publication", 1, |_, results, weight| {
        Ok(match usable(results, PublicationProbe::KEY) {
            Some(result) if result.is_success() => {
                ComponentResult::new(100, weight, "The plugin is published by the update-center.")
            }
            Some(_) => ComponentResult::new(
                0,
                weight,
                "The plugin is no longer published by the update-center.",
            ),
            None => ComponentResult::new(-100, 100, "The plugin publication cannot be confirmed."),
        })
    })
}

/// Whether the plugin and its repository are still alive.
pub fn deprecation() -> CategoryScoring {
    CategoryScoring::new(
        "deprecation",
        0.8,
        1,
        "Scores the plugin on deprecation notices and repository archival.",
    )
    .with_rule("Deprecation status", 1, |_, results, weight| {
        Ok(verdict(
            results,
            DeprecationProbe::KEY,
            weight,
            "The plugin is not deprecated.",
            "The plugin is deprecated.",
        ))
    })
    .with_rule("Repository archival", 1, |_, results, weight| {
        Ok(verdict(
            results,
            RepositoryArchivedProbe::KEY,
            weight,
            "The plugin repository is active.",
            "The plugin repository is archived.",
        ))
    })
}

/// Whether the plugin is actively maintained.
pub fn adoption() -> CategoryScoring {
    CategoryScoring::new(
        "adoption",
        0.8,
        1,
        "Scores the plugin on its need for a maintainer and the age of its last commit.",
    )
    .with_rule("Adoption status", 10, |_, results, weight| {
        Ok(verdict(
            results,
            UpForAdoptionProbe::KEY,
            weight,
            "The plugin has maintainers.",
            "The plugin is looking for a new maintainer.",
        ))
    })
    .with_rule("Last commit recency", 4, last_commit_recency)
}

/// Age of the last commit, measured against the latest release so the value
/// only moves when new results are stored.
fn last_commit_recency(plugin: &Plugin, results: &ProbeResults, weight: u32) -> Result<ComponentResult> {
    let Some(result) = usable(results, LastCommitDateProbe::KEY) else {
        return Ok(ComponentResult::new(-100, 100, "The last commit date is unknown."));
    };
    if !result.is_success() {
        return Ok(ComponentResult::new(0, weight, "No commit touches the plugin sources."));
    }
    let Some(released) = plugin.release_timestamp else {
        return Ok(ComponentResult::new(
            0,
            0,
            "The plugin release date is unknown, so the last commit cannot be dated.",
        ));
    };
    let text = result.message_text();
    let committed = DateTime::parse_from_rfc3339(&text)
        .map_err(|err| HealthError::Other(format!("last commit date {text:?} is not a date: {err}")))?
        .with_timezone(&Utc);
    let days = (released - committed).num_days();
    let score = match days {
        ..=SIX_MONTHS => 100,
        ..=ONE_YEAR => 75,
        ..=TWO_YEARS => 50,
        ..=FOUR_YEARS => 25,
        _ => 0,
    };
    let reason = if days < 0 {
        "The last commit is more recent than the latest release.".to_string()
    } else {
        format!("The last commit happened {days} days before the latest release.")
    };
    Ok(ComponentResult::new(score, weight, reason))
}

const SIX_MONTHS: i64 = 6 * 30;
const ONE_YEAR: i64 = 365;
const TWO_YEARS: i64 = 2 * 365;
const FOUR_YEARS: i64 = 4 * 365;
