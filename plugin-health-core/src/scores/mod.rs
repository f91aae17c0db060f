//! Scorings shipped with the crate.

use crate::plugin::ProbeResults;
use crate::scoring::{ComponentResult, Resolution, Scoring, usable};

mod build;
mod documentation;
mod repository;
mod security;
mod update_center;

pub use build::build_configuration;
pub use documentation::documentation;
pub use repository::repository_configuration;
pub use security::security;
pub use update_center::{adoption, deprecation, publication};

/// Every scoring shipped with the crate.
pub fn default_scorings() -> Vec<Box<dyn Scoring>> {
    vec![
        Box::new(publication()),
        Box::new(deprecation()),
        Box::new(adoption()),
        Box::new(repository_configuration()),
        Box::new(documentation()),
        Box::new(build_configuration()),
        Box::new(security()),
    ]
}

/// Full score on SUCCESS, zero on FAILURE.
///
/// A missing or ERROR result is not held against the plugin: it yields a
/// zero-weight entry that only carries the reason.
pub(crate) fn verdict(
    results: &ProbeResults,
    key: &str,
    weight: u32,
    passed: &str,
    failed: &str,
) -> ComponentResult {
    match usable(results, key) {
        Some(result) if result.is_success() => ComponentResult::new(100, weight, passed),
        Some(result) => ComponentResult::new(0, weight, failed).with_reason(result.message_text()),
        None => ComponentResult::new(0, 0, format!("The {key} probe has no usable result.")),
    }
}

/// [`verdict`] with a resolution attached when the plugin does not pass.
pub(crate) fn verdict_with_help(
    results: &ProbeResults,
    key: &str,
    weight: u32,
    messages: (&str, &str),
    help: (&str, &str),
) -> ComponentResult {
    let result = verdict(results, key, weight, messages.0, messages.1);
    if result.score >= 100 {
        return result;
    }
    result.with_resolution(Resolution::new(help.0, help.1))
}
