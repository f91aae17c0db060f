//! Report formatting utilities for pass and score outputs.

use std::fmt::Write;

use serde::Serialize;

use crate::engine::{PassReport, ProbeDescription, outcomes_by_status};
use crate::result::ResultStatus;
use crate::score::{Score, ScoringDescription};

/// Render pass reports as Markdown.
pub fn render_pass_markdown(reports: &[PassReport]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# Plugin Health Pass Report\n");
    for report in reports {
        let _ = writeln!(output, "## {}\n", report.plugin);
        if let Some(failure) = &report.failure {
            let _ = writeln!(output, "- Status: failed ({failure})\n");
            continue;
        }
        let _ = writeln!(
            output,
            "- Duration: {}ms",
            (report.finished_at - report.started_at).num_milliseconds()
        );
        let _ = writeln!(output, "- Probes: {}\n", summary(report));
        for (status, keys) in outcomes_by_status(report) {
            let items: Vec<String> = keys.iter().map(|key| format!("`{key}`")).collect();
            append_list(&mut output, status, &items, "None.");
        }
    }
    output
}

/// Render pass reports as plain text, one line per plugin.
pub fn render_pass_text(reports: &[PassReport]) -> String {
    let mut output = String::new();
    for report in reports {
        match &report.failure {
            Some(failure) => {
                let _ = writeln!(output, "{}: failed ({failure})", report.plugin);
            }
            None => {
                let _ = writeln!(output, "{}: {}", report.plugin, summary(report));
                let errors = outcomes_by_status(report);
                if let Some(keys) = errors.get(ResultStatus::Error.label()) {
                    let _ = writeln!(output, "  errors: {}", keys.join(", "));
                }
            }
        }
    }
    output
}

/// Render scores as Markdown, with every component reason and resolution.
pub fn render_score_markdown(scores: &[Score]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# Plugin Health Score Report\n");
    for score in scores {
        let _ = writeln!(output, "## {} ({}/100)\n", score.plugin, score.value);
        let _ = writeln!(output, "- Computed: {}\n", score.computed_at.to_rfc3339());
        for detail in &score.details {
            let _ = writeln!(
                output,
                "### {} ({}/100, weight {}, v{})",
                detail.key, detail.value, detail.weight, detail.version
            );
            for component in &detail.components {
                let _ = writeln!(
                    output,
                    "- {} (score {}, weight {})",
                    component.reasons.join(" "),
                    component.score,
                    component.weight
                );
                for resolution in &component.resolutions {
                    let _ = writeln!(output, "  - [{}]({})", resolution.text, resolution.link);
                }
            }
            let _ = writeln!(output);
        }
    }
    output
}

/// Render scores as plain text, one line per plugin.
pub fn render_score_text(scores: &[Score]) -> String {
    let mut output = String::new();
    for score in scores {
        let categories: Vec<String> = score
            .details
            .iter()
            .map(|detail| format!("{}={}", detail.key, detail.value))
            .collect();
        let _ = writeln!(output, "{}: {} ({})", score.plugin, score.value, categories.join(", "));
    }
    output
}

/// Render probe descriptions as plain text, in execution order.
pub fn render_probe_list(probes: &[ProbeDescription]) -> String {
    let mut output = String::new();
    for probe in probes {
        let mut traits = Vec::new();
        if probe.requires_release {
            traits.push("release".to_string());
        }
        if probe.source_code_related {
            traits.push("source".to_string());
        }
        if !probe.requirements.is_empty() {
            traits.push(format!("requires {}", probe.requirements.join(", ")));
        }
        let _ = writeln!(output, "{} (v{}): {}", probe.key, probe.schema_version, probe.description);
        if !traits.is_empty() {
            let _ = writeln!(output, "  {}", traits.join("; "));
        }
    }
    output
}

/// Render scoring descriptions as plain text.
pub fn render_scoring_list(scorings: &[ScoringDescription]) -> String {
    let mut output = String::new();
    for scoring in scorings {
        let _ = writeln!(
            output,
            "{} (v{}, weight {}): {}",
            scoring.key, scoring.version, scoring.weight, scoring.description
        );
        for component in &scoring.components {
            let _ = writeln!(output, "  - {} (weight {})", component.description, component.weight);
        }
    }
    output
}

/// Render any serializable report payload as JSON.
pub fn render_json<T: Serialize + ?Sized>(payload: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(payload)
}

fn summary(report: &PassReport) -> String {
    [
        ResultStatus::Success,
        ResultStatus::Failure,
        ResultStatus::Error,
        ResultStatus::Skipped,
    ]
    .into_iter()
    .map(|status| format!("{} {}", report.count(status), status.label().to_lowercase()))
    .collect::<Vec<_>>()
    .join(", ")
}

fn append_list(output: &mut String, title: &str, items: &[String], empty_message: &str) {
    if items.is_empty() {
        let _ = writeln!(output, "### {title}\n{empty_message}\n");
        return;
    }
    let _ = writeln!(output, "### {title}");
    for item in items {
        let _ = writeln!(output, "- {item}");
    }
    let _ = writeln!(output);
}
