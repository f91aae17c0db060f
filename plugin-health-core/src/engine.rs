//! Ordered execution of probes over one plugin.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::context::ProbeContext;
use crate::error::{HealthError, Result};
use crate::plugin::Plugin;
use crate::probe::Probe;
use crate::result::ResultStatus;

/// Outcome of one probe within a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProbeOutcome {
    /// Probe key.
    pub key: String,
    /// Status of the result returned by the probe.
    pub status: ResultStatus,
}

/// Summary of one pass over a plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PassReport {
    /// Plugin name.
    pub plugin: String,
    /// When the pass started.
    #[schema(value_type = String, format = DateTime)]
    pub started_at: DateTime<Utc>,
    /// When the pass finished.
    #[schema(value_type = String, format = DateTime)]
    pub finished_at: DateTime<Utc>,
    /// One entry per probe, in execution order.
    pub outcomes: Vec<ProbeOutcome>,
    /// Failure that prevented the pass from running at all.
    #[serde(default)]
    pub failure: Option<String>,
}

impl PassReport {
    /// Report for a pass that could not run.
    pub fn failed(plugin: impl Into<String>, error: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            plugin: plugin.into(),
            started_at: now,
            finished_at: now,
            outcomes: Vec::new(),
            failure: Some(error.into()),
        }
    }

    /// Number of probes that returned a given status.
    pub fn count(&self, status: ResultStatus) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status == status)
            .count()
    }
}

/// Runs a fixed set of probes in dependency order.
pub struct ProbeEngine {
    probes: Vec<Arc<dyn Probe>>,
}

impl ProbeEngine {
    /// Build an engine, ordering probes so every requirement runs before its dependents.
    ///
    /// Registration order breaks ties. Duplicate keys, requirements on unknown
    /// keys and dependency cycles are rejected.
    pub fn new(probes: Vec<Arc<dyn Probe>>) -> Result<Self> {
        let mut keys = BTreeSet::new();
        for probe in &probes {
            if !keys.insert(probe.key().to_string()) {
                return Err(HealthError::Config(format!(
                    "duplicate probe key {}",
                    probe.key()
                )));
            }
        }
        for probe in &probes {
            if let Some(missing) = probe
                .requirements()
                .iter()
                .find(|requirement| !keys.contains(**requirement))
            {
                return Err(HealthError::Config(format!(
                    "probe {} requires unknown probe {missing}",
                    probe.key()
                )));
            }
        }

        let mut pending = probes;
        let mut ordered: Vec<Arc<dyn Probe>> = Vec::with_capacity(pending.len());
        let mut placed: BTreeSet<String> = BTreeSet::new();
        while !pending.is_empty() {
            let ready = pending.iter().position(|probe| {
                probe
                    .requirements()
                    .iter()
                    .all(|requirement| placed.contains(*requirement))
            });
            let Some(index) = ready else {
                let stuck: Vec<&str> = pending.iter().map(|probe| probe.key()).collect();
                return Err(HealthError::Config(format!(
                    "probe requirements form a cycle among {}",
                    stuck.join(", ")
                )));
            };
            let probe = pending.remove(index);
            placed.insert(probe.key().to_string());
            ordered.push(probe);
        }

        Ok(Self { probes: ordered })
    }

    /// Probes in execution order.
    pub fn probes(&self) -> &[Arc<dyn Probe>] {
        &self.probes
    }

    /// Execution order as probe keys.
    pub fn execution_order(&self) -> Vec<&str> {
        self.probes.iter().map(|probe| probe.key()).collect()
    }

    /// Run every probe once over `plugin`, merging SUCCESS and FAILURE results into it.
    ///
    /// SKIPPED and ERROR results only show up in the report, so the previous
    /// verdict of a probe survives a pass where it could not be evaluated.
    pub fn run_pass(&self, plugin: &mut Plugin, context: &mut ProbeContext) -> PassReport {
        let started_at = Utc::now();
        let mut outcomes = Vec::with_capacity(self.probes.len());

        for probe in &self.probes {
            let result = probe.apply(plugin, context);
            let status = result.status();
            match status {
                ResultStatus::Skipped => {
                    debug!("{} skipped on {}", probe.key(), plugin.name);
                }
                ResultStatus::Error => {
                    warn!(
                        "{} could not evaluate {}: {}",
                        probe.key(),
                        plugin.name,
                        result.message_text()
                    );
                }
                ResultStatus::Success | ResultStatus::Failure => {
                    debug!("{} on {}: {}", probe.key(), plugin.name, status.label());
                    plugin.record(result);
                }
            }
            outcomes.push(ProbeOutcome {
                key: probe.key().to_string(),
                status,
            });
        }

        let report = PassReport {
            plugin: plugin.name.clone(),
            started_at,
            finished_at: Utc::now(),
            outcomes,
            failure: None,
        };
        info!(
            "pass over {} finished: {} success, {} failure, {} error, {} skipped",
            plugin.name,
            report.count(ResultStatus::Success),
            report.count(ResultStatus::Failure),
            report.count(ResultStatus::Error),
            report.count(ResultStatus::Skipped)
        );
        report
    }

    /// Run a pass and consume the context, releasing any checkout it holds.
    pub fn run(&self, mut plugin: Plugin, mut context: ProbeContext) -> (Plugin, PassReport) {
        let report = self.run_pass(&mut plugin, &mut context);
        drop(context);
        (plugin, report)
    }

    /// Static traits of every probe, keyed for listing.
    pub fn describe(&self) -> Vec<ProbeDescription> {
        self.probes
            .iter()
            .map(|probe| ProbeDescription {
                key: probe.key().to_string(),
                description: probe.description().to_string(),
                schema_version: probe.schema_version(),
                requires_release: probe.requires_release(),
                source_code_related: probe.is_source_code_related(),
                requirements: probe
                    .requirements()
                    .iter()
                    .map(|key| key.to_string())
                    .collect(),
            })
            .collect()
    }
}

/// Static traits of a probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProbeDescription {
    /// Probe key.
    pub key: String,
    /// Human-readable purpose.
    pub description: String,
    /// Version of the check logic.
    pub schema_version: u32,
    /// Only a new release can change the outcome.
    pub requires_release: bool,
    /// Only a new commit can change the outcome.
    pub source_code_related: bool,
    /// Probes that must succeed first.
    pub requirements: Vec<String>,
}

/// Group a list of outcomes by status, for summaries.
pub fn outcomes_by_status(report: &PassReport) -> BTreeMap<&'static str, Vec<&str>> {
    let mut grouped: BTreeMap<&'static str, Vec<&str>> = BTreeMap::new();
    for outcome in &report.outcomes {
        grouped
            .entry(outcome.status.label())
            .or_default()
            .push(outcome.key.as_str());
    }
    grouped
}
