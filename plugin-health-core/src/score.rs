//! Overall plugin score combining every category.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{HealthError, Result};
use crate::plugin::Plugin;
use crate::scores::default_scorings;
use crate::scoring::{ScoreResult, Scoring, weighted_value};

/// Overall score of a plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    /// Plugin name.
    pub plugin: String,
    /// Category values reduced by category weight, 0 to 100.
    pub value: u8,
    /// When the score was computed.
    #[schema(value_type = String, format = DateTime)]
    pub computed_at: DateTime<Utc>,
    /// Category scores, in scoring registration order.
    pub details: Vec<ScoreResult>,
}

impl Score {
    /// Category score by key.
    pub fn detail(&self, key: &str) -> Option<&ScoreResult> {
        self.details.iter().find(|detail| detail.key == key)
    }
}

/// Static description of a scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoringDescription {
    /// Scoring key.
    pub key: String,
    /// Human-readable purpose.
    pub description: String,
    /// Category weight.
    pub weight: f32,
    /// Scoring version.
    pub version: u32,
    /// Components in evaluation order.
    pub components: Vec<ComponentDescription>,
}

/// Static description of a scoring component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ComponentDescription {
    /// What the component judges.
    pub description: String,
    /// Declared weight.
    pub weight: u32,
}

/// Applies every registered scoring to a plugin.
pub struct ScoringService {
    scorings: Vec<Box<dyn Scoring>>,
}

impl ScoringService {
    /// Create a service; scoring keys must be unique.
    pub fn new(scorings: Vec<Box<dyn Scoring>>) -> Result<Self> {
        let mut keys = BTreeSet::new();
        for scoring in &scorings {
            if !keys.insert(scoring.key().to_string()) {
                return Err(HealthError::Config(format!(
                    "scoring {} is registered twice",
                    scoring.key()
                )));
            }
        }
        Ok(Self { scorings })
    }

    /// Service with every scoring shipped with the crate.
    pub fn with_default_scorings() -> Self {
        Self {
            scorings: default_scorings(),
        }
    }

    /// Registered scorings.
    pub fn scorings(&self) -> &[Box<dyn Scoring>] {
        &self.scorings
    }

    /// Score `plugin` from its stored results.
    pub fn score(&self, plugin: &Plugin) -> Score {
        let details: Vec<ScoreResult> = self
            .scorings
            .iter()
            .map(|scoring| scoring.apply(plugin))
            .collect();
        let value = weighted_value(
            details
                .iter()
                .map(|detail| (f64::from(detail.value), f64::from(detail.weight))),
        );
        debug!("{} scored {value} over {} categories", plugin.name, details.len());
        Score {
            plugin: plugin.name.clone(),
            value,
            computed_at: Utc::now(),
            details,
        }
    }

    /// Describe every registered scoring.
    pub fn describe(&self) -> Vec<ScoringDescription> {
        self.scorings
            .iter()
            .map(|scoring| ScoringDescription {
                key: scoring.key().to_string(),
                description: scoring.description().to_string(),
                weight: scoring.weight(),
                version: scoring.version(),
                components: scoring
                    .components()
                    .iter()
                    .map(|component| ComponentDescription {
                        description: component.description().to_string(),
                        weight: component.weight(),
                    })
                    .collect(),
            })
            .collect()
    }
}
