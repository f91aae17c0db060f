//! Plugin records and their accumulated probe results.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::result::ProbeResult;

/// Probe key to latest result.
pub type ProbeResults = BTreeMap<String, ProbeResult>;

/// A plugin and the latest result of every probe run against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Plugin {
    /// Stable plugin identifier.
    pub name: String,
    /// Latest released version, when known.
    #[serde(default)]
    pub version: Option<String>,
    /// Source repository URL.
    #[serde(default)]
    pub scm: Option<String>,
    /// Time of the latest release.
    #[serde(default)]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub release_timestamp: Option<DateTime<Utc>>,
    /// Latest result per probe key.
    #[serde(default)]
    #[schema(value_type = Object)]
    results: ProbeResults,
}

impl Plugin {
    /// Create a plugin with no metadata and no results.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            scm: None,
            release_timestamp: None,
            results: ProbeResults::new(),
        }
    }

    /// Set the source repository URL.
    pub fn with_scm(mut self, scm: impl Into<String>) -> Self {
        self.scm = Some(scm.into());
        self
    }

    /// Set the release metadata.
    pub fn with_release(mut self, version: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        self.version = Some(version.into());
        self.release_timestamp = Some(timestamp);
        self
    }

    /// Latest result for a probe key.
    pub fn result(&self, key: &str) -> Option<&ProbeResult> {
        self.results.get(key)
    }

    /// All latest results.
    pub fn results(&self) -> &ProbeResults {
        &self.results
    }

    /// Store a result, replacing any previous one for the same key.
    pub fn record(&mut self, result: ProbeResult) -> Option<ProbeResult> {
        self.results.insert(result.id().to_string(), result)
    }
}
