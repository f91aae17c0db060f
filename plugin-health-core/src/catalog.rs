//! Update-center snapshot and documentation links.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::HealthConfig;
use crate::error::{HealthError, Result};
use crate::http::{build_client, decode_json, request_error};

/// Plugin name to external documentation URL.
pub type DocumentationLinks = BTreeMap<String, String>;

/// Read-only registry data about every published plugin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    /// Published plugins by name.
    #[serde(default)]
    pub plugins: BTreeMap<String, CatalogPlugin>,
    /// Deprecation notices by plugin name.
    #[serde(default)]
    pub deprecations: BTreeMap<String, Deprecation>,
    /// Published security warnings, for plugins and core alike.
    #[serde(default)]
    pub warnings: Vec<SecurityWarning>,
}

/// One plugin entry of the update-center.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPlugin {
    /// Plugin identifier.
    pub name: String,
    /// Latest published version.
    #[serde(default)]
    pub version: Option<String>,
    /// Source repository URL.
    #[serde(default)]
    pub scm: Option<String>,
    /// Time of the latest release.
    #[serde(default)]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub release_timestamp: Option<DateTime<Utc>>,
    /// Update-center labels.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Install count based popularity.
    #[serde(default)]
    pub popularity: u64,
    /// Default branch of the source repository.
    #[serde(default)]
    pub default_branch: Option<String>,
    /// Issue trackers declared by the plugin.
    #[serde(default)]
    pub issue_trackers: Vec<IssueTracker>,
}

impl CatalogPlugin {
    /// Whether the plugin carries a label.
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|candidate| candidate == label)
    }
}

/// Issue tracker reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueTracker {
    /// Tracker kind, e.g. `github` or `jira`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Where issues can be browsed.
    #[serde(default)]
    pub view_url: Option<String>,
    /// Where issues can be reported.
    #[serde(default)]
    pub report_url: Option<String>,
}

/// Security advisory entry of the update-center.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SecurityWarning {
    /// Advisory id, e.g. `SECURITY-2650`.
    pub id: String,
    /// Affected component name.
    pub name: String,
    /// `plugin` or `core`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Advisory page.
    #[serde(default)]
    pub url: Option<String>,
    /// Affected version ranges.
    #[serde(default)]
    pub versions: Vec<SecurityWarningVersion>,
}

/// Version range covered by a [`SecurityWarning`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecurityWarningVersion {
    /// Last affected version, when the advisory names one.
    #[serde(default)]
    pub last_version: Option<String>,
    /// Regular expression matching every affected version.
    pub pattern: String,
}

impl SecurityWarning {
    /// Whether `version` of the warned component is affected.
    ///
    /// Patterns must match the whole version string.
    pub fn affects(&self, version: &str) -> Result<bool> {
        for range in &self.versions {
            let pattern = Regex::new(&format!("^(?:{})$", range.pattern)).map_err(|err| {
                HealthError::Other(format!(
                    "{} has an invalid version pattern {:?}: {err}",
                    self.id, range.pattern
                ))
            })?;
            if pattern.is_match(version) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Deprecation notice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Deprecation {
    /// Page explaining the deprecation.
    pub url: String,
}

impl Catalog {
    /// Parse an update-center JSON document.
    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Load an update-center JSON document from disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Entry of a published plugin.
    pub fn plugin(&self, name: &str) -> Option<&CatalogPlugin> {
        self.plugins.get(name)
    }

    /// Deprecation notice of a plugin.
    pub fn deprecation(&self, name: &str) -> Option<&Deprecation> {
        self.deprecations.get(name)
    }

    /// Plugin warnings affecting `version` of plugin `name`.
    pub fn active_warnings(&self, name: &str, version: &str) -> Result<Vec<&SecurityWarning>> {
        let mut active = Vec::new();
        for warning in self
            .warnings
            .iter()
            .filter(|warning| warning.kind == "plugin" && warning.name == name)
        {
            if warning.affects(version)? {
                active.push(warning);
            }
        }
        Ok(active)
    }
}

#[derive(Debug, Deserialize)]
struct DocumentationEntry {
    url: Option<String>,
}

/// Parse the documentation-links JSON document (`{"name": {"url": "..."}}`).
///
/// Entries without a URL are dropped.
pub fn parse_documentation_links(contents: &str) -> Result<DocumentationLinks> {
    Ok(into_links(serde_json::from_str(contents)?))
}

fn into_links(entries: BTreeMap<String, DocumentationEntry>) -> DocumentationLinks {
    entries
        .into_iter()
        .filter_map(|(name, entry)| entry.url.map(|url| (name, url)))
        .collect()
}

/// Load the documentation-links JSON document from disk.
pub fn load_documentation_links(path: &Path) -> Result<DocumentationLinks> {
    parse_documentation_links(&std::fs::read_to_string(path)?)
}

/// HTTP client for the update-center and documentation documents.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    update_center_url: String,
    documentation_url: String,
}

impl CatalogClient {
    /// Build a client from configuration.
    pub fn new(config: &HealthConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.http_timeout, &config.user_agent)?,
            update_center_url: config.update_center_url.clone(),
            documentation_url: config.documentation_url.clone(),
        })
    }

    /// Download the update-center snapshot.
    pub fn fetch_catalog(&self) -> Result<Catalog> {
        let response = self
            .client
            .get(&self.update_center_url)
            .send()
            .map_err(|err| request_error("update-center", err))?;
        decode_json("update-center", response)
    }

    /// Download the documentation-links table.
    pub fn fetch_documentation_links(&self) -> Result<DocumentationLinks> {
        let response = self
            .client
            .get(&self.documentation_url)
            .send()
            .map_err(|err| request_error("documentation", err))?;
        Ok(into_links(decode_json("documentation", response)?))
    }
}
