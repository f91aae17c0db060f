//! Runtime configuration sourced from the environment.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{HealthError, Result};

/// Default update-center document.
pub const DEFAULT_UPDATE_CENTER_URL: &str =
    "https://updates.jenkins.io/current/update-center.actual.json";
/// Default documentation-links document.
pub const DEFAULT_DOCUMENTATION_URL: &str =
    "https://updates.jenkins.io/plugin-documentation-urls.json";
/// Default hosting API endpoint.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
/// Default Jira server holding plugin issues.
pub const DEFAULT_JIRA_URL: &str = "https://issues.jenkins.io";

/// Settings shared by the collaborator clients.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthConfig {
    /// Update-center JSON document.
    pub update_center_url: String,
    /// Documentation-links JSON document.
    pub documentation_url: String,
    /// Hosting API base URL.
    pub github_api_url: String,
    /// Hosting API token.
    pub github_token: Option<String>,
    /// Jira server base URL.
    pub jira_url: String,
    /// User agent sent with every HTTP request.
    pub user_agent: String,
    /// Directory under which repositories are cloned for a pass.
    pub workspace: PathBuf,
    /// Time budget of one HTTP request.
    pub http_timeout: Duration,
    /// Time budget of one git command.
    pub git_timeout: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            update_center_url: DEFAULT_UPDATE_CENTER_URL.to_string(),
            documentation_url: DEFAULT_DOCUMENTATION_URL.to_string(),
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            github_token: None,
            jira_url: DEFAULT_JIRA_URL.to_string(),
            user_agent: "plugin-health".to_string(),
            workspace: std::env::temp_dir().join("plugin-health"),
            http_timeout: Duration::from_secs(30),
            git_timeout: Duration::from_secs(300),
        }
    }
}

impl HealthConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let value = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Ok(Self {
            update_center_url: value("PLUGIN_HEALTH_UPDATE_CENTER_URL")
                .unwrap_or(defaults.update_center_url),
            documentation_url: value("PLUGIN_HEALTH_DOCUMENTATION_URL")
                .unwrap_or(defaults.documentation_url),
            github_api_url: value("GITHUB_API_URL").unwrap_or(defaults.github_api_url),
            github_token: value("GITHUB_TOKEN"),
            jira_url: value("PLUGIN_HEALTH_JIRA_URL").unwrap_or(defaults.jira_url),
            user_agent: value("GITHUB_USER_AGENT").unwrap_or(defaults.user_agent),
            workspace: value("PLUGIN_HEALTH_WORKSPACE")
                .map(PathBuf::from)
                .unwrap_or(defaults.workspace),
            http_timeout: seconds(
                "PLUGIN_HEALTH_HTTP_TIMEOUT_SECS",
                value("PLUGIN_HEALTH_HTTP_TIMEOUT_SECS"),
            )?
            .unwrap_or(defaults.http_timeout),
            git_timeout: seconds(
                "PLUGIN_HEALTH_GIT_TIMEOUT_SECS",
                value("PLUGIN_HEALTH_GIT_TIMEOUT_SECS"),
            )?
            .unwrap_or(defaults.git_timeout),
        })
    }
}

fn seconds(key: &str, raw: Option<String>) -> Result<Option<Duration>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|_| HealthError::Config(format!("{key} must be a number of seconds, got {raw:?}")))?;
    if secs == 0 {
        return Err(HealthError::Config(format!("{key} must be greater than zero")));
    }
    Ok(Some(Duration::from_secs(secs)))
}
