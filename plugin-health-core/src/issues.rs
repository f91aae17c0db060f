//! Issue-tracker capability and its Jira implementation.

use reqwest::Url;
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::config::HealthConfig;
use crate::error::{HealthError, Result};
use crate::http::{build_client, decode_json, request_error};

/// Read access to issue trackers other than the hosting platform.
#[cfg_attr(test, mockall::automock)]
pub trait IssueTrackerClient: Send + Sync {
    /// Count the open issues behind a Jira `view_url` carrying a `jql` query.
    fn open_jira_issues(&self, view_url: &str) -> Result<u64>;
}

/// Jira REST API client.
#[derive(Debug, Clone)]
pub struct JiraApiClient {
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    error_messages: Vec<String>,
}

impl JiraApiClient {
    /// Build a Jira client from configuration.
    pub fn new(config: &HealthConfig) -> Result<Self> {
        Ok(Self {
            base_url: config.jira_url.trim_end_matches('/').to_string(),
            client: build_client(config.http_timeout, &config.user_agent)?,
        })
    }
}

impl IssueTrackerClient for JiraApiClient {
    fn open_jira_issues(&self, view_url: &str) -> Result<u64> {
        let jql = jql_of(view_url)?;
        let response = self
            .client
            .get(format!("{}/rest/api/latest/search", self.base_url))
            .query(&[
                ("jql", format!("{jql} AND status=open")),
                ("maxResults", "0".to_string()),
            ])
            .send()
            .map_err(|err| request_error("jira", err))?;
        let search: SearchResponse = decode_json("jira", response)?;
        if !search.error_messages.is_empty() {
            return Err(HealthError::Http(format!(
                "jira api error: {}",
                search.error_messages.join(" ")
            )));
        }
        search
            .total
            .ok_or_else(|| HealthError::Http("jira search response has no total".to_string()))
    }
}

fn jql_of(view_url: &str) -> Result<String> {
    let url = Url::parse(view_url)
        .map_err(|err| HealthError::Other(format!("invalid issue tracker URL {view_url}: {err}")))?;
    url.query_pairs()
        .find(|(name, _)| name == "jql")
        .map(|(_, jql)| jql.into_owned())
        .filter(|jql| !jql.trim().is_empty())
        .ok_or_else(|| HealthError::Other(format!("issue tracker URL {view_url} has no jql query")))
}
