//! Hosting-platform API capability and its GitHub implementation.

use log::warn;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, LINK};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::HealthConfig;
use crate::error::{HealthError, Result};
use crate::http::{build_client, decode_json, request_error};

/// Repository metadata exposed by the hosting platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// `owner/name` of the repository.
    pub name: String,
    /// Whether the repository is read-only.
    pub archived: bool,
    /// Default branch.
    pub default_branch: String,
    /// Open issues, as counted by the platform.
    #[serde(default)]
    pub open_issues_count: u64,
}

/// An open pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// Pull request number.
    pub number: u64,
    /// Title.
    pub title: String,
    /// Login of the author.
    pub author: String,
    /// Label names.
    pub labels: Vec<String>,
    /// Whether the pull request is a draft.
    pub draft: bool,
}

/// A check run reported on a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRun {
    /// Check name.
    pub name: String,
    /// `queued`, `in_progress` or `completed`.
    pub status: String,
    /// Outcome of a completed run.
    pub conclusion: Option<String>,
}

impl CheckRun {
    /// Whether the run has finished.
    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }

    /// Whether the run finished without failing.
    pub fn is_passing(&self) -> bool {
        matches!(
            self.conclusion.as_deref(),
            Some("success") | Some("neutral") | Some("skipped")
        )
    }
}

/// Host serving the repositories [`GitHubApiClient`] can query.
pub const GITHUB_HOST: &str = "github.com";

/// Upper bound on followed `Link: rel="next"` pages per listing.
const MAX_PAGES: usize = 50;

/// Read access to the hosting platform.
#[cfg_attr(test, mockall::automock)]
pub trait HostingClient: Send + Sync {
    /// Fetch repository metadata for `owner/name`.
    fn repository(&self, name: &str) -> Result<Repository>;
    /// List the open pull requests of a repository.
    fn pull_requests(&self, name: &str) -> Result<Vec<PullRequest>>;
    /// List the check runs reported on a branch, tag or commit.
    fn check_runs(&self, name: &str, git_ref: &str) -> Result<Vec<CheckRun>>;
}

/// GitHub REST API client.
#[derive(Debug, Clone)]
pub struct GitHubApiClient {
    base_url: String,
    token: Option<String>,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ApiRepository {
    full_name: String,
    #[serde(default)]
    archived: bool,
    default_branch: String,
    #[serde(default)]
    open_issues_count: u64,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct ApiLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiPullRequest {
    number: u64,
    title: String,
    user: Option<ApiUser>,
    #[serde(default)]
    labels: Vec<ApiLabel>,
    #[serde(default)]
    draft: bool,
}

#[derive(Debug, Deserialize)]
struct ApiCheckRuns {
    check_runs: Vec<ApiCheckRun>,
}

#[derive(Debug, Deserialize)]
struct ApiCheckRun {
    name: String,
    status: String,
    conclusion: Option<String>,
}

impl GitHubApiClient {
    /// Build a GitHub API client from configuration.
    pub fn new(config: &HealthConfig) -> Result<Self> {
        Ok(Self {
            base_url: config.github_api_url.trim_end_matches('/').to_string(),
            token: config.github_token.clone(),
            client: build_client(config.http_timeout, &config.user_agent)?,
        })
    }

    fn send(&self, url: &str) -> Result<Response> {
        let mut request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request.send().map_err(|err| request_error("github", err))
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(&format!("{}{path}", self.base_url))?;
        decode_json("github", response)
    }

    /// Collect every page of a listing by following the `Link` header.
    fn get_all<P: DeserializeOwned, T>(&self, path: &str, items: impl Fn(P) -> Vec<T>) -> Result<Vec<T>> {
        let mut url = format!("{}{path}", self.base_url);
        let mut collected = Vec::new();
        for _ in 0..MAX_PAGES {
            let response = self.send(&url)?;
            let next = next_page(response.headers());
            collected.extend(items(decode_json("github", response)?));
            match next {
                Some(next) => url = next,
                None => return Ok(collected),
            }
        }
        warn!("stopped listing {path} after {MAX_PAGES} pages");
        Ok(collected)
    }
}

/// Target of the `rel="next"` entry of a `Link` header.
fn next_page(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;
    link.split(',').find_map(|entry| {
        let (target, params) = entry.split_once(';')?;
        params
            .split(';')
            .any(|param| param.trim() == "rel=\"next\"")
            .then(|| {
                target
                    .trim()
                    .trim_start_matches('<')
                    .trim_end_matches('>')
                    .to_string()
            })
    })
}

impl HostingClient for GitHubApiClient {
    fn repository(&self, name: &str) -> Result<Repository> {
        validate_repository_name(name)?;
        let repository: ApiRepository = self.get(&format!("/repos/{name}"))?;
        Ok(Repository {
            name: repository.full_name,
            archived: repository.archived,
            default_branch: repository.default_branch,
            open_issues_count: repository.open_issues_count,
        })
    }

    fn pull_requests(&self, name: &str) -> Result<Vec<PullRequest>> {
        validate_repository_name(name)?;
        let pulls: Vec<ApiPullRequest> = self.get_all(
            &format!("/repos/{name}/pulls?state=open&per_page=100"),
            |page: Vec<ApiPullRequest>| page,
        )?;
        Ok(pulls
            .into_iter()
            .map(|pull| PullRequest {
                number: pull.number,
                title: pull.title,
                author: pull.user.map(|user| user.login).unwrap_or_default(),
                labels: pull.labels.into_iter().map(|label| label.name).collect(),
                draft: pull.draft,
            })
            .collect())
    }

    fn check_runs(&self, name: &str, git_ref: &str) -> Result<Vec<CheckRun>> {
        validate_repository_name(name)?;
        let runs: Vec<ApiCheckRun> = self.get_all(
            &format!("/repos/{name}/commits/{git_ref}/check-runs?per_page=100"),
            |page: ApiCheckRuns| page.check_runs,
        )?;
        Ok(runs
            .into_iter()
            .map(|run| CheckRun {
                name: run.name,
                status: run.status,
                conclusion: run.conclusion,
            })
            .collect())
    }
}

fn validate_repository_name(name: &str) -> Result<()> {
    let mut parts = name.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty() => Ok(()),
        _ => Err(HealthError::Other(format!(
            "invalid repository name {name:?}, expected owner/name"
        ))),
    }
}
