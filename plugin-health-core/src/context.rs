//! Per-plugin, per-pass discovery cache shared by probes.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use uuid::Uuid;

use crate::catalog::{Catalog, DocumentationLinks};
use crate::config::HealthConfig;
use crate::descriptor::{DescriptorReader, PomReader};
use crate::error::{HealthError, Result};
use crate::fs::{FileSystem, StdFileSystem};
use crate::hosting::{GitHubApiClient, HostingClient};
use crate::issues::{IssueTrackerClient, JiraApiClient};
use crate::plugin::Plugin;
use crate::scm::{GitCommandClient, ScmLink, SourceControl};

/// External capabilities a pass may call.
#[derive(Clone)]
pub struct Collaborators {
    /// Hosting-platform API.
    pub hosting: Arc<dyn HostingClient>,
    /// Local git operations.
    pub scm: Arc<dyn SourceControl>,
    /// Build-descriptor parser.
    pub descriptors: Arc<dyn DescriptorReader>,
    /// Filesystem access for repository probes.
    pub file_system: Arc<dyn FileSystem>,
    /// Issue trackers other than the hosting platform.
    pub issues: Arc<dyn IssueTrackerClient>,
}

impl Collaborators {
    /// Production collaborators built from configuration.
    pub fn from_config(config: &HealthConfig) -> Result<Self> {
        Ok(Self {
            hosting: Arc::new(GitHubApiClient::new(config)?),
            scm: Arc::new(GitCommandClient::new(config.git_timeout)),
            descriptors: Arc::new(PomReader::new()),
            file_system: Arc::new(StdFileSystem::new()),
            issues: Arc::new(JiraApiClient::new(config)?),
        })
    }
}

/// Creates one [`ProbeContext`] per plugin pass from shared, read-only inputs.
#[derive(Clone)]
pub struct ContextFactory {
    collaborators: Collaborators,
    catalog: Arc<Catalog>,
    documentation_links: Option<Arc<DocumentationLinks>>,
    workspace: PathBuf,
}

impl ContextFactory {
    /// Create a factory; clones land in unique directories under `workspace`.
    pub fn new(collaborators: Collaborators, catalog: Catalog, workspace: impl Into<PathBuf>) -> Self {
        Self {
            collaborators,
            catalog: Arc::new(catalog),
            documentation_links: None,
            workspace: workspace.into(),
        }
    }

    /// Attach the documentation-link table published into every context.
    pub fn with_documentation_links(mut self, links: DocumentationLinks) -> Self {
        self.documentation_links = Some(Arc::new(links));
        self
    }

    /// The catalog snapshot shared by every context.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Fresh context for one pass over `plugin`.
    ///
    /// Facts derivable from the plugin's SCM URL are published up front so
    /// probes that skip this pass do not leave them unknown.
    pub fn context_for(&self, plugin: &Plugin) -> ProbeContext {
        let mut context = ProbeContext {
            plugin_name: plugin.name.clone(),
            collaborators: self.collaborators.clone(),
            catalog: self.catalog.clone(),
            workspace: self.workspace.clone(),
            repository: None,
            sub_folder: None,
            repository_name: None,
            last_commit_date: None,
            documentation_links: self.documentation_links.clone(),
            issue_trackers: None,
        };
        if let Some(link) = plugin.scm.as_deref().and_then(ScmLink::parse) {
            context.repository_name = Some(link.repository);
            context.sub_folder = link.sub_folder;
        }
        context
    }
}

/// A checked-out repository; managed checkouts are deleted on drop.
#[derive(Debug)]
struct Checkout {
    path: PathBuf,
    managed: bool,
}

impl Drop for Checkout {
    fn drop(&mut self) {
        if !self.managed || !self.path.exists() {
            return;
        }
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!("removed checkout {}", self.path.display()),
            Err(err) => warn!("failed to remove checkout {}: {err}", self.path.display()),
        }
    }
}

/// Mutable scratch space of one plugin pass.
///
/// Every optional field is publish-once: setting the same value again is a
/// no-op, setting a different value fails with [`HealthError::Conflict`].
pub struct ProbeContext {
    plugin_name: String,
    collaborators: Collaborators,
    catalog: Arc<Catalog>,
    workspace: PathBuf,
    repository: Option<Checkout>,
    sub_folder: Option<PathBuf>,
    repository_name: Option<String>,
    last_commit_date: Option<DateTime<Utc>>,
    documentation_links: Option<Arc<DocumentationLinks>>,
    issue_trackers: Option<IssueTrackers>,
}

/// Issue tracker kind (`github`, `jira`) to the URL browsing its issues.
pub type IssueTrackers = BTreeMap<String, String>;

impl ProbeContext {
    /// Name of the plugin this context belongs to.
    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    /// Catalog snapshot.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Hosting-platform client.
    pub fn hosting(&self) -> &dyn HostingClient {
        self.collaborators.hosting.as_ref()
    }

    /// Source-control client.
    pub fn scm(&self) -> &dyn SourceControl {
        self.collaborators.scm.as_ref()
    }

    /// Build-descriptor reader.
    pub fn descriptors(&self) -> &dyn DescriptorReader {
        self.collaborators.descriptors.as_ref()
    }

    /// Filesystem used to inspect the checkout.
    pub fn file_system(&self) -> &dyn FileSystem {
        self.collaborators.file_system.as_ref()
    }

    /// Client for issue trackers outside the hosting platform.
    pub fn issues(&self) -> &dyn IssueTrackerClient {
        self.collaborators.issues.as_ref()
    }

    /// Local path of the repository, once published.
    pub fn repository_path(&self) -> Option<&Path> {
        self.repository.as_ref().map(|checkout| checkout.path.as_path())
    }

    /// Folder of the plugin inside a mono-repo.
    pub fn sub_folder(&self) -> Option<&Path> {
        self.sub_folder.as_deref()
    }

    /// `org/name` of the hosted repository.
    pub fn repository_name(&self) -> Option<&str> {
        self.repository_name.as_deref()
    }

    /// Date of the last commit touching the plugin sources.
    pub fn last_commit_date(&self) -> Option<DateTime<Utc>> {
        self.last_commit_date
    }

    /// Documentation-link table.
    pub fn documentation_links(&self) -> Option<&DocumentationLinks> {
        self.documentation_links.as_deref()
    }

    /// Issue trackers declared by the plugin, once detected.
    pub fn issue_trackers(&self) -> Option<&IssueTrackers> {
        self.issue_trackers.as_ref()
    }

    /// Directory holding the plugin sources: the checkout joined with the sub-folder.
    pub fn plugin_root(&self) -> Option<PathBuf> {
        let repository = self.repository_path()?;
        Some(match self.sub_folder() {
            Some(folder) => repository.join(folder),
            None => repository.to_path_buf(),
        })
    }

    /// Publish an existing local checkout; it is left in place when the context drops.
    pub fn publish_repository_path(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        match &self.repository {
            Some(existing) if existing.path == path => Ok(()),
            Some(existing) => Err(conflict("repository path", &existing.path, &path)),
            None => {
                self.repository = Some(Checkout {
                    path,
                    managed: false,
                });
                Ok(())
            }
        }
    }

    /// Publish the plugin folder inside a mono-repo.
    pub fn publish_sub_folder(&mut self, folder: impl Into<PathBuf>) -> Result<()> {
        publish(&mut self.sub_folder, folder.into(), "sub-folder")
    }

    /// Publish the `org/name` of the hosted repository.
    pub fn publish_repository_name(&mut self, name: impl Into<String>) -> Result<()> {
        publish(&mut self.repository_name, name.into(), "repository name")
    }

    /// Publish the date of the last commit touching the plugin sources.
    pub fn publish_last_commit_date(&mut self, date: DateTime<Utc>) -> Result<()> {
        publish(&mut self.last_commit_date, date, "last commit date")
    }

    /// Publish the issue trackers declared by the plugin.
    pub fn publish_issue_trackers(&mut self, trackers: IssueTrackers) -> Result<()> {
        publish(&mut self.issue_trackers, trackers, "issue trackers")
    }

    /// Publish the documentation-link table.
    pub fn publish_documentation_links(&mut self, links: DocumentationLinks) -> Result<()> {
        match &self.documentation_links {
            Some(existing) if existing.as_ref() == &links => Ok(()),
            Some(_) => Err(HealthError::Conflict(
                "documentation links already published with different content".to_string(),
            )),
            None => {
                self.documentation_links = Some(Arc::new(links));
                Ok(())
            }
        }
    }

    /// Clone the plugin repository once per pass and return its local path.
    ///
    /// A failed clone leaves nothing behind and nothing published.
    pub fn checkout(&mut self, scm_url: &str) -> Result<PathBuf> {
        if let Some(path) = self.repository_path() {
            return Ok(path.to_path_buf());
        }
        let link = ScmLink::parse(scm_url)
            .ok_or_else(|| HealthError::Other(format!("cannot clone invalid SCM URL {scm_url}")))?;
        std::fs::create_dir_all(&self.workspace)?;
        let checkout = Checkout {
            path: self
                .workspace
                .join(format!("{}-{}", self.plugin_name, Uuid::new_v4())),
            managed: true,
        };
        self.collaborators
            .scm
            .clone_repository(&link.clone_url(), &checkout.path)?;
        debug!(
            "cloned {} for {} into {}",
            link.repository,
            self.plugin_name,
            checkout.path.display()
        );
        let path = checkout.path.clone();
        self.repository = Some(checkout);
        Ok(path)
    }
}

fn publish<T: PartialEq + Debug>(slot: &mut Option<T>, value: T, field: &str) -> Result<()> {
    match slot {
        Some(existing) if *existing == value => Ok(()),
        Some(existing) => Err(conflict(field, &*existing, &value)),
        None => {
            *slot = Some(value);
            Ok(())
        }
    }
}

fn conflict(field: &str, existing: &dyn Debug, proposed: &dyn Debug) -> HealthError {
    HealthError::Conflict(format!(
        "{field} already published as {existing:?}, refusing {proposed:?}"
    ))
}
