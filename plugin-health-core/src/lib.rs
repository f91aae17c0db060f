#![deny(missing_docs)]
//! Plugin health core library.
//!
//! Probes inspect a plugin's catalog entry, source repository and hosting
//! state; the engine decides which probes need to run and records their
//! results; scorings reduce the recorded results into versioned scores.

pub mod catalog;
pub mod config;
pub mod context;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod fs;
pub mod hosting;
mod http;
pub mod issues;
pub mod plugin;
pub mod probe;
pub mod probes;
pub mod registry;
pub mod report;
pub mod result;
pub mod schema;
pub mod scm;
pub mod score;
pub mod scores;
pub mod scoring;

pub use catalog::{Catalog, CatalogClient, CatalogPlugin, DocumentationLinks};
pub use config::HealthConfig;
pub use context::{Collaborators, ContextFactory, ProbeContext};
pub use descriptor::{BuildDescriptor, DescriptorReader, PomReader};
pub use engine::{PassReport, ProbeDescription, ProbeEngine, ProbeOutcome};
pub use error::{HealthError, Result};
pub use fs::{FileSystem, StdFileSystem};
pub use hosting::{GitHubApiClient, HostingClient};
pub use issues::{IssueTrackerClient, JiraApiClient};
pub use plugin::{Plugin, ProbeResults};
pub use probe::{Applicability, Probe};
pub use probes::default_probes;
pub use registry::PluginRegistry;
pub use report::{
    render_json, render_pass_markdown, render_pass_text, render_probe_list, render_score_markdown,
    render_score_text, render_scoring_list,
};
pub use result::{ProbeResult, ResultStatus};
pub use schema::{ApiDoc, openapi_json};
pub use scm::{GitCommandClient, ScmLink, SourceControl};
pub use score::{Score, ScoringDescription, ScoringService};
pub use scores::default_scorings;
pub use scoring::{ComponentResult, Resolution, ScoreResult, Scoring, ScoringComponent};
