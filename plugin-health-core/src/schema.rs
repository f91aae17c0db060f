//! OpenAPI document describing every serialized model.

use utoipa::OpenApi;

use crate::catalog::{
    Catalog, CatalogPlugin, Deprecation, IssueTracker, SecurityWarning, SecurityWarningVersion,
};
use crate::engine::{PassReport, ProbeDescription, ProbeOutcome};
use crate::plugin::Plugin;
use crate::result::{ProbeResult, ResultStatus};
use crate::score::{ComponentDescription, Score, ScoringDescription};
use crate::scoring::{ComponentResult, Resolution, ScoreResult};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "plugin-health",
        description = "Models of the plugin health state file and reports."
    ),
    components(
        schemas(
            ResultStatus,
            ProbeResult,
            Plugin,
            Catalog,
            CatalogPlugin,
            IssueTracker,
            Deprecation,
            SecurityWarning,
            SecurityWarningVersion,
            ProbeOutcome,
            PassReport,
            ProbeDescription,
            Resolution,
            ComponentResult,
            ScoreResult,
            Score,
            ScoringDescription,
            ComponentDescription
        )
    )
)]
/// OpenAPI document for the plugin health models.
pub struct ApiDoc;

/// Pretty-printed OpenAPI JSON.
pub fn openapi_json() -> Result<String, serde_json::Error> {
    ApiDoc::openapi().to_pretty_json()
}
