#![deny(missing_docs)]
//! Plugin health command-line interface.
//!
//! Runs probe passes over update-center plugins, scores the recorded results
//! and lists the registered probes and scorings.

use clap::{Args, Parser, Subcommand, ValueEnum};
use dotenvy::dotenv;
use log::{info, warn};
use plugin_health_core::catalog::load_documentation_links;
use plugin_health_core::{
    Catalog, CatalogClient, Collaborators, ContextFactory, DocumentationLinks, HealthConfig,
    PassReport, PluginRegistry, ProbeEngine, Score, ScoringService, default_probes,
    openapi_json, render_json, render_pass_markdown, render_pass_text, render_probe_list,
    render_score_markdown, render_score_text, render_scoring_list,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub(crate) type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser)]
#[command(name = "plugin-health", version, about = "Plugin health probes and scores")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct StateArgs {
    /// JSON file holding plugin records between runs.
    #[arg(long, env = "PLUGIN_HEALTH_STATE", default_value = "plugin-health-state.json")]
    state: PathBuf,
    /// Plugins to process (repeatable or comma-separated); all known plugins when omitted.
    #[arg(long, value_delimiter = ',')]
    plugin: Vec<String>,
}

#[derive(Args, Clone)]
struct SourceArgs {
    /// Update-center JSON file to use instead of downloading it.
    #[arg(long, env = "PLUGIN_HEALTH_CATALOG_FILE")]
    catalog: Option<PathBuf>,
    /// Documentation-links JSON file to use instead of downloading it.
    #[arg(long, env = "PLUGIN_HEALTH_DOCUMENTATION_FILE")]
    documentation: Option<PathBuf>,
    /// Maximum number of concurrent plugin passes.
    #[arg(short = 'j', long, env = "PLUGIN_HEALTH_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,
}

#[derive(Args, Clone)]
struct OutputArgs {
    /// Output format for report data.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Write the report to a file instead of stdout.
    #[arg(long = "report-output")]
    report_output: Option<PathBuf>,
}

#[derive(ValueEnum, Copy, Clone, Debug, Eq, PartialEq)]
enum OutputFormat {
    Text,
    Json,
    Markdown,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a probe pass over plugins and save their results.
    Run {
        #[command(flatten)]
        state: StateArgs,
        #[command(flatten)]
        sources: SourceArgs,
        #[command(flatten)]
        report: OutputArgs,
    },
    /// Score plugins from their saved probe results.
    Score {
        #[command(flatten)]
        state: StateArgs,
        #[command(flatten)]
        report: OutputArgs,
    },
    /// List probes in execution order.
    Probes {
        #[command(flatten)]
        report: OutputArgs,
    },
    /// List scorings with their components and weights.
    Scorings {
        #[command(flatten)]
        report: OutputArgs,
    },
    /// Print the OpenAPI document of the serialized models.
    Schema {
        /// Write the document to a file instead of stdout.
        #[arg(long = "report-output")]
        report_output: Option<PathBuf>,
    },
}

#[cfg(not(test))]
fn main() -> CliResult<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let runtime = Runtime::new()?;

    match cli.command {
        Commands::Run {
            state,
            sources,
            report,
        } => run_probes(&runtime, state, sources, report)?,
        Commands::Score { state, report } => {
            let registry = PluginRegistry::load(&state.state)?;
            let names = select_plugins(&registry, &state.plugin)?;
            let scores = score_plugins(&ScoringService::with_default_scorings(), &registry, &names);
            runtime.block_on(emit_score_reports(&scores, &report))?
        }
        Commands::Probes { report } => {
            let engine = ProbeEngine::new(default_probes())?;
            let descriptions = engine.describe();
            let contents = match report.format {
                OutputFormat::Json => render_json(&descriptions)?,
                OutputFormat::Text | OutputFormat::Markdown => render_probe_list(&descriptions),
            };
            runtime.block_on(emit_output(&report, contents))?
        }
        Commands::Scorings { report } => {
            let descriptions = ScoringService::with_default_scorings().describe();
            let contents = match report.format {
                OutputFormat::Json => render_json(&descriptions)?,
                OutputFormat::Text | OutputFormat::Markdown => render_scoring_list(&descriptions),
            };
            runtime.block_on(emit_output(&report, contents))?
        }
        Commands::Schema { report_output } => {
            let report = OutputArgs {
                format: OutputFormat::Json,
                report_output,
            };
            runtime.block_on(emit_output(&report, openapi_json()?))?
        }
    }

    Ok(())
}

#[cfg(test)]
fn main() {}

/// Load every input synchronously, then fan the passes out on the runtime.
///
/// The blocking HTTP clients are built, used and finally dropped outside the
/// runtime; the tasks only ever hold extra clones of them.
fn run_probes(
    runtime: &Runtime,
    state: StateArgs,
    sources: SourceArgs,
    report: OutputArgs,
) -> CliResult<()> {
    let config = HealthConfig::from_env()?;
    let catalog_client = CatalogClient::new(&config)?;
    let catalog = load_catalog(&catalog_client, sources.catalog.as_deref())?;
    let links = documentation_links(&catalog_client, sources.documentation.as_deref());

    let mut factory = ContextFactory::new(
        Collaborators::from_config(&config)?,
        catalog,
        config.workspace.clone(),
    );
    if let Some(links) = links {
        factory = factory.with_documentation_links(links);
    }

    let registry = Arc::new(PluginRegistry::load(&state.state)?);
    let changed = registry.sync_catalog(factory.catalog());
    info!("catalog sync changed {changed} of {} plugins", registry.len());
    let names = select_plugins(&registry, &state.plugin)?;
    if names.is_empty() {
        println!("No plugins found to probe.");
        return Ok(());
    }

    let engine = Arc::new(ProbeEngine::new(default_probes())?);
    let reports = runtime.block_on(run_passes(
        engine,
        factory.clone(),
        registry.clone(),
        names,
        sources.concurrency,
    ))?;
    registry.save(&state.state)?;
    runtime.block_on(emit_pass_reports(&reports, &report))?;
    drop(factory);
    Ok(())
}

fn load_catalog(client: &CatalogClient, path: Option<&Path>) -> CliResult<Catalog> {
    let catalog = match path {
        Some(path) => Catalog::from_path(path)?,
        None => client.fetch_catalog()?,
    };
    Ok(catalog)
}

fn documentation_links(client: &CatalogClient, path: Option<&Path>) -> Option<DocumentationLinks> {
    let loaded = match path {
        Some(path) => load_documentation_links(path),
        None => client.fetch_documentation_links(),
    };
    match loaded {
        Ok(links) => Some(links),
        Err(err) => {
            warn!("documentation links unavailable: {err}");
            None
        }
    }
}

fn select_plugins(registry: &PluginRegistry, requested: &[String]) -> CliResult<Vec<String>> {
    if requested.is_empty() {
        return Ok(registry.names());
    }
    let mut names = Vec::with_capacity(requested.len());
    for name in requested.iter().map(|name| name.trim()) {
        if name.is_empty() {
            continue;
        }
        if registry.get(name).is_none() {
            return Err(format!("unknown plugin: {name}").into());
        }
        names.push(name.to_string());
    }
    names.sort();
    names.dedup();
    Ok(names)
}

async fn run_passes(
    engine: Arc<ProbeEngine>,
    factory: ContextFactory,
    registry: Arc<PluginRegistry>,
    names: Vec<String>,
    concurrency: usize,
) -> CliResult<Vec<PassReport>> {
    let concurrency = if concurrency == 0 { 1 } else { concurrency };
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut tasks = JoinSet::new();

    for name in names {
        let permit = semaphore.clone().acquire_owned().await?;
        let engine = engine.clone();
        let factory = factory.clone();
        let registry = registry.clone();
        tasks.spawn(async move {
            let _permit = permit;
            let plugin = name.clone();
            let pass = tokio::task::spawn_blocking(move || {
                run_pass(&engine, &factory, &registry, &name)
            });
            match pass.await {
                Ok(report) => report,
                Err(err) => PassReport::failed(plugin, err.to_string()),
            }
        });
    }

    let mut reports = Vec::new();
    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(report) => reports.push(report),
            Err(err) => reports.push(PassReport::failed("unknown", err.to_string())),
        }
    }
    reports.sort_by(|left, right| left.plugin.cmp(&right.plugin));
    Ok(reports)
}

fn run_pass(
    engine: &ProbeEngine,
    factory: &ContextFactory,
    registry: &PluginRegistry,
    name: &str,
) -> PassReport {
    let Some(current) = registry.get(name) else {
        return PassReport::failed(name, format!("{name} is not a known plugin"));
    };
    let plugin = current.as_ref().clone();
    let context = factory.context_for(&plugin);
    let (plugin, report) = engine.run(plugin, context);
    registry.commit(plugin);
    report
}

fn score_plugins(service: &ScoringService, registry: &PluginRegistry, names: &[String]) -> Vec<Score> {
    names
        .iter()
        .filter_map(|name| registry.get(name))
        .map(|plugin| service.score(&plugin))
        .collect()
}

async fn emit_pass_reports(reports: &[PassReport], output: &OutputArgs) -> CliResult<()> {
    let contents = match output.format {
        OutputFormat::Text => render_pass_text(reports),
        OutputFormat::Markdown => render_pass_markdown(reports),
        OutputFormat::Json => render_json(reports)?,
    };
    emit_output(output, contents).await
}

async fn emit_score_reports(scores: &[Score], output: &OutputArgs) -> CliResult<()> {
    let contents = match output.format {
        OutputFormat::Text => render_score_text(scores),
        OutputFormat::Markdown => render_score_markdown(scores),
        OutputFormat::Json => render_json(scores)?,
    };
    emit_output(output, contents).await
}

async fn emit_output(output: &OutputArgs, contents: String) -> CliResult<()> {
    if let Some(path) = &output.report_output {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, contents).await?;
    } else {
        print!("{contents}");
    }
    Ok(())
}
