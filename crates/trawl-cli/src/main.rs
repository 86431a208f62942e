//! `trawl` - collect job listings through a real browser session.

mod prompt;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use trawl_browser::{BrowserEngine, SessionDriver};
use trawl_codes::{CodeLoader, CodeRegistry};
use trawl_collector::{
    CollectionOutcome, CollectionSummary, CollectorSettings, JsonFileSink, PersistenceSink,
    RecordFilter, RunStatus, SearchOrchestrator,
};
use trawl_core::{
    AppConfig, FilterField, LimitConfig, NoCodes, PaginationMode, QueryEncoder, ScrollMode,
    SearchQuery,
};

use crate::prompt::StdinPrompt;

#[derive(Parser, Debug)]
#[command(
    name = "trawl",
    version,
    about = "Collect job listings from a paginated search site"
)]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "TRAWL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one search and save the collected records
    Search(SearchArgs),
    /// Print statistics for a saved results file
    Summarize(SummarizeArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    /// Visit successive result pages
    Page,
    /// Stay on the first page and scroll for more
    Scroll,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Free-text keywords
    #[arg(short, long)]
    query: Option<String>,

    /// City name, e.g. 北京
    #[arg(long)]
    city: Option<String>,

    /// Business district inside the city
    #[arg(long)]
    district: Option<String>,

    /// Required experience, e.g. 3-5年
    #[arg(long)]
    experience: Option<String>,

    /// Required degree, e.g. 本科
    #[arg(long)]
    degree: Option<String>,

    /// Salary band, e.g. 20-50K
    #[arg(long)]
    salary: Option<String>,

    /// Company headcount band
    #[arg(long)]
    scale: Option<String>,

    /// Company funding stage
    #[arg(long)]
    stage: Option<String>,

    /// Job type, e.g. 全职
    #[arg(long)]
    job_type: Option<String>,

    /// First page to collect
    #[arg(long, default_value_t = 1)]
    page: u32,

    /// Results per page (defaults to limits.page_size)
    #[arg(long)]
    page_size: Option<u32>,

    /// Pagination strategy
    #[arg(long, value_enum, default_value_t = ModeArg::Page)]
    mode: ModeArg,

    /// Let the operator scroll and confirm each capture (implies --mode scroll)
    #[arg(long)]
    manual: bool,

    /// Last page to visit in page mode (defaults to limits.max_pages)
    #[arg(long)]
    max_pages: Option<u32>,

    /// Scroll bound in scroll mode (defaults to limits.max_scroll_times)
    #[arg(long)]
    max_scrolls: Option<u32>,

    /// Directory holding the filter code tables
    #[arg(long, env = "TRAWL_CODES_DIR")]
    codes_dir: Option<PathBuf>,

    /// Directory for the results file (defaults to output.result_dir)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Do not write a results file
    #[arg(long)]
    no_save: bool,

    /// Also write the latest raw response to the output directory
    #[arg(long)]
    save_raw: bool,

    /// Skip visiting the home and landing pages before searching
    #[arg(long)]
    skip_warmup: bool,

    /// Show the browser window
    #[arg(long)]
    headed: bool,
}

impl SearchArgs {
    fn search_query(&self, default_page_size: u32) -> SearchQuery {
        let mut query = SearchQuery {
            query: self.query.clone(),
            ..SearchQuery::default()
        };

        let filters = [
            (FilterField::City, &self.city),
            (FilterField::District, &self.district),
            (FilterField::Experience, &self.experience),
            (FilterField::Degree, &self.degree),
            (FilterField::Salary, &self.salary),
            (FilterField::Scale, &self.scale),
            (FilterField::Stage, &self.stage),
            (FilterField::JobType, &self.job_type),
        ];
        for (field, value) in filters {
            if let Some(value) = value {
                query = query.with_filter(field, value.clone());
            }
        }

        query
            .with_page(self.page)
            .with_page_size(self.page_size.unwrap_or(default_page_size))
    }

    fn pagination(&self, limits: &LimitConfig) -> PaginationMode {
        if self.manual || self.mode == ModeArg::Scroll {
            let mode = if self.manual {
                ScrollMode::Manual
            } else {
                ScrollMode::Auto
            };
            PaginationMode::Scroll {
                mode,
                max_scrolls: self.max_scrolls.unwrap_or(limits.max_scroll_times),
            }
        } else {
            PaginationMode::Page {
                max_pages: self.max_pages.unwrap_or(limits.max_pages),
            }
        }
    }
}

#[derive(Args, Debug)]
struct SummarizeArgs {
    /// Results file written by `trawl search`
    file: PathBuf,

    /// Keep records whose name or labels contain this keyword (repeatable)
    #[arg(long)]
    keyword: Vec<String>,

    /// Keep records in this city (repeatable)
    #[arg(long)]
    city: Vec<String>,

    /// Keep records with this company scale (repeatable)
    #[arg(long)]
    scale: Vec<String>,
}

/// Initialize tracing subscriber for logging
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,trawl=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let mut config = match path {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => AppConfig::load().context("failed to load config")?,
    };
    config.apply_env_overrides();
    Ok(config)
}

/// Code tables for filter encoding; filters are dropped when none load.
fn load_codes(dir: Option<&Path>) -> Arc<dyn QueryEncoder> {
    let registry = match dir {
        Some(dir) => CodeLoader::new(dir),
        None => CodeLoader::with_default_dir(),
    }
    .and_then(|loader| CodeRegistry::load_from(&loader));

    match registry {
        Ok(registry) => {
            info!(tables = registry.count(), "loaded code tables");
            Arc::new(registry)
        }
        Err(e) => {
            warn!(error = %e, "code tables unavailable, filters will be omitted");
            Arc::new(NoCodes)
        }
    }
}

/// Build and check the request before any browser work.
fn plan(config: &AppConfig, args: &SearchArgs) -> Result<(SearchQuery, PaginationMode)> {
    let query = args.search_query(config.limits.page_size);
    let mode = args.pagination(&config.limits);
    SearchOrchestrator::check_request(&query, mode, args.manual)?;
    Ok((query, mode))
}

async fn search(config: AppConfig, args: SearchArgs) -> Result<()> {
    let mut config = config;
    if args.headed {
        config.browser.headless = false;
    }

    let (query, mode) = plan(&config, &args)?;
    let dir = match &args.output_dir {
        Some(dir) => dir.clone(),
        None => config.result_dir()?,
    };
    let encoder = load_codes(args.codes_dir.as_deref());

    let engine = Arc::new(
        BrowserEngine::launch(&config.browser)
            .await
            .context("failed to launch browser")?,
    );

    let mut orchestrator = SearchOrchestrator::new(
        engine.clone(),
        encoder,
        CollectorSettings::from_config(&config),
    );
    if args.manual {
        orchestrator = orchestrator.with_prompt(Box::new(StdinPrompt));
    }
    if args.save_raw || config.output.save_raw_response {
        orchestrator = orchestrator.with_raw_dump(JsonFileSink::new(&dir));
    }

    let result = collect(&mut orchestrator, &query, mode, !args.skip_warmup).await;
    if let Err(e) = engine.close().await {
        warn!(error = %e, "failed to close browser");
    }
    let outcome = result?;

    let summary = CollectionSummary::from_outcome(&outcome);
    print_summary(&summary);

    if !args.no_save && !outcome.records.is_empty() {
        let path = JsonFileSink::new(dir).save(&outcome.records, &summary)?;
        println!("Saved {} records to {}", outcome.records.len(), path.display());
    }

    report_status(&outcome)
}

async fn collect(
    orchestrator: &mut SearchOrchestrator,
    query: &SearchQuery,
    mode: PaginationMode,
    warmup: bool,
) -> Result<CollectionOutcome> {
    if warmup {
        orchestrator
            .establish_session()
            .await
            .context("failed to establish browsing session")?;
    }
    Ok(orchestrator.run(query, mode).await?)
}

fn report_status(outcome: &CollectionOutcome) -> Result<()> {
    match &outcome.status {
        RunStatus::Terminated => Ok(()),
        RunStatus::Failed { kind, message } => {
            bail!(
                "collection stopped early ({kind:?}) after {} records: {message}",
                outcome.records.len()
            )
        }
    }
}

fn summarize(args: &SummarizeArgs) -> Result<()> {
    let records = JsonFileSink::load(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    let filter = RecordFilter {
        keywords: args.keyword.clone(),
        cities: args.city.clone(),
        scales: args.scale.clone(),
    };
    let records = if filter.is_empty() {
        records
    } else {
        filter.apply(&records)
    };

    let invalid = records.iter().filter(|r| r.validate().is_err()).count();
    if invalid > 0 {
        warn!(invalid, "records missing name, id or company");
    }

    print_summary(&CollectionSummary::from_records(&records));
    Ok(())
}

fn print_summary(summary: &CollectionSummary) {
    println!("Total jobs: {}", summary.total_jobs);
    if let Some(run) = &summary.run {
        println!(
            "Run {} ({}): {}, {} attempts, {} responses",
            run.run_id, run.mode, run.status, run.attempts, run.packets_processed
        );
        if let Some(total) = run.total_count {
            println!("Site reported {total} matching jobs");
        }
    }

    let sections = [
        ("City", &summary.city_distribution),
        ("Company scale", &summary.scale_distribution),
        ("Degree", &summary.degree_distribution),
        ("Experience", &summary.experience_distribution),
    ];
    for (title, buckets) in sections {
        if buckets.is_empty() {
            continue;
        }
        println!("\n{title}:");
        for bucket in buckets.iter().take(10) {
            println!("  {:<20} {}", bucket.value, bucket.count);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Search(args) => search(config, args).await,
        Command::Summarize(args) => summarize(&args),
    }
}
