use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use url::Url;

use harvest_client::{
    DEFAULT_USER_AGENT, HttpNavigator, JobPageExtractor, ReqwestFetcher, RobotsGuard,
    SelectorListingParser, next_page,
};
use harvest_core::HarvestConfig;
use harvest_core::download::{DownloadService, load_targets};
use harvest_core::extraction::ExtractionService;
use harvest_core::frontier::{CrawlOutcome, FrontierController, JsonFileStore, TracingCrawlReporter};
use harvest_core::models::FrontierState;
use harvest_core::retry::{RetryPolicy, RetryingFetcher};
use harvest_core::throttle::{ThrottleConfig, ThrottledFetcher};
use harvest_core::traits::{FrontierStore, PageNavigator};
use harvest_core::validate::{UrlValidator, build_artifact};

#[derive(Parser)]
#[command(name = "harvest", version, about = "Crawl, validate, download and extract job postings")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum NavigatorKind {
    /// Plain HTTP; for server-rendered listings
    Http,
    /// Headless Chromium; needs the `browser` feature
    Browser,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover job URLs page by page and write the frontier artifact
    Crawl {
        /// Career site listing URL
        #[arg(long)]
        home_url: String,

        /// Pattern document (YAML or JSON)
        #[arg(short, long, env = "HARVEST_CONFIG")]
        config: PathBuf,

        /// Frontier artifact; also the resume source
        #[arg(short, long, default_value = "frontier.json")]
        output: PathBuf,

        /// Resume the stored frontier from this page
        #[arg(long)]
        restart_from_page: Option<u32>,

        #[arg(long, value_enum, default_value_t = NavigatorKind::Http)]
        navigator: NavigatorKind,

        #[arg(long, env = "HARVEST_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
        user_agent: String,

        /// Do not consult robots.txt
        #[arg(long, default_value_t = false)]
        ignore_robots: bool,
    },

    /// Validate and dedupe a frontier artifact
    Validate {
        /// Frontier artifact from `crawl`
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long, env = "HARVEST_CONFIG")]
        config: PathBuf,

        #[arg(short, long, default_value = "validated_jobs.json")]
        output: PathBuf,
    },

    /// Download the page of every validated job
    Download {
        /// Validated-jobs artifact from `validate`
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long, default_value = "job_pages")]
        output_dir: PathBuf,

        /// Seconds between requests to the same host
        #[arg(long, default_value_t = 1.0)]
        delay: f64,

        /// Request timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,

        #[arg(long, default_value_t = 3)]
        max_retries: u32,

        #[arg(long, env = "HARVEST_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
        user_agent: String,
    },

    /// Extract normalized records from downloaded pages
    Extract {
        /// Directory written by `download`
        #[arg(long)]
        html_dir: PathBuf,

        #[arg(short, long, default_value = "records")]
        output_dir: PathBuf,

        #[arg(short, long, env = "HARVEST_CONFIG")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(format!("harvest={level}").parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cancel_token = CancellationToken::new();
    let ctrl_c_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; stopping after the current item");
            ctrl_c_token.cancel();
        }
    });

    match cli.command {
        Commands::Crawl {
            home_url,
            config,
            output,
            restart_from_page,
            navigator,
            user_agent,
            ignore_robots,
        } => {
            let opts = CrawlOptions {
                home_url: Url::parse(&home_url)
                    .with_context(|| format!("Invalid home URL: {home_url}"))?,
                config: load_config(&config)?,
                output,
                restart_from_page,
                user_agent,
            };
            cmd_crawl(opts, navigator, ignore_robots, &cancel_token).await?;
        }
        Commands::Validate {
            input,
            config,
            output,
        } => cmd_validate(&input, &load_config(&config)?, &output)?,
        Commands::Download {
            input,
            output_dir,
            delay,
            timeout,
            max_retries,
            user_agent,
        } => {
            let fetcher = ReqwestFetcher::with_options(Duration::from_secs(timeout), &user_agent)
                .context("Failed to create HTTP client")?;
            let fetcher = ThrottledFetcher::new(
                RetryingFetcher::new(fetcher, RetryPolicy::default().with_max_retries(max_retries)),
                ThrottleConfig::from_secs_f64(delay),
            );
            cmd_download(fetcher, &input, &output_dir, &cancel_token).await?;
        }
        Commands::Extract {
            html_dir,
            output_dir,
            config,
        } => cmd_extract(&html_dir, &output_dir, &load_config(&config)?, &cancel_token)?,
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<HarvestConfig> {
    HarvestConfig::load(path).context("Failed to load pattern configuration")
}

// ---------------------------------------------------------------------------
// crawl
// ---------------------------------------------------------------------------

struct CrawlOptions {
    home_url: Url,
    config: HarvestConfig,
    output: PathBuf,
    restart_from_page: Option<u32>,
    user_agent: String,
}

async fn cmd_crawl(
    opts: CrawlOptions,
    navigator: NavigatorKind,
    ignore_robots: bool,
    cancel_token: &CancellationToken,
) -> Result<()> {
    opts.config.require_stub_selectors()?;
    let robots_fetcher = ReqwestFetcher::with_options(Duration::from_secs(30), &opts.user_agent)
        .context("Failed to create HTTP client")?;

    match navigator {
        NavigatorKind::Http => {
            let nav = HttpNavigator::new(robots_fetcher.clone());
            if ignore_robots {
                crawl_with(nav, &opts, cancel_token).await
            } else {
                crawl_with(RobotsGuard::new(nav, robots_fetcher), &opts, cancel_token).await
            }
        }
        NavigatorKind::Browser => {
            crawl_in_browser(&opts, robots_fetcher, ignore_robots, cancel_token).await
        }
    }
}

#[cfg(feature = "browser")]
async fn crawl_in_browser(
    opts: &CrawlOptions,
    robots_fetcher: ReqwestFetcher,
    ignore_robots: bool,
    cancel_token: &CancellationToken,
) -> Result<()> {
    let nav = harvest_client::BrowserNavigator::launch(&opts.user_agent)
        .await
        .context("Failed to launch headless browser")?
        .with_wait_for(opts.config.wait_for.clone())
        .with_pagination(&opts.config.pagination);
    if ignore_robots {
        crawl_with(nav, opts, cancel_token).await
    } else {
        crawl_with(RobotsGuard::new(nav, robots_fetcher), opts, cancel_token).await
    }
}

#[cfg(not(feature = "browser"))]
async fn crawl_in_browser(
    _opts: &CrawlOptions,
    _robots_fetcher: ReqwestFetcher,
    _ignore_robots: bool,
    _cancel_token: &CancellationToken,
) -> Result<()> {
    anyhow::bail!("This build has no browser support; rebuild with `--features browser`")
}

async fn crawl_with<N: PageNavigator>(
    navigator: N,
    opts: &CrawlOptions,
    cancel_token: &CancellationToken,
) -> Result<()> {
    let config = &opts.config;
    let store = JsonFileStore::new(&opts.output);

    let state = match opts.restart_from_page {
        Some(page) => match store.load().context("Failed to load frontier for resume")? {
            Some(state) => {
                tracing::info!(
                    page,
                    jobs = state.jobs.len(),
                    path = %opts.output.display(),
                    "Resuming crawl"
                );
                state
            }
            None => {
                tracing::warn!(path = %opts.output.display(), "No frontier to resume; starting fresh");
                FrontierState::new(opts.home_url.as_str(), &config.company_name)
            }
        },
        None => FrontierState::new(opts.home_url.as_str(), &config.company_name),
    };

    let controller = FrontierController::new(
        navigator,
        SelectorListingParser::from_config(config)?,
        next_page::from_config(&config.pagination)?,
        store,
        config.pagination.clone(),
    );

    let CrawlOutcome {
        state,
        stop,
        pages_this_run,
        new_stubs,
    } = controller
        .run(
            &opts.home_url,
            state,
            opts.restart_from_page,
            cancel_token,
            &TracingCrawlReporter,
        )
        .await?;

    println!("Crawl finished: {stop}");
    println!("  Pages this run:   {pages_this_run}");
    println!("  New jobs:         {new_stubs}");
    println!("  Total jobs:       {}", state.total_jobs);
    println!("  Pages crawled:    {}", state.total_pages_crawled);
    if let Some(estimate) = state.total_pages_attempted {
        println!("  Estimated pages:  {estimate}");
    }
    println!("  Frontier written: {}", opts.output.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn cmd_validate(input: &Path, config: &HarvestConfig, output: &Path) -> Result<()> {
    let validator = UrlValidator::new(config.require_url_validation()?)?;
    let frontier = JsonFileStore::new(input)
        .load()?
        .with_context(|| format!("Frontier artifact not found: {}", input.display()))?;

    let artifact = build_artifact(frontier, &validator);
    let json = serde_json::to_string_pretty(&artifact).context("Failed to serialize artifact")?;
    std::fs::write(output, json)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    let stats = &artifact.processing_stats;
    println!("Validation finished");
    println!("  Original:   {}", stats.original_count);
    println!("  Valid:      {}", stats.valid_count);
    println!("  Invalid:    {}", stats.invalid_count);
    println!("  Duplicates: {}", stats.duplicate_count);
    println!("  Final:      {}", stats.final_count);
    println!("  Written:    {}", output.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// download
// ---------------------------------------------------------------------------

async fn cmd_download<F: harvest_core::Fetcher>(
    fetcher: F,
    input: &Path,
    output_dir: &Path,
    cancel_token: &CancellationToken,
) -> Result<()> {
    let targets = load_targets(input)?;
    let service = DownloadService::new(fetcher, output_dir);
    let summary = service.run(&targets, cancel_token).await?;

    println!("Download finished{}", if summary.cancelled { " (cancelled)" } else { "" });
    println!("  Jobs:             {}", summary.total);
    println!("  Downloaded:       {}", summary.downloaded);
    println!("  Already present:  {}", summary.skipped_existing);
    println!("  Name collisions:  {}", summary.collisions);
    println!("  Rejected (4xx):   {}", summary.rejected);
    println!("  Failed:           {}", summary.failed);
    println!("  Pages on disk:    {}", summary.succeeded());
    Ok(())
}

// ---------------------------------------------------------------------------
// extract
// ---------------------------------------------------------------------------

fn cmd_extract(
    html_dir: &Path,
    output_dir: &Path,
    config: &HarvestConfig,
    cancel_token: &CancellationToken,
) -> Result<()> {
    let extractor = JobPageExtractor::from_config(config)?;
    let summary = ExtractionService::new(extractor, html_dir, output_dir).run(cancel_token)?;

    println!("Extraction finished{}", if summary.cancelled { " (cancelled)" } else { "" });
    println!("  Pages:            {}", summary.total);
    println!("  Records written:  {}", summary.extracted);
    println!("  Error pages:      {}", summary.error_pages);
    println!("  Missing fields:   {}", summary.missing_fields);
    println!("  Invalid records:  {}", summary.invalid_records);
    println!("  I/O failures:     {}", summary.io_failures);
    Ok(())
}
