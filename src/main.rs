//! Sumi-Harvest main entry point
//!
//! This is the command-line interface for the Sumi-Harvest record scraper.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Instant;
use sumi_harvest::config::{load_config, Config};
use sumi_harvest::output::{print_failures, print_rows, print_statistics, BatchStatistics};
use sumi_harvest::{ExtractionMode, Row, Scraper};
use tracing_subscriber::EnvFilter;

/// Sumi-Harvest: typed record extraction from HTML pages
///
/// Sumi-Harvest fetches the URLs of a job file under a concurrency ceiling,
/// extracts one record per page (or per listing item) with the configured
/// CSS or XPath fields, and prints the deduplicated records.
#[derive(Parser, Debug)]
#[command(name = "sumi-harvest")]
#[command(version = "1.0.0")]
#[command(about = "Typed record extraction from HTML pages", long_about = None)]
struct Cli {
    /// Path to TOML job file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate the job file and show what would be scraped
    #[arg(long, conflicts_with = "html")]
    dry_run: bool,

    /// Scrape a local HTML file instead of the configured URLs
    #[arg(long, value_name = "FILE")]
    html: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading job file from: {}", cli.config.display());
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!(
        "Job file loaded successfully ({} URL(s), {} field(s))",
        config.urls.len(),
        config.fields.len()
    );

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let scraper = build_scraper(&config, cli.quiet)?;

    match cli.html {
        Some(path) => handle_html_file(&scraper, &config, &path).await?,
        None => handle_batch(&scraper, &config).await?,
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_harvest=info,warn"),
            1 => EnvFilter::new("sumi_harvest=debug,info"),
            2 => EnvFilter::new("sumi_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn build_scraper(config: &Config, quiet: bool) -> anyhow::Result<Scraper<Row>> {
    let mut settings = config.scraper_config();
    settings.logging = settings.logging && !quiet;

    let scraper = Scraper::builder()
        .fields(config.field_extractors()?)
        .config(settings)
        .build()?;

    Ok(scraper)
}

/// Handles the --dry-run mode: shows the parsed job
fn handle_dry_run(config: &Config) {
    println!("=== Sumi-Harvest Dry Run ===\n");

    println!("Scraper Configuration:");
    println!("  Max concurrency: {}", config.scraper.max_concurrency);
    println!("  Batch timeout: {}ms", config.scraper.batch_timeout_ms);
    println!("  Mode: {:?}", config.scraper.mode);
    println!("  Console logging: {}", config.scraper.logging);

    println!("\nFetcher:");
    println!("  Request timeout: {}ms", config.fetcher.request_timeout_ms);
    println!("  Hard timeout: {}ms", config.fetcher.hard_timeout_ms);
    println!(
        "  User agent: {}",
        config
            .fetcher
            .user_agent
            .as_deref()
            .unwrap_or(sumi_harvest::crawler::DEFAULT_USER_AGENT)
    );

    println!("\nFields ({}):", config.fields.len());
    for field in &config.fields {
        let selector = match (&field.css, &field.xpath) {
            (Some(css), _) => format!("css {}", css),
            (_, Some(xpath)) => format!("xpath {}", xpath),
            _ => "no selector".to_string(),
        };
        println!(
            "  - {} ({}, anchor {:?}{}{})",
            field.name,
            selector,
            field.anchor,
            if field.many { ", many" } else { "" },
            if field.attributes.is_empty() {
                String::new()
            } else {
                format!(", attributes {}", field.attributes.join(","))
            }
        );
    }

    println!("\nURLs ({}):", config.urls.len());
    for url in &config.urls {
        println!("  * {}", url);
    }

    println!("\n✓ Job file is valid");
    println!("✓ Would scrape {} URL(s)", config.urls.len());
}

/// Handles the --html mode: scrapes a local file
async fn handle_html_file(
    scraper: &Scraper<Row>,
    config: &Config,
    path: &Path,
) -> anyhow::Result<()> {
    let markup = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let found = match config.scraper.mode {
        ExtractionMode::Single => scraper.scrape(&markup).await.into_iter().count(),
        ExtractionMode::Listing => scraper.scrape_all(&markup).await.into_iter().flatten().count(),
    };
    tracing::info!("{} record(s) extracted from {}", found, path.display());

    print_rows(&scraper.field_names(), &scraper.records().await);
    Ok(())
}

/// Handles the main batch: scrapes every configured URL
async fn handle_batch(scraper: &Scraper<Row>, config: &Config) -> anyhow::Result<()> {
    if config.urls.is_empty() {
        tracing::warn!("Job file lists no URLs; nothing to scrape");
        return Ok(());
    }

    tracing::info!(
        "Scraping {} URL(s) with at most {} in flight",
        config.urls.len(),
        config.scraper.max_concurrency
    );

    let started = Instant::now();
    scraper
        .scrape_throttled(
            config.urls.clone(),
            config.scraper.max_concurrency,
            || tracing::info!("Batch complete"),
        )
        .await
        .context("Batch watcher stopped before reporting completion")?;
    let elapsed = started.elapsed();

    let snapshot = scraper.snapshot().await;
    let log = scraper.log().await;

    print_rows(&scraper.field_names(), &snapshot.records);
    print_failures(&snapshot.failed_urls);
    println!();
    print_statistics(&BatchStatistics::collect(
        config.urls.len(),
        &snapshot,
        &log,
        elapsed,
    ));

    Ok(())
}
