//! Tag-Down main entry point
//!
//! This is the command-line interface for the Tag-Down search crawler.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tag_down::config::{read_config, validate, Config};
use tag_down::crawler::{raw_query, run_dir_name, run_tag_down};
use tag_down::output::print_statistics;
use tag_down::CrawlMode;
use tracing_subscriber::EnvFilter;

/// Tag-Down: a tag search crawler
///
/// Tag-Down pages through the search results for a tag or filter, saves
/// every image and video it finds, and logs one CSV row per media item
/// (or per post in text-only mode).
#[derive(Parser, Debug)]
#[command(name = "tag-down")]
#[command(version = "1.0.0")]
#[command(about = "A tag search crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show what would be crawled without making any request
    #[arg(long)]
    dry_run: bool,

    /// Override the search tag
    #[arg(long)]
    tag: Option<String>,

    /// Override the search filter
    #[arg(long)]
    filter: Option<String>,

    /// Override the number of entries to request
    #[arg(long, value_name = "N")]
    count: Option<u32>,

    /// Crawl the latest feed
    #[arg(long, conflicts_with = "top")]
    latest: bool,

    /// Crawl the media grid
    #[arg(long, conflicts_with = "latest")]
    top: bool,

    /// Record post text only
    #[arg(long)]
    text_only: bool,

    /// Override the download concurrency limit
    #[arg(long, value_name = "N")]
    concurrency: Option<u32>,

    /// Override the session cookie
    #[arg(long)]
    cookie: Option<String>,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(tag) = &self.tag {
            config.search.tag = tag.clone();
        }
        if let Some(filter) = &self.filter {
            config.search.filter = filter.clone();
        }
        if let Some(count) = self.count {
            config.search.down_count = count;
        }
        if self.latest {
            config.search.latest = true;
        }
        if self.top {
            config.search.latest = false;
        }
        if self.text_only {
            config.search.text_only = true;
        }
        if let Some(concurrency) = self.concurrency {
            config.download.max_concurrent_requests = concurrency;
        }
        if let Some(cookie) = &self.cookie {
            config.auth.cookie = cookie.clone();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let mut config = read_config(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    cli.apply_overrides(&mut config);
    validate(&config).context("invalid configuration")?;

    if config.search.down_count % 50 != 0 {
        tracing::warn!(
            "down-count {} is not a multiple of 50; \
             pages are requested whole, so more entries than asked may be fetched",
            config.search.down_count
        );
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let outcome = run_tag_down(&config).await.context("crawl failed")?;

    if !cli.quiet {
        print_statistics(&outcome.stats);
        println!();
        println!("Output directory: {}", outcome.output_dir.display());
        println!("Result log:       {}", outcome.log_path.display());
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("tag_down=info,warn"),
            1 => EnvFilter::new("tag_down=debug,info"),
            2 => EnvFilter::new("tag_down=trace,debug"),
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

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config) {
    let mode = CrawlMode::from_flags(config.search.latest, config.search.text_only);

    println!("=== Tag-Down Dry Run ===\n");

    println!("Search:");
    println!(
        "  Query: {}",
        raw_query(&config.search.tag, &config.search.filter)
    );
    println!("  Mode: {}", mode);
    println!("  Entries per page: {}", mode.page_size());
    println!(
        "  Pages: up to {}",
        mode.page_budget(config.search.down_count)
    );

    println!("\nDownload:");
    println!(
        "  Max concurrent requests: {}",
        config.download.max_concurrent_requests
    );
    match config.download.max_attempts {
        0 => println!("  Attempts per item: unlimited"),
        n => println!("  Attempts per item: {}", n),
    }

    println!("\nOutput:");
    println!("  Root: {}", config.download.output_root);
    println!("  Directory: {}", run_dir_name(config));

    println!("\n✓ Configuration is valid");
}
