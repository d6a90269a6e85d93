//! Crawler module for paging the search feed and saving media
//!
//! This module contains the core crawling logic, including:
//! - Session credentials and search requests
//! - Media fetching with retry logic
//! - The bounded-concurrency download pipeline
//! - Overall crawl coordination

mod context;
mod coordinator;
mod credentials;
mod fetcher;
mod pipeline;
mod search;

pub use context::{run_dir_name, sanitize_dir_name, RunContext};
pub use coordinator::Coordinator;
pub use credentials::Credentials;
pub use fetcher::{
    build_http_client, FetchError, HttpMediaFetcher, MediaFetcher, MEDIA_TIMEOUT, PAGE_TIMEOUT,
};
pub use pipeline::{DownloadPipeline, DownloadReport, DownloadTask, RetryPolicy};
pub use search::{raw_query, SearchClient, SearchQuery, SEARCH_TIMELINE_PATH};

use crate::config::Config;
use crate::output::CrawlStats;
use crate::TagDownError;
use std::path::PathBuf;

/// What a finished run leaves behind
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Directory holding the media files and the log
    pub output_dir: PathBuf,

    /// The CSV result log
    pub log_path: PathBuf,

    pub stats: CrawlStats,
}

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Check the cookie for the required fields
/// 2. Create the output directory and open the result log
/// 3. Page through the search feed, downloading media per page
/// 4. Close the result log, also when the page loop failed
///
/// # Arguments
///
/// * `config` - The run configuration
///
/// # Returns
///
/// * `Ok(RunOutcome)` - Crawl completed
/// * `Err(TagDownError)` - Invalid credentials (before any network or disk
///   activity), or a failure while crawling
pub async fn run_tag_down(config: &Config) -> Result<RunOutcome, TagDownError> {
    let credentials = Credentials::from_cookie(&config.auth.cookie)?;

    let context = RunContext::create(config)?;
    let output_dir = context.output_dir().to_path_buf();
    let log_path = context.log_path().to_path_buf();

    let result = match Coordinator::new(config, credentials, &context) {
        Ok(mut coordinator) => coordinator.run().await.map(|()| coordinator.stats().clone()),
        Err(e) => Err(e),
    };

    let closed = context.close().await;
    let stats = result?;
    closed?;

    Ok(RunOutcome {
        output_dir,
        log_path,
        stats,
    })
}
