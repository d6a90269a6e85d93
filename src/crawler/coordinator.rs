//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the page loop that coordinates:
//! - Requesting search pages one at a time
//! - Normalizing each page and extracting its entries
//! - Appending text records, or downloading media before the next page
//! - Deciding when the crawl is over

use crate::config::Config;
use crate::crawler::context::RunContext;
use crate::crawler::credentials::Credentials;
use crate::crawler::fetcher::{build_http_client, HttpMediaFetcher, MEDIA_TIMEOUT, PAGE_TIMEOUT};
use crate::crawler::pipeline::{DownloadPipeline, DownloadTask, RetryPolicy};
use crate::crawler::search::{raw_query, SearchClient, SearchQuery};
use crate::feed::{extract_entry, normalize_page, RawEntry};
use crate::output::{CrawlStats, RecordSink, StopReason};
use crate::record::{CrawlCursor, Record};
use crate::state::{CrawlMode, PageState};
use crate::TagDownError;
use std::path::PathBuf;
use std::sync::Arc;

/// Main crawler coordinator structure
pub struct Coordinator {
    mode: CrawlMode,
    media_dir: PathBuf,
    page_budget: u32,
    search: SearchClient,
    pipeline: DownloadPipeline,
    sink: Arc<dyn RecordSink>,
    stats: CrawlStats,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The run configuration
    /// * `credentials` - Parsed session credentials
    /// * `context` - The run's output directory and result log
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(TagDownError)` - Failed to build the HTTP clients or the query
    pub fn new(
        config: &Config,
        credentials: Credentials,
        context: &RunContext,
    ) -> Result<Self, TagDownError> {
        let mode = context.mode();

        let query = SearchQuery::new(
            &config.api.base_url,
            raw_query(&config.search.tag, &config.search.filter),
            mode,
        )?;
        let search = SearchClient::new(build_http_client(PAGE_TIMEOUT)?, query, credentials);

        let fetcher = Arc::new(HttpMediaFetcher::new(build_http_client(MEDIA_TIMEOUT)?));
        let pipeline = DownloadPipeline::new(
            fetcher,
            config.download.max_concurrent_requests as usize,
            RetryPolicy::from_config(&config.download),
        );

        Ok(Self::with_parts(
            mode,
            context.output_dir().to_path_buf(),
            mode.page_budget(config.search.down_count),
            search,
            pipeline,
            context.sink(),
        ))
    }

    /// Assembles a coordinator from prepared parts
    pub fn with_parts(
        mode: CrawlMode,
        media_dir: PathBuf,
        page_budget: u32,
        search: SearchClient,
        pipeline: DownloadPipeline,
        sink: Arc<dyn RecordSink>,
    ) -> Self {
        Self {
            mode,
            media_dir,
            page_budget,
            search,
            pipeline,
            sink,
            stats: CrawlStats::default(),
        }
    }

    /// Statistics collected so far
    pub fn stats(&self) -> &CrawlStats {
        &self.stats
    }

    /// Runs the page loop
    ///
    /// Pages are strictly sequential: the next page is requested only after
    /// the current page's records are appended and, in media modes, its
    /// downloads have all finished. The sink is not closed here.
    pub async fn run(&mut self) -> Result<(), TagDownError> {
        tracing::info!(
            "Starting {} crawl for \"{}\": {} entries per page, up to {} pages",
            self.mode,
            self.search.query().raw_query(),
            self.mode.page_size(),
            self.page_budget
        );

        let result = self.page_loop().await;
        if result.is_err() {
            self.stats.stop_reason = StopReason::Failed;
        }

        tracing::info!(
            "Crawl finished ({}): {} pages, {} records, {} entries skipped",
            self.stats.stop_reason,
            self.stats.pages_requested,
            self.stats.records_written,
            self.stats.total_skipped()
        );
        if self.stats.records_written == 0 {
            tracing::warn!("No records were produced; check the query and the cookie");
        }

        result
    }

    async fn page_loop(&mut self) -> Result<(), TagDownError> {
        let mut cursor: CrawlCursor = None;

        for page_number in 1..=self.page_budget {
            let state = PageState::from_cursor(&cursor);
            self.stats.pages_requested += 1;
            let response = self.search.fetch_page(&cursor).await?;

            let page = normalize_page(&response, self.mode, state);
            if let Some(reason) = page.terminal {
                tracing::info!("Page {} is terminal: {}", page_number, reason);
                self.stats.stop_reason = StopReason::TerminalPage(reason);
                return Ok(());
            }

            let entry_count = page.entries.len();
            if entry_count == 0 {
                tracing::info!("Page {} has no entries", page_number);
                self.stats.stop_reason = StopReason::NoEntries;
                return Ok(());
            }

            let records = self.extract_page(page.entries);
            tracing::info!(
                "Page {}: {} entries, {} records",
                page_number,
                entry_count,
                records.len()
            );
            if records.is_empty() {
                tracing::warn!(
                    "Page {} had {} entries but none could be extracted",
                    page_number,
                    entry_count
                );
            }

            if self.mode.is_media() {
                let tasks: Vec<DownloadTask> = records
                    .into_iter()
                    .filter_map(DownloadTask::from_record)
                    .collect();
                if tasks.is_empty() {
                    self.stats.stop_reason = StopReason::NoMedia;
                    return Ok(());
                }

                let report = self.pipeline.run(tasks, Arc::clone(&self.sink)).await?;
                self.stats.downloads_completed += report.completed;
                self.stats.download_retries += report.retries;
                self.stats.downloads_abandoned += report.abandoned;
                self.stats.records_written += report.completed;
            } else {
                for record in records {
                    self.sink.append(record).await?;
                    self.stats.records_written += 1;
                }
            }

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => {
                    tracing::info!("Page {} has no continuation cursor", page_number);
                    self.stats.stop_reason = StopReason::NoCursor;
                    return Ok(());
                }
            }
        }

        self.stats.stop_reason = StopReason::PageBudgetExhausted;
        Ok(())
    }

    /// Extracts every entry of a page, skipping unusable ones
    fn extract_page(&mut self, entries: Vec<RawEntry>) -> Vec<Record> {
        let mut records = Vec::new();

        for entry in entries {
            self.stats.entries_seen += 1;
            let entry_id = entry.entry_id.clone().unwrap_or_default();

            match extract_entry(entry, self.mode, &self.media_dir) {
                Ok(extracted) => {
                    for unresolved in &extracted.unresolved {
                        tracing::debug!("Leaving out from entry {}: {}", entry_id, unresolved);
                    }
                    self.stats.media_unresolved += extracted.unresolved.len() as u64;
                    records.extend(extracted.records);
                }
                Err(e) => {
                    tracing::debug!("Skipping entry {}: {}", entry_id, e);
                    self.stats.record_skip(&e);
                }
            }
        }

        records
    }
}
