//! Crawl statistics
//!
//! Schema drift in the remote feed shows up here first: a run with many
//! malformed entries or zero records is reported rather than failed.

use crate::feed::{ExtractError, TerminalReason};
use std::fmt;

/// Why the page loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopReason {
    /// The loop has not ended yet
    #[default]
    Running,

    /// Enough pages were requested to cover the download count
    PageBudgetExhausted,

    /// A page carried nothing to extract
    TerminalPage(TerminalReason),

    /// A page had entries but no cursor to continue from
    NoCursor,

    /// A media page yielded no downloadable media
    NoMedia,

    /// A page carried no entries at all
    NoEntries,

    /// A page request failed
    Failed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::PageBudgetExhausted => write!(f, "page budget exhausted"),
            Self::TerminalPage(reason) => write!(f, "terminal page ({})", reason),
            Self::NoCursor => write!(f, "no continuation cursor"),
            Self::NoMedia => write!(f, "page without media"),
            Self::NoEntries => write!(f, "page without entries"),
            Self::Failed => write!(f, "page request failed"),
        }
    }
}

/// Counters collected over one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub pages_requested: u32,
    pub entries_seen: u64,
    pub promoted_skipped: u64,
    pub malformed_skipped: u64,
    pub without_media: u64,
    /// Media items left out of posts that still produced records
    pub media_unresolved: u64,
    pub records_written: u64,
    pub downloads_completed: u64,
    pub download_retries: u64,
    pub downloads_abandoned: u64,
    pub stop_reason: StopReason,
}

impl CrawlStats {
    /// Counts an entry the extractor rejected
    pub fn record_skip(&mut self, error: &ExtractError) {
        match error {
            ExtractError::Promoted => self.promoted_skipped += 1,
            ExtractError::NoMedia => self.without_media += 1,
            ExtractError::MissingTweet
            | ExtractError::Malformed(_)
            | ExtractError::TimestampOutOfRange(_)
            | ExtractError::Media { .. } => self.malformed_skipped += 1,
        }
    }

    /// Total entries that produced no record
    pub fn total_skipped(&self) -> u64 {
        self.promoted_skipped + self.malformed_skipped + self.without_media
    }
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &CrawlStats) {
    println!("=== Crawl Statistics ===\n");
    println!("Pages requested:      {}", stats.pages_requested);
    println!("Entries seen:         {}", stats.entries_seen);
    println!("Records written:      {}", stats.records_written);

    println!("\nSkipped entries ({}):", stats.total_skipped());
    println!("  Promoted:           {}", stats.promoted_skipped);
    println!("  Malformed:          {}", stats.malformed_skipped);
    println!("  Without media:      {}", stats.without_media);

    println!("\nDownloads:");
    println!("  Completed:          {}", stats.downloads_completed);
    println!("  Retried attempts:   {}", stats.download_retries);
    println!("  Abandoned:          {}", stats.downloads_abandoned);
    println!("  Unresolved media:   {}", stats.media_unresolved);

    println!("\nStopped: {}", stats.stop_reason);
}
