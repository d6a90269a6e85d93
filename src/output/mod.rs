//! Output module for crawl results
//!
//! This module handles:
//! - The record sink interface
//! - The CSV result log
//! - Crawl statistics

mod csv_sink;
pub mod stats;
mod traits;

pub use csv_sink::{display_timestamp, CsvSink};
pub use stats::{print_statistics, CrawlStats, StopReason};
pub use traits::{OutputError, OutputResult, RecordSink};
