//! Result sink trait and errors
//!
//! A sink receives every record a run produces. Appends may arrive from many
//! download tasks at once and in any order; implementations serialize them.

use crate::record::Record;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write CSV row: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sink is closed")]
    Closed,

    #[error("Sink writer stopped unexpectedly: {0}")]
    Writer(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Append-only destination for records
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Writes one record
    async fn append(&self, record: Record) -> OutputResult<()>;

    /// Flushes and releases the destination; later appends fail
    async fn close(&self) -> OutputResult<()>;
}
