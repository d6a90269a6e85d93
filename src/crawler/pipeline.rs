//! Download pipeline
//!
//! This module handles:
//! - Fetching every media item of a page under a global concurrency limit
//! - Retrying failed fetches and writes of an item
//! - Forwarding each saved item's record to the sink as it completes
//!
//! Completion order is whatever the network gives; the sink takes appends
//! in any order.

use crate::config::DownloadConfig;
use crate::crawler::fetcher::{FetchError, MediaFetcher};
use crate::media;
use crate::output::RecordSink;
use crate::record::{MediaKind, Record};
use crate::TagDownError;
use std::num::NonZeroU32;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// One media item to fetch and save
#[derive(Debug, Clone)]
pub struct DownloadTask {
    /// Remote source, without the image quality query
    pub remote_url: String,
    pub record: Record,
    pub kind: MediaKind,
}

impl DownloadTask {
    /// Creates the task for a media record; `None` for text records
    pub fn from_record(record: Record) -> Option<Self> {
        let media = record.media.as_ref()?;
        Some(Self {
            remote_url: media.url.clone(),
            kind: media.kind,
            record,
        })
    }

    /// URL actually requested
    pub fn fetch_url(&self) -> String {
        media::fetch_url(&self.remote_url, self.kind)
    }

    /// Planned destination on disk
    pub fn local_path(&self) -> &Path {
        self.record
            .media
            .as_ref()
            .map(|media| media.local_path.as_path())
            .unwrap_or_else(|| Path::new(""))
    }
}

/// How often and how fast a failed item is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    /// Attempts before giving up; `None` retries forever
    pub max_attempts: Option<NonZeroU32>,

    /// Pause between attempts
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Retry forever without pausing
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn from_config(config: &DownloadConfig) -> Self {
        Self {
            max_attempts: NonZeroU32::new(config.max_attempts),
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    /// Returns true if no attempt may follow attempt number `attempt`
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        self.max_attempts
            .is_some_and(|max| attempt >= max.get())
    }
}

/// Result of one pipeline run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub completed: u64,
    pub retries: u64,
    pub abandoned: u64,
}

enum TaskOutcome {
    Completed { retries: u64 },
    Abandoned { retries: u64 },
}

/// Bounded-concurrency media downloader
pub struct DownloadPipeline {
    fetcher: Arc<dyn MediaFetcher>,
    gate: Arc<Semaphore>,
    policy: RetryPolicy,
}

impl DownloadPipeline {
    /// Creates a pipeline
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Source of media bytes
    /// * `max_concurrent` - Fetches allowed in flight at once (at least 1)
    /// * `policy` - Retry behavior for failed items
    pub fn new(fetcher: Arc<dyn MediaFetcher>, max_concurrent: usize, policy: RetryPolicy) -> Self {
        Self {
            fetcher,
            gate: Arc::new(Semaphore::new(max_concurrent.max(1))),
            policy,
        }
    }

    /// Downloads every task and forwards each saved item's record to `sink`
    ///
    /// Returns once every task has completed or, under a bounded policy,
    /// been abandoned. Errors are only returned for sink failures and
    /// panicked tasks; download failures are retried.
    pub async fn run(
        &self,
        tasks: Vec<DownloadTask>,
        sink: Arc<dyn RecordSink>,
    ) -> Result<DownloadReport, TagDownError> {
        let total = tasks.len();
        let mut running = JoinSet::new();

        for task in tasks {
            running.spawn(download_task(
                task,
                Arc::clone(&self.fetcher),
                Arc::clone(&self.gate),
                self.policy,
                Arc::clone(&sink),
            ));
        }

        let mut report = DownloadReport::default();
        let mut finished = 0usize;

        while let Some(joined) = running.join_next().await {
            let outcome = joined.map_err(|e| TagDownError::Task(e.to_string()))??;
            match outcome {
                TaskOutcome::Completed { retries } => {
                    report.completed += 1;
                    report.retries += retries;
                }
                TaskOutcome::Abandoned { retries } => {
                    report.abandoned += 1;
                    report.retries += retries;
                }
            }

            finished += 1;
            if finished % 10 == 0 || finished == total {
                tracing::info!("Download progress: {}/{}", finished, total);
            }
        }

        Ok(report)
    }
}

async fn download_task(
    task: DownloadTask,
    fetcher: Arc<dyn MediaFetcher>,
    gate: Arc<Semaphore>,
    policy: RetryPolicy,
    sink: Arc<dyn RecordSink>,
) -> Result<TaskOutcome, TagDownError> {
    let url = task.fetch_url();
    let mut attempt: u32 = 0;

    loop {
        attempt = attempt.saturating_add(1);

        match attempt_download(&task, &url, fetcher.as_ref(), &gate).await {
            Ok(()) => {
                tracing::debug!("Saved {}", task.local_path().display());
                sink.append(task.record).await?;
                return Ok(TaskOutcome::Completed {
                    retries: u64::from(attempt - 1),
                });
            }
            Err(e) => {
                tracing::warn!(
                    "Download of {} failed (attempt {}): {}",
                    task.local_path().display(),
                    attempt,
                    e
                );

                if policy.is_exhausted(attempt) {
                    tracing::error!(
                        "Giving up on {} after {} attempts",
                        task.remote_url,
                        attempt
                    );
                    return Ok(TaskOutcome::Abandoned {
                        retries: u64::from(attempt - 1),
                    });
                }

                if !policy.backoff.is_zero() {
                    tokio::time::sleep(policy.backoff).await;
                }
            }
        }
    }
}

/// One fetch-and-write attempt; the gate is held only while fetching
async fn attempt_download(
    task: &DownloadTask,
    url: &str,
    fetcher: &dyn MediaFetcher,
    gate: &Semaphore,
) -> Result<(), FetchError> {
    let body = {
        let _permit = gate
            .acquire()
            .await
            .map_err(|_| FetchError::Write(std::io::Error::other("download gate closed")))?;
        fetcher.fetch(url).await?
    };

    tokio::fs::write(task.local_path(), body).await?;
    Ok(())
}
