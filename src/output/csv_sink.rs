//! CSV result log
//!
//! One blocking writer task owns the file. `append` and `close` only send
//! commands to it, so concurrent callers never touch the handle.

use crate::output::traits::{OutputError, OutputResult, RecordSink};
use crate::record::Record;
use async_trait::async_trait;
use chrono::{Local, TimeZone};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const TEXT_HEADER: [&str; 8] = [
    "Tweet Date",
    "Display Name",
    "User Name",
    "Tweet URL",
    "Tweet Content",
    "Favorite Count",
    "Retweet Count",
    "Reply Count",
];

const MEDIA_HEADER: [&str; 11] = [
    "Tweet Date",
    "Display Name",
    "User Name",
    "Tweet URL",
    "Media Type",
    "Media URL",
    "Saved Path",
    "Tweet Content",
    "Favorite Count",
    "Retweet Count",
    "Reply Count",
];

/// Pending appends buffered ahead of the writer
const COMMAND_BUFFER: usize = 256;

enum SinkCommand {
    Append(Record),
    Close(oneshot::Sender<OutputResult<()>>),
}

/// CSV-backed record sink
pub struct CsvSink {
    path: PathBuf,
    commands: mpsc::Sender<SinkCommand>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl CsvSink {
    /// Creates the log file in `dir` and starts its writer
    ///
    /// The file is named after the current local time and starts with a
    /// run-time banner row and the header for the chosen layout.
    ///
    /// # Arguments
    ///
    /// * `dir` - Directory to create the log in
    /// * `with_media` - Whether rows carry the media columns
    ///
    /// Must be called from within a Tokio runtime.
    pub fn create(dir: &Path, with_media: bool) -> OutputResult<Self> {
        let now = Local::now();
        let path = dir.join(format!("{}-mode.csv", now.format("%Y-%m-%d %H-%M-%S")));

        let mut file = File::create(&path)?;
        file.write_all(UTF8_BOM)?;

        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(file);
        writer.write_record([format!("Run Time : {}", now.format("%Y-%m-%d %H-%M-%S"))])?;
        if with_media {
            writer.write_record(MEDIA_HEADER)?;
        } else {
            writer.write_record(TEXT_HEADER)?;
        }

        let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
        let handle = tokio::task::spawn_blocking(move || run_writer(writer, receiver, with_media));

        tracing::debug!("Opened result log {}", path.display());

        Ok(Self {
            path,
            commands,
            writer: Mutex::new(Some(handle)),
        })
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordSink for CsvSink {
    async fn append(&self, record: Record) -> OutputResult<()> {
        self.commands
            .send(SinkCommand::Append(record))
            .await
            .map_err(|_| OutputError::Closed)
    }

    async fn close(&self) -> OutputResult<()> {
        let (ack, done) = oneshot::channel();
        self.commands
            .send(SinkCommand::Close(ack))
            .await
            .map_err(|_| OutputError::Closed)?;

        let result = done
            .await
            .map_err(|_| OutputError::Writer("writer dropped the close request".to_string()))?;

        let handle = self.writer.lock().ok().and_then(|mut guard| guard.take());
        if let Some(handle) = handle {
            handle
                .await
                .map_err(|e| OutputError::Writer(e.to_string()))?;
        }

        tracing::debug!("Closed result log {}", self.path.display());
        result
    }
}

fn run_writer(
    mut writer: csv::Writer<File>,
    mut receiver: mpsc::Receiver<SinkCommand>,
    with_media: bool,
) {
    // The first failed row is reported when the sink is closed
    let mut first_error: Option<OutputError> = None;

    while let Some(command) = receiver.blocking_recv() {
        match command {
            SinkCommand::Append(record) => {
                if let Err(e) = writer.write_record(row(&record, with_media)) {
                    tracing::error!("Failed to log record {}: {}", record.source_url, e);
                    first_error.get_or_insert(OutputError::Csv(e));
                }
            }
            SinkCommand::Close(ack) => {
                let result = match first_error.take() {
                    Some(e) => Err(e),
                    None => writer.flush().map_err(OutputError::from),
                };
                let _ = ack.send(result);
                return;
            }
        }
    }

    // All senders dropped without a close
    if let Err(e) = writer.flush() {
        tracing::error!("Failed to flush result log: {}", e);
    }
}

/// Formats a millisecond timestamp for display as local `YYYY-MM-DD HH:MM`
pub fn display_timestamp(timestamp_ms: i64) -> String {
    match Local.timestamp_millis_opt(timestamp_ms).earliest() {
        Some(time) => time.format("%Y-%m-%d %H:%M").to_string(),
        None => timestamp_ms.to_string(),
    }
}

fn row(record: &Record, with_media: bool) -> Vec<String> {
    let mut fields = vec![
        display_timestamp(record.timestamp),
        record.author_display_name.clone(),
        record.author_handle.clone(),
        record.source_url.clone(),
    ];

    if with_media {
        match &record.media {
            Some(media) => fields.extend([
                media.kind.to_string(),
                media.url.clone(),
                media.local_path.display().to_string(),
            ]),
            None => fields.extend([String::new(), String::new(), String::new()]),
        }
    }

    fields.extend([
        record.content.clone(),
        record.like_count.to_string(),
        record.repost_count.to_string(),
        record.reply_count.to_string(),
    ]);
    fields
}
