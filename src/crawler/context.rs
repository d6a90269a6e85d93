//! Per-run context
//!
//! Created before the first page is requested and closed exactly once after
//! the page loop ends; `close` consumes the context.

use crate::config::Config;
use crate::output::{CsvSink, RecordSink};
use crate::state::CrawlMode;
use crate::TagDownError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Directory name used when sanitizing leaves nothing but dots
const DEFAULT_DIR_NAME: &str = "search";

/// Keeps letters, digits, `#` and `.` of a search term
pub fn sanitize_dir_name(term: &str) -> String {
    term.chars()
        .filter(|c| c.is_alphanumeric() || matches!(*c, '#' | '.'))
        .collect()
}

/// Name of the run directory: the sanitized tag, or the filter when the
/// tag is empty
pub fn run_dir_name(config: &Config) -> String {
    let term = if config.search.tag.trim().is_empty() {
        &config.search.filter
    } else {
        &config.search.tag
    };

    let name = sanitize_dir_name(term);
    if name.chars().all(|c| c == '.') {
        DEFAULT_DIR_NAME.to_string()
    } else {
        name
    }
}

/// Output directory, result log and mode of one run
pub struct RunContext {
    mode: CrawlMode,
    output_dir: PathBuf,
    sink: Arc<CsvSink>,
}

impl RunContext {
    /// Creates the output directory and opens the result log
    pub fn create(config: &Config) -> Result<Self, TagDownError> {
        let mode = CrawlMode::from_flags(config.search.latest, config.search.text_only);

        let output_dir = Path::new(&config.download.output_root).join(run_dir_name(config));
        std::fs::create_dir_all(&output_dir)?;

        let sink = CsvSink::create(&output_dir, mode.is_media())?;
        tracing::info!("Writing results to {}", sink.path().display());

        Ok(Self {
            mode,
            output_dir,
            sink: Arc::new(sink),
        })
    }

    pub fn mode(&self) -> CrawlMode {
        self.mode
    }

    /// Directory media files are saved into
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn log_path(&self) -> &Path {
        self.sink.path()
    }

    /// Shared handle to the result log
    pub fn sink(&self) -> Arc<dyn RecordSink> {
        self.sink.clone()
    }

    /// Flushes and closes the result log
    pub async fn close(self) -> Result<(), TagDownError> {
        self.sink.close().await?;
        Ok(())
    }
}
