//! Tag-Down: a tag search crawler
//!
//! This crate pages through a social-media search timeline, extracts post
//! metadata and media references, downloads media under a concurrency cap,
//! and writes one CSV row per extracted record.

pub mod config;
pub mod crawler;
pub mod feed;
pub mod media;
pub mod output;
pub mod record;
pub mod state;

use thiserror::Error;

/// Main error type for Tag-Down operations
#[derive(Debug, Error)]
pub enum TagDownError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid credentials: {0}")]
    Credentials(#[from] CredentialsError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Response from {url} is not valid JSON: {source}")]
    InvalidJson {
        url: String,
        source: serde_json::Error,
    },

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Download task failed: {0}")]
    Task(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Cookie-specific errors, raised before any request is sent
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialsError {
    #[error("cookie is missing the `{0}` field")]
    MissingField(&'static str),
}

/// Result type alias for Tag-Down operations
pub type Result<T> = std::result::Result<T, TagDownError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_tag_down, RunOutcome};
pub use record::{CrawlCursor, MediaKind, Record};
pub use state::{CrawlMode, PageState};
