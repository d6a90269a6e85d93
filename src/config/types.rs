use serde::Deserialize;

/// Main configuration structure for Tag-Down
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub search: SearchConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// What to search for and how much of it
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Search tag (e.g. "#ig"); may be empty when a filter is given
    #[serde(default)]
    pub tag: String,

    /// Advanced search expression appended to the tag
    #[serde(default)]
    pub filter: String,

    /// Number of feed entries to request in total
    #[serde(rename = "down-count")]
    pub down_count: u32,

    /// Crawl the "latest" feed instead of the media grid
    #[serde(default)]
    pub latest: bool,

    /// Record post text only, without downloading media
    #[serde(rename = "text-only", default)]
    pub text_only: bool,
}

/// Session credentials
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Raw browser cookie string; must carry `auth_token` and `ct0`
    pub cookie: String,
}

/// Media download behavior
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadConfig {
    /// Maximum number of media fetches in flight
    #[serde(rename = "max-concurrent-requests", default = "default_concurrency")]
    pub max_concurrent_requests: u32,

    /// Directory in which the per-run output directory is created
    #[serde(rename = "output-root", default = "default_output_root")]
    pub output_root: String,

    /// Attempts per media item before giving up (0 = never give up)
    #[serde(rename = "max-attempts", default)]
    pub max_attempts: u32,

    /// Delay between attempts on the same media item (milliseconds)
    #[serde(rename = "retry-backoff-ms", default)]
    pub retry_backoff_ms: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_concurrency(),
            output_root: default_output_root(),
            max_attempts: 0,
            retry_backoff_ms: 0,
        }
    }
}

/// Remote endpoint settings
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Scheme and host of the search service
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

pub const DEFAULT_CONCURRENCY: u32 = 8;

fn default_concurrency() -> u32 {
    DEFAULT_CONCURRENCY
}

fn default_output_root() -> String {
    ".".to_string()
}

fn default_base_url() -> String {
    "https://twitter.com".to_string()
}
