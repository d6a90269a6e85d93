//! Output record types
//!
//! A `Record` is one row of the result log: one per text post in text mode,
//! one per media item in media modes.

use std::fmt;
use std::path::PathBuf;

/// Opaque continuation token; `None` means "start of feed"
pub type CrawlCursor = Option<String>;

/// Kind of a downloaded media item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// File extension used for saved files of this kind
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Image => "png",
            Self::Video => "mp4",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "Image"),
            Self::Video => write!(f, "Video"),
        }
    }
}

/// The media reference carried by a media-mode record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub kind: MediaKind,

    /// Remote source of the media
    pub url: String,

    /// Planned destination on disk
    pub local_path: PathBuf,
}

/// One logical output row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Event time in milliseconds since the epoch
    pub timestamp: i64,

    pub author_display_name: String,

    /// Author handle including the leading `@`
    pub author_handle: String,

    /// Canonical permalink of the post
    pub source_url: String,

    /// Post text with the trailing short link removed
    pub content: String,

    pub like_count: u64,
    pub repost_count: u64,
    pub reply_count: u64,

    /// Present on media-mode records only
    pub media: Option<MediaRef>,
}

impl Record {
    /// Returns a copy of this record carrying the given media reference
    pub fn with_media(&self, media: MediaRef) -> Self {
        Self {
            media: Some(media),
            ..self.clone()
        }
    }
}
