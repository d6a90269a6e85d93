//! Media representation selection and output file naming

use crate::record::MediaKind;
use chrono::{Local, TimeZone};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Query appended to image URLs to request the largest rendition
pub const IMAGE_QUALITY_QUERY: &str = "format=png&name=4096x4096";

/// Errors raised while resolving a media descriptor
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("video has no playable variant")]
    NoPlayableVariant,
}

/// One encoding of a video
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VideoVariant {
    pub url: String,

    /// Absent on playlist variants
    #[serde(default)]
    pub bitrate: Option<u64>,
}

/// Picks the URL of the best video variant
///
/// A single variant is returned as-is, which covers animated images that are
/// served as one-variant videos. Otherwise the variant with the strictly
/// greatest declared bitrate wins; the first one wins a tie and variants
/// without a bitrate are ignored.
///
/// # Example
///
/// ```
/// use tag_down::media::{resolve_video, VideoVariant};
///
/// let variants = vec![
///     VideoVariant { url: "A".to_string(), bitrate: Some(500) },
///     VideoVariant { url: "B".to_string(), bitrate: Some(1200) },
/// ];
/// assert_eq!(resolve_video(&variants).unwrap(), "B");
/// ```
pub fn resolve_video(variants: &[VideoVariant]) -> Result<&str, ResolveError> {
    if let [only] = variants {
        return Ok(&only.url);
    }

    let mut best: Option<(&VideoVariant, u64)> = None;
    for variant in variants {
        if let Some(bitrate) = variant.bitrate {
            if best.map_or(true, |(_, max)| bitrate > max) {
                best = Some((variant, bitrate));
            }
        }
    }

    best.map(|(variant, _)| variant.url.as_str())
        .ok_or(ResolveError::NoPlayableVariant)
}

/// URL to request for a media item; images get the quality query
pub fn fetch_url(media_url: &str, kind: MediaKind) -> String {
    match kind {
        MediaKind::Image => format!("{}?{}", media_url, IMAGE_QUALITY_QUERY),
        MediaKind::Video => media_url.to_string(),
    }
}

/// First four hex characters of the SHA-256 digest of the URL
pub fn short_hash(media_url: &str) -> String {
    let digest = Sha256::digest(media_url.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(4);
    encoded
}

/// Formats a millisecond timestamp as local `YYYY-MM-DD HH-MM`
pub fn format_file_timestamp(timestamp_ms: i64) -> String {
    match Local.timestamp_millis_opt(timestamp_ms).earliest() {
        Some(time) => time.format("%Y-%m-%d %H-%M").to_string(),
        None => timestamp_ms.to_string(),
    }
}

/// Derives the destination path of a media item
///
/// The name is `{time}_{handle}_{hash}.{ext}`, so re-fetching the same URL
/// within a run lands on the same file.
pub fn derive_filename(
    base_dir: &Path,
    timestamp_ms: i64,
    handle: &str,
    media_url: &str,
    kind: MediaKind,
) -> PathBuf {
    base_dir.join(format!(
        "{}_{}_{}.{}",
        format_file_timestamp(timestamp_ms),
        handle,
        short_hash(media_url),
        kind.extension()
    ))
}
