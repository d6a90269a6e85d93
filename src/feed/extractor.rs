//! Entry extractor
//!
//! Turns one raw feed entry into records. Entries that cannot be used are
//! reported through [`ExtractError`], which callers log and skip; nothing
//! here fails a page.

use crate::feed::types::{MediaEntity, RawEntry, Tweet};
use crate::media::{derive_filename, resolve_video, ResolveError};
use crate::record::{MediaKind, MediaRef, Record};
use crate::state::CrawlMode;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

/// The service reports the end of the one-hour edit window, not the post time
pub const EDIT_WINDOW_MS: i64 = 3_600_000;

/// Marker of the short link appended to post text
pub const SHORT_LINK_MARKER: &str = "https://t.co/";

/// Host used to build post permalinks
pub const PERMALINK_BASE: &str = "https://twitter.com";

/// Why an entry produced no records
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("promoted entry")]
    Promoted,

    #[error("entry carries no post")]
    MissingTweet,

    #[error("post is missing required fields: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("post has no media")]
    NoMedia,

    #[error("post time {0} is out of range")]
    TimestampOutOfRange(i64),

    #[error("media item {index}: {source}")]
    Media { index: usize, source: ResolveError },
}

/// Records of one entry, with the media items that were left out
#[derive(Debug, Default)]
pub struct Extracted {
    pub records: Vec<Record>,

    /// `ExtractError::Media` for each item that could not be resolved
    pub unresolved: Vec<ExtractError>,
}

/// Extracts the records of one entry
///
/// # Arguments
///
/// * `entry` - The raw entry from the normalizer
/// * `mode` - The crawl mode of the run
/// * `media_dir` - Directory media files are planned into
///
/// # Returns
///
/// * `Ok(Extracted)` - One record in text mode, one per resolvable media item
///   otherwise
/// * `Err(ExtractError)` - The entry is unusable and should be skipped; in
///   media modes this includes every media item failing to resolve
pub fn extract_entry(
    entry: RawEntry,
    mode: CrawlMode,
    media_dir: &Path,
) -> Result<Extracted, ExtractError> {
    if entry.is_promoted() {
        return Err(ExtractError::Promoted);
    }

    let payload = entry.tweet.ok_or(ExtractError::MissingTweet)?;
    let tweet: Tweet = serde_json::from_value(unwrap_visibility(payload))?;
    let record = base_record(&tweet)?;

    if !mode.is_media() {
        return Ok(Extracted {
            records: vec![record],
            unresolved: Vec::new(),
        });
    }

    let media = match tweet.legacy.extended_entities {
        Some(entities) if !entities.media.is_empty() => entities.media,
        _ => return Err(ExtractError::NoMedia),
    };

    let mut extracted = Extracted::default();
    for (index, item) in media.iter().enumerate() {
        match media_ref(item, &record, media_dir) {
            Ok(media) => extracted.records.push(record.with_media(media)),
            Err(source) => extracted
                .unresolved
                .push(ExtractError::Media { index, source }),
        }
    }

    if extracted.records.is_empty() {
        if let Some(first) = std::mem::take(&mut extracted.unresolved).into_iter().next() {
            return Err(first);
        }
    }
    Ok(extracted)
}

/// Some results wrap the post one level deeper, next to visibility metadata
fn unwrap_visibility(payload: Value) -> Value {
    match payload {
        Value::Object(mut object)
            if object
                .get("tweet")
                .is_some_and(|inner| inner.get("edit_control").is_some()) =>
        {
            object.remove("tweet").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn base_record(tweet: &Tweet) -> Result<Record, ExtractError> {
    let user = &tweet.core.user_results.result.legacy;
    let handle = format!("@{}", user.screen_name);
    let source_url = format!(
        "{}/{}/status/{}",
        PERMALINK_BASE, handle, tweet.legacy.conversation_id_str
    );

    let editable_until = tweet.edit_control.editable_until_msecs;
    let timestamp = editable_until
        .checked_sub(EDIT_WINDOW_MS)
        .ok_or(ExtractError::TimestampOutOfRange(editable_until))?;

    Ok(Record {
        timestamp,
        author_display_name: user.name.clone(),
        author_handle: handle,
        source_url,
        content: strip_short_link(&tweet.legacy.full_text).to_string(),
        like_count: tweet.legacy.favorite_count,
        repost_count: tweet.legacy.retweet_count,
        reply_count: tweet.legacy.reply_count,
        media: None,
    })
}

/// Drops everything from the first short link onward
pub fn strip_short_link(text: &str) -> &str {
    text.split(SHORT_LINK_MARKER).next().unwrap_or(text)
}

fn media_ref(
    item: &MediaEntity,
    record: &Record,
    media_dir: &Path,
) -> Result<MediaRef, ResolveError> {
    let (kind, url) = match (&item.video_info, &item.media_url_https) {
        (Some(video), _) => (MediaKind::Video, resolve_video(&video.variants)?.to_string()),
        (None, Some(url)) => (MediaKind::Image, url.clone()),
        (None, None) => return Err(ResolveError::NoPlayableVariant),
    };

    let local_path = derive_filename(
        media_dir,
        record.timestamp,
        &record.author_handle,
        &url,
        kind,
    );

    Ok(MediaRef {
        kind,
        url,
        local_path,
    })
}
