//! Typed view of the search timeline response
//!
//! Only the parts the crawler reads are modelled. Every field is optional so
//! that one odd entry does not fail the whole page; the normalizer decides
//! what a missing piece means.

use crate::media::VideoVariant;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// JSON pointer to the instruction list inside a search response
pub const INSTRUCTIONS_POINTER: &str =
    "/data/search_by_raw_query/search_timeline/timeline/instructions";

/// One timeline instruction
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Instruction {
    #[serde(rename = "type")]
    pub kind: Option<String>,

    /// `TimelineAddEntries` payload
    pub entries: Option<Vec<TimelineEntry>>,

    /// `TimelineReplaceEntry` payload (continuation cursors)
    pub entry: Option<TimelineEntry>,

    /// `TimelineAddToModule` payload (media grid continuation)
    #[serde(rename = "moduleItems")]
    pub module_items: Option<Vec<ModuleItem>>,
}

/// A top-level timeline entry: a post, a module, or a cursor
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimelineEntry {
    #[serde(rename = "entryId")]
    pub entry_id: Option<String>,

    #[serde(default)]
    pub content: EntryContent,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryContent {
    /// Cursor value on cursor entries
    pub value: Option<String>,

    /// Grid items on module entries
    pub items: Option<Vec<ModuleItem>>,

    #[serde(rename = "itemContent")]
    pub item_content: Option<ItemContent>,
}

/// An item inside a module (the media grid)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleItem {
    #[serde(rename = "entryId")]
    pub entry_id: Option<String>,

    pub item: Option<ModuleItemBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleItemBody {
    #[serde(rename = "itemContent")]
    pub item_content: Option<ItemContent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemContent {
    pub tweet_results: Option<TweetResults>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TweetResults {
    /// Left untyped here; the extractor owns the post schema
    pub result: Option<Value>,
}

/// A feed entry handed from the normalizer to the extractor
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntry {
    /// Entry identifier, absent on first-page grid items
    pub entry_id: Option<String>,

    /// The post payload, if the entry carries one
    pub tweet: Option<Value>,
}

impl RawEntry {
    /// Returns true if the identifier marks the entry as advertising
    pub fn is_promoted(&self) -> bool {
        self.entry_id
            .as_deref()
            .is_some_and(|id| id.contains("promoted"))
    }
}

impl From<TimelineEntry> for RawEntry {
    fn from(entry: TimelineEntry) -> Self {
        Self {
            entry_id: entry.entry_id,
            tweet: entry
                .content
                .item_content
                .and_then(|content| content.tweet_results)
                .and_then(|results| results.result),
        }
    }
}

impl From<ModuleItem> for RawEntry {
    fn from(item: ModuleItem) -> Self {
        Self {
            entry_id: item.entry_id,
            tweet: item
                .item
                .and_then(|body| body.item_content)
                .and_then(|content| content.tweet_results)
                .and_then(|results| results.result),
        }
    }
}

/// The fields of a post the extractor requires
#[derive(Debug, Clone, Deserialize)]
pub struct Tweet {
    pub core: TweetCore,
    pub edit_control: EditControl,
    pub legacy: TweetLegacy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TweetCore {
    pub user_results: UserResults,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserResults {
    pub result: UserResult,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserResult {
    pub legacy: UserLegacy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserLegacy {
    pub name: String,
    pub screen_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditControl {
    #[serde(deserialize_with = "millis_from_string_or_number")]
    pub editable_until_msecs: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TweetLegacy {
    pub favorite_count: u64,
    pub retweet_count: u64,
    pub reply_count: u64,
    pub conversation_id_str: String,
    pub full_text: String,
    pub extended_entities: Option<ExtendedEntities>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtendedEntities {
    pub media: Vec<MediaEntity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaEntity {
    pub media_url_https: Option<String>,
    pub video_info: Option<VideoInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoInfo {
    pub variants: Vec<VideoVariant>,
}

/// The service encodes millisecond timestamps as strings
fn millis_from_string_or_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Millis {
        Text(String),
        Number(i64),
    }

    match Millis::deserialize(deserializer)? {
        Millis::Number(value) => Ok(value),
        Millis::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}
