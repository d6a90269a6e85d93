//! Feed module: reading search timeline pages
//!
//! This module contains:
//! - A typed view of the timeline response
//! - The page normalizer (cursor and entry list per response shape)
//! - The entry extractor (records from one entry)

mod extractor;
mod normalizer;
pub mod types;

pub use extractor::{
    extract_entry, strip_short_link, ExtractError, Extracted, EDIT_WINDOW_MS,
};
pub use normalizer::{
    normalize_page, ListLocation, NormalizedPage, ShapeFamily, ShapeRule, TerminalReason,
};
pub use types::RawEntry;
