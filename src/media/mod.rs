//! Media module: picks the best representation of a media item and decides
//! where it is saved.

mod resolver;

pub use resolver::{
    derive_filename, fetch_url, format_file_timestamp, resolve_video, short_hash,
    ResolveError, VideoVariant, IMAGE_QUALITY_QUERY,
};
