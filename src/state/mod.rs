//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlMode`: The feed family and recording rules fixed for a run
//! - `PageState`: Whether the next page is the first one or a continuation

mod mode;
mod page_state;

// Re-export main types
pub use mode::CrawlMode;
pub use page_state::PageState;
