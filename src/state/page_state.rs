/// Page state definitions for the pagination state machine
///
/// A crawl starts in `Initial` and is in `Continuation` for every page after
/// the first, since only the first request goes out without a cursor. The
/// state decides which response shape to expect.
use crate::record::CrawlCursor;
use std::fmt;

/// Position of the next request within the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    /// No cursor yet; the next page is the first one
    Initial,

    /// A cursor from a previous page is being followed
    Continuation,
}

impl PageState {
    /// Derives the state from the cursor the next request will carry
    pub fn from_cursor(cursor: &CrawlCursor) -> Self {
        match cursor {
            None => Self::Initial,
            Some(_) => Self::Continuation,
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial => write!(f, "initial"),
            Self::Continuation => write!(f, "continuation"),
        }
    }
}
