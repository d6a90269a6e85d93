/// Crawl mode definitions
///
/// The mode is fixed for a whole run and selects the feed family, the page
/// size, and which normalization and extraction rules apply.
use std::fmt;

/// Which feed to crawl and what to record from it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlMode {
    /// Media grid of the search ("top" results), downloading media
    MediaTop,

    /// Latest posts of the search, downloading media
    MediaLatest,

    /// Latest posts of the search, recording text only
    TextOnly,
}

impl CrawlMode {
    /// Chooses the mode from the two user switches; text-only wins
    pub fn from_flags(prefer_latest: bool, text_only: bool) -> Self {
        if text_only {
            Self::TextOnly
        } else if prefer_latest {
            Self::MediaLatest
        } else {
            Self::MediaTop
        }
    }

    /// Entries requested per page
    pub fn page_size(&self) -> u32 {
        match self {
            Self::MediaTop => 50,
            Self::MediaLatest | Self::TextOnly => 20,
        }
    }

    /// Value of the remote `product` parameter
    pub fn product(&self) -> &'static str {
        match self {
            Self::MediaTop => "Media",
            Self::MediaLatest | Self::TextOnly => "Latest",
        }
    }

    /// Returns true if this mode downloads media
    pub fn is_media(&self) -> bool {
        !matches!(self, Self::TextOnly)
    }

    /// Number of pages needed to cover `down_count` entries
    pub fn page_budget(&self, down_count: u32) -> u32 {
        down_count.div_ceil(self.page_size())
    }

    /// Returns all modes
    pub fn all_modes() -> [Self; 3] {
        [Self::MediaTop, Self::MediaLatest, Self::TextOnly]
    }
}

impl fmt::Display for CrawlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MediaTop => "media_top",
            Self::MediaLatest => "media_latest",
            Self::TextOnly => "text_only",
        };
        write!(f, "{}", name)
    }
}
