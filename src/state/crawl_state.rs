/// Crawl state definitions
///
/// This module defines the two states of the listing walk.
use std::fmt;

/// Where the listing walk currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlState {
    /// The listing page at `url` is next; `page` counts from 1
    Running { url: String, page: u32 },

    /// No further listing page
    Done,
}

impl CrawlState {
    /// State at the first listing page
    pub fn start(url: impl Into<String>) -> Self {
        Self::Running {
            url: url.into(),
            page: 1,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Moves to the next listing page, or to `Done` when there is none
    ///
    /// `Done` stays `Done`.
    pub fn advance(self, next: Option<String>) -> Self {
        match (self, next) {
            (Self::Running { page, .. }, Some(url)) => Self::Running {
                url,
                page: page + 1,
            },
            _ => Self::Done,
        }
    }

    /// URL of the listing page to process, if still running
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Running { url, .. } => Some(url),
            Self::Done => None,
        }
    }

    pub fn page(&self) -> Option<u32> {
        match self {
            Self::Running { page, .. } => Some(*page),
            Self::Done => None,
        }
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running { url, page } => write!(f, "page {} ({})", page, url),
            Self::Done => write!(f, "done"),
        }
    }
}
