//! State module for tracking crawl progress
//!
//! The crawl walks listing pages strictly one after another, so its whole
//! progress is a single `CrawlState`: either the listing page to process
//! next, or done.

mod crawl_state;

pub use crawl_state::CrawlState;
