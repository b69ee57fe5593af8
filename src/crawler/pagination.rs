//! Listing page parser: detail links and the next-page link
//!
//! A listing page carries one hidden marker per car card
//! (`<div class="hide" data-link-to-view="/uk/auto_...html">`) and a pager:
//!
//! ```html
//! <nav class="pager">
//!   <span class="page-item"><a class="page-link active" href="#">1</a></span>
//!   <span class="page-item"><a class="page-link" href="?page=2">2</a></span>
//! </nav>
//! ```
//!
//! Structural absence is never an error here: it means "no links" or
//! "no next page".

use crate::url::resolve_link;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Links extracted from one listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Absolute detail URLs in document order, duplicates kept
    pub links: Vec<String>,

    /// Absolute URL of the following listing page, if any
    pub next: Option<String>,
}

/// Parses a listing document once and extracts both links and the next page
pub fn parse_listing(html: &str, base_url: &Url) -> ListingPage {
    let document = Html::parse_document(html);
    ListingPage {
        links: links_in(&document, base_url),
        next: next_page_in(&document, base_url),
    }
}

/// Returns every detail link on a listing page as an absolute URL
///
/// Markers are collected in document order and not deduplicated; a marker
/// with an empty or unresolvable value is skipped.
///
/// # Example
///
/// ```
/// use autoria_scraper::crawler::extract_links;
/// use url::Url;
///
/// let html = r#"<div class="hide" data-link-to-view="/uk/auto_1.html"></div>"#;
/// let base = Url::parse("https://auto.ria.com/").unwrap();
/// assert_eq!(extract_links(html, &base), vec!["https://auto.ria.com/uk/auto_1.html"]);
/// ```
pub fn extract_links(html: &str, base_url: &Url) -> Vec<String> {
    links_in(&Html::parse_document(html), base_url)
}

/// Returns the next listing page URL, or None on the last page
pub fn next_page(html: &str, base_url: &Url) -> Option<String> {
    next_page_in(&Html::parse_document(html), base_url)
}

fn links_in(document: &Html, base_url: &Url) -> Vec<String> {
    let Ok(marker_selector) = Selector::parse("div.hide[data-link-to-view]") else {
        return Vec::new();
    };

    document
        .select(&marker_selector)
        .filter_map(|marker| marker.value().attr("data-link-to-view"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect()
}

/// Walks the pager: active link → its span → next sibling span → its link
fn next_page_in(document: &Html, base_url: &Url) -> Option<String> {
    let pager_selector = Selector::parse("nav.pager").ok()?;
    let active_selector = Selector::parse("a.page-link.active").ok()?;
    let link_selector = Selector::parse("a.page-link").ok()?;

    let pager = document.select(&pager_selector).next()?;
    let active = pager.select(&active_selector).next()?;

    // Nearest enclosing span that is still inside the pager
    let page_item = active
        .ancestors()
        .take_while(|node| node.id() != pager.id())
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().name() == "span")?;

    let next_item = page_item
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .next()?;
    if next_item.value().name() != "span" {
        return None;
    }

    let next_link = next_item.select(&link_selector).next()?;
    let href = next_link.value().attr("href")?;

    resolve_link(href, base_url)
}
