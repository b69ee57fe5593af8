//! Image fields: the preview image and the gallery size

use scraper::{Html, Selector};
use std::collections::HashSet;

/// Gallery photos carry one of these markers in their `src`
const GALLERY_MARKERS: [&str; 2] = ["30__", "/gallery/"];

/// URL of the social preview image (`og:image`)
pub fn extract_main_image(document: &Html) -> Option<String> {
    let selector = Selector::parse("meta[property='og:image']").ok()?;
    let content = document
        .select(&selector)
        .next()?
        .value()
        .attr("content")?
        .trim();

    if content.is_empty() {
        None
    } else {
        Some(content.to_string())
    }
}

/// Number of distinct gallery photos on the page
pub fn extract_image_count(document: &Html) -> usize {
    let Ok(selector) = Selector::parse("img[src]") else {
        return 0;
    };

    document
        .select(&selector)
        .filter_map(|img| img.value().attr("src"))
        .filter(|src| GALLERY_MARKERS.iter().any(|marker| src.contains(marker)))
        .collect::<HashSet<_>>()
        .len()
}
