//! Vehicle identifiers: registration plate and VIN
//!
//! Both are matched against a loose pattern first; when the pattern does not
//! hit, the raw text is kept so that unusual plates are not lost.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

/// Ukrainian plate: 1-3 letters, 1-4 digits, 1-3 letters (Latin or Cyrillic)
static PLATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-ZА-ЯІЇЄҐ]{1,3}\s*\d{1,4}\s*[A-ZА-ЯІЇЄҐ]{1,3}")
        .expect("plate pattern should compile")
});

/// VIN alphabet excludes I, O and Q
static VIN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-HJ-NPR-Z0-9]{10,17}").expect("VIN pattern should compile"));

/// Registration plate from `span.state-num.ua`
///
/// Only the element's own text counts; nested badges such as a
/// "verified" tooltip are ignored.
pub fn extract_plate(document: &Html) -> Option<String> {
    let selector = Selector::parse("span.state-num.ua").ok()?;
    let element = document.select(&selector).next()?;

    let own_text = element
        .children()
        .filter_map(|child| child.value().as_text())
        .map(|text| text.trim())
        .find(|text| !text.is_empty())?;

    Some(match_plate(own_text))
}

/// VIN from `span.label-vin`
pub fn extract_vin(document: &Html) -> Option<String> {
    let selector = Selector::parse("span.label-vin").ok()?;
    let element = document.select(&selector).next()?;
    let text = element.text().collect::<String>();
    let text = text.trim();

    if text.is_empty() {
        None
    } else {
        Some(match_vin(text))
    }
}

/// The plate-shaped part of `text`, or the trimmed text itself
pub fn match_plate(text: &str) -> String {
    first_match(&PLATE_PATTERN, text)
}

/// The VIN-shaped part of `text`, or the trimmed text itself
pub fn match_vin(text: &str) -> String {
    first_match(&VIN_PATTERN, text)
}

fn first_match(pattern: &Regex, text: &str) -> String {
    let text = text.trim();
    pattern
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| text.to_string())
}
