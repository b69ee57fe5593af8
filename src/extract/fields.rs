//! Text fields: title, price, odometer, seller

use scraper::{Html, Selector};

/// Trimmed text of the first element matching `css`, None if absent or blank
pub(crate) fn first_text(document: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    let element = document.select(&selector).next()?;
    let text = element.text().collect::<String>();
    let text = text.trim();

    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

pub fn extract_title(document: &Html) -> Option<String> {
    first_text(document, "h1.head")
}

/// Price in USD from the `div.price_value` block
pub fn extract_price(document: &Html) -> Option<i64> {
    first_text(document, "div.price_value").and_then(|text| parse_price(&text))
}

/// Odometer in kilometers; the page shows thousands of km
pub fn extract_odometer(document: &Html) -> Option<i64> {
    first_text(document, "span.size18").and_then(|text| parse_odometer(&text))
}

pub fn extract_seller(document: &Html) -> Option<String> {
    first_text(document, "#userInfoBlock .seller_info_name.bold a.sellerPro")
}

/// Parses a displayed price such as `"12 300 $"`
///
/// Whitespace (including non-breaking spaces) and the dollar sign are
/// dropped; whatever remains must be a run of ASCII digits.
///
/// # Example
///
/// ```
/// use autoria_scraper::extract::parse_price;
///
/// assert_eq!(parse_price("12 300 $"), Some(12300));
/// assert_eq!(parse_price("Договірна"), None);
/// ```
pub fn parse_price(text: &str) -> Option<i64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '$')
        .collect();

    if cleaned.is_empty() || !cleaned.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    cleaned.parse().ok()
}

/// Parses a mileage in thousands of km, e.g. `"95"` or `"12.5"`
pub fn parse_odometer(text: &str) -> Option<i64> {
    let thousands: f64 = text.trim().parse().ok()?;
    if !thousands.is_finite() || thousands < 0.0 {
        return None;
    }

    let km = (thousands * 1000.0).round();
    if km > i64::MAX as f64 {
        return None;
    }
    Some(km as i64)
}
