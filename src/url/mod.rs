//! URL resolution for links found on listing pages
//!
//! Detail markers and pager links are usually site-relative, so everything
//! is resolved against the configured base URL before it is fetched.

use url::Url;

/// Resolves a link href to an absolute URL
///
/// Returns None if the link should be excluded:
/// - empty or whitespace-only hrefs
/// - `javascript:` pseudo-links (e.g. `javascript:void(0)`)
/// - fragment-only links (same page anchors)
/// - hrefs that fail to resolve, or resolve to a non-HTTP(S) scheme
///
/// # Example
///
/// ```
/// use autoria_scraper::url::resolve_link;
/// use url::Url;
///
/// let base = Url::parse("https://auto.ria.com/uk/car/used/").unwrap();
/// assert_eq!(
///     resolve_link("/uk/auto_bmw_x5_1.html", &base).as_deref(),
///     Some("https://auto.ria.com/uk/auto_bmw_x5_1.html")
/// );
/// assert_eq!(resolve_link("javascript:void(0)", &base), None);
/// ```
pub fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || is_pseudo_link(href) {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}

/// Returns true for hrefs that do not navigate anywhere
pub fn is_pseudo_link(href: &str) -> bool {
    let href = href.trim();
    href.starts_with('#')
        || href
            .get(..11)
            .map_or(false, |scheme| scheme.eq_ignore_ascii_case("javascript:"))
}
