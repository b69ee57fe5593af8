//! Field extraction for car detail pages
//!
//! Every extractor is a pure function from a parsed detail document to an
//! optional value. A missing element is `None`, never an error, so one
//! absent field never costs the rest of the record.

mod fields;
mod identifiers;
mod media;

pub use fields::{extract_odometer, extract_price, extract_seller, extract_title, parse_odometer, parse_price};
pub use identifiers::{extract_plate, extract_vin, match_plate, match_vin};
pub use media::{extract_image_count, extract_main_image};

use chrono::{DateTime, Utc};
use scraper::Html;

/// Everything the static HTML of a detail page tells us
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailFields {
    pub title: Option<String>,
    pub price_usd: Option<i64>,
    pub odometer_km: Option<i64>,
    pub seller_name: Option<String>,
    pub main_image_url: Option<String>,
    pub image_count: usize,
    pub plate: Option<String>,
    pub vin: Option<String>,
}

impl DetailFields {
    /// Parses a detail page and runs every extractor against it
    ///
    /// # Example
    ///
    /// ```
    /// use autoria_scraper::extract::DetailFields;
    ///
    /// let html = r#"<h1 class="head">BMW X5 2015</h1><div class="price_value">12 300 $</div>"#;
    /// let fields = DetailFields::from_html(html);
    /// assert_eq!(fields.title.as_deref(), Some("BMW X5 2015"));
    /// assert_eq!(fields.price_usd, Some(12300));
    /// assert_eq!(fields.odometer_km, None);
    /// ```
    pub fn from_html(html: &str) -> Self {
        Self::from_document(&Html::parse_document(html))
    }

    pub fn from_document(document: &Html) -> Self {
        Self {
            title: extract_title(document),
            price_usd: extract_price(document),
            odometer_km: extract_odometer(document),
            seller_name: extract_seller(document),
            main_image_url: extract_main_image(document),
            image_count: extract_image_count(document),
            plate: extract_plate(document),
            vin: extract_vin(document),
        }
    }
}

/// One processed detail page, ready for persistence
///
/// Carries both the prospective car identity (URL, title, seller, image)
/// and the facts of this particular observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedItem {
    /// Detail page URL, the identity key of the car
    pub url: String,
    pub fields: DetailFields,
    /// Seller phone, digits only
    pub phone: Option<String>,
    /// When this crawl pass saw the listing
    pub observed_at: DateTime<Utc>,
}

impl ScrapedItem {
    pub fn new(
        url: impl Into<String>,
        fields: DetailFields,
        phone: Option<String>,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            url: url.into(),
            fields,
            phone,
            observed_at,
        }
    }
}
