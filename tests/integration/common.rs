//! Shared fixtures: configs, page builders and fake phone revealers

#![allow(dead_code)]

use async_trait::async_trait;
use autoria_scraper::browser::{BrowserError, PhoneRevealer};
use autoria_scraper::config::{BrowserConfig, Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use autoria_scraper::storage::ConflictPolicy;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const PHONE: &str = "0671234567";

pub fn test_user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

/// Fast settings: tiny backoff, no pacing, browser off
pub fn create_test_config(start_url: &str, db_path: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            start_url: start_url.to_string(),
            base_url: None,
            max_concurrent_fetches: 2,
            max_concurrent_details: 2,
            max_attempts: 3,
            backoff_base_ms: 10,
            request_timeout_secs: 5,
            pacing_min_ms: 0,
            pacing_max_ms: 0,
            max_pages: None,
        },
        user_agent: test_user_agent(),
        browser: BrowserConfig {
            enabled: false,
            ..BrowserConfig::default()
        },
        output: OutputConfig {
            database_path: db_path.to_string_lossy().into_owned(),
            conflict_policy: ConflictPolicy::RollbackPage,
        },
    }
}

/// Listing page with one marker per link and a pager pointing at `next`
pub fn listing_page(links: &[&str], next: Option<&str>) -> String {
    let markers: String = links
        .iter()
        .map(|link| {
            format!(
                r#"<section class="ticket-item"><div class="hide" data-link-to-view="{}"></div></section>"#,
                link
            )
        })
        .collect();

    let next_item = next
        .map(|href| {
            format!(
                r#"<span class="page-item"><a class="page-link" href="{}">next</a></span>"#,
                href
            )
        })
        .unwrap_or_default();

    format!(
        r##"<html><body>
            <div id="searchResults">{}</div>
            <nav class="pager">
                <span class="page-item"><a class="page-link active" href="#">current</a></span>
                {}
            </nav>
        </body></html>"##,
        markers, next_item
    )
}

pub fn detail_page(title: &str, price: &str) -> String {
    format!(
        r#"<html>
        <head><meta property="og:image" content="https://cdn.example.com/{title}.jpg"></head>
        <body>
            <h1 class="head">{title}</h1>
            <div class="price_value">{price}</div>
            <span class="size18">120</span>
            <div id="userInfoBlock">
                <div class="seller_info_name bold"><a class="sellerPro">Seller of {title}</a></div>
            </div>
            <span class="state-num ua">AA 1234 BB</span>
            <span class="label-vin">WVWZZZ1KZ8W123456</span>
        </body>
        </html>"#,
        title = title,
        price = price
    )
}

pub async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Mounts detail pages `/auto_{n}.html` for every n in `ids`
pub async fn mount_details(server: &MockServer, ids: &[u32], delay: Duration) {
    for id in ids {
        Mock::given(method("GET"))
            .and(path(format!("/auto_{}.html", id)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(detail_page(&format!("Car {}", id), "10 500 $"))
                    .set_delay(delay),
            )
            .mount(server)
            .await;
    }
}

pub fn detail_links(server: &MockServer, ids: &[u32]) -> Vec<String> {
    ids.iter()
        .map(|id| format!("{}/auto_{}.html", server.uri(), id))
        .collect()
}

/// Always reveals the same phone
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPhone;

#[async_trait]
impl PhoneRevealer for FixedPhone {
    async fn reveal(&mut self, _url: &str) -> Result<Option<String>, BrowserError> {
        Ok(Some(PHONE.to_string()))
    }
}

/// Records whether two reveals ever ran at the same time
#[derive(Debug, Clone, Default)]
pub struct OverlapDetector {
    pub busy: Arc<AtomicBool>,
    pub overlapped: Arc<AtomicBool>,
    pub calls: Arc<AtomicUsize>,
    pub shutdowns: Arc<AtomicUsize>,
}

#[async_trait]
impl PhoneRevealer for OverlapDetector {
    async fn reveal(&mut self, _url: &str) -> Result<Option<String>, BrowserError> {
        if self.busy.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        tokio::time::sleep(Duration::from_millis(15)).await;
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.busy.store(false, Ordering::SeqCst);
        Ok(Some(PHONE.to_string()))
    }

    async fn shutdown(&mut self) -> Result<(), BrowserError> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Fails with a session-level error when it sees `fail_on` in the URL
#[derive(Debug, Clone)]
pub struct BrokenBrowser {
    pub fail_on: String,
}

#[async_trait]
impl PhoneRevealer for BrokenBrowser {
    async fn reveal(&mut self, url: &str) -> Result<Option<String>, BrowserError> {
        if url.contains(&self.fail_on) {
            Err(BrowserError::Launch("browser went away".to_string()))
        } else {
            Ok(None)
        }
    }
}
