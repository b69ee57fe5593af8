//! Detail pool behavior: the detail cap, exclusive phone reveals and
//! per-item failure tolerance

use crate::common::{
    detail_links, mount_details, test_user_agent, BrokenBrowser, FixedPhone, OverlapDetector,
    PHONE,
};
use autoria_scraper::browser::PhoneGate;
use autoria_scraper::crawler::{build_http_client, DetailPool, Fetcher, Pacing, RetryPolicy};
use autoria_scraper::{NoPhoneRevealer, PhoneRevealer, ScraperError};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_pool<R: PhoneRevealer>(
    revealer: R,
    max_fetches: usize,
    max_details: usize,
) -> DetailPool<R> {
    let client = build_http_client(&test_user_agent(), Duration::from_secs(5))
        .expect("Failed to build HTTP client");
    let fetcher = Arc::new(Fetcher::new(
        client,
        max_fetches,
        RetryPolicy::new(2, Duration::from_millis(10)),
    ));
    DetailPool::new(fetcher, PhoneGate::new(revealer), max_details)
        .with_pacing(Pacing::new(Duration::ZERO, Duration::ZERO))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_detail_cap_is_respected() {
    let mock_server = MockServer::start().await;
    let ids = [1, 2, 3, 4, 5, 6];
    mount_details(&mock_server, &ids, Duration::from_millis(40)).await;

    let pool = create_pool(NoPhoneRevealer, 10, 2);
    let batch = pool
        .process_page(&detail_links(&mock_server, &ids))
        .await
        .expect("Page should be processed");

    assert_eq!(batch.items.len(), 6);
    assert_eq!(batch.failed, 0);
    assert!(pool.gauge().peak() <= 2);
    assert_eq!(pool.gauge().total(), 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_phone_reveals_never_overlap() {
    let mock_server = MockServer::start().await;
    let ids = [1, 2, 3, 4, 5, 6];
    mount_details(&mock_server, &ids, Duration::ZERO).await;

    let detector = OverlapDetector::default();
    let pool = create_pool(detector.clone(), 10, 4);
    let batch = pool
        .process_page(&detail_links(&mock_server, &ids))
        .await
        .expect("Page should be processed");

    assert_eq!(batch.items.len(), 6);
    assert_eq!(detector.calls.load(Ordering::SeqCst), 6);
    assert!(!detector.overlapped.load(Ordering::SeqCst));
    assert!(batch
        .items
        .iter()
        .all(|item| item.phone.as_deref() == Some(PHONE)));
}

#[tokio::test]
async fn test_items_carry_extracted_fields() {
    let mock_server = MockServer::start().await;
    mount_details(&mock_server, &[7], Duration::ZERO).await;

    let pool = create_pool(FixedPhone, 2, 2);
    let batch = pool
        .process_page(&detail_links(&mock_server, &[7]))
        .await
        .expect("Page should be processed");

    let item = &batch.items[0];
    assert_eq!(item.url, format!("{}/auto_7.html", mock_server.uri()));
    assert_eq!(item.fields.title.as_deref(), Some("Car 7"));
    assert_eq!(item.fields.price_usd, Some(10500));
    assert_eq!(item.fields.vin.as_deref(), Some("WVWZZZ1KZ8W123456"));
    assert_eq!(item.phone.as_deref(), Some(PHONE));
}

#[tokio::test]
async fn test_failed_item_does_not_fail_page() {
    let mock_server = MockServer::start().await;
    mount_details(&mock_server, &[1, 3], Duration::ZERO).await;

    Mock::given(method("GET"))
        .and(path("/auto_2.html"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let pool = create_pool(NoPhoneRevealer, 2, 2);
    let batch = pool
        .process_page(&detail_links(&mock_server, &[1, 2, 3]))
        .await
        .expect("Page should be processed");

    assert_eq!(batch.items.len(), 2);
    assert_eq!(batch.failed, 1);
    assert!(batch.items.iter().all(|item| !item.url.ends_with("auto_2.html")));
}

#[tokio::test]
async fn test_empty_page_gives_empty_batch() {
    let pool = create_pool(NoPhoneRevealer, 2, 2);
    let batch = pool.process_page(&[]).await.expect("Empty page is fine");

    assert!(batch.items.is_empty());
    assert_eq!(batch.failed, 0);
}

#[tokio::test]
async fn test_browser_failure_is_fatal() {
    let mock_server = MockServer::start().await;
    mount_details(&mock_server, &[1, 2, 3], Duration::ZERO).await;

    let pool = create_pool(
        BrokenBrowser {
            fail_on: "auto_2".to_string(),
        },
        2,
        1,
    );
    let result = pool
        .process_page(&detail_links(&mock_server, &[1, 2, 3]))
        .await;

    assert!(matches!(result, Err(ScraperError::Browser(_))));
}
