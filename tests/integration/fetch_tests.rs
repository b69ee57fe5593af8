//! Fetcher behavior against a mock server: retries, fatal statuses,
//! timeouts and the global in-flight cap

use crate::common::test_user_agent;
use autoria_scraper::crawler::{build_http_client, Fetcher, RetryPolicy, RetryReason};
use autoria_scraper::ScraperError;
use futures::future::join_all;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_fetcher(max_in_flight: usize, max_attempts: u32, timeout: Duration) -> Fetcher {
    let client =
        build_http_client(&test_user_agent(), timeout).expect("Failed to build HTTP client");
    Fetcher::new(
        client,
        max_in_flight,
        RetryPolicy::new(max_attempts, Duration::from_millis(10)),
    )
}

#[tokio::test]
async fn test_rate_limited_then_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&mock_server)
        .await;

    let fetcher = create_fetcher(2, 3, Duration::from_secs(5));
    let body = fetcher
        .fetch(&format!("{}/page", mock_server.uri()))
        .await
        .expect("Fetch should succeed on the third attempt");

    assert_eq!(body, "<html>ok</html>");
    assert_eq!(fetcher.gauge().total(), 3);
}

#[tokio::test]
async fn test_rate_limited_exhausts_attempts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&mock_server)
        .await;

    let fetcher = create_fetcher(2, 3, Duration::from_secs(5));
    let result = fetcher.fetch(&format!("{}/page", mock_server.uri())).await;

    match result {
        Err(ScraperError::FetchExhausted {
            attempts, reason, ..
        }) => {
            assert_eq!(attempts, 3);
            assert_eq!(reason, RetryReason::RateLimited);
        }
        other => panic!("Expected FetchExhausted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = create_fetcher(2, 3, Duration::from_secs(5));
    let result = fetcher
        .fetch(&format!("{}/missing", mock_server.uri()))
        .await;

    assert!(matches!(
        result,
        Err(ScraperError::Http { status: 404, .. })
    ));
    assert_eq!(fetcher.gauge().total(), 1);
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = create_fetcher(2, 3, Duration::from_secs(5));
    let result = fetcher.fetch(&format!("{}/broken", mock_server.uri())).await;

    assert!(matches!(
        result,
        Err(ScraperError::Http { status: 503, .. })
    ));
}

#[tokio::test]
async fn test_timeout_is_retried_then_exhausted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("too late")
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&mock_server)
        .await;

    let fetcher = create_fetcher(2, 2, Duration::from_millis(100));
    let result = fetcher.fetch(&format!("{}/slow", mock_server.uri())).await;

    match result {
        Err(ScraperError::FetchExhausted {
            attempts, reason, ..
        }) => {
            assert_eq!(attempts, 2);
            assert_eq!(reason, RetryReason::Timeout);
        }
        other => panic!("Expected FetchExhausted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_connection_refused_fails_fast() {
    // Nothing listens on the port once the server is dropped
    let uri = {
        let mock_server = MockServer::start().await;
        mock_server.uri()
    };

    let fetcher = create_fetcher(2, 3, Duration::from_secs(2));
    let result = fetcher.fetch(&format!("{}/page", uri)).await;

    assert!(matches!(result, Err(ScraperError::Request { .. })));
    assert_eq!(fetcher.gauge().total(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_in_flight_cap_is_respected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html></html>")
                .set_delay(Duration::from_millis(50)),
        )
        .mount(&mock_server)
        .await;

    let fetcher = create_fetcher(2, 3, Duration::from_secs(5));
    let url = format!("{}/page", mock_server.uri());

    let results = join_all((0..8).map(|_| fetcher.fetch(&url))).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(fetcher.gauge().total(), 8);
    assert!(fetcher.gauge().peak() <= 2);
    assert!(fetcher.gauge().peak() >= 1);
    assert_eq!(fetcher.gauge().active(), 0);
}

#[tokio::test]
async fn test_cap_of_one_serializes_requests() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html></html>")
                .set_delay(Duration::from_millis(20)),
        )
        .mount(&mock_server)
        .await;

    let fetcher = create_fetcher(1, 3, Duration::from_secs(5));
    let url = format!("{}/page", mock_server.uri());

    let results = join_all((0..4).map(|_| fetcher.fetch(&url))).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(fetcher.gauge().peak(), 1);
}
