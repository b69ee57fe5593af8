//! End-to-end crawl tests: listing walk, persistence and run-level errors

use crate::common::{
    create_test_config, listing_page, mount_details, mount_page, BrokenBrowser, FixedPhone,
    OverlapDetector, PHONE,
};
use autoria_scraper::crawler::run_crawl;
use autoria_scraper::storage::open_storage;
use autoria_scraper::{ListingStore, NoPhoneRevealer, ScraperError};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Two listing pages: three cars on the first, two on the second
async fn mount_two_page_site(mock_server: &MockServer) {
    mount_page(
        mock_server,
        "/list/1",
        listing_page(
            &["/auto_1.html", "/auto_2.html", "/auto_3.html"],
            Some("/list/2"),
        ),
    )
    .await;
    mount_page(
        mock_server,
        "/list/2",
        listing_page(&["/auto_4.html", "/auto_5.html"], None),
    )
    .await;
    mount_details(mock_server, &[1, 2, 3, 4, 5], Duration::ZERO).await;
}

fn temp_db() -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("cars.db");
    (dir, db_path)
}

#[tokio::test]
async fn test_two_page_crawl() {
    let mock_server = MockServer::start().await;
    mount_two_page_site(&mock_server).await;

    let (_dir, db_path) = temp_db();
    let config = create_test_config(&format!("{}/list/1", mock_server.uri()), &db_path);

    let report = run_crawl(config, FixedPhone)
        .await
        .expect("Crawl should succeed");

    assert_eq!(report.pages, 2);
    assert_eq!(report.items_saved, 5);
    assert_eq!(report.items_failed, 0);
    assert_eq!(report.batches_saved, 2);
    assert_eq!(report.batches_failed, 0);
    assert_eq!(report.fetch_attempts, 7);
    assert!(report.peak_fetches <= 2);
    assert!(report.peak_details <= 2);

    let storage = open_storage(&db_path).expect("Failed to open storage");
    assert_eq!(storage.count_cars().unwrap(), 5);
    assert_eq!(storage.count_observations().unwrap(), 5);
    assert_eq!(storage.count_observations_with_phone().unwrap(), 5);

    let car = storage
        .get_car_by_url(&format!("{}/auto_4.html", mock_server.uri()))
        .unwrap()
        .expect("Car from the second page should be stored");
    assert_eq!(car.title, "Car 4");
    assert_eq!(car.seller_name.as_deref(), Some("Seller of Car 4"));

    let observations = storage.get_observations(car.id).unwrap();
    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].price_usd, Some(10500));
    assert_eq!(observations[0].phone_digits.as_deref(), Some(PHONE));
}

#[tokio::test]
async fn test_second_pass_adds_observations_only() {
    let mock_server = MockServer::start().await;
    mount_two_page_site(&mock_server).await;

    let (_dir, db_path) = temp_db();
    let start_url = format!("{}/list/1", mock_server.uri());

    run_crawl(create_test_config(&start_url, &db_path), NoPhoneRevealer)
        .await
        .expect("First pass should succeed");
    let report = run_crawl(create_test_config(&start_url, &db_path), NoPhoneRevealer)
        .await
        .expect("Second pass should succeed");

    assert_eq!(report.items_saved, 5);

    let storage = open_storage(&db_path).expect("Failed to open storage");
    assert_eq!(storage.count_cars().unwrap(), 5);
    assert_eq!(storage.count_observations().unwrap(), 10);
    assert_eq!(storage.count_observations_with_phone().unwrap(), 0);

    let car = storage
        .get_car_by_url(&format!("{}/auto_1.html", mock_server.uri()))
        .unwrap()
        .expect("Car should be stored");
    let observations = storage.get_observations(car.id).unwrap();
    assert_eq!(observations.len(), 2);
    assert_ne!(observations[0].observed_at, observations[1].observed_at);
}

#[tokio::test]
async fn test_self_referencing_next_link_stops() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/list/1",
        listing_page(&["/auto_1.html"], Some("/list/1")),
    )
    .await;
    mount_details(&mock_server, &[1], Duration::ZERO).await;

    let (_dir, db_path) = temp_db();
    let config = create_test_config(&format!("{}/list/1", mock_server.uri()), &db_path);

    let report = run_crawl(config, NoPhoneRevealer)
        .await
        .expect("Crawl should succeed");

    assert_eq!(report.pages, 1);
    assert_eq!(report.items_saved, 1);
}

#[tokio::test]
async fn test_page_limit_stops_walk() {
    let mock_server = MockServer::start().await;
    mount_two_page_site(&mock_server).await;

    let (_dir, db_path) = temp_db();
    let mut config = create_test_config(&format!("{}/list/1", mock_server.uri()), &db_path);
    config.crawler.max_pages = Some(1);

    let report = run_crawl(config, NoPhoneRevealer)
        .await
        .expect("Crawl should succeed");

    assert_eq!(report.pages, 1);
    assert_eq!(report.items_saved, 3);
}

#[tokio::test]
async fn test_empty_listing_ends_crawl() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/list/1", listing_page(&[], None)).await;

    let (_dir, db_path) = temp_db();
    let config = create_test_config(&format!("{}/list/1", mock_server.uri()), &db_path);

    let report = run_crawl(config, NoPhoneRevealer)
        .await
        .expect("Crawl should succeed");

    assert_eq!(report.pages, 1);
    assert_eq!(report.items_saved, 0);
    assert_eq!(report.batches_saved, 0);
}

#[tokio::test]
async fn test_failed_detail_is_skipped() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/list/1",
        listing_page(&["/auto_1.html", "/auto_2.html", "/auto_3.html"], None),
    )
    .await;
    mount_details(&mock_server, &[1, 3], Duration::ZERO).await;
    Mock::given(method("GET"))
        .and(path("/auto_2.html"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let (_dir, db_path) = temp_db();
    let config = create_test_config(&format!("{}/list/1", mock_server.uri()), &db_path);

    let report = run_crawl(config, NoPhoneRevealer)
        .await
        .expect("Crawl should succeed");

    assert_eq!(report.items_saved, 2);
    assert_eq!(report.items_failed, 1);

    let storage = open_storage(&db_path).expect("Failed to open storage");
    assert!(storage
        .get_car_by_url(&format!("{}/auto_2.html", mock_server.uri()))
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_listing_failure_ends_run_with_error() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/list/1",
        listing_page(&["/auto_1.html"], Some("/list/2")),
    )
    .await;
    mount_details(&mock_server, &[1], Duration::ZERO).await;
    Mock::given(method("GET"))
        .and(path("/list/2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let (_dir, db_path) = temp_db();
    let config = create_test_config(&format!("{}/list/1", mock_server.uri()), &db_path);

    let result = run_crawl(config, NoPhoneRevealer).await;
    assert!(matches!(
        result,
        Err(ScraperError::Http { status: 500, .. })
    ));

    // The first page was committed before the failure
    let storage = open_storage(&db_path).expect("Failed to open storage");
    assert_eq!(storage.count_observations().unwrap(), 1);
}

#[tokio::test]
async fn test_browser_failure_ends_run() {
    let mock_server = MockServer::start().await;
    mount_two_page_site(&mock_server).await;

    let (_dir, db_path) = temp_db();
    let config = create_test_config(&format!("{}/list/1", mock_server.uri()), &db_path);

    let result = run_crawl(
        config,
        BrokenBrowser {
            fail_on: "auto_4".to_string(),
        },
    )
    .await;
    assert!(matches!(result, Err(ScraperError::Browser(_))));

    // Page one was persisted, page two's batch was abandoned
    let storage = open_storage(&db_path).expect("Failed to open storage");
    assert_eq!(storage.count_cars().unwrap(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_revealer_is_shut_down_after_run() {
    let mock_server = MockServer::start().await;
    mount_two_page_site(&mock_server).await;

    let (_dir, db_path) = temp_db();
    let mut config = create_test_config(&format!("{}/list/1", mock_server.uri()), &db_path);
    config.crawler.max_concurrent_details = 4;

    let detector = OverlapDetector::default();
    let report = run_crawl(config, detector.clone())
        .await
        .expect("Crawl should succeed");

    assert_eq!(report.items_saved, 5);
    assert_eq!(detector.calls.load(Ordering::SeqCst), 5);
    assert!(!detector.overlapped.load(Ordering::SeqCst));
    assert_eq!(detector.shutdowns.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_batch_does_not_stop_crawl() {
    let mock_server = MockServer::start().await;
    mount_two_page_site(&mock_server).await;

    let (_dir, db_path) = temp_db();

    // Any insert of the second car aborts, taking page one's batch with it
    drop(open_storage(&db_path).expect("Failed to create schema"));
    let conn = rusqlite::Connection::open(&db_path).expect("Failed to open database");
    conn.execute_batch(
        "CREATE TRIGGER reject_auto_2 BEFORE INSERT ON cars
         WHEN NEW.url LIKE '%auto_2%'
         BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
    )
    .expect("Failed to create trigger");
    drop(conn);

    let config = create_test_config(&format!("{}/list/1", mock_server.uri()), &db_path);
    let report = run_crawl(config, NoPhoneRevealer)
        .await
        .expect("Crawl should continue past a failed batch");

    assert_eq!(report.pages, 2);
    assert_eq!(report.batches_failed, 1);
    assert_eq!(report.batches_saved, 1);
    assert_eq!(report.items_saved, 2);

    let storage = open_storage(&db_path).expect("Failed to open storage");
    assert_eq!(storage.count_cars().unwrap(), 2);
    assert_eq!(storage.count_observations().unwrap(), 2);
    assert!(storage
        .get_car_by_url(&format!("{}/auto_1.html", mock_server.uri()))
        .unwrap()
        .is_none());
    assert!(storage
        .get_car_by_url(&format!("{}/auto_5.html", mock_server.uri()))
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_revealer_is_shut_down_when_setup_fails() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("missing").join("cars.db");
    let config = create_test_config("https://auto.ria.com/uk/car/used/", &db_path);

    let detector = OverlapDetector::default();
    let result = run_crawl(config, detector.clone()).await;

    assert!(result.is_err());
    assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
    assert_eq!(detector.shutdowns.load(Ordering::SeqCst), 1);
}
