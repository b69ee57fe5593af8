//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the configured user agent and timeout
//! - The global in-flight cap shared by listing and detail fetches
//! - Retry with backoff for rate limiting and timeouts
//! - Error classification

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::crawler::gauge::ActivityGauge;
use crate::crawler::retry::{RetryPolicy, RetryReason};
use crate::ScraperError;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Outcome of a single HTTP attempt
#[derive(Debug)]
enum AttemptError {
    /// Worth another attempt after a backoff
    Retryable(RetryReason),
    /// Propagates to the caller as is
    Fatal(ScraperError),
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Whole-request timeout (connect + response + body)
///
/// # Example
///
/// ```no_run
/// use autoria_scraper::config::UserAgentConfig;
/// use autoria_scraper::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "AutoriaScraper".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(10)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Document fetcher with a global concurrency cap and retry policy
///
/// One instance is shared (behind an `Arc`) by the coordinator and every
/// detail task, so the cap bounds all outstanding requests of the run.
#[derive(Debug)]
pub struct Fetcher {
    client: Client,
    permits: Arc<Semaphore>,
    policy: RetryPolicy,
    gauge: ActivityGauge,
}

impl Fetcher {
    /// Creates a fetcher
    ///
    /// # Arguments
    ///
    /// * `client` - The HTTP client to use
    /// * `max_in_flight` - Maximum simultaneous HTTP attempts
    /// * `policy` - Retry policy applied to every fetch
    pub fn new(client: Client, max_in_flight: usize, policy: RetryPolicy) -> Self {
        Self {
            client,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
            policy,
            gauge: ActivityGauge::new(),
        }
    }

    /// Creates a fetcher from the crawler and user agent sections of the config
    pub fn from_config(
        crawler: &CrawlerConfig,
        user_agent: &UserAgentConfig,
    ) -> Result<Self, ScraperError> {
        let client = build_http_client(user_agent, crawler.request_timeout())?;
        let policy = RetryPolicy::new(crawler.max_attempts, crawler.backoff_base());
        Ok(Self::new(
            client,
            crawler.max_concurrent_fetches as usize,
            policy,
        ))
    }

    /// Gauge of in-flight HTTP attempts
    pub fn gauge(&self) -> &ActivityGauge {
        &self.gauge
    }

    /// Fetches a URL and returns the response body
    ///
    /// # Request Flow
    ///
    /// 1. Wait for a global in-flight permit
    /// 2. Send GET, read the body, release the permit
    /// 3. On 429 or timeout, sleep per the retry policy and go to 1
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The document body
    /// * `Err(ScraperError::FetchExhausted)` - Every allowed attempt was retryable
    /// * `Err(ScraperError::Http)` - Non-retryable error status
    /// * `Err(ScraperError::Request)` - Non-retryable transport error
    pub async fn fetch(&self, url: &str) -> Result<String, ScraperError> {
        let mut attempt: u32 = 0;

        loop {
            let outcome = {
                let _permit = self
                    .permits
                    .acquire()
                    .await
                    .map_err(|e| ScraperError::Task(format!("fetch permits closed: {}", e)))?;
                let _active = self.gauge.enter();
                self.attempt(url).await
            };

            match outcome {
                Ok(body) => return Ok(body),
                Err(AttemptError::Fatal(e)) => return Err(e),
                Err(AttemptError::Retryable(reason)) => {
                    if !self.policy.should_retry(attempt) {
                        return Err(ScraperError::FetchExhausted {
                            url: url.to_string(),
                            attempts: attempt + 1,
                            reason,
                        });
                    }

                    let delay = self.policy.delay(reason, attempt);
                    tracing::warn!(
                        "Fetch of {} {} (attempt {}/{}), retrying in {:?}",
                        url,
                        reason,
                        attempt + 1,
                        self.policy.max_attempts,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Performs one GET and classifies the result
    async fn attempt(&self, url: &str) -> Result<String, AttemptError> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return Err(classify_transport_error(url, e)),
        };

        let status = response.status();
        if !status.is_success() {
            if let Some(reason) = RetryPolicy::classify_status(status.as_u16()) {
                return Err(AttemptError::Retryable(reason));
            }
            return Err(AttemptError::Fatal(ScraperError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            }));
        }

        response
            .text()
            .await
            .map_err(|e| classify_transport_error(url, e))
    }
}

/// Maps a reqwest error onto the retry table
fn classify_transport_error(url: &str, error: reqwest::Error) -> AttemptError {
    if error.is_timeout() {
        AttemptError::Retryable(RetryReason::Timeout)
    } else {
        AttemptError::Fatal(ScraperError::Request {
            url: url.to_string(),
            source: error,
        })
    }
}
