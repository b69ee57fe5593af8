//! Phone number reveal through a headless browser
//!
//! The seller phone is hidden behind a "show" control that only works with
//! JavaScript. This module provides:
//! - `PhoneRevealer`, the seam between the crawler and whatever performs the reveal
//! - `BrowserSession`, the chromiumoxide implementation (one browser, one tab)
//! - `NoPhoneRevealer`, used when the browser is disabled
//! - `PhoneGate`, the mutual exclusion handle shared by all detail tasks
//!
//! Step failures inside a reveal (timeouts, missing controls) are soft and
//! yield `Ok(None)`. Only a broken browser session is an error, and it ends
//! the whole run.

mod session;

pub use session::BrowserSession;

use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Browser-level failures; both variants are run-fatal
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Browser session failed: {0}")]
    Session(#[source] CdpError),
}

/// Something that can turn a detail URL into the seller's phone digits
#[async_trait]
pub trait PhoneRevealer: Send + 'static {
    /// Opens `url`, triggers the reveal control and reads the phone
    ///
    /// # Returns
    ///
    /// * `Ok(Some(digits))` - Phone revealed, digits only
    /// * `Ok(None)` - Any step came up empty or timed out
    /// * `Err(BrowserError)` - The session itself is unusable
    async fn reveal(&mut self, url: &str) -> Result<Option<String>, BrowserError>;

    /// Releases the underlying browser, if any
    async fn shutdown(&mut self) -> Result<(), BrowserError> {
        Ok(())
    }
}

/// Revealer that never reveals anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPhoneRevealer;

#[async_trait]
impl PhoneRevealer for NoPhoneRevealer {
    async fn reveal(&mut self, _url: &str) -> Result<Option<String>, BrowserError> {
        Ok(None)
    }
}

/// Exclusive access to a single revealer
///
/// Clones share the same revealer. A reveal holds the lock for its whole
/// duration, so at most one reveal is in progress at any instant no matter
/// how many detail tasks call in.
#[derive(Debug)]
pub struct PhoneGate<R> {
    inner: Arc<Mutex<R>>,
}

impl<R> Clone for PhoneGate<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: PhoneRevealer> PhoneGate<R> {
    pub fn new(revealer: R) -> Self {
        Self {
            inner: Arc::new(Mutex::new(revealer)),
        }
    }

    pub async fn reveal(&self, url: &str) -> Result<Option<String>, BrowserError> {
        let mut revealer = self.inner.lock().await;
        revealer.reveal(url).await
    }

    /// Waits for any running reveal, then shuts the revealer down
    pub async fn shutdown(&self) -> Result<(), BrowserError> {
        let mut revealer = self.inner.lock().await;
        revealer.shutdown().await
    }
}

/// Keeps only ASCII digits; None when nothing is left
///
/// # Example
///
/// ```
/// use autoria_scraper::browser::digits_only;
///
/// assert_eq!(digits_only("(067) 123 45 67"), Some("0671234567".to_string()));
/// assert_eq!(digits_only("показати"), None);
/// ```
pub fn digits_only(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}
