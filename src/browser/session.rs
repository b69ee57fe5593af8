//! chromiumoxide-backed phone revealer
//!
//! One Chrome process and one tab live for the whole crawl. The CDP event
//! handler runs on its own tokio task; every reveal step is an awaited CDP
//! call with its own deadline, so no runtime worker is ever blocked.

use super::{digits_only, BrowserError, PhoneRevealer};
use crate::config::BrowserConfig;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::SetBlockedUrLsParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig as ChromeConfig, Element, Page};
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Images are switched off for the whole browser
const LAUNCH_ARGS: [&str; 4] = [
    "--disable-gpu",
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--blink-settings=imagesEnabled=false",
];

/// Stylesheets and fonts are blocked on the working tab
const BLOCKED_RESOURCES: [&str; 6] = ["*.css", "*.woff", "*.woff2", "*.ttf", "*.otf", "*.eot"];

const OVERLAY_CLOSE: &str = ".c-notifier-close";
const PHONE_LINK: &str = "a.phone_show_link";

const OVERLAY_HIDDEN_JS: &str = r#"(() => {
    const el = document.querySelector('.c-notifier-container');
    if (!el) return true;
    const style = window.getComputedStyle(el);
    return style.display === 'none' || style.visibility === 'hidden' || el.offsetParent === null;
})()"#;

/// Text of the revealed phone, or '' while it is missing or hidden
const PHONE_TEXT_JS: &str = r#"(() => {
    const el = document.querySelector('span.phone.bold');
    if (!el) return '';
    const style = window.getComputedStyle(el);
    if (style.display === 'none' || style.visibility === 'hidden' || el.offsetParent === null) return '';
    return el.innerText || '';
})()"#;

const SCRIPT_CLICK: &str = "function() { this.click(); }";

/// Headless browser session used for phone reveals
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    page_load_timeout: Duration,
    overlay_timeout: Duration,
    wait_timeout: Duration,
    poll_interval: Duration,
    closed: bool,
}

impl BrowserSession {
    /// Starts Chrome, spawns the CDP handler and opens the working tab
    pub async fn launch(config: &BrowserConfig) -> Result<Self, BrowserError> {
        let mut builder = ChromeConfig::builder();
        builder = if config.headless {
            builder.new_headless_mode()
        } else {
            builder.with_head()
        };
        if let Some(path) = &config.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let chrome_config = builder.args(LAUNCH_ARGS).build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(chrome_config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler stopped: {}", e);
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(BrowserError::Launch(format!("failed to open tab: {}", e)));
            }
        };

        let blocked: Vec<String> = BLOCKED_RESOURCES.iter().map(|p| p.to_string()).collect();
        if let Err(e) = page.execute(SetBlockedUrLsParams::new(blocked)).await {
            handler.abort();
            return Err(BrowserError::Launch(format!(
                "failed to block stylesheets and fonts: {}",
                e
            )));
        }

        tracing::info!(
            "Browser session started ({})",
            if config.headless { "headless" } else { "headed" }
        );

        Ok(Self {
            browser,
            page,
            handler,
            page_load_timeout: Duration::from_secs(config.page_load_timeout_secs),
            overlay_timeout: Duration::from_secs(config.overlay_timeout_secs),
            wait_timeout: Duration::from_secs(config.wait_timeout_secs),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            closed: false,
        })
    }

    async fn navigate(&self, url: &str) -> Result<bool, BrowserError> {
        match tokio::time::timeout(self.page_load_timeout, self.page.goto(url)).await {
            Ok(result) => Ok(soft(result.map(|_| ()), "navigation")?.is_some()),
            Err(_) => {
                tracing::debug!("Page load timed out for {}", url);
                Ok(false)
            }
        }
    }

    /// Closes the notification overlay if it shows up; its absence is normal
    async fn dismiss_overlay(&self) -> Result<(), BrowserError> {
        let Some(close) = self.wait_for_element(OVERLAY_CLOSE, self.overlay_timeout).await? else {
            return Ok(());
        };
        if soft(close.click().await.map(|_| ()), "overlay close")?.is_none() {
            return Ok(());
        }

        let deadline = Instant::now() + self.wait_timeout;
        loop {
            let hidden = soft(self.page.evaluate(OVERLAY_HIDDEN_JS).await, "overlay check")?
                .and_then(|result| result.into_value::<bool>().ok())
                .unwrap_or(false);
            if hidden {
                return Ok(());
            }
            if Instant::now() >= deadline {
                tracing::debug!("Overlay still visible after {:?}", self.wait_timeout);
                return Ok(());
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn wait_for_element(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Option<Element>, BrowserError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(element) = soft(self.page.find_element(selector).await, selector)? {
                return Ok(Some(element));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn wait_for_phone_text(&self) -> Result<Option<String>, BrowserError> {
        let deadline = Instant::now() + self.wait_timeout;
        loop {
            let text = soft(self.page.evaluate(PHONE_TEXT_JS).await, "phone lookup")?
                .and_then(|result| result.into_value::<String>().ok())
                .unwrap_or_default();
            if !text.trim().is_empty() {
                return Ok(Some(text));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl PhoneRevealer for BrowserSession {
    async fn reveal(&mut self, url: &str) -> Result<Option<String>, BrowserError> {
        if !self.navigate(url).await? {
            return Ok(None);
        }

        self.dismiss_overlay().await?;

        let links = soft(self.page.find_elements(PHONE_LINK).await, PHONE_LINK)?.unwrap_or_default();
        let Some(link) = links.into_iter().next() else {
            tracing::debug!("No phone reveal control on {}", url);
            return Ok(None);
        };

        soft(link.scroll_into_view().await.map(|_| ()), "scroll")?;
        if soft(link.click().await.map(|_| ()), "click")?.is_none() {
            soft(
                link.call_js_fn(SCRIPT_CLICK, false).await.map(|_| ()),
                "script click",
            )?;
        }

        let Some(raw) = self.wait_for_phone_text().await? else {
            tracing::debug!("Phone did not appear on {} within {:?}", url, self.wait_timeout);
            return Ok(None);
        };

        Ok(digits_only(&raw))
    }

    async fn shutdown(&mut self) -> Result<(), BrowserError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let closed = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            tracing::debug!("Waiting for browser exit failed: {}", e);
        }
        self.handler.abort();
        tracing::info!("Browser session closed");

        closed.map(|_| ()).map_err(BrowserError::Session)
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Transport faults mean the session is gone; everything else is a step miss
fn is_session_fault(error: &CdpError) -> bool {
    matches!(
        error,
        CdpError::Ws(_) | CdpError::Io(_) | CdpError::NoResponse | CdpError::ChannelSendError(_)
    )
}

fn soft<T>(result: Result<T, CdpError>, step: &str) -> Result<Option<T>, BrowserError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if is_session_fault(&e) => Err(BrowserError::Session(e)),
        Err(e) => {
            tracing::debug!("Browser step '{}' failed: {}", step, e);
            Ok(None)
        }
    }
}
