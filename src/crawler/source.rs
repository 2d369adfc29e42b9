//! Document sources
//!
//! A document source turns a URL into HTML. Two implementations share the
//! same record building and pipeline code:
//! - [`StaticSource`] fetches pages over HTTP
//! - [`BrowserSource`] drives a browser for pages rendered by JavaScript
//!
//! The browser automation itself lives behind [`BrowserDriver`]; this crate
//! ships no driver implementation.

use crate::crawler::fetcher::Fetcher;
use crate::extract::Selector;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

/// Loads the HTML of a URL; faults are reported as `None`, never as errors
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn load(&self, url: &str) -> Option<String>;
}

/// Static pages fetched with a plain GET
#[derive(Debug, Clone)]
pub struct StaticSource {
    fetcher: Fetcher,
}

impl StaticSource {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl DocumentSource for StaticSource {
    async fn load(&self, url: &str) -> Option<String> {
        let response = self.fetcher.fetch(url).await?;

        if response.body.is_none() {
            tracing::debug!(
                "No document at {}: status {}, content type '{}'",
                url,
                response.status_code,
                response.content_type
            );
        }

        response.body
    }
}

/// Errors reported by a browser driver
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("No element matches {0}")]
    ElementNotFound(String),

    #[error("Browser command failed: {0}")]
    Command(String),
}

/// Browser automation contract consumed by [`BrowserSource`]
#[async_trait]
pub trait BrowserDriver: Send {
    /// Handle to an element located on the current page
    type Element: Send + Sync;

    async fn navigate(&mut self, url: &str) -> Result<(), DriverError>;

    async fn current_html(&mut self) -> Result<String, DriverError>;

    /// Value of `document.readyState`
    async fn ready_state(&mut self) -> Result<String, DriverError>;

    async fn find_by_css(&mut self, selector: &str) -> Result<Vec<Self::Element>, DriverError>;

    async fn find_by_xpath(&mut self, path: &str) -> Result<Vec<Self::Element>, DriverError>;

    async fn click(&mut self, element: &Self::Element) -> Result<(), DriverError>;

    async fn send_keys(&mut self, element: &Self::Element, text: &str) -> Result<(), DriverError>;

    async fn quit(&mut self) -> Result<(), DriverError>;
}

/// Readiness polling for browser-rendered pages
#[derive(Debug, Clone, Copy)]
pub struct BrowserOptions {
    /// How long to wait for `readyState == "complete"` after navigating
    pub ready_timeout: Duration,

    /// Delay between readiness checks
    pub poll_interval: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            ready_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Pages rendered by a browser
///
/// One browser serves one page at a time, so the driver sits behind an
/// async mutex and concurrent loads queue up for it.
pub struct BrowserSource<D> {
    driver: Mutex<D>,
    options: BrowserOptions,
}

impl<D: BrowserDriver> BrowserSource<D> {
    pub fn new(driver: D, options: BrowserOptions) -> Self {
        Self {
            driver: Mutex::new(driver),
            options,
        }
    }

    /// Clicks the first element matching `selector` on the current page
    pub async fn click(&self, selector: &Selector) -> Result<(), DriverError> {
        let mut driver = self.driver.lock().await;
        let element = locate(&mut *driver, selector).await?;
        driver.click(&element).await
    }

    /// Types `text` into the first element matching `selector`
    pub async fn type_text(&self, selector: &Selector, text: &str) -> Result<(), DriverError> {
        let mut driver = self.driver.lock().await;
        let element = locate(&mut *driver, selector).await?;
        driver.send_keys(&element, text).await
    }

    /// Returns the HTML currently displayed, without navigating
    pub async fn current_html(&self) -> Result<String, DriverError> {
        self.driver.lock().await.current_html().await
    }

    /// Shuts the browser down
    pub async fn quit(&self) -> Result<(), DriverError> {
        self.driver.lock().await.quit().await
    }

    async fn navigate_and_read(&self, url: &str) -> Result<String, DriverError> {
        let mut driver = self.driver.lock().await;
        driver.navigate(url).await?;
        wait_until_ready(&mut *driver, &self.options).await?;
        driver.current_html().await
    }
}

#[async_trait]
impl<D: BrowserDriver + 'static> DocumentSource for BrowserSource<D> {
    async fn load(&self, url: &str) -> Option<String> {
        match self.navigate_and_read(url).await {
            Ok(html) => Some(html),
            Err(e) => {
                tracing::warn!("Browser load of {} failed: {}", url, e);
                None
            }
        }
    }
}

async fn locate<D: BrowserDriver>(
    driver: &mut D,
    selector: &Selector,
) -> Result<D::Element, DriverError> {
    let found = if selector.is_xpath() {
        driver.find_by_xpath(selector.as_str()).await?
    } else {
        driver.find_by_css(selector.as_str()).await?
    };

    found
        .into_iter()
        .next()
        .ok_or_else(|| DriverError::ElementNotFound(selector.to_string()))
}

/// Polls `readyState` until the page reports "complete"
async fn wait_until_ready<D: BrowserDriver>(
    driver: &mut D,
    options: &BrowserOptions,
) -> Result<(), DriverError> {
    let deadline = Instant::now() + options.ready_timeout;

    loop {
        if driver.ready_state().await? == "complete" {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(DriverError::Command(format!(
                "page not ready after {:?}",
                options.ready_timeout
            )));
        }
        tokio::time::sleep(options.poll_interval).await;
    }
}
