//! Crawler module for document loading and scrape coordination
//!
//! This module contains the core scraping logic, including:
//! - HTTP fetching under transport and wall-clock timeouts
//! - Static and browser-driven document sources
//! - Bounded-concurrency execution of URL batches
//! - The caller-facing scraper

mod coordinator;
mod fetcher;
mod source;
mod throttler;

pub use coordinator::{Input, Scraper, ScraperBuilder, ScraperConfig};
pub use fetcher::{build_http_client, is_html_content_type, Fetcher, HttpResponse, DEFAULT_USER_AGENT};
pub use source::{
    BrowserDriver, BrowserOptions, BrowserSource, DocumentSource, DriverError, StaticSource,
};
pub use throttler::{run_bounded, task, Task};

pub use crate::extract::ExtractionMode;
