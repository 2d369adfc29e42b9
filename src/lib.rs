//! Sumi-Harvest: typed record extraction from HTML pages
//!
//! This crate turns HTML documents, supplied directly or fetched over the
//! network, into strongly-typed records. Fetches fan out under a fixed
//! concurrency ceiling, and every result is funneled through single-consumer
//! mailboxes that deduplicate records and keep an ordered event log.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod storage;

use thiserror::Error;

/// Main error type for Sumi-Harvest operations
///
/// Only construction can fail. Scraping itself never returns an error: faults
/// are recorded in the failed-URL queue and the event log instead.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Extraction rule error: {0}")]
    Extract(#[from] extract::ExtractError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector for field '{field}': {source}")]
    InvalidSelector {
        field: String,
        source: extract::ExtractError,
    },
}

/// Result type alias for Sumi-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{ExtractionMode, Scraper, ScraperConfig};
pub use extract::{Anchor, FieldExtractor, FieldValue, FieldValues, Record, Row, Selector};
pub use pipeline::LogEntry;
pub use storage::Source;
