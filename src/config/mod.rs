//! Configuration module for Sumi-Harvest
//!
//! This module handles loading, parsing, and validating TOML job files.
//!
//! # Example
//!
//! ```no_run
//! use sumi_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("job.toml")).unwrap();
//! println!("Scraper will keep {} fetches in flight", config.scraper.max_concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, FetcherConfig, FieldConfig, ScraperSettings};

// Re-export parser functions
pub use parser::load_config;
