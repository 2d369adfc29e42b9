//! Integration tests for the scraper
//!
//! These tests use wiremock to create mock HTTP servers and exercise the
//! fetcher and the full scrape cycle end-to-end.

mod fetch_tests;
mod scrape_tests;
