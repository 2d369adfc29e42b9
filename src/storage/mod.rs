//! In-memory result storage
//!
//! The result store holds the deduplicated records of a scraper together
//! with where each one came from, plus the queue of URLs that could not be
//! fetched or yielded no record. It is owned by the ingestion consumer and
//! never shared directly; readers get snapshot copies.

use crate::extract::Record;
use std::collections::HashSet;
use std::fmt;

/// Provenance of a stored record
///
/// Kept for export only; it does not take part in record equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Source {
    Html,
    Url(String),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Html => f.write_str("HTML"),
            Self::Url(url) => f.write_str(url),
        }
    }
}

/// Deduplicated records plus the failed-URL queue
#[derive(Debug)]
pub struct ResultStore<R> {
    seen: HashSet<R>,
    records: Vec<(R, Source)>,
    failed_urls: Vec<String>,
}

impl<R: Record> ResultStore<R> {
    pub fn new() -> Self {
        Self {
            seen: HashSet::new(),
            records: Vec::new(),
            failed_urls: Vec::new(),
        }
    }

    /// Inserts a record unless an equal one is already stored
    ///
    /// # Returns
    ///
    /// * `true` - The record was new and has been stored
    /// * `false` - An equal record was already present
    pub fn insert(&mut self, record: R, source: Source) -> bool {
        if !self.seen.insert(record.clone()) {
            return false;
        }
        self.records.push((record, source));
        true
    }

    /// Appends a URL to the failed queue; duplicates are kept
    pub fn record_failure(&mut self, url: String) {
        self.failed_urls.push(url);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Copies the current contents
    pub fn snapshot(&self) -> StoreSnapshot<R> {
        StoreSnapshot {
            records: self.records.clone(),
            failed_urls: self.failed_urls.clone(),
        }
    }
}

impl<R: Record> Default for ResultStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of a result store
#[derive(Debug, Clone)]
pub struct StoreSnapshot<R> {
    /// Records in insertion order, with their source
    pub records: Vec<(R, Source)>,

    /// URLs that failed, in the order they were reported
    pub failed_urls: Vec<String>,
}

impl<R> Default for StoreSnapshot<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            failed_urls: Vec::new(),
        }
    }
}
