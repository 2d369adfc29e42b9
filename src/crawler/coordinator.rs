//! Scraper coordinator - the caller-facing scraping API
//!
//! This module wires the pieces of a scrape together:
//! - Classifying input as a URL or raw HTML
//! - Loading documents through a document source
//! - Building records and funneling them into the ingestion pipeline
//! - Recording failures and events
//! - Fanning out over many URLs through the throttler

use crate::config::FetcherConfig;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::source::{DocumentSource, StaticSource};
use crate::crawler::throttler::{run_bounded, task, Task};
use crate::extract::{ExtractionMode, FieldExtractor, Record, RecordBuilder};
use crate::pipeline::{EventLog, Ingestion, LogEntry, Transform};
use crate::storage::{Source, StoreSnapshot};
use crate::HarvestError;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Runtime settings of a scraper
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Mirror event log entries to the console
    pub logging: bool,

    /// Record mode used by throttled batches
    pub mode: ExtractionMode,

    /// Default ceiling of concurrent fetches for throttled batches
    pub max_concurrency: usize,

    /// Time after which a throttled batch reports completion regardless
    pub batch_timeout: Duration,

    /// HTTP settings of the default static source
    pub fetcher: FetcherConfig,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            logging: true,
            mode: ExtractionMode::Single,
            max_concurrency: 4,
            batch_timeout: Duration::from_secs(600),
            fetcher: FetcherConfig::default(),
        }
    }
}

/// What a caller asked to scrape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Html(String),
    Url(String),
}

impl Input {
    /// Text starting with `http://` or `https://` is a URL, anything else is HTML
    pub fn classify(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Self::Url(trimmed.to_string())
        } else {
            Self::Html(text.to_string())
        }
    }

    fn label(&self) -> &str {
        match self {
            Self::Html(_) => "HTML",
            Self::Url(url) => url,
        }
    }

    fn source(&self) -> Source {
        match self {
            Self::Html(_) => Source::Html,
            Self::Url(url) => Source::Url(url.clone()),
        }
    }
}

struct Shared<R> {
    builder: RecordBuilder<R>,
    source: Arc<dyn DocumentSource>,
    ingestion: Ingestion<R>,
    events: EventLog,
    config: ScraperConfig,
}

impl<R: Record> Shared<R> {
    /// Loads, extracts and submits one input; never fails outward
    async fn process(&self, input: Input, mode: ExtractionMode) -> Vec<Option<R>> {
        self.events.log(format!("Scraping {}", input.label()));

        let markup = match &input {
            Input::Html(html) => html.clone(),
            Input::Url(url) => match self.source.load(url).await {
                Some(html) => html,
                None => {
                    self.fail(url, format!("Failed to fetch {}", url));
                    return Vec::new();
                }
            },
        };

        let records = self.builder.extract(&markup, mode);
        let source = input.source();

        let mut submitted = 0;
        for record in records.iter().flatten() {
            self.ingestion.submit(record.clone(), source.clone());
            submitted += 1;
        }

        if submitted == 0 {
            let message = format!("Failed to extract a record from {}", input.label());
            match &input {
                Input::Url(url) => self.fail(url, message),
                Input::Html(_) => self.events.log(message),
            }
        } else {
            self.events
                .log(format!("Scraped {}: {} record(s)", input.label(), submitted));
        }

        records
    }

    fn fail(&self, url: &str, message: String) {
        self.ingestion.record_failure(url);
        self.events.log(message);
    }
}

/// Extracts records of shape `R` from URLs or HTML
///
/// Cloning is cheap; clones share the same store and event log.
///
/// # Example
///
/// ```no_run
/// use sumi_harvest::{FieldExtractor, Row, Scraper};
///
/// # async fn demo() -> sumi_harvest::Result<()> {
/// let scraper = Scraper::<Row>::builder()
///     .field(FieldExtractor::css("title", "h1")?)
///     .field(FieldExtractor::css("links", "a")?.many(true).attribute("href"))
///     .build()?;
///
/// let urls = vec!["https://example.com/a", "https://example.com/b"];
/// scraper.scrape_throttled(urls, 2, || {}).await.ok();
///
/// println!("{} records, {} failures", scraper.data().await.len(), scraper.failed_requests().await.len());
/// # Ok(())
/// # }
/// ```
pub struct Scraper<R> {
    shared: Arc<Shared<R>>,
}

impl<R> Clone for Scraper<R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<R: Record> Scraper<R> {
    pub fn builder() -> ScraperBuilder<R> {
        ScraperBuilder::new()
    }

    /// Creates a scraper over the static source with default settings
    pub fn new(fields: Vec<FieldExtractor>) -> Result<Self, HarvestError> {
        Self::builder().fields(fields).build()
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.shared.config
    }

    /// Field names in extractor order
    pub fn field_names(&self) -> Vec<&str> {
        self.shared.builder.field_names()
    }

    /// Scrapes a single record from a URL or an HTML string
    pub async fn scrape(&self, input: &str) -> Option<R> {
        self.shared
            .process(Input::classify(input), ExtractionMode::Single)
            .await
            .into_iter()
            .next()
            .flatten()
    }

    /// Scrapes every record of a listing page
    pub async fn scrape_all(&self, input: &str) -> Vec<Option<R>> {
        self.shared
            .process(Input::classify(input), ExtractionMode::Listing)
            .await
    }

    /// Scrapes many URLs with at most `max_concurrency` fetches in flight
    ///
    /// `on_complete` fires exactly once, when every URL has been processed
    /// or the configured batch timeout elapses. The returned handle resolves
    /// right after it fires. Results land in [`data`](Self::data) and
    /// [`failed_requests`](Self::failed_requests).
    pub fn scrape_throttled<I, S, F>(
        &self,
        urls: I,
        max_concurrency: usize,
        on_complete: F,
    ) -> JoinHandle<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnOnce() + Send + 'static,
    {
        let mode = self.shared.config.mode;
        let tasks: Vec<Task> = urls
            .into_iter()
            .map(|url| {
                let shared = Arc::clone(&self.shared);
                let input = Input::Url(url.into());
                task(move || async move {
                    shared.process(input, mode).await;
                })
            })
            .collect();

        tracing::debug!(
            "Starting throttled batch of {} URL(s), ceiling {}",
            tasks.len(),
            max_concurrency
        );

        run_bounded(
            tasks,
            max_concurrency,
            on_complete,
            self.shared.config.batch_timeout,
        )
    }

    /// Current deduplicated records
    pub async fn data(&self) -> Vec<R> {
        self.snapshot()
            .await
            .records
            .into_iter()
            .map(|(record, _)| record)
            .collect()
    }

    /// Current deduplicated records with their source, for export
    pub async fn records(&self) -> Vec<(R, Source)> {
        self.snapshot().await.records
    }

    /// URLs that could not be fetched or yielded no record
    pub async fn failed_requests(&self) -> Vec<String> {
        self.snapshot().await.failed_urls
    }

    /// Event log entries in arrival order
    pub async fn log(&self) -> Vec<LogEntry> {
        self.shared.events.entries().await
    }

    pub async fn snapshot(&self) -> StoreSnapshot<R> {
        self.shared.ingestion.snapshot().await
    }
}

/// Assembles a [`Scraper`]
pub struct ScraperBuilder<R> {
    fields: Vec<FieldExtractor>,
    config: ScraperConfig,
    transform: Option<Transform<R>>,
    source: Option<Arc<dyn DocumentSource>>,
}

impl<R: Record> ScraperBuilder<R> {
    fn new() -> Self {
        Self {
            fields: Vec::new(),
            config: ScraperConfig::default(),
            transform: None,
            source: None,
        }
    }

    pub fn field(mut self, field: FieldExtractor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = FieldExtractor>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn config(mut self, config: ScraperConfig) -> Self {
        self.config = config;
        self
    }

    /// Applies `transform` to every record right before deduplication
    pub fn transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(R) -> R + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    /// Replaces the default HTTP source, e.g. with a browser-driven one
    pub fn source(mut self, source: Arc<dyn DocumentSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Validates the fields and starts the pipeline consumers
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Result<Scraper<R>, HarvestError> {
        let builder = RecordBuilder::new(self.fields)?;

        let source = match self.source {
            Some(source) => source,
            None => Arc::new(StaticSource::new(Fetcher::new(&self.config.fetcher)?)),
        };

        let shared = Shared {
            builder,
            source,
            ingestion: Ingestion::spawn(self.transform),
            events: EventLog::spawn(self.config.logging),
            config: self.config,
        };

        Ok(Scraper {
            shared: Arc::new(shared),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{FieldValues, Row};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    struct Headline {
        title: String,
    }

    impl Record for Headline {
        const FIELDS: &'static [&'static str] = &["title"];

        fn from_fields(fields: &FieldValues) -> Option<Self> {
            Some(Self {
                title: fields.text("title")?.to_string(),
            })
        }
    }

    /// Serves canned pages; unknown URLs fail like a transport fault
    struct CannedSource {
        pages: Vec<(&'static str, &'static str)>,
        loads: AtomicUsize,
    }

    #[async_trait]
    impl DocumentSource for CannedSource {
        async fn load(&self, url: &str) -> Option<String> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.pages
                .iter()
                .find(|(u, _)| *u == url)
                .map(|(_, html)| html.to_string())
        }
    }

    fn canned() -> Arc<CannedSource> {
        Arc::new(CannedSource {
            pages: vec![
                ("https://news.test/1", "<h1>Rates held</h1>"),
                ("https://news.test/2", "<h1>Rates cut</h1>"),
                ("https://news.test/dup", "<h1>Rates held</h1>"),
                ("https://news.test/empty", "<p>No headline</p>"),
            ],
            loads: AtomicUsize::new(0),
        })
    }

    fn quiet() -> ScraperConfig {
        ScraperConfig {
            logging: false,
            ..ScraperConfig::default()
        }
    }

    fn headline_scraper() -> Scraper<Headline> {
        Scraper::builder()
            .field(FieldExtractor::css("title", "h1").unwrap())
            .config(quiet())
            .source(canned())
            .build()
            .unwrap()
    }

    #[test]
    fn test_input_classification() {
        assert_eq!(
            Input::classify("  https://a.test/x "),
            Input::Url("https://a.test/x".to_string())
        );
        assert_eq!(
            Input::classify("http://a.test"),
            Input::Url("http://a.test".to_string())
        );
        assert_eq!(
            Input::classify("<p>https://a.test</p>"),
            Input::Html("<p>https://a.test</p>".to_string())
        );
    }

    #[tokio::test]
    async fn test_scrape_html_string() {
        let scraper = headline_scraper();
        let record = scraper.scrape("<html><h1> Breaking </h1></html>").await;

        assert_eq!(
            record,
            Some(Headline {
                title: "Breaking".to_string()
            })
        );
        assert_eq!(scraper.records().await[0].1, Source::Html);
        assert!(scraper.failed_requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_scrape_url_and_deduplicate() {
        let scraper = headline_scraper();
        assert!(scraper.scrape("https://news.test/1").await.is_some());
        assert!(scraper.scrape("https://news.test/dup").await.is_some());

        let records = scraper.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].1, Source::Url("https://news.test/1".to_string()));
    }

    #[tokio::test]
    async fn test_failures_are_recorded_not_raised() {
        let scraper = headline_scraper();
        assert_eq!(scraper.scrape("https://news.test/missing").await, None);
        assert_eq!(scraper.scrape("https://news.test/empty").await, None);
        assert_eq!(scraper.scrape("<p>html without headline</p>").await, None);

        assert_eq!(
            scraper.failed_requests().await,
            vec!["https://news.test/missing", "https://news.test/empty"]
        );

        let messages: Vec<String> = scraper.log().await.into_iter().map(|e| e.message).collect();
        assert_eq!(
            messages,
            vec![
                "Scraping https://news.test/missing",
                "Failed to fetch https://news.test/missing",
                "Scraping https://news.test/empty",
                "Failed to extract a record from https://news.test/empty",
                "Scraping HTML",
                "Failed to extract a record from HTML",
            ]
        );
    }

    #[tokio::test]
    async fn test_transform_applies_before_storage() {
        let scraper = Scraper::<Headline>::builder()
            .field(FieldExtractor::css("title", "h1").unwrap())
            .config(quiet())
            .source(canned())
            .transform(|h: Headline| Headline {
                title: h.title.to_uppercase(),
            })
            .build()
            .unwrap();

        scraper.scrape("https://news.test/1").await;
        assert_eq!(
            scraper.data().await,
            vec![Headline {
                title: "RATES HELD".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_scrape_all_listing() {
        let scraper = Scraper::<Row>::builder()
            .field(FieldExtractor::css("item", "li").unwrap().many(true))
            .config(quiet())
            .source(canned())
            .build()
            .unwrap();

        let rows = scraper
            .scrape_all("<ul><li>a</li><li>b</li><li>a</li></ul>")
            .await;
        assert_eq!(rows.len(), 3);
        assert_eq!(scraper.data().await.len(), 2);
    }

    #[tokio::test]
    async fn test_scrape_throttled_reports_completion_once() {
        let source = canned();
        let scraper = Scraper::<Headline>::builder()
            .field(FieldExtractor::css("title", "h1").unwrap())
            .config(quiet())
            .source(source.clone())
            .build()
            .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let urls = [
            "https://news.test/1",
            "https://news.test/2",
            "https://news.test/dup",
            "https://news.test/missing",
        ];

        scraper
            .scrape_throttled(urls, 2, move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.loads.load(Ordering::SeqCst), 4);
        assert_eq!(scraper.data().await.len(), 2);
        assert_eq!(
            scraper.failed_requests().await,
            vec!["https://news.test/missing"]
        );
    }

    #[tokio::test]
    async fn test_unknown_field_fails_build() {
        let result = Scraper::<Headline>::builder()
            .field(FieldExtractor::css("summary", "p").unwrap())
            .source(canned())
            .build();
        assert!(matches!(result, Err(HarvestError::Extract(_))));
    }
}
