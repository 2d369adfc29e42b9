use crate::crawler::ScraperConfig;
use crate::extract::{Anchor, ExtractionMode, FieldExtractor};
use crate::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::time::Duration;

/// A scraping job read from a TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// URLs scraped by a throttled batch
    #[serde(default)]
    pub urls: Vec<String>,

    #[serde(default)]
    pub scraper: ScraperSettings,

    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// Field extractors, in record order
    #[serde(default, rename = "field")]
    pub fields: Vec<FieldConfig>,
}

/// Scraper behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ScraperSettings {
    /// Maximum number of fetches in flight
    pub max_concurrency: usize,

    /// Time after which a batch reports completion (milliseconds)
    pub batch_timeout_ms: u64,

    /// Mirror event log entries to the console
    pub logging: bool,

    pub mode: ExtractionMode,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            batch_timeout_ms: 600_000,
            logging: true,
            mode: ExtractionMode::Single,
        }
    }
}

/// HTTP fetcher configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FetcherConfig {
    /// Transport timeout per request (milliseconds)
    pub request_timeout_ms: u64,

    /// Wall-clock ceiling per request (milliseconds)
    pub hard_timeout_ms: u64,

    /// Overrides the default crawler user agent
    pub user_agent: Option<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 55_000,
            hard_timeout_ms: 60_000,
            user_agent: None,
        }
    }
}

/// One `[[field]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct FieldConfig {
    pub name: String,

    #[serde(default)]
    pub css: Option<String>,

    #[serde(default)]
    pub xpath: Option<String>,

    #[serde(default)]
    pub anchor: Anchor,

    #[serde(default)]
    pub many: bool,

    /// Attributes to read instead of the text content
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl FieldConfig {
    /// Compiles this entry into an extractor
    pub fn to_extractor(&self) -> ConfigResult<FieldExtractor> {
        let compiled = match (&self.css, &self.xpath) {
            (Some(css), None) => FieldExtractor::css(self.name.clone(), css),
            (None, Some(xpath)) => FieldExtractor::xpath(self.name.clone(), xpath),
            _ => {
                return Err(ConfigError::Validation(format!(
                    "Field '{}' must set exactly one of css or xpath",
                    self.name
                )))
            }
        };

        let extractor = compiled.map_err(|source| ConfigError::InvalidSelector {
            field: self.name.clone(),
            source,
        })?;

        Ok(extractor
            .anchor(self.anchor)
            .many(self.many)
            .attributes(self.attributes.iter().cloned()))
    }
}

impl Config {
    /// Runtime scraper settings derived from this job
    pub fn scraper_config(&self) -> ScraperConfig {
        ScraperConfig {
            logging: self.scraper.logging,
            mode: self.scraper.mode,
            max_concurrency: self.scraper.max_concurrency,
            batch_timeout: Duration::from_millis(self.scraper.batch_timeout_ms),
            fetcher: self.fetcher.clone(),
        }
    }

    /// Compiled field extractors, in declaration order
    pub fn field_extractors(&self) -> ConfigResult<Vec<FieldExtractor>> {
        self.fields.iter().map(FieldConfig::to_extractor).collect()
    }
}
