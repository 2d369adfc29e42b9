use crate::config::types::{Config, FetcherConfig, FieldConfig, ScraperSettings};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scraper_settings(&config.scraper)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_fields(&config.fields)?;
    validate_urls(&config.urls)?;
    Ok(())
}

/// Validates scraper settings
fn validate_scraper_settings(settings: &ScraperSettings) -> Result<(), ConfigError> {
    if settings.max_concurrency < 1 || settings.max_concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrency must be between 1 and 100, got {}",
            settings.max_concurrency
        )));
    }

    if settings.batch_timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "batch-timeout-ms must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates fetcher timeouts and user agent
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.request_timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "request-timeout-ms must be >= 1".to_string(),
        ));
    }

    if config.hard_timeout_ms < config.request_timeout_ms {
        return Err(ConfigError::Validation(format!(
            "hard-timeout-ms ({}) must be >= request-timeout-ms ({})",
            config.hard_timeout_ms, config.request_timeout_ms
        )));
    }

    if let Some(agent) = &config.user_agent {
        if agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user-agent cannot be blank".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates field entries: names and selectors
fn validate_fields(fields: &[FieldConfig]) -> Result<(), ConfigError> {
    if fields.is_empty() {
        return Err(ConfigError::Validation(
            "At least one [[field]] is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for field in fields {
        if field.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Field name cannot be empty".to_string(),
            ));
        }

        if !seen.insert(field.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate field name '{}'",
                field.name
            )));
        }

        // Compiling checks both selector presence and syntax
        field.to_extractor()?;
    }

    Ok(())
}

/// Validates target URLs
fn validate_urls(urls: &[String]) -> Result<(), ConfigError> {
    for raw in urls {
        let url = Url::parse(raw)
            .map_err(|e| ConfigError::InvalidUrl(format!("'{}': {}", raw, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "'{}' must use the http or https scheme",
                raw
            )));
        }
    }

    Ok(())
}
