//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the scraper, including:
//! - Building HTTP clients with the crawler user agent and transport timeout
//! - A hard wall-clock ceiling around every request
//! - Classifying responses so only 200-OK HTML carries a body
//! - Turning every transport fault into `None`

use crate::config::FetcherConfig;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;

/// User agent sent with every request unless the configuration overrides it
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; SumiHarvest/1.0; +https://example.invalid/bot)";

/// Classified outcome of a completed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// The URI that was requested (before redirects)
    pub request_uri: String,

    /// HTTP status code of the final response
    pub status_code: u16,

    /// Content-Type header value, empty when absent
    pub content_type: String,

    /// Whether the content type mentions HTML
    pub is_html: bool,

    /// Page body, present only for 200-OK HTML responses
    pub body: Option<String>,
}

impl HttpResponse {
    /// Classifies a response from its status and content type, without a body
    pub fn classify(request_uri: &str, status_code: u16, content_type: &str) -> Self {
        Self {
            request_uri: request_uri.to_string(),
            status_code,
            content_type: content_type.to_string(),
            is_html: is_html_content_type(content_type),
            body: None,
        }
    }

    /// Whether this response is allowed to carry a body
    pub fn accepts_body(&self) -> bool {
        self.status_code == StatusCode::OK.as_u16() && self.is_html
    }
}

/// Case-insensitive check for "html" in a Content-Type value
pub fn is_html_content_type(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("html")
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are followed by the transport (up to 10 hops), and the
/// transport timeout is the primary per-request limit.
///
/// # Arguments
///
/// * `config` - The fetcher configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    let user_agent = config
        .user_agent
        .as_deref()
        .unwrap_or(DEFAULT_USER_AGENT);

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_millis(config.request_timeout_ms))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Issues single GET requests under a hard wall-clock ceiling
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    hard_timeout: Duration,
}

impl Fetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            hard_timeout: Duration::from_millis(config.hard_timeout_ms),
        })
    }

    /// Fetches a URI and classifies the response
    ///
    /// # Returns
    ///
    /// * `Some(HttpResponse)` - The exchange completed; `body` is set only
    ///   for 200-OK HTML
    /// * `None` - A transport fault: DNS, connection, TLS, timeout, or a
    ///   failure while reading the body
    pub async fn fetch(&self, uri: &str) -> Option<HttpResponse> {
        match tokio::time::timeout(self.hard_timeout, self.send(uri)).await {
            Ok(Ok(response)) => Some(response),
            Ok(Err(e)) => {
                tracing::warn!("Fetch of {} failed: {}", uri, describe_transport_error(&e));
                None
            }
            Err(_) => {
                tracing::warn!(
                    "Fetch of {} exceeded the {:?} ceiling",
                    uri,
                    self.hard_timeout
                );
                None
            }
        }
    }

    async fn send(&self, uri: &str) -> Result<HttpResponse, reqwest::Error> {
        let response = self.client.get(uri).send().await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let mut classified =
            HttpResponse::classify(uri, response.status().as_u16(), &content_type);

        tracing::debug!(
            "GET {} -> {} ({})",
            uri,
            classified.status_code,
            if content_type.is_empty() {
                "no content type"
            } else {
                content_type.as_str()
            }
        );

        if classified.accepts_body() {
            classified.body = Some(response.text().await?);
        }

        Ok(classified)
    }
}

/// Short description of a transport fault for logs
fn describe_transport_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timeout".to_string()
    } else if error.is_connect() {
        format!("connection failed ({})", error)
    } else if error.is_redirect() {
        "too many redirects".to_string()
    } else {
        error.to_string()
    }
}
