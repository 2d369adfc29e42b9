use crate::extract::{ExtractError, XPath};
use scraper::{ElementRef, Html};
use std::fmt;

/// A rule locating zero or more elements in a document
///
/// Selectors are compiled when constructed, so a malformed rule is reported
/// once to the caller instead of failing every scrape that uses it.
#[derive(Debug, Clone)]
pub enum Selector {
    Css {
        text: String,
        compiled: scraper::Selector,
    },
    XPath {
        text: String,
        compiled: XPath,
    },
}

impl Selector {
    /// Compiles a CSS selector
    ///
    /// # Example
    ///
    /// ```
    /// use sumi_harvest::extract::Selector;
    ///
    /// assert!(Selector::css("div.price > span").is_ok());
    /// assert!(Selector::css("div[").is_err());
    /// ```
    pub fn css(text: &str) -> Result<Self, ExtractError> {
        let compiled = scraper::Selector::parse(text).map_err(|e| ExtractError::InvalidCss {
            selector: text.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self::Css {
            text: text.to_string(),
            compiled,
        })
    }

    /// Compiles an XPath expression
    pub fn xpath(text: &str) -> Result<Self, ExtractError> {
        let compiled = XPath::parse(text).map_err(|message| ExtractError::InvalidXPath {
            path: text.to_string(),
            message,
        })?;

        Ok(Self::XPath {
            text: text.to_string(),
            compiled,
        })
    }

    /// The selector source text
    pub fn as_str(&self) -> &str {
        match self {
            Self::Css { text, .. } | Self::XPath { text, .. } => text,
        }
    }

    pub fn is_xpath(&self) -> bool {
        matches!(self, Self::XPath { .. })
    }

    /// Returns every matching element in document order
    pub fn select<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        match self {
            Self::Css { compiled, .. } => document.select(compiled).collect(),
            Self::XPath { compiled, .. } => compiled.select(document),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css { text, .. } => write!(f, "css:{}", text),
            Self::XPath { text, .. } => write!(f, "xpath:{}", text),
        }
    }
}
