//! Field extractors
//!
//! A field extractor is one declarative rule: which elements to select, how
//! far to walk up from each match, and whether to read text or attributes.

use crate::extract::clean::{collapse_whitespace, element_text};
use crate::extract::{ExtractError, FieldValue, Selector};
use scraper::{ElementRef, Html};
use serde::Deserialize;

/// Separator placed between the values of several attributes read from one node
pub const ATTRIBUTE_SEPARATOR: &str = "; ";

/// Number of ancestor levels to walk from a matched element before reading it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    #[default]
    None,
    Parent,
    GrandParent,
    ThirdParent,
}

impl Anchor {
    pub fn levels(self) -> usize {
        match self {
            Self::None => 0,
            Self::Parent => 1,
            Self::GrandParent => 2,
            Self::ThirdParent => 3,
        }
    }

    /// Walks up from `element`; `None` when the walk leaves the element tree
    pub fn resolve<'a>(self, element: ElementRef<'a>) -> Option<ElementRef<'a>> {
        let mut current = element;
        for _ in 0..self.levels() {
            current = current.parent().and_then(ElementRef::wrap)?;
        }
        Some(current)
    }
}

/// A named rule mapping a document to a scalar or list value
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    name: String,
    selector: Selector,
    anchor: Anchor,
    many: bool,
    attributes: Vec<String>,
}

impl FieldExtractor {
    /// Creates a singular, text-reading extractor
    pub fn new(name: impl Into<String>, selector: Selector) -> Self {
        Self {
            name: name.into(),
            selector,
            anchor: Anchor::None,
            many: false,
            attributes: Vec::new(),
        }
    }

    /// Creates an extractor from a CSS selector
    ///
    /// # Example
    ///
    /// ```
    /// use sumi_harvest::extract::{Anchor, FieldExtractor};
    ///
    /// let links = FieldExtractor::css("links", "a.result")
    ///     .unwrap()
    ///     .many(true)
    ///     .attribute("href");
    /// assert!(links.is_many());
    ///
    /// let price = FieldExtractor::css("price", "span.currency")
    ///     .unwrap()
    ///     .anchor(Anchor::Parent);
    /// assert_eq!(price.anchor_level(), Anchor::Parent);
    /// ```
    pub fn css(name: impl Into<String>, selector: &str) -> Result<Self, ExtractError> {
        Ok(Self::new(name, Selector::css(selector)?))
    }

    /// Creates an extractor from an XPath expression
    pub fn xpath(name: impl Into<String>, path: &str) -> Result<Self, ExtractError> {
        Ok(Self::new(name, Selector::xpath(path)?))
    }

    pub fn anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    /// Selects whether every match yields a value (`true`) or only the first
    pub fn many(mut self, many: bool) -> Self {
        self.many = many;
        self
    }

    /// Reads this attribute instead of the node text
    ///
    /// Repeated calls add attributes; their values are joined with
    /// [`ATTRIBUTE_SEPARATOR`].
    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        let name = name.into().to_ascii_lowercase();
        if !self.attributes.contains(&name) {
            self.attributes.push(name);
        }
        self
    }

    pub fn attributes<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names.into_iter().fold(self, |field, name| field.attribute(name))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn anchor_level(&self) -> Anchor {
        self.anchor
    }

    pub fn is_many(&self) -> bool {
        self.many
    }

    pub fn attribute_names(&self) -> &[String] {
        &self.attributes
    }

    /// Runs this rule against a document
    ///
    /// # Returns
    ///
    /// * `Some(FieldValue::Text)` - Singular field whose first match has a non-empty value
    /// * `Some(FieldValue::List)` - `many` field, possibly empty
    /// * `None` - Singular field with no match, or whose value cleaned to nothing
    pub fn extract(&self, document: &Html) -> Option<FieldValue> {
        let matches = self.selector.select(document);

        if self.many {
            let values = matches
                .into_iter()
                .filter_map(|element| self.read(element))
                .collect();
            return Some(FieldValue::List(values));
        }

        matches
            .into_iter()
            .next()
            .and_then(|element| self.read(element))
            .map(FieldValue::Text)
    }

    /// Reads every matched element, keeping one slot per match
    ///
    /// A slot is `None` when its element has no usable value, so positions
    /// line up across fields in listing mode.
    pub(crate) fn extract_slots(&self, document: &Html) -> Vec<Option<String>> {
        self.selector
            .select(document)
            .into_iter()
            .map(|element| self.read(element))
            .collect()
    }

    /// Reads the value of one matched element after anchor resolution
    fn read(&self, element: ElementRef<'_>) -> Option<String> {
        let target = self.anchor.resolve(element)?;

        let value = if self.attributes.is_empty() {
            element_text(target)
        } else {
            self.attributes
                .iter()
                .filter_map(|name| target.value().attr(name))
                .map(collapse_whitespace)
                .filter(|value| !value.is_empty())
                .collect::<Vec<_>>()
                .join(ATTRIBUTE_SEPARATOR)
        };

        (!value.is_empty()).then_some(value)
    }
}
