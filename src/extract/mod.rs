//! Declarative extraction model
//!
//! This module turns parsed HTML documents into records:
//! - Selectors (CSS, or an XPath subset evaluated over the same tree)
//! - Field extractors with ancestor anchors and attribute reading
//! - Record builders validated against an explicit record schema
//! - Text cleanup shared by every field

pub mod clean;
mod field;
mod record;
mod selector;
mod xpath;

pub use field::{Anchor, FieldExtractor, ATTRIBUTE_SEPARATOR};
pub use record::{ExtractionMode, FieldValue, FieldValues, Record, RecordBuilder, Row};
pub use selector::Selector;
pub use xpath::XPath;

use thiserror::Error;

/// Errors raised while building extraction rules
///
/// These are caller errors and surface at construction time, never while a
/// document is being scraped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("Invalid CSS selector '{selector}': {message}")]
    InvalidCss { selector: String, message: String },

    #[error("Invalid XPath '{path}': {message}")]
    InvalidXPath { path: String, message: String },

    #[error("Field name cannot be empty")]
    EmptyName,

    #[error("Duplicate field name: {0}")]
    DuplicateField(String),

    #[error("Field '{0}' does not exist on the record shape")]
    UnknownField(String),

    #[error("A record builder needs at least one field")]
    NoFields,
}
