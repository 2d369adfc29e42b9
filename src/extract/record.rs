//! Records and the builder that assembles them from field extractors

use crate::extract::{ExtractError, FieldExtractor};
use scraper::Html;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

/// Value produced by one field extractor
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::List(items) => f.write_str(&items.join(" | ")),
        }
    }
}

/// Named field values in extractor order
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldValues {
    entries: Vec<(String, FieldValue)>,
}

impl FieldValues {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    pub fn list(&self, name: &str) -> Option<&[String]> {
        self.get(name).and_then(FieldValue::as_list)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn push(&mut self, name: &str, value: FieldValue) {
        self.entries.push((name.to_string(), value));
    }
}

/// An application-defined record shape
///
/// `FIELDS` is the explicit schema: every extractor name must appear in it.
/// An empty list marks a dynamic shape that accepts any field name, like
/// [`Row`]. Equality is the deduplication key, so two records with the same
/// field values are the same record.
///
/// # Example
///
/// ```
/// use sumi_harvest::extract::{FieldValues, Record};
///
/// #[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// struct Article {
///     title: String,
///     tags: Vec<String>,
/// }
///
/// impl Record for Article {
///     const FIELDS: &'static [&'static str] = &["title", "tags"];
///
///     fn from_fields(fields: &FieldValues) -> Option<Self> {
///         Some(Self {
///             title: fields.text("title")?.to_string(),
///             tags: fields.list("tags").map(<[String]>::to_vec).unwrap_or_default(),
///         })
///     }
/// }
/// ```
pub trait Record: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    const FIELDS: &'static [&'static str];

    /// Builds a record from resolved values; `None` rejects the record
    fn from_fields(fields: &FieldValues) -> Option<Self>;
}

/// A record whose shape is whatever the extractors produce
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Row {
    fields: FieldValues,
}

impl Row {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &FieldValues {
        &self.fields
    }
}

impl Record for Row {
    const FIELDS: &'static [&'static str] = &[];

    fn from_fields(fields: &FieldValues) -> Option<Self> {
        Some(Self {
            fields: fields.clone(),
        })
    }
}

/// How many records a document yields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMode {
    /// One record per document
    #[default]
    Single,
    /// One record per value of the `many` fields, sharing the singular fields
    Listing,
}

/// Combines field extractors into records of shape `R`
#[derive(Debug)]
pub struct RecordBuilder<R> {
    extractors: Vec<FieldExtractor>,
    _shape: PhantomData<fn() -> R>,
}

/// Per-field values of a listing page
enum Resolved {
    /// One slot per match of a `many` field
    Slots(Vec<Option<String>>),
    /// A singular field shared by every record
    Shared(Option<FieldValue>),
}

impl<R: Record> RecordBuilder<R> {
    /// Validates the extractors against the record schema
    ///
    /// # Returns
    ///
    /// * `Ok(RecordBuilder)` - Names are non-empty, unique and known to `R`
    /// * `Err(ExtractError)` - The first rule that violates this
    pub fn new(extractors: Vec<FieldExtractor>) -> Result<Self, ExtractError> {
        if extractors.is_empty() {
            return Err(ExtractError::NoFields);
        }

        let mut seen = HashSet::new();
        for extractor in &extractors {
            let name = extractor.name();
            if name.is_empty() {
                return Err(ExtractError::EmptyName);
            }
            if !seen.insert(name) {
                return Err(ExtractError::DuplicateField(name.to_string()));
            }
            if !R::FIELDS.is_empty() && !R::FIELDS.contains(&name) {
                return Err(ExtractError::UnknownField(name.to_string()));
            }
        }

        Ok(Self {
            extractors,
            _shape: PhantomData,
        })
    }

    /// Field names in extractor order, for export headers
    pub fn field_names(&self) -> Vec<&str> {
        self.extractors.iter().map(FieldExtractor::name).collect()
    }

    /// Builds a single record; any unresolved singular field rejects it
    pub fn build_one(&self, document: &Html) -> Option<R> {
        let mut values = FieldValues::default();

        for extractor in &self.extractors {
            match extractor.extract(document) {
                Some(value) => values.push(extractor.name(), value),
                None => {
                    tracing::debug!(
                        "Field '{}' unresolved by {}",
                        extractor.name(),
                        extractor.selector()
                    );
                    return None;
                }
            }
        }

        R::from_fields(&values)
    }

    /// Builds one record per match of the `many` fields
    ///
    /// Singular fields are resolved once and shared by every record. Record
    /// `i` receives the value of the `i`-th match of each `many` field as
    /// text; it is `None` when a singular field is unresolved or the `i`-th
    /// match of some `many` field is absent or blank. Blank matches keep
    /// their position, so later matches stay paired with the right record.
    /// Without `many` fields this is [`build_one`](Self::build_one).
    pub fn build_all(&self, document: &Html) -> Vec<Option<R>> {
        if !self.extractors.iter().any(FieldExtractor::is_many) {
            return vec![self.build_one(document)];
        }

        let resolved: Vec<(&str, Resolved)> = self
            .extractors
            .iter()
            .map(|extractor| {
                let value = if extractor.is_many() {
                    Resolved::Slots(extractor.extract_slots(document))
                } else {
                    Resolved::Shared(extractor.extract(document))
                };
                (extractor.name(), value)
            })
            .collect();

        let count = resolved
            .iter()
            .filter_map(|(_, value)| match value {
                Resolved::Slots(slots) => Some(slots.len()),
                Resolved::Shared(_) => None,
            })
            .max()
            .unwrap_or(0);

        (0..count)
            .map(|index| {
                let mut values = FieldValues::default();
                for (name, value) in &resolved {
                    let value = match value {
                        Resolved::Slots(slots) => FieldValue::Text(slots.get(index)?.clone()?),
                        Resolved::Shared(shared) => shared.clone()?,
                    };
                    values.push(name, value);
                }
                R::from_fields(&values)
            })
            .collect()
    }

    /// Parses markup and builds records according to `mode`
    pub fn extract(&self, markup: &str, mode: ExtractionMode) -> Vec<Option<R>> {
        let document = Html::parse_document(markup);
        match mode {
            ExtractionMode::Single => vec![self.build_one(&document)],
            ExtractionMode::Listing => self.build_all(&document),
        }
    }
}
