//! `KEY=VALUE` configuration documents
//!
//! Parameters hold dotenv-style text. A [`ConfigDocument`] is parsed fresh
//! from each fetch and never mutated afterwards; overlays are combined by
//! [`ConfigDocument::merged`], which produces a new document.

use crate::error::DocumentError;
use serde::Serialize;
use std::collections::BTreeMap;

/// Parsed key/value document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConfigDocument {
    entries: BTreeMap<String, String>,
}

impl ConfigDocument {
    /// Create empty document
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse dotenv text
    ///
    /// Follows the `dotenvy` grammar: quoted values may span lines, and
    /// `${VAR}` references expand from keys defined earlier in the same
    /// document or from the process environment.
    ///
    /// # Errors
    /// Returns `DocumentError` with the 1-based line number of the first
    /// line that cannot be parsed.
    ///
    /// # Examples
    /// ```
    /// # use monad_substrate::ConfigDocument;
    /// let doc = ConfigDocument::parse("# base\nA=1\nexport B='two words'").unwrap();
    /// assert_eq!(doc.get("A"), Some("1"));
    /// assert_eq!(doc.get("B"), Some("two words"));
    /// ```
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        dotenvy::from_read_iter(text.as_bytes())
            .map(|entry| entry.map_err(|e| document_error(text, &e)))
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(|entries| Self { entries })
    }

    /// Get value by key
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Check if key is present
    #[inline]
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the document has no keys
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Overlay `other` on top of `self`; keys in `other` win
    #[must_use]
    pub fn merged(mut self, other: &ConfigDocument) -> Self {
        self.entries
            .extend(other.entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }
}

impl FromIterator<(String, String)> for ConfigDocument {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

fn document_error(text: &str, err: &dotenvy::Error) -> DocumentError {
    match err {
        dotenvy::Error::LineParse(line, _) => {
            let first = line.lines().next().unwrap_or_default().trim();
            let line_no = text
                .lines()
                .position(|candidate| candidate.trim() == first)
                .map_or(0, |index| index + 1);
            DocumentError::new(line_no, format!("cannot parse '{first}'"))
        }
        other => DocumentError::new(0, other.to_string()),
    }
}
