/*
 * bibliography.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * CSL-JSON bibliography model.
 */

//! Bibliography entries in CSL-JSON form.
//!
//! Only the fields the built-in engine and the search index read are typed;
//! everything else is kept verbatim in [`BibEntry::other`] so that a full
//! citation processor can be plugged in behind
//! [`EngineFactory`](crate::EngineFactory) without losing data.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};

/// One bibliography entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BibEntry {
    #[serde(deserialize_with = "deserialize_string_or_int")]
    pub id: String,

    /// CSL item type (`book`, `article-journal`, ...).
    #[serde(rename = "type", default)]
    pub entry_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(rename = "container-title", skip_serializing_if = "Option::is_none")]
    pub container_title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<StringOrNumber>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<StringOrNumber>,

    #[serde(rename = "DOI", skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,

    #[serde(rename = "URL", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<Vec<Name>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor: Option<Vec<Name>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued: Option<DateVariable>,

    /// Fields not modelled above.
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

/// Deserialize a value that may be either a string or an integer into a String.
/// CSL-JSON allows numeric ids.
fn deserialize_string_or_int<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value: serde_json::Value = Deserialize::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        _ => Err(Error::custom("expected string or number for id")),
    }
}

/// A CSL field that may be written as a string or a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringOrNumber {
    String(String),
    Number(i64),
}

impl std::fmt::Display for StringOrNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StringOrNumber::String(s) => f.write_str(s),
            StringOrNumber::Number(n) => write!(f, "{n}"),
        }
    }
}

/// A name in CSL-JSON format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub given: Option<String>,

    /// Institutional names and other unsplittable names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,
}

impl Name {
    /// The name as used in a short citation: family name, else literal.
    pub fn short(&self) -> Option<&str> {
        self.family.as_deref().or(self.literal.as_deref())
    }

    /// "Family, Given" for sorting and bibliography lead names.
    pub fn inverted(&self) -> Option<String> {
        match (&self.family, &self.given) {
            (Some(family), Some(given)) => Some(format!("{family}, {given}")),
            (Some(family), None) => Some(family.clone()),
            _ => self.literal.clone(),
        }
    }

    /// "Given Family".
    pub fn display(&self) -> Option<String> {
        match (&self.family, &self.given) {
            (Some(family), Some(given)) => Some(format!("{given} {family}")),
            (Some(family), None) => Some(family.clone()),
            _ => self.literal.clone(),
        }
    }
}

/// A CSL date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateVariable {
    #[serde(rename = "date-parts", skip_serializing_if = "Option::is_none")]
    pub date_parts: Option<Vec<Vec<StringOrNumber>>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl DateVariable {
    /// The year of the (first) date, if any.
    pub fn year(&self) -> Option<String> {
        if let Some(year) = self
            .date_parts
            .as_ref()
            .and_then(|parts| parts.first())
            .and_then(|first| first.first())
        {
            return Some(year.to_string());
        }
        let text = self.raw.as_deref().or(self.literal.as_deref())?;
        let digits: String = text.chars().take_while(char::is_ascii_digit).collect();
        (digits.len() == 4).then_some(digits)
    }
}

impl BibEntry {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entry_type: String::new(),
            title: None,
            container_title: None,
            publisher: None,
            volume: None,
            page: None,
            doi: None,
            url: None,
            author: None,
            editor: None,
            issued: None,
            other: serde_json::Map::new(),
        }
    }

    /// Authors, falling back to editors.
    pub fn creators(&self) -> &[Name] {
        self.author
            .as_deref()
            .filter(|names| !names.is_empty())
            .or(self.editor.as_deref())
            .unwrap_or(&[])
    }

    pub fn year(&self) -> Option<String> {
        self.issued.as_ref().and_then(DateVariable::year)
    }
}

/// An ordered set of entries keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bibliography {
    entries: IndexMap<String, BibEntry>,
    fingerprint: Option<String>,
}

impl Bibliography {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a bibliography from entries. A repeated id replaces the earlier
    /// entry but keeps its position.
    pub fn from_entries(entries: impl IntoIterator<Item = BibEntry>) -> Self {
        let mut map = IndexMap::new();
        for entry in entries {
            if let Some(previous) = map.insert(entry.id.clone(), entry) {
                tracing::debug!(id = %previous.id, "duplicate bibliography entry");
            }
        }
        Self {
            entries: map,
            fingerprint: None,
        }
    }

    /// Parse a CSL-JSON array. The content fingerprint is recorded so that
    /// later edits to the file can be detected.
    pub fn from_csl_json(content: &str) -> serde_json::Result<Self> {
        let entries: Vec<BibEntry> = serde_json::from_str(content)?;
        let mut bibliography = Self::from_entries(entries);
        bibliography.fingerprint = Some(content_fingerprint(content.as_bytes()));
        Ok(bibliography)
    }

    pub fn get(&self, id: &str) -> Option<&BibEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = &BibEntry> {
        self.entries.values()
    }

    /// SHA-256 of the source text, for bibliographies parsed from text.
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }
}

/// Hex SHA-256 of `bytes`.
pub fn content_fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
