/*
 * document.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * Document identity and per-document citation settings.
 */

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identity of an open document (a URI or path).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Per-document overrides of the global citation settings.
///
/// Two documents with equal settings (field by field) may share an engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeSettings {
    /// Alternate bibliography file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bibliography: Option<String>,

    /// Alternate style id, or a path to a `.csl` file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,

    /// Alternate locale id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// The citation-related subset of a document's YAML front matter.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FrontMatter {
    bibliography: Option<OneOrMany>,
    #[serde(alias = "citation-style")]
    csl: Option<String>,
    #[serde(alias = "citation-language")]
    lang: Option<String>,
}

impl ScopeSettings {
    pub fn is_empty(&self) -> bool {
        self.bibliography.is_none() && self.style.is_none() && self.lang.is_none()
    }

    /// Read citation settings from the YAML front matter at the top of
    /// `text`.
    ///
    /// Returns `None` when there is no front matter, when it is not valid
    /// YAML, or when it sets none of `bibliography`, `csl` (`citation-style`)
    /// or `lang` (`citation-language`). Only the first of several
    /// bibliographies is used.
    pub fn from_front_matter(text: &str) -> Option<Self> {
        let yaml = front_matter(text)?;
        let parsed: FrontMatter = match serde_yaml::from_str(yaml) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::debug!(error = %err, "ignoring unparseable front matter");
                return None;
            }
        };
        let bibliography = match parsed.bibliography {
            Some(OneOrMany::One(path)) => Some(path),
            Some(OneOrMany::Many(paths)) => paths.into_iter().next(),
            None => None,
        };
        let settings = Self {
            bibliography: bibliography.filter(|s| !s.trim().is_empty()),
            style: parsed.csl.filter(|s| !s.trim().is_empty()),
            lang: parsed.lang.filter(|s| !s.trim().is_empty()),
        };
        (!settings.is_empty()).then_some(settings)
    }
}

/// The YAML between a leading `---` line and the next `---` or `...` line.
fn front_matter(text: &str) -> Option<&str> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != "---" {
        return None;
    }
    let start = first.len();
    let mut offset = start;
    for line in lines {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            return Some(&text[start..offset]);
        }
        offset += line.len();
    }
    None
}
