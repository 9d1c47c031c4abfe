/*
 * resolve/result.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * The per-document outcome of resolution.
 */

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use quarto_cite_syntax::CitationGroup;
use serde::Serialize;

use super::scope::Scope;
use crate::document::ScopeSettings;
use crate::engine::RenderedCitation;

/// Everything known about one document's citations after a resolution pass.
///
/// `resolved_keys` and `unresolved_keys` partition `keys`. Results are
/// shared behind `Arc` and never mutated; consumers compare fields by
/// identity (`Arc::ptr_eq` on `bibliography`) to skip redundant work.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    /// Every key cited in the document.
    pub keys: BTreeSet<String>,
    /// Keys found in the document's bibliography.
    pub resolved_keys: BTreeSet<String>,
    /// Keys not found, or every key when resolution failed.
    pub unresolved_keys: BTreeSet<String>,
    /// The rendered bibliography document, absent when nothing resolved.
    pub bibliography: Option<Arc<str>>,
    /// Rendered resolvable citation groups in source order.
    pub citations: Vec<RenderedCitation>,
    /// Rendered bibliography entry HTML by cited id.
    pub cite_to_bib_entry: BTreeMap<String, String>,
    /// The document's own settings, if it has any.
    pub settings: Option<ScopeSettings>,
    /// The scope the document was resolved against.
    #[serde(skip)]
    pub(crate) scope: Option<Arc<Scope>>,
    /// The groups extracted from the document text.
    #[serde(skip)]
    pub(crate) groups: Vec<CitationGroup>,
}

impl std::fmt::Debug for ResolutionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionResult")
            .field("keys", &self.keys)
            .field("resolved_keys", &self.resolved_keys)
            .field("unresolved_keys", &self.unresolved_keys)
            .field("bibliography", &self.bibliography.is_some())
            .field("citations", &self.citations.len())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ResolutionResult {
    /// The result of a pass that could not produce an engine or render:
    /// every key unresolved, nothing rendered.
    pub(crate) fn unresolved(
        keys: BTreeSet<String>,
        settings: Option<ScopeSettings>,
        groups: Vec<CitationGroup>,
    ) -> Self {
        Self {
            unresolved_keys: keys.clone(),
            keys,
            resolved_keys: BTreeSet::new(),
            bibliography: None,
            citations: Vec::new(),
            cite_to_bib_entry: BTreeMap::new(),
            settings,
            scope: None,
            groups,
        }
    }

    pub fn key_status(&self, id: &str) -> KeyStatus {
        KeyStatus {
            resolved: self.resolved_keys.contains(id),
            unresolved: self.unresolved_keys.contains(id),
        }
    }

    /// Rendered citations whose source range lies within `from..to`. An
    /// empty range is a cursor position and matches citations touching it.
    pub fn citations_in_range(&self, from: usize, to: usize) -> Vec<&RenderedCitation> {
        self.citations
            .iter()
            .filter(|c| {
                if from == to {
                    c.from <= from && from <= c.to
                } else {
                    from <= c.from && c.to <= to
                }
            })
            .collect()
    }

    /// Footnote body for the 1-based note index.
    pub fn note(&self, index: u32) -> Option<&str> {
        self.citations
            .iter()
            .find(|c| c.note_index == Some(index))
            .and_then(|c| c.note.as_deref())
    }

    /// Rendered bibliography entry for a cited id.
    pub fn bib_entry(&self, id: &str) -> Option<&str> {
        self.cite_to_bib_entry.get(id).map(String::as_str)
    }

    /// The style, locale and bibliography this result was rendered with.
    pub fn scope(&self) -> Option<&Arc<Scope>> {
        self.scope.as_ref()
    }
}

/// Whether a key resolved. Both flags are false for keys the document does
/// not cite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KeyStatus {
    pub resolved: bool,
    pub unresolved: bool,
}

/// What the resolver currently holds for a document.
#[derive(Debug, Clone)]
pub enum DocumentState {
    /// Never resolved, evicted or forgotten.
    Absent,
    /// A resolution is running and nothing is cached yet.
    Pending,
    /// The latest completed result; a newer resolution may be running.
    Resolved(Arc<ResolutionResult>),
}
