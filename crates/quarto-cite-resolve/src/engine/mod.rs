/*
 * engine/mod.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * The citation engine seam.
 */

//! Citation engines.
//!
//! A [`CitationEngine`] turns citation groups into display text for one
//! style, locale and bibliography. Engines are created by an
//! [`EngineFactory`]; [`EngineBuilder`] gathers the factory's inputs from the
//! style and locale caches. The crate ships [`AuthorDateFactory`], a compact
//! author-date/note renderer; hosts with a full CSL processor plug it in
//! through the factory trait.

mod author_date;
mod builder;
pub mod csl_xml;

use std::sync::Arc;

use quarto_cite_syntax::{Citation, CitationGroup};
use serde::{Deserialize, Serialize};

use crate::bibliography::Bibliography;
use crate::error::Result;
use crate::style_cache::DocumentCache;

pub use author_date::{AuthorDateEngine, AuthorDateFactory};
pub use builder::EngineBuilder;

/// Display text for one citation group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedCitation {
    pub citations: Vec<Citation>,
    /// Rendered HTML for the group, or its footnote marker for note styles.
    pub val: String,
    pub from: usize,
    pub to: usize,
    /// Footnote body for note styles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// 1-based footnote number for note styles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_index: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BibliographyMetadata {
    /// Ids of the rendered entries, aligned with
    /// [`BibliographyOutput::entries`].
    pub entry_ids: Vec<String>,
    pub entry_spacing: u32,
    pub line_spacing: u32,
    pub hanging_indent: bool,
}

/// A rendered bibliography.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BibliographyOutput {
    pub metadata: BibliographyMetadata,
    /// One HTML fragment per entry.
    pub entries: Vec<String>,
}

/// A configured citation processor.
///
/// Engines are stateful: [`render_bibliography`](Self::render_bibliography)
/// covers the works cited by the most recent
/// [`render_citations`](Self::render_citations) call. Callers serialize
/// access to an engine.
pub trait CitationEngine: Send {
    /// Render `groups`, returning one result per group in the same order.
    /// Every cited id must exist in the engine's bibliography.
    fn render_citations(&mut self, groups: &[CitationGroup]) -> Result<Vec<RenderedCitation>>;

    /// Render the bibliography for the works last cited, or `None` when
    /// nothing was cited.
    fn render_bibliography(&mut self) -> Result<Option<BibliographyOutput>>;
}

/// Synchronous access to loaded locale documents.
#[derive(Clone)]
pub struct LocaleLookup {
    cache: Arc<DocumentCache>,
}

impl LocaleLookup {
    pub fn new(cache: Arc<DocumentCache>) -> Self {
        Self { cache }
    }

    /// The locale document for `lang`, if it has been loaded.
    pub fn get(&self, lang: &str) -> Option<Arc<str>> {
        self.cache.get(lang)
    }
}

/// Everything an engine is built from.
pub struct EngineInputs {
    /// The CSL style document.
    pub style: Arc<str>,
    pub lang: String,
    pub locales: LocaleLookup,
    pub bibliography: Arc<Bibliography>,
}

/// Creates engines.
pub trait EngineFactory: Send + Sync {
    fn build(&self, inputs: EngineInputs) -> Result<Box<dyn CitationEngine>>;
}
