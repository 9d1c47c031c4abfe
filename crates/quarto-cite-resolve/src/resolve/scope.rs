/*
 * resolve/scope.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * A configured engine with its bibliography.
 */

use std::sync::{Arc, Mutex, PoisonError};

use crate::bibliography::Bibliography;
use crate::document::ScopeSettings;
use crate::engine::CitationEngine;
use crate::search::{SearchHit, SearchIndex};

/// An engine, the bibliography it was built over, and the settings that
/// selected them. Documents with equal settings share a scope.
pub struct Scope {
    settings: Option<ScopeSettings>,
    bibliography: Arc<Bibliography>,
    search: SearchIndex,
    engine: Mutex<Box<dyn CitationEngine>>,
}

impl Scope {
    pub(crate) fn new(
        settings: Option<ScopeSettings>,
        bibliography: Arc<Bibliography>,
        engine: Box<dyn CitationEngine>,
    ) -> Self {
        let search = SearchIndex::build(&bibliography);
        Self {
            settings,
            bibliography,
            search,
            engine: Mutex::new(engine),
        }
    }

    /// `None` for the global scope.
    pub fn settings(&self) -> Option<&ScopeSettings> {
        self.settings.as_ref()
    }

    pub fn bibliography(&self) -> &Arc<Bibliography> {
        &self.bibliography
    }

    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        self.search.search(query, limit)
    }

    /// Run `f` with exclusive access to the engine.
    pub(crate) fn with_engine<R>(&self, f: impl FnOnce(&mut dyn CitationEngine) -> R) -> R {
        let mut engine = self.engine.lock().unwrap_or_else(PoisonError::into_inner);
        f(engine.as_mut())
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("settings", &self.settings)
            .field("entries", &self.bibliography.len())
            .finish_non_exhaustive()
    }
}
