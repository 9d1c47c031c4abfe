/*
 * resolve/resolver.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * Per-document citation resolution with result caching.
 */

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use quarto_cite_syntax::{CitationGroup, parse_citations};

use super::lru::LruCache;
use super::renderer;
use super::result::{DocumentState, KeyStatus, ResolutionResult};
use super::scope::Scope;
use crate::bibliography::Bibliography;
use crate::config::CiteConfig;
use crate::document::{DocumentId, ScopeSettings};
use crate::engine::{AuthorDateFactory, EngineBuilder, EngineFactory, RenderedCitation};
use crate::error::{Error, Result};
use crate::observer::ResolutionObserver;
use crate::search::SearchHit;
use crate::sources::{DocumentKind, Sources};
use crate::style_cache::DocumentCache;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A style setting naming a file rather than a style id.
fn style_path(style: &str) -> Option<&Path> {
    (style.ends_with(".csl") || style.contains(['/', '\\'])).then(|| Path::new(style))
}

/// Marks a document as having a resolution in flight for as long as it
/// lives.
struct InFlight<'a> {
    documents: &'a Mutex<HashMap<DocumentId, usize>>,
    document: DocumentId,
}

impl<'a> InFlight<'a> {
    fn enter(documents: &'a Mutex<HashMap<DocumentId, usize>>, document: &DocumentId) -> Self {
        *lock(documents).entry(document.clone()).or_default() += 1;
        Self {
            documents,
            document: document.clone(),
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut documents = lock(self.documents);
        if let Some(count) = documents.get_mut(&self.document) {
            *count -= 1;
            if *count == 0 {
                documents.remove(&self.document);
            }
        }
    }
}

/// Resolves the citations of open documents and caches the results.
///
/// Documents without citation front matter share the global scope, built
/// from the [`CiteConfig`]. A document whose front matter sets
/// `bibliography`, `csl` or `lang` gets its own scope, which is reused for
/// as long as its settings and bibliography file stay the same.
///
/// Resolution never fails: when a style, locale or bibliography cannot be
/// loaded, or the engine errors, the document's keys are all reported
/// unresolved and the error is logged.
///
/// # Example
///
/// ```rust
/// use quarto_cite_resolve::{CiteConfig, DocumentId, Resolver};
///
/// # pollster::block_on(async {
/// let resolver = Resolver::with_defaults(CiteConfig::default());
/// let result = resolver
///     .resolve(&DocumentId::from("notes.md"), "As @doe99 argues.")
///     .await;
/// assert!(result.unresolved_keys.contains("doe99"));
/// # });
/// ```
pub struct Resolver {
    config: CiteConfig,
    sources: Sources,
    styles: Arc<DocumentCache>,
    locales: Arc<DocumentCache>,
    builder: EngineBuilder,
    // Lock order: global_scope before global_bibliography.
    global_scope: tokio::sync::Mutex<Option<Arc<Scope>>>,
    global_bibliography: tokio::sync::Mutex<Option<Arc<Bibliography>>>,
    results: Mutex<LruCache<DocumentId, Arc<ResolutionResult>>>,
    in_flight: Mutex<HashMap<DocumentId, usize>>,
    observers: RwLock<Vec<Arc<dyn ResolutionObserver>>>,
}

impl Resolver {
    pub fn new(config: CiteConfig, sources: Sources, factory: Arc<dyn EngineFactory>) -> Self {
        let styles = Arc::new(DocumentCache::new(
            DocumentKind::Style,
            sources.styles.clone(),
        ));
        let locales = Arc::new(DocumentCache::new(
            DocumentKind::Locale,
            sources.locales.clone(),
        ));
        let builder = EngineBuilder::new(factory, styles.clone(), locales.clone());
        let results = Mutex::new(LruCache::new(config.cache_capacity));
        Self {
            config,
            sources,
            styles,
            locales,
            builder,
            global_scope: tokio::sync::Mutex::new(None),
            global_bibliography: tokio::sync::Mutex::new(None),
            results,
            in_flight: Mutex::new(HashMap::new()),
            observers: RwLock::new(Vec::new()),
        }
    }

    /// A resolver reading from the file system and rendering with the
    /// built-in engine.
    pub fn with_defaults(config: CiteConfig) -> Self {
        let sources = Sources::file_system(&config);
        Self::new(config, sources, Arc::new(AuthorDateFactory))
    }

    pub fn config(&self) -> &CiteConfig {
        &self.config
    }

    pub fn subscribe(&self, observer: Arc<dyn ResolutionObserver>) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    fn observers(&self) -> Vec<Arc<dyn ResolutionObserver>> {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the global bibliography. Cached results are dropped so every
    /// document resolves against the new entries.
    pub async fn set_bibliography(&self, bibliography: Bibliography) {
        let mut scope = self.global_scope.lock().await;
        let mut global = self.global_bibliography.lock().await;
        tracing::info!(entries = bibliography.len(), "Replacing global bibliography");
        *global = Some(Arc::new(bibliography));
        *scope = None;
        drop(global);
        drop(scope);
        lock(&self.results).clear();
    }

    /// Drop every scope, cached document, style and locale. The next
    /// resolution reloads everything from the sources.
    pub async fn reinitialize(&self) {
        let mut scope = self.global_scope.lock().await;
        let mut global = self.global_bibliography.lock().await;
        *global = None;
        *scope = None;
        drop(global);
        drop(scope);
        self.styles.clear();
        self.locales.clear();
        lock(&self.results).clear();
        tracing::info!("Reinitialized citation resolver");
    }

    async fn global_bibliography(&self) -> Result<Arc<Bibliography>> {
        let mut slot = self.global_bibliography.lock().await;
        if let Some(bibliography) = slot.as_ref() {
            return Ok(bibliography.clone());
        }
        let bibliography = match &self.config.bibliography {
            Some(path) => Arc::new(self.sources.bibliographies.load(path).await?),
            None => Arc::new(Bibliography::new()),
        };
        *slot = Some(bibliography.clone());
        Ok(bibliography)
    }

    async fn global_scope(&self) -> Result<Arc<Scope>> {
        let mut slot = self.global_scope.lock().await;
        if let Some(scope) = slot.as_ref() {
            return Ok(scope.clone());
        }
        let bibliography = self.global_bibliography().await?;
        let style = &self.config.style;
        let lang = &self.config.lang;
        let engine = self
            .builder
            .build(style, style_path(style), lang, bibliography.clone())
            .await?;
        let scope = Arc::new(Scope::new(None, bibliography, engine));
        tracing::info!(
            style = %style,
            lang = %lang,
            entries = scope.bibliography().len(),
            "Initialized global citation scope"
        );
        *slot = Some(scope.clone());
        Ok(scope)
    }

    async fn build_scope(&self, settings: &ScopeSettings) -> Result<Arc<Scope>> {
        let bibliography = match &settings.bibliography {
            Some(path) => Arc::new(self.sources.bibliographies.load(Path::new(path)).await?),
            None => self.global_bibliography().await?,
        };
        let style = settings.style.as_deref().unwrap_or(&self.config.style);
        let lang = settings.lang.as_deref().unwrap_or(&self.config.lang);
        let engine = self
            .builder
            .build(style, style_path(style), lang, bibliography.clone())
            .await?;
        tracing::debug!(
            style,
            lang,
            bibliography = ?settings.bibliography,
            "Built document citation scope"
        );
        Ok(Arc::new(Scope::new(
            Some(settings.clone()),
            bibliography,
            engine,
        )))
    }

    /// Whether the bibliography file behind `settings` still has the
    /// content `scope` was built from.
    async fn bibliography_unchanged(&self, settings: &ScopeSettings, scope: &Scope) -> bool {
        let Some(path) = &settings.bibliography else {
            return true;
        };
        match self.sources.bibliographies.fingerprint(Path::new(path)).await {
            Ok(fingerprint) => scope.bibliography().fingerprint() == Some(fingerprint.as_str()),
            Err(err) => {
                tracing::debug!(path = %path, error = %err, "Bibliography fingerprint unavailable");
                false
            }
        }
    }

    /// The scope for a document and whether it is the one `previous` was
    /// rendered with.
    async fn scope_for(
        &self,
        settings: Option<&ScopeSettings>,
        previous: Option<&ResolutionResult>,
    ) -> Result<(Arc<Scope>, bool)> {
        let previous = previous.and_then(|p| p.scope.as_ref().map(|s| (p.settings.as_ref(), s)));

        let Some(settings) = settings else {
            let scope = self.global_scope().await?;
            let reused = matches!(previous, Some((None, s)) if Arc::ptr_eq(s, &scope));
            return Ok((scope, reused));
        };

        if let Some((Some(previous_settings), scope)) = previous
            && previous_settings == settings
            && self.bibliography_unchanged(settings, scope).await
        {
            return Ok((scope.clone(), true));
        }
        Ok((self.build_scope(settings).await?, false))
    }

    /// Resolve the citations in `text`, the current content of `document`.
    ///
    /// The returned result is also cached and, when it differs from the
    /// previous one in anything a consumer displays, delivered to
    /// subscribers. When several resolutions of one document overlap, the
    /// one finishing last is cached.
    pub async fn resolve(&self, document: &DocumentId, text: &str) -> Arc<ResolutionResult> {
        let _in_flight = InFlight::enter(&self.in_flight, document);

        let groups = parse_citations(text);
        let keys: BTreeSet<String> = groups
            .iter()
            .flat_map(CitationGroup::ids)
            .map(str::to_string)
            .collect();
        let settings = ScopeSettings::from_front_matter(text);
        let previous = self.peek(document);

        let (scope, reused) = match self.scope_for(settings.as_ref(), previous.as_deref()).await {
            Ok(found) => found,
            Err(err) => return self.fail(document, &err, keys, settings, groups),
        };

        if reused
            && let Some(previous) = &previous
            && previous.groups == groups
        {
            tracing::trace!(document = %document, "Citations unchanged, skipping render");
            return self.store(document, previous.clone(), false);
        }

        let entries = scope.bibliography();
        let (resolved_keys, unresolved_keys) = renderer::partition(&keys, entries);
        let renderable = renderer::renderable_groups(&groups, entries);
        let outcome = match renderer::render(&scope, &renderable) {
            Ok(outcome) => outcome,
            Err(err) => return self.fail(document, &err, keys, settings, groups),
        };

        if reused
            && let Some(previous) = &previous
            && previous.citations == outcome.citations
        {
            // Same rendering: keep the previous bibliography so consumers
            // comparing by identity can skip redrawing it.
            let notify = previous.resolved_keys != resolved_keys
                || previous.unresolved_keys != unresolved_keys;
            let result = ResolutionResult {
                keys,
                resolved_keys,
                unresolved_keys,
                bibliography: previous.bibliography.clone(),
                citations: outcome.citations,
                cite_to_bib_entry: previous.cite_to_bib_entry.clone(),
                settings,
                scope: Some(scope),
                groups,
            };
            return self.store(document, Arc::new(result), notify);
        }

        let assembled = match outcome
            .bibliography
            .map(renderer::assemble_bibliography)
            .transpose()
        {
            Ok(assembled) => assembled.flatten(),
            Err(err) => return self.fail(document, &err, keys, settings, groups),
        };
        let (bibliography, cite_to_bib_entry) = match assembled {
            Some(assembled) => (Some(assembled.document), assembled.entries),
            None => (None, BTreeMap::new()),
        };

        tracing::debug!(
            document = %document,
            resolved = resolved_keys.len(),
            unresolved = unresolved_keys.len(),
            citations = outcome.citations.len(),
            "Rendered citations"
        );
        let result = ResolutionResult {
            keys,
            resolved_keys,
            unresolved_keys,
            bibliography,
            citations: outcome.citations,
            cite_to_bib_entry,
            settings,
            scope: Some(scope),
            groups,
        };
        self.store(document, Arc::new(result), true)
    }

    fn fail(
        &self,
        document: &DocumentId,
        err: &Error,
        keys: BTreeSet<String>,
        settings: Option<ScopeSettings>,
        groups: Vec<CitationGroup>,
    ) -> Arc<ResolutionResult> {
        tracing::warn!(document = %document, error = %err, "Citation resolution failed");
        let result = ResolutionResult::unresolved(keys, settings, groups);
        self.store(document, Arc::new(result), true)
    }

    fn store(
        &self,
        document: &DocumentId,
        result: Arc<ResolutionResult>,
        notify: bool,
    ) -> Arc<ResolutionResult> {
        let evicted = lock(&self.results).insert(document.clone(), result.clone());
        let observers = self.observers();
        if let Some((evicted, _)) = evicted {
            tracing::debug!(document = %evicted, "Evicting resolution result");
            for observer in &observers {
                observer.on_evicted(&evicted);
            }
        }
        if notify {
            for observer in &observers {
                observer.on_resolved(document, &result);
            }
        }
        result
    }

    fn peek(&self, document: &DocumentId) -> Option<Arc<ResolutionResult>> {
        lock(&self.results).peek(document).cloned()
    }

    /// The latest result for `document`, marking it recently used.
    pub fn cached(&self, document: &DocumentId) -> Option<Arc<ResolutionResult>> {
        lock(&self.results).get(document).cloned()
    }

    pub fn state(&self, document: &DocumentId) -> DocumentState {
        if let Some(result) = self.peek(document) {
            return DocumentState::Resolved(result);
        }
        if lock(&self.in_flight).contains_key(document) {
            DocumentState::Pending
        } else {
            DocumentState::Absent
        }
    }

    /// Whether `id` resolved in `document`. Both flags are false when the
    /// document has no result or does not cite `id`.
    pub fn key_status(&self, document: &DocumentId, id: &str) -> KeyStatus {
        self.cached(document)
            .map(|result| result.key_status(id))
            .unwrap_or_default()
    }

    /// Rendered citations lying within `from..to` in `document`.
    pub fn citations_in_range(
        &self,
        document: &DocumentId,
        from: usize,
        to: usize,
    ) -> Vec<RenderedCitation> {
        self.cached(document)
            .map(|result| {
                result
                    .citations_in_range(from, to)
                    .into_iter()
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Footnote body for the 1-based `index` in `document`.
    pub fn note(&self, document: &DocumentId, index: u32) -> Option<String> {
        self.cached(document)?.note(index).map(str::to_string)
    }

    /// Rendered bibliography entry for `id` in `document`.
    pub fn bib_entry_html(&self, document: &DocumentId, id: &str) -> Option<String> {
        self.cached(document)?.bib_entry(id).map(str::to_string)
    }

    /// Search the bibliography `document` resolves against, or the global
    /// bibliography when there is no document or no result for it.
    pub async fn search(
        &self,
        document: Option<&DocumentId>,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let scope = document
            .and_then(|document| self.peek(document))
            .and_then(|result| result.scope.clone());
        let scope = match scope {
            Some(scope) => scope,
            None => self.global_scope().await?,
        };
        Ok(scope.search(query, limit))
    }

    /// Drop the cached result for a closed document.
    pub fn forget(&self, document: &DocumentId) -> bool {
        lock(&self.results).remove(document).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_path() {
        assert_eq!(style_path("apa"), None);
        assert_eq!(style_path("styles/apa.csl"), Some(Path::new("styles/apa.csl")));
        assert_eq!(style_path("mine.csl"), Some(Path::new("mine.csl")));
    }

    #[test]
    fn test_in_flight_counts_overlapping_passes() {
        let documents = Mutex::new(HashMap::new());
        let doc = DocumentId::from("a.md");
        let first = InFlight::enter(&documents, &doc);
        let second = InFlight::enter(&documents, &doc);
        drop(first);
        assert!(lock(&documents).contains_key(&doc));
        drop(second);
        assert!(lock(&documents).is_empty());
    }
}
