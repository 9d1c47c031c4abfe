//! End-to-end tests for the resolver: scopes, caching, change suppression
//! and failure handling, driven through in-memory sources.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use quarto_cite_resolve::bibliography::content_fingerprint;
use quarto_cite_resolve::{
    AuthorDateFactory, BibliographyOutput, BibliographySource, CiteConfig, CitationEngine,
    DocumentId, DocumentKind, DocumentSource, DocumentState, EngineFactory, EngineInputs, Error,
    KeyStatus, RenderedCitation, ResolutionObserver, ResolutionResult, Resolver, Result, Sources,
};
use quarto_cite_syntax::CitationGroup;
use tokio::sync::Notify;

// ============================================================================
// Fixtures
// ============================================================================

const IN_TEXT_STYLE: &str =
    r#"<style class="in-text"><info><title>Author-date</title></info></style>"#;
const NOTE_STYLE: &str = r#"<style class="note"><info><title>Notes</title></info></style>"#;
const ENGLISH: &str = r#"<locale xml:lang="en-US"><terms>
    <term name="and">and</term><term name="et-al">et al.</term>
</terms></locale>"#;
const GERMAN: &str = r#"<locale xml:lang="de-DE"><terms>
    <term name="and">und</term><term name="et-al">u. a.</term>
</terms></locale>"#;

const GLOBAL_BIB: &str = r#"[
    {"id": "smith99", "type": "book", "title": "Linear Models",
     "author": [{"family": "Smith", "given": "Jane"}],
     "issued": {"date-parts": [[1999]]}}
]"#;

const LOCAL_BIB: &str = r#"[
    {"id": "doe2000", "type": "article-journal", "title": "Smoothing",
     "author": [{"family": "Doe"}, {"family": "Roe"}],
     "issued": {"date-parts": [[2000]]}}
]"#;

struct MemoryDocuments {
    kind: DocumentKind,
    documents: HashMap<String, String>,
    fetches: AtomicUsize,
}

impl MemoryDocuments {
    fn new(kind: DocumentKind, documents: &[(&str, &str)]) -> Self {
        Self {
            kind,
            documents: documents
                .iter()
                .map(|(id, text)| (id.to_string(), text.to_string()))
                .collect(),
            fetches: AtomicUsize::new(0),
        }
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentSource for MemoryDocuments {
    async fn fetch(&self, id: &str, explicit_path: Option<&Path>) -> Result<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let key = explicit_path.map_or_else(|| id.to_string(), |p| p.display().to_string());
        self.documents
            .get(&key)
            .cloned()
            .ok_or_else(|| self.kind.load_error(id, "not found"))
    }
}

#[derive(Default)]
struct MemoryBibliographies {
    files: Mutex<HashMap<PathBuf, String>>,
}

impl MemoryBibliographies {
    fn write(&self, path: &str, content: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), content.to_string());
    }

    fn read(&self, path: &Path) -> Result<String> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| Error::BibliographyLoad {
                path: path.to_path_buf(),
                source: std::io::ErrorKind::NotFound.into(),
            })
    }
}

#[async_trait]
impl BibliographySource for MemoryBibliographies {
    async fn load(&self, path: &Path) -> Result<quarto_cite_resolve::Bibliography> {
        let content = self.read(path)?;
        quarto_cite_resolve::Bibliography::from_csl_json(&content).map_err(|e| {
            Error::BibliographyParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })
    }

    async fn fingerprint(&self, path: &Path) -> Result<String> {
        Ok(content_fingerprint(self.read(path)?.as_bytes()))
    }
}

/// Wraps the built-in engine and counts builds and render passes.
#[derive(Default)]
struct CountingFactory {
    builds: AtomicUsize,
    renders: Arc<AtomicUsize>,
}

struct CountingEngine {
    inner: Box<dyn CitationEngine>,
    renders: Arc<AtomicUsize>,
}

impl EngineFactory for CountingFactory {
    fn build(&self, inputs: EngineInputs) -> Result<Box<dyn CitationEngine>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingEngine {
            inner: AuthorDateFactory.build(inputs)?,
            renders: self.renders.clone(),
        }))
    }
}

impl CitationEngine for CountingEngine {
    fn render_citations(&mut self, groups: &[CitationGroup]) -> Result<Vec<RenderedCitation>> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        self.inner.render_citations(groups)
    }

    fn render_bibliography(&mut self) -> Result<Option<BibliographyOutput>> {
        self.inner.render_bibliography()
    }
}

#[derive(Default)]
struct Recorder {
    resolved: Mutex<Vec<String>>,
    evicted: Mutex<Vec<String>>,
}

impl Recorder {
    fn resolved(&self) -> Vec<String> {
        self.resolved.lock().unwrap().clone()
    }

    fn evicted(&self) -> Vec<String> {
        self.evicted.lock().unwrap().clone()
    }
}

impl ResolutionObserver for Recorder {
    fn on_resolved(&self, document: &DocumentId, _result: &Arc<ResolutionResult>) {
        self.resolved.lock().unwrap().push(document.to_string());
    }

    fn on_evicted(&self, document: &DocumentId) {
        self.evicted.lock().unwrap().push(document.to_string());
    }
}

struct Harness {
    resolver: Resolver,
    styles: Arc<MemoryDocuments>,
    bibliographies: Arc<MemoryBibliographies>,
    factory: Arc<CountingFactory>,
    recorder: Arc<Recorder>,
}

impl Harness {
    fn new() -> Self {
        Self::with_capacity(10)
    }

    fn with_capacity(capacity: usize) -> Self {
        let styles = Arc::new(MemoryDocuments::new(
            DocumentKind::Style,
            &[
                ("author-date", IN_TEXT_STYLE),
                ("notes", NOTE_STYLE),
                ("styles/mine.csl", NOTE_STYLE),
            ],
        ));
        let locales = Arc::new(MemoryDocuments::new(
            DocumentKind::Locale,
            &[("en-US", ENGLISH), ("de-DE", GERMAN)],
        ));
        let bibliographies = Arc::new(MemoryBibliographies::default());
        bibliographies.write("global.json", GLOBAL_BIB);
        bibliographies.write("local.json", LOCAL_BIB);
        let factory = Arc::new(CountingFactory::default());
        let recorder = Arc::new(Recorder::default());

        let config = CiteConfig {
            style: "author-date".to_string(),
            lang: "en-US".to_string(),
            bibliography: Some(PathBuf::from("global.json")),
            cache_capacity: capacity,
            ..Default::default()
        };
        let sources = Sources {
            styles: styles.clone(),
            locales,
            bibliographies: bibliographies.clone(),
        };
        let resolver = Resolver::new(config, sources, factory.clone());
        resolver.subscribe(recorder.clone());

        Self {
            resolver,
            styles,
            bibliographies,
            factory,
            recorder,
        }
    }

    async fn resolve(&self, document: &str, text: &str) -> Arc<ResolutionResult> {
        self.resolver.resolve(&DocumentId::from(document), text).await
    }

    fn builds(&self) -> usize {
        self.factory.builds.load(Ordering::SeqCst)
    }

    fn renders(&self) -> usize {
        self.factory.renders.load(Ordering::SeqCst)
    }
}

fn set(keys: &[&str]) -> std::collections::BTreeSet<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

fn assert_partitioned(result: &ResolutionResult) {
    assert!(result.resolved_keys.is_disjoint(&result.unresolved_keys));
    let union: std::collections::BTreeSet<String> = result
        .resolved_keys
        .union(&result.unresolved_keys)
        .cloned()
        .collect();
    assert_eq!(union, result.keys);
}

// ============================================================================
// Resolution
// ============================================================================

#[tokio::test]
async fn test_partitions_keys_and_renders_resolved_groups() {
    let h = Harness::new();
    let result = h
        .resolve("a.md", "[see @doe2000, p. 12; @lee2010] and @smith99")
        .await;

    assert_partitioned(&result);
    assert_eq!(result.resolved_keys, set(&["smith99"]));
    assert_eq!(result.unresolved_keys, set(&["doe2000", "lee2010"]));

    assert_eq!(result.citations.len(), 1);
    let citation = &result.citations[0];
    assert_eq!(citation.val, "Smith (1999)");
    assert_eq!((citation.from, citation.to), (36, 44));

    assert!(result.bibliography.as_deref().unwrap().contains("Linear Models"));
    assert_eq!(
        result.cite_to_bib_entry.keys().collect::<Vec<_>>(),
        vec!["smith99"]
    );
    assert_eq!(h.recorder.resolved(), vec!["a.md"]);
}

#[tokio::test]
async fn test_no_resolved_citations_means_no_bibliography() {
    let h = Harness::new();
    let result = h.resolve("a.md", "Only [@nobody] here.").await;
    assert_partitioned(&result);
    assert_eq!(result.unresolved_keys, set(&["nobody"]));
    assert!(result.citations.is_empty());
    assert!(result.bibliography.is_none());
    assert!(result.cite_to_bib_entry.is_empty());
}

#[tokio::test]
async fn test_document_without_citations() {
    let h = Harness::new();
    let result = h.resolve("a.md", "No citations, just me@example.com.").await;
    assert!(result.keys.is_empty());
    assert!(result.citations.is_empty());
    assert!(result.bibliography.is_none());
}

// ============================================================================
// Caching and change suppression
// ============================================================================

#[tokio::test]
async fn test_unchanged_text_skips_render() {
    let h = Harness::new();
    let first = h.resolve("a.md", "As @smith99 shows.").await;
    let second = h.resolve("a.md", "As @smith99 shows, again.").await;

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(h.renders(), 1);
    assert_eq!(h.builds(), 1);
    assert_eq!(h.recorder.resolved(), vec!["a.md"]);
}

#[tokio::test]
async fn test_unresolved_edits_keep_bibliography_identity() {
    let h = Harness::new();
    let first = h.resolve("a.md", "@smith99 text").await;
    let second = h.resolve("a.md", "@smith99 text [@missing]").await;

    assert_eq!(h.renders(), 2);
    assert!(Arc::ptr_eq(
        first.bibliography.as_ref().unwrap(),
        second.bibliography.as_ref().unwrap()
    ));
    assert_eq!(second.unresolved_keys, set(&["missing"]));
    // The partition changed, so subscribers hear about it.
    assert_eq!(h.recorder.resolved().len(), 2);

    // Moving the unresolved citation changes nothing anyone renders.
    let third = h.resolve("a.md", "@smith99 text  [@missing]").await;
    assert_eq!(h.renders(), 3);
    assert!(Arc::ptr_eq(
        first.bibliography.as_ref().unwrap(),
        third.bibliography.as_ref().unwrap()
    ));
    assert_eq!(h.recorder.resolved().len(), 2);
    let cached = h.resolver.cached(&DocumentId::from("a.md")).unwrap();
    assert!(Arc::ptr_eq(&cached, &third));
}

#[tokio::test]
async fn test_shifted_citations_rerender_with_same_scope() {
    let h = Harness::new();
    let first = h.resolve("a.md", "@smith99").await;
    let second = h.resolve("a.md", "Intro. @smith99").await;

    assert_eq!(h.builds(), 1);
    assert_eq!(h.renders(), 2);
    assert_eq!(second.citations[0].from, 7);
    assert_eq!(first.bibliography, second.bibliography);
    assert!(!Arc::ptr_eq(
        first.bibliography.as_ref().unwrap(),
        second.bibliography.as_ref().unwrap()
    ));
    assert_eq!(h.recorder.resolved().len(), 2);
}

#[tokio::test]
async fn test_least_recently_used_document_is_evicted() {
    let h = Harness::with_capacity(2);
    h.resolve("a.md", "@smith99").await;
    h.resolve("b.md", "@smith99").await;
    assert!(h.resolver.cached(&DocumentId::from("a.md")).is_some());
    h.resolve("c.md", "@smith99").await;

    assert!(matches!(
        h.resolver.state(&DocumentId::from("b.md")),
        DocumentState::Absent
    ));
    assert!(matches!(
        h.resolver.state(&DocumentId::from("a.md")),
        DocumentState::Resolved(_)
    ));
    assert_eq!(h.recorder.evicted(), vec!["b.md"]);
}

#[tokio::test]
async fn test_forget_drops_result() {
    let h = Harness::new();
    let doc = DocumentId::from("a.md");
    h.resolve("a.md", "@smith99").await;
    assert!(h.resolver.forget(&doc));
    assert!(!h.resolver.forget(&doc));
    assert!(matches!(h.resolver.state(&doc), DocumentState::Absent));
}

// ============================================================================
// Scopes
// ============================================================================

#[tokio::test]
async fn test_front_matter_scope_is_reused_until_bibliography_changes() {
    let h = Harness::new();
    let text = "---\nbibliography: local.json\n---\n[@doe2000] and [@smith99]";
    let result = h.resolve("a.md", text).await;
    assert_eq!(result.resolved_keys, set(&["doe2000"]));
    assert_eq!(result.unresolved_keys, set(&["smith99"]));
    assert_eq!(result.citations[0].val, "(Doe and Roe 2000)");
    assert_eq!(h.builds(), 1);

    h.resolve("a.md", &format!("{text}.")).await;
    assert_eq!(h.builds(), 1);

    h.bibliographies.write(
        "local.json",
        &LOCAL_BIB.replace("Smoothing", "Smoothing, Revised"),
    );
    let result = h.resolve("a.md", &format!("{text}..")).await;
    assert_eq!(h.builds(), 2);
    assert!(
        result
            .bibliography
            .as_deref()
            .unwrap()
            .contains("Smoothing, Revised")
    );
}

#[tokio::test]
async fn test_locale_override() {
    let h = Harness::new();
    let text = "---\nbibliography: local.json\nlang: de-DE\n---\n[@doe2000]";
    let result = h.resolve("a.md", text).await;
    assert_eq!(result.citations[0].val, "(Doe und Roe 2000)");
    assert_eq!(result.settings.as_ref().unwrap().lang.as_deref(), Some("de-DE"));
}

#[tokio::test]
async fn test_note_style_override_and_style_cache() {
    let h = Harness::new();
    let text = "---\ncsl: notes\n---\nFirst @smith99. Then [@smith99, p. 3].";
    let result = h.resolve("a.md", text).await;
    assert_eq!(result.citations[0].val, "<sup>1</sup>");
    let doc = DocumentId::from("a.md");
    assert_eq!(h.resolver.note(&doc, 2).as_deref(), Some("Smith 1999, 3."));
    assert_eq!(h.resolver.note(&doc, 3), None);

    // A second document with the same style builds its own engine but
    // reuses the cached style document.
    h.resolve("b.md", text).await;
    assert_eq!(h.builds(), 2);
    assert_eq!(h.styles.fetches(), 1);

    let by_path = h
        .resolve("c.md", "---\ncsl: styles/mine.csl\n---\n@smith99")
        .await;
    assert_eq!(by_path.citations[0].note_index, Some(1));
    assert_eq!(h.styles.fetches(), 2);
}

#[tokio::test]
async fn test_changing_style_override_rebuilds_scope() {
    let h = Harness::new();
    let doc = DocumentId::from("a.md");
    let first = h
        .resolve("a.md", "---\nlang: en-US\n---\nSee @smith99.")
        .await;
    assert_eq!(first.citations[0].val, "Smith (1999)");
    assert_eq!(h.builds(), 1);

    // Same citations, only the style override changes.
    let second = h
        .resolve("a.md", "---\nlang: en-US\ncsl: notes\n---\nSee @smith99.")
        .await;
    assert_eq!(h.builds(), 2);
    assert_eq!(second.citations[0].val, "<sup>1</sup>");
    assert_eq!(h.resolver.note(&doc, 1).as_deref(), Some("Smith 1999."));
    assert!(!Arc::ptr_eq(
        first.scope().unwrap(),
        second.scope().unwrap()
    ));
    assert_eq!(h.recorder.resolved(), vec!["a.md", "a.md"]);
}

#[tokio::test]
async fn test_failed_scope_reports_every_key_unresolved() {
    let h = Harness::new();
    let broken = "---\ncsl: no-such-style\n---\n[@smith99; @other] @smith99";
    let result = h.resolve("a.md", broken).await;

    assert_partitioned(&result);
    assert!(result.resolved_keys.is_empty());
    assert_eq!(result.unresolved_keys, set(&["other", "smith99"]));
    assert!(result.citations.is_empty());
    assert!(result.bibliography.is_none());
    assert!(result.scope().is_none());
    assert_eq!(h.recorder.resolved(), vec!["a.md"]);

    // The failure is not remembered: fixing the document resolves it.
    let fixed = h.resolve("a.md", "[@smith99; @other] @smith99").await;
    assert_eq!(fixed.resolved_keys, set(&["smith99"]));
}

#[tokio::test]
async fn test_missing_local_bibliography_fails_softly() {
    let h = Harness::new();
    let result = h
        .resolve("a.md", "---\nbibliography: gone.json\n---\n@smith99")
        .await;
    assert_eq!(result.unresolved_keys, set(&["smith99"]));
    assert_eq!(h.builds(), 0);
}

#[tokio::test]
async fn test_set_bibliography_and_reinitialize() {
    let h = Harness::new();
    let doc = DocumentId::from("a.md");
    let result = h.resolve("a.md", "@doe2000").await;
    assert_eq!(result.unresolved_keys, set(&["doe2000"]));

    let local = quarto_cite_resolve::Bibliography::from_csl_json(LOCAL_BIB).unwrap();
    h.resolver.set_bibliography(local).await;
    assert!(matches!(h.resolver.state(&doc), DocumentState::Absent));
    let result = h.resolve("a.md", "@doe2000").await;
    assert_eq!(result.resolved_keys, set(&["doe2000"]));
    assert_eq!(h.builds(), 2);

    h.resolver.reinitialize().await;
    assert!(matches!(h.resolver.state(&doc), DocumentState::Absent));
    let result = h.resolve("a.md", "@doe2000").await;
    // Back to the configured global bibliography.
    assert_eq!(result.unresolved_keys, set(&["doe2000"]));
    assert_eq!(h.styles.fetches(), 2);
    assert_eq!(h.builds(), 3);
}

/// Holds every bibliography load until released.
#[derive(Default)]
struct GatedBibliographies {
    inner: MemoryBibliographies,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl BibliographySource for GatedBibliographies {
    async fn load(&self, path: &Path) -> Result<quarto_cite_resolve::Bibliography> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.load(path).await
    }

    async fn fingerprint(&self, path: &Path) -> Result<String> {
        self.inner.fingerprint(path).await
    }
}

#[tokio::test]
async fn test_state_is_pending_while_resolving() {
    let bibliographies = Arc::new(GatedBibliographies::default());
    bibliographies.inner.write("global.json", GLOBAL_BIB);
    let sources = Sources {
        styles: Arc::new(MemoryDocuments::new(
            DocumentKind::Style,
            &[("author-date", IN_TEXT_STYLE)],
        )),
        locales: Arc::new(MemoryDocuments::new(
            DocumentKind::Locale,
            &[("en-US", ENGLISH)],
        )),
        bibliographies: bibliographies.clone(),
    };
    let config = CiteConfig {
        style: "author-date".to_string(),
        bibliography: Some(PathBuf::from("global.json")),
        ..Default::default()
    };
    let resolver = Resolver::new(config, sources, Arc::new(CountingFactory::default()));
    let doc = DocumentId::from("a.md");
    assert!(matches!(resolver.state(&doc), DocumentState::Absent));

    let watch = async {
        bibliographies.entered.notified().await;
        let pending = matches!(resolver.state(&doc), DocumentState::Pending);
        bibliographies.release.notify_one();
        pending
    };
    let (result, pending) = tokio::join!(resolver.resolve(&doc, "@smith99"), watch);

    assert!(pending);
    assert_eq!(result.resolved_keys, set(&["smith99"]));
    match resolver.state(&doc) {
        DocumentState::Resolved(cached) => assert!(Arc::ptr_eq(&cached, &result)),
        other => panic!("expected a resolved state, got {other:?}"),
    }
}

// ============================================================================
// Queries
// ============================================================================

#[tokio::test]
async fn test_queries_against_cached_result() {
    let h = Harness::new();
    let doc = DocumentId::from("a.md");
    h.resolve("a.md", "See @smith99 and [@nobody].").await;

    assert_eq!(
        h.resolver.key_status(&doc, "smith99"),
        KeyStatus {
            resolved: true,
            unresolved: false
        }
    );
    assert_eq!(
        h.resolver.key_status(&doc, "nobody"),
        KeyStatus {
            resolved: false,
            unresolved: true
        }
    );
    assert_eq!(h.resolver.key_status(&doc, "uncited"), KeyStatus::default());
    assert_eq!(
        h.resolver
            .key_status(&DocumentId::from("other.md"), "smith99"),
        KeyStatus::default()
    );

    let hits = h.resolver.citations_in_range(&doc, 0, 12);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].val, "Smith (1999)");
    assert_eq!((hits[0].from, hits[0].to), (4, 12));
    // Partly covered citations are not within the range.
    assert!(h.resolver.citations_in_range(&doc, 0, 10).is_empty());
    assert!(h.resolver.citations_in_range(&doc, 6, 20).is_empty());
    assert_eq!(h.resolver.citations_in_range(&doc, 4, 12).len(), 1);
    assert_eq!(h.resolver.citations_in_range(&doc, 8, 8).len(), 1);
    assert!(h.resolver.citations_in_range(&doc, 13, 27).is_empty());

    let entry = h.resolver.bib_entry_html(&doc, "smith99").unwrap();
    assert!(entry.starts_with("<div class=\"csl-entry\">Smith, Jane. 1999."));
    assert_eq!(h.resolver.bib_entry_html(&doc, "nobody"), None);
}

#[tokio::test]
async fn test_search_uses_document_scope() {
    let h = Harness::new();
    let hits = h.resolver.search(None, "smi", 5).await.unwrap();
    assert_eq!(hits[0].id, "smith99");

    let doc = DocumentId::from("a.md");
    h.resolve("a.md", "---\nbibliography: local.json\n---\n@doe2000")
        .await;
    let hits = h.resolver.search(Some(&doc), "", 5).await.unwrap();
    let ids: Vec<_> = hits.iter().map(|hit| hit.id.as_str()).collect();
    assert_eq!(ids, vec!["doe2000"]);
}

#[test]
fn test_resolver_runs_without_tokio() {
    let h = Harness::new();
    let result = pollster::block_on(h.resolve("a.md", "@smith99"));
    assert_eq!(result.resolved_keys, set(&["smith99"]));
}
