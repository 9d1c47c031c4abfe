//! Citation resolution for live editing.
//!
//! Given the text of an open document, a [`Resolver`] finds its citations
//! (via `quarto-cite-syntax`), decides which bibliography, style and locale
//! apply, renders the citations and the bibliography through a
//! [`CitationEngine`], and caches the outcome per document so that editor
//! features (highlighting, hovers, footnote previews, completion) can query
//! it cheaply.
//!
//! The pieces, bottom up:
//!
//! - [`Bibliography`]: CSL-JSON entries, with a [`SearchIndex`] for
//!   key completion;
//! - [`DocumentSource`] / [`BibliographySource`]: where styles, locales and
//!   bibliographies come from;
//! - [`DocumentCache`]: memoized style and locale documents;
//! - [`EngineBuilder`] / [`EngineFactory`]: engine construction;
//! - [`Resolver`]: scopes, rendering, the result cache and subscribers.

pub mod bibliography;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod observer;
pub mod resolve;
pub mod search;
pub mod sources;
pub mod style_cache;

pub use bibliography::{BibEntry, Bibliography, DateVariable, Name, StringOrNumber};
pub use config::CiteConfig;
pub use document::{DocumentId, ScopeSettings};
pub use engine::{
    AuthorDateEngine, AuthorDateFactory, BibliographyMetadata, BibliographyOutput,
    CitationEngine, EngineBuilder, EngineFactory, EngineInputs, LocaleLookup, RenderedCitation,
};
pub use error::{Error, Result};
pub use observer::{NoopObserver, ResolutionObserver, TracingObserver};
pub use resolve::{DocumentState, KeyStatus, ResolutionResult, Resolver, Scope};
pub use search::{SearchHit, SearchIndex};
pub use sources::{
    BibliographySource, DocumentKind, DocumentSource, FileSystemBibliographySource,
    FileSystemSource, Sources,
};
pub use style_cache::DocumentCache;
