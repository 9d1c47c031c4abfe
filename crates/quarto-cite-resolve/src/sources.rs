/*
 * sources.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * Where styles, locales and bibliographies come from.
 */

//! Document sources.
//!
//! Resolution never touches the file system directly. Styles and locales
//! are fetched through [`DocumentSource`] and bibliographies through
//! [`BibliographySource`], so hosts can serve them from a network service,
//! an editor's virtual file system or memory. The file-system sources read
//! synchronously and work under any executor.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::bibliography::{Bibliography, content_fingerprint};
use crate::config::{CiteConfig, DEFAULT_LANG, DEFAULT_STYLE};
use crate::error::{Error, Result};

/// The kind of document a [`DocumentSource`] serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Style,
    Locale,
}

impl DocumentKind {
    /// File name for a document id, following the naming used by the CSL
    /// style and locale repositories.
    pub fn file_name(&self, id: &str) -> String {
        match self {
            DocumentKind::Style => format!("{id}.csl"),
            DocumentKind::Locale => format!("locales-{id}.xml"),
        }
    }

    /// The load error for this kind of document.
    pub fn load_error(&self, id: impl Into<String>, message: impl Into<String>) -> Error {
        match self {
            DocumentKind::Style => Error::StyleLoad {
                id: id.into(),
                message: message.into(),
            },
            DocumentKind::Locale => Error::LocaleLoad {
                lang: id.into(),
                message: message.into(),
            },
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Style => f.write_str("style"),
            DocumentKind::Locale => f.write_str("locale"),
        }
    }
}

/// Fetches style or locale documents by id.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetch the document `id`, or the document at `explicit_path` when one
    /// is given.
    async fn fetch(&self, id: &str, explicit_path: Option<&Path>) -> Result<String>;
}

/// Loads bibliographies.
#[async_trait]
pub trait BibliographySource: Send + Sync {
    async fn load(&self, path: &Path) -> Result<Bibliography>;

    /// Content fingerprint of the bibliography at `path`, comparable with
    /// [`Bibliography::fingerprint`] of what [`load`](Self::load) returns.
    async fn fingerprint(&self, path: &Path) -> Result<String>;
}

const BUILTIN_STYLE: &str = include_str!("../resources/chicago-author-date.csl");
const BUILTIN_LOCALE: &str = include_str!("../resources/locales-en-US.xml");

/// Serves styles or locales from a directory, falling back to the built-in
/// default style and locale.
#[derive(Debug, Clone)]
pub struct FileSystemSource {
    kind: DocumentKind,
    dir: Option<PathBuf>,
    builtin: HashMap<String, &'static str>,
}

impl FileSystemSource {
    pub fn new(kind: DocumentKind, dir: Option<PathBuf>) -> Self {
        let mut builtin = HashMap::new();
        match kind {
            DocumentKind::Style => builtin.insert(DEFAULT_STYLE.to_string(), BUILTIN_STYLE),
            DocumentKind::Locale => builtin.insert(DEFAULT_LANG.to_string(), BUILTIN_LOCALE),
        };
        Self { kind, dir, builtin }
    }

    pub fn styles(dir: Option<PathBuf>) -> Self {
        Self::new(DocumentKind::Style, dir)
    }

    pub fn locales(dir: Option<PathBuf>) -> Self {
        Self::new(DocumentKind::Locale, dir)
    }

    fn read(&self, id: &str, path: &Path) -> Result<String> {
        std::fs::read_to_string(path)
            .map_err(|e| self.kind.load_error(id, format!("{}: {e}", path.display())))
    }
}

#[async_trait]
impl DocumentSource for FileSystemSource {
    async fn fetch(&self, id: &str, explicit_path: Option<&Path>) -> Result<String> {
        if let Some(path) = explicit_path {
            return self.read(id, path);
        }
        if let Some(dir) = &self.dir {
            let path = dir.join(self.kind.file_name(id));
            if path.is_file() {
                return self.read(id, &path);
            }
        }
        match self.builtin.get(id) {
            Some(text) => {
                tracing::debug!(kind = %self.kind, id, "using built-in document");
                Ok((*text).to_string())
            }
            None => Err(self.kind.load_error(id, "not found")),
        }
    }
}

/// Reads CSL-JSON bibliographies from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystemBibliographySource;

#[async_trait]
impl BibliographySource for FileSystemBibliographySource {
    async fn load(&self, path: &Path) -> Result<Bibliography> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::BibliographyLoad {
            path: path.to_path_buf(),
            source,
        })?;
        let bibliography =
            Bibliography::from_csl_json(&content).map_err(|e| Error::BibliographyParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        tracing::debug!(path = %path.display(), entries = bibliography.len(), "loaded bibliography");
        Ok(bibliography)
    }

    async fn fingerprint(&self, path: &Path) -> Result<String> {
        let bytes = std::fs::read(path).map_err(|source| Error::BibliographyLoad {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(content_fingerprint(&bytes))
    }
}

/// The sources a [`Resolver`](crate::Resolver) draws on.
#[derive(Clone)]
pub struct Sources {
    pub styles: Arc<dyn DocumentSource>,
    pub locales: Arc<dyn DocumentSource>,
    pub bibliographies: Arc<dyn BibliographySource>,
}

impl Sources {
    /// File-system sources configured from `config`.
    pub fn file_system(config: &CiteConfig) -> Self {
        Self {
            styles: Arc::new(FileSystemSource::styles(config.style_dir.clone())),
            locales: Arc::new(FileSystemSource::locales(config.locale_dir.clone())),
            bibliographies: Arc::new(FileSystemBibliographySource),
        }
    }
}
