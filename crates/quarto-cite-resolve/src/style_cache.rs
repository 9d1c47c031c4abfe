/*
 * style_cache.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * Memoized style and locale documents.
 */

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OnceCell;

use crate::error::Result;
use crate::sources::{DocumentKind, DocumentSource};

/// Memoizes style or locale documents by id.
///
/// Each id is fetched at most once: concurrent [`load`](Self::load)s of the
/// same id share one fetch. Failed fetches are not remembered, so the next
/// load retries. Entries live until [`clear`](Self::clear).
pub struct DocumentCache {
    kind: DocumentKind,
    source: Arc<dyn DocumentSource>,
    cells: Mutex<HashMap<String, Arc<OnceCell<Arc<str>>>>>,
}

impl DocumentCache {
    pub fn new(kind: DocumentKind, source: Arc<dyn DocumentSource>) -> Self {
        Self {
            kind,
            source,
            cells: Mutex::new(HashMap::new()),
        }
    }

    fn cells(&self) -> MutexGuard<'_, HashMap<String, Arc<OnceCell<Arc<str>>>>> {
        self.cells.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The document for `id` if it has already been loaded.
    pub fn get(&self, id: &str) -> Option<Arc<str>> {
        self.cells().get(id).and_then(|cell| cell.get().cloned())
    }

    /// Load `id` (or `explicit_path`, memoized under the path) through the
    /// source unless it is already cached.
    pub async fn load(&self, id: &str, explicit_path: Option<&Path>) -> Result<Arc<str>> {
        let key = match explicit_path {
            Some(path) => path.display().to_string(),
            None => id.to_string(),
        };
        let cell = self.cells().entry(key).or_default().clone();
        let document = cell
            .get_or_try_init(|| async {
                tracing::debug!(kind = %self.kind, id, "fetching document");
                self.source.fetch(id, explicit_path).await.map(Arc::from)
            })
            .await?;
        Ok(document.clone())
    }

    /// Forget every cached document.
    pub fn clear(&self) {
        self.cells().clear();
    }

    /// Number of loaded documents.
    pub fn len(&self) -> usize {
        self.cells()
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
