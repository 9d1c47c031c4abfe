/*
 * engine/builder.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * Assembles engine inputs from the style and locale caches.
 */

use std::path::Path;
use std::sync::Arc;

use super::{CitationEngine, EngineFactory, EngineInputs, LocaleLookup};
use crate::bibliography::Bibliography;
use crate::error::Result;
use crate::style_cache::DocumentCache;

/// Builds engines for a style, locale and bibliography.
///
/// The style and locale are loaded through their caches before the factory
/// runs, so the factory itself never waits on I/O. Any failure aborts the
/// build.
#[derive(Clone)]
pub struct EngineBuilder {
    factory: Arc<dyn EngineFactory>,
    styles: Arc<DocumentCache>,
    locales: Arc<DocumentCache>,
}

impl EngineBuilder {
    pub fn new(
        factory: Arc<dyn EngineFactory>,
        styles: Arc<DocumentCache>,
        locales: Arc<DocumentCache>,
    ) -> Self {
        Self {
            factory,
            styles,
            locales,
        }
    }

    pub async fn build(
        &self,
        style: &str,
        style_path: Option<&Path>,
        lang: &str,
        bibliography: Arc<Bibliography>,
    ) -> Result<Box<dyn CitationEngine>> {
        let style_document = self.styles.load(style, style_path).await?;
        self.locales.load(lang, None).await?;
        tracing::debug!(
            style,
            lang,
            entries = bibliography.len(),
            "building citation engine"
        );
        self.factory.build(EngineInputs {
            style: style_document,
            lang: lang.to_string(),
            locales: LocaleLookup::new(self.locales.clone()),
            bibliography,
        })
    }
}
