/*
 * config.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * Resolver configuration.
 */

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Style used when neither the configuration nor the document names one.
pub const DEFAULT_STYLE: &str = "chicago-author-date";

/// Locale used when neither the configuration nor the document names one.
pub const DEFAULT_LANG: &str = "en-US";

/// Number of per-document results kept before the least recently used one
/// is evicted.
pub const DEFAULT_CACHE_CAPACITY: usize = 10;

/// Global settings for a [`Resolver`](crate::Resolver).
///
/// Documents without citation front matter resolve against these settings
/// (the "global scope").
///
/// ```yaml
/// style: apa
/// lang: en-GB
/// bibliography: refs/library.json
/// style-dir: ~/Zotero/styles
/// cache-capacity: 20
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct CiteConfig {
    /// Default style id.
    pub style: String,

    /// Default locale id.
    pub lang: String,

    /// Global bibliography, a CSL-JSON file.
    pub bibliography: Option<PathBuf>,

    /// Directory searched for `<id>.csl` style files.
    pub style_dir: Option<PathBuf>,

    /// Directory searched for `locales-<lang>.xml` locale files.
    pub locale_dir: Option<PathBuf>,

    pub cache_capacity: usize,
}

impl Default for CiteConfig {
    fn default() -> Self {
        Self {
            style: DEFAULT_STYLE.to_string(),
            lang: DEFAULT_LANG.to_string(),
            bibliography: None,
            style_dir: None,
            locale_dir: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl CiteConfig {
    /// Parse a YAML configuration. An empty document yields the defaults.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self =
            serde_yaml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content).map_err(|e| match e {
            Error::Config(message) => Error::Config(format!("{}: {message}", path.display())),
            other => other,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 {
            return Err(Error::Config("cache-capacity must be at least 1".into()));
        }
        if self.style.trim().is_empty() {
            return Err(Error::Config("style must not be empty".into()));
        }
        if self.lang.trim().is_empty() {
            return Err(Error::Config("lang must not be empty".into()));
        }
        Ok(())
    }
}
