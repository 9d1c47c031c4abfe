/*
 * error.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * Error types for citation resolution.
 */

//! Error types for citation resolution.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for citation resolution.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while preparing or running a citation engine.
///
/// None of these escape [`Resolver::resolve`](crate::Resolver::resolve):
/// a failed resolution degrades to a result with every key unresolved.
#[derive(Debug, Error)]
pub enum Error {
    /// A citation style could not be fetched.
    #[error("Failed to load citation style '{id}': {message}")]
    StyleLoad {
        /// Style id or path
        id: String,
        /// What went wrong
        message: String,
    },

    /// A locale could not be fetched.
    #[error("Failed to load locale '{lang}': {message}")]
    LocaleLoad {
        /// Locale id such as `en-US`
        lang: String,
        /// What went wrong
        message: String,
    },

    /// A bibliography file could not be read.
    #[error("Failed to read bibliography {}: {source}", path.display())]
    BibliographyLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A bibliography file is not valid CSL-JSON.
    #[error("Failed to parse bibliography {}: {message}", path.display())]
    BibliographyParse { path: PathBuf, message: String },

    /// A style document is not a usable CSL style.
    #[error("Invalid citation style: {0}")]
    StyleParse(String),

    /// A locale document is not a usable CSL locale.
    #[error("Invalid locale '{lang}': {message}")]
    LocaleParse { lang: String, message: String },

    /// The engine factory refused its inputs.
    #[error("Failed to build citation engine: {0}")]
    EngineBuild(String),

    /// The engine failed while rendering.
    #[error("Citation rendering failed: {0}")]
    Render(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
