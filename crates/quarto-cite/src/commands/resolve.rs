/*
 * commands/resolve.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * Resolve command.
 */

//! Resolve and render the citations of one document.
//!
//! The document's front matter may choose its own bibliography, style and
//! language; the command-line options set the defaults it falls back to.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::ValueEnum;
use quarto_cite_resolve::{DocumentId, RenderedCitation, Resolver, TracingObserver};
use tracing::{info, warn};

use super::{load_config, read_input};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// The full resolution result
    Json,
    /// Rendered citations followed by the bibliography
    Html,
}

pub struct ResolveArgs {
    pub input: Option<PathBuf>,
    pub bibliography: Option<PathBuf>,
    pub csl: Option<String>,
    pub lang: Option<String>,
    pub config: Option<PathBuf>,
    pub format: OutputFormat,
}

pub fn execute(args: ResolveArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(bibliography) = args.bibliography {
        config.bibliography = Some(bibliography);
    }
    if let Some(csl) = args.csl {
        config.style = csl;
    }
    if let Some(lang) = args.lang {
        config.lang = lang;
    }
    config.validate()?;

    let text = read_input(args.input.as_deref())?;
    let document = match &args.input {
        Some(path) if path.as_os_str() != "-" => DocumentId::new(path.display().to_string()),
        _ => DocumentId::new("<stdin>"),
    };

    let resolver = Resolver::with_defaults(config);
    resolver.subscribe(Arc::new(TracingObserver));
    let result = pollster::block_on(resolver.resolve(&document, &text));

    for key in &result.unresolved_keys {
        warn!(document = %document, key = %key, "Unresolved citation key");
    }
    info!(
        citations = result.citations.len(),
        bibliography = result.bibliography.is_some(),
        "Rendered document"
    );

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(result.as_ref())
            .context("Failed to serialize resolution result")?,
        OutputFormat::Html => render_html(&result.citations, result.bibliography.as_deref()),
    };
    println!("{output}");
    Ok(())
}

/// A standalone HTML fragment: one paragraph per citation, the footnotes of
/// note styles, then the bibliography.
fn render_html(citations: &[RenderedCitation], bibliography: Option<&str>) -> String {
    let mut html = String::new();
    for citation in citations {
        html.push_str(&format!(
            "<p class=\"citation\" data-from=\"{}\" data-to=\"{}\">{}</p>\n",
            citation.from, citation.to, citation.val
        ));
    }

    let notes: Vec<_> = citations
        .iter()
        .filter_map(|c| Some((c.note_index?, c.note.as_deref()?)))
        .collect();
    if !notes.is_empty() {
        html.push_str("<ol class=\"footnotes\">\n");
        for (index, note) in notes {
            html.push_str(&format!("<li value=\"{index}\">{note}</li>\n"));
        }
        html.push_str("</ol>\n");
    }

    if let Some(bibliography) = bibliography {
        html.push_str(bibliography);
        html.push('\n');
    }
    html
}
