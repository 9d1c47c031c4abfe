/*
 * resolve/renderer.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * One render pass of citation groups against a scope.
 */

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use quarto_cite_syntax::CitationGroup;

use super::scope::Scope;
use crate::bibliography::Bibliography;
use crate::engine::{BibliographyOutput, RenderedCitation};
use crate::error::{Error, Result};

/// Split `keys` into (resolved, unresolved) against `bibliography`.
pub(crate) fn partition(
    keys: &BTreeSet<String>,
    bibliography: &Bibliography,
) -> (BTreeSet<String>, BTreeSet<String>) {
    keys.iter()
        .cloned()
        .partition(|key| bibliography.contains(key))
}

/// Groups whose every cited id is in `bibliography`.
pub(crate) fn renderable_groups(
    groups: &[CitationGroup],
    bibliography: &Bibliography,
) -> Vec<CitationGroup> {
    groups
        .iter()
        .filter(|group| group.ids().all(|id| bibliography.contains(id)))
        .cloned()
        .collect()
}

pub(crate) struct RenderOutcome {
    pub citations: Vec<RenderedCitation>,
    pub bibliography: Option<BibliographyOutput>,
}

/// Render `groups` and the matching bibliography with the scope's engine.
pub(crate) fn render(scope: &Scope, groups: &[CitationGroup]) -> Result<RenderOutcome> {
    scope.with_engine(|engine| {
        let citations = engine.render_citations(groups)?;
        if citations.len() != groups.len() {
            return Err(Error::Render(format!(
                "engine rendered {} of {} citation groups",
                citations.len(),
                groups.len()
            )));
        }
        let bibliography = engine.render_bibliography()?;
        Ok(RenderOutcome {
            citations,
            bibliography,
        })
    })
}

/// A rendered bibliography document and the entry for each cited id.
pub(crate) struct AssembledBibliography {
    pub document: Arc<str>,
    pub entries: BTreeMap<String, String>,
}

/// Wrap the engine's entries into one bibliography document, pairing each
/// entry with its id. `None` when there are no entries.
pub(crate) fn assemble_bibliography(
    output: BibliographyOutput,
) -> Result<Option<AssembledBibliography>> {
    let BibliographyOutput { metadata, entries } = output;
    if entries.is_empty() {
        return Ok(None);
    }
    if metadata.entry_ids.len() != entries.len() {
        return Err(Error::Render(format!(
            "bibliography has {} entries but {} entry ids",
            entries.len(),
            metadata.entry_ids.len()
        )));
    }

    let mut style = Vec::new();
    if metadata.line_spacing > 1 {
        style.push(format!("line-height: {}", metadata.line_spacing));
    }
    if metadata.hanging_indent {
        style.push("padding-left: 1em; text-indent: -1em".to_string());
    }
    let mut document = String::from("<div class=\"csl-bib-body\"");
    if !style.is_empty() {
        document.push_str(&format!(" style=\"{};\"", style.join("; ")));
    }
    document.push_str(">\n");
    for entry in &entries {
        document.push_str(entry);
        document.push('\n');
    }
    document.push_str("</div>");

    Ok(Some(AssembledBibliography {
        document: Arc::from(document),
        entries: metadata.entry_ids.into_iter().zip(entries).collect(),
    }))
}
