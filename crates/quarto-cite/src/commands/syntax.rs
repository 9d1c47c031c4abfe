/*
 * commands/syntax.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * Tokenize and extract commands.
 */

//! Print the citation syntax found in a document.

use std::path::Path;

use anyhow::Result;
use quarto_cite_syntax::{extract as extract_groups, tokenize as tokenize_text};
use tracing::debug;

use super::read_input;

/// Print the segment stream of `input` as JSON.
pub fn tokenize(input: Option<&Path>) -> Result<()> {
    let text = read_input(input)?;
    let segments = tokenize_text(&text);
    debug!(segments = segments.len(), "Tokenized input");
    println!("{}", serde_json::to_string_pretty(&segments)?);
    Ok(())
}

/// Print the citation groups of `input` as JSON.
pub fn extract(input: Option<&Path>) -> Result<()> {
    let text = read_input(input)?;
    let groups = extract_groups(&tokenize_text(&text));
    debug!(groups = groups.len(), "Extracted citation groups");
    println!("{}", serde_json::to_string_pretty(&groups)?);
    Ok(())
}
