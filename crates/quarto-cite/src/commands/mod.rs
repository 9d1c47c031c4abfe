/*
 * commands/mod.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * Subcommand implementations for the quarto-cite CLI.
 */

//! Command implementations for the quarto-cite CLI.

pub mod resolve;
pub mod search;
pub mod syntax;

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use quarto_cite_resolve::CiteConfig;

/// Read the document at `input`, or stdin when it is absent or `-`.
pub fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {}", path.display())),
        _ => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read stdin")?;
            Ok(buffer)
        }
    }
}

/// The configuration at `path`, or the defaults.
pub fn load_config(path: Option<&Path>) -> Result<CiteConfig> {
    let config = match path {
        Some(path) => CiteConfig::load(path)?,
        None => CiteConfig::default(),
    };
    Ok(config)
}
