/*
 * commands/search.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * Search command.
 */

//! Fuzzy search over a bibliography's entries.

use std::path::PathBuf;

use anyhow::{Result, bail};
use quarto_cite_resolve::Resolver;
use tracing::debug;

use super::load_config;

pub struct SearchArgs {
    pub query: String,
    pub bibliography: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub limit: usize,
}

pub fn execute(args: SearchArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(bibliography) = args.bibliography {
        config.bibliography = Some(bibliography);
    }
    if config.bibliography.is_none() {
        bail!("No bibliography to search (use --bibliography or a config file)");
    }
    config.validate()?;

    let resolver = Resolver::with_defaults(config);
    let hits = pollster::block_on(resolver.search(None, &args.query, args.limit))?;
    debug!(query = %args.query, hits = hits.len(), "Searched bibliography");

    for hit in hits {
        println!("{}\t{}", hit.id, hit.score);
    }
    Ok(())
}
