/*
 * resolve/mod.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * Citation resolution for open documents.
 */

mod lru;
mod renderer;
mod resolver;
mod result;
mod scope;

pub use lru::LruCache;
pub use resolver::Resolver;
pub use result::{DocumentState, KeyStatus, ResolutionResult};
pub use scope::Scope;
