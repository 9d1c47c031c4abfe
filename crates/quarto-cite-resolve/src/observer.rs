/*
 * observer.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * Notifications about new resolution results.
 */

//! Observer abstraction for resolution events.
//!
//! Editor panes, diagnostics and previews subscribe to a
//! [`Resolver`](crate::Resolver) with a [`ResolutionObserver`] and are told
//! when a document's result changes. Results that differ from the previous
//! one only in ways nobody renders (e.g. shifted offsets of unresolved keys)
//! are stored without notifying.

use std::sync::Arc;

use crate::document::DocumentId;
use crate::resolve::ResolutionResult;

/// Observer for resolution events.
///
/// All methods have empty default implementations, allowing observers
/// to implement only the events they care about. Observers are called on
/// the resolving task and should return quickly.
pub trait ResolutionObserver: Send + Sync {
    /// A new result was stored for `document`.
    fn on_resolved(&self, _document: &DocumentId, _result: &Arc<ResolutionResult>) {}

    /// `document`'s result was dropped from the cache to make room.
    fn on_evicted(&self, _document: &DocumentId) {}
}

/// An observer that ignores all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ResolutionObserver for NoopObserver {}

/// An observer that emits `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ResolutionObserver for TracingObserver {
    fn on_resolved(&self, document: &DocumentId, result: &Arc<ResolutionResult>) {
        tracing::info!(
            document = %document,
            keys = result.keys.len(),
            resolved = result.resolved_keys.len(),
            unresolved = result.unresolved_keys.len(),
            citations = result.citations.len(),
            "Resolved citations"
        );
    }

    fn on_evicted(&self, document: &DocumentId) {
        tracing::debug!(document = %document, "Evicted resolution result");
    }
}
