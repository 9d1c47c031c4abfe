//! Pandoc citation syntax for editors and previewers.
//!
//! This crate locates citation markup inside free-form text and turns it
//! into structured, positioned data:
//!
//! - [`tokenize`] scans a buffer into [`Segment`]s (`[`, prefix, `@`, key,
//!   locator label, locator, suffix, `;`, `]`, ...), each carrying its exact
//!   byte range so a highlighter can decorate it;
//! - [`extract`] folds a segment stream into [`CitationGroup`]s of
//!   [`Citation`] records ready for a citation processor.
//!
//! Neither step knows about bibliographies; resolution lives in
//! `quarto-cite-resolve`.
//!
//! # Example
//!
//! ```rust
//! use quarto_cite_syntax::{parse_citations, CitationMode};
//!
//! let groups = parse_citations("[see @doe2000, p. 12; @lee2010]");
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].mode, CitationMode::Parenthetical);
//!
//! let first = &groups[0].citations[0];
//! assert_eq!(first.id, "doe2000");
//! assert_eq!(first.prefix.as_deref(), Some("see"));
//! assert_eq!(first.locator.as_deref(), Some("12"));
//! assert_eq!(first.locator_label.as_deref(), Some("p."));
//! ```

pub mod extract;
pub mod locator;
pub mod segment;
pub mod tokenizer;

pub use extract::{Citation, CitationGroup, CitationMode, extract};
pub use locator::locator_term;
pub use segment::{Segment, SegmentKind};
pub use tokenizer::{tokenize, tokenize_at};

/// Tokenize and extract in one step.
pub fn parse_citations(text: &str) -> Vec<CitationGroup> {
    extract(&tokenize(text))
}
