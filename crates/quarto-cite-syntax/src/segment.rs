/*
 * segment.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * Positioned lexical units of citation syntax.
 */

use serde::{Deserialize, Serialize};

/// The lexical role of a [`Segment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SegmentKind {
    /// The citation key following an `@`.
    Key,
    /// The `@` sigil.
    At,
    /// `[` opening a citation group.
    BracketOpen,
    /// `]` closing a citation group.
    BracketClose,
    /// `{` opening a braced locator.
    CurlyBracketOpen,
    /// `}` closing a braced locator.
    CurlyBracketClose,
    /// `;` between citations, or the `,` introducing a locator.
    /// Trailing whitespace is part of the segment.
    Separator,
    /// `-` directly before `@`, suppressing the author.
    Suppressor,
    /// Free text before the key.
    Prefix,
    /// Free text after the key when no locator is present.
    Suffix,
    /// The locator value, e.g. `33-35`.
    Locator,
    /// The locator label with its trailing whitespace, e.g. `pp. `.
    LocatorLabel,
    /// Free text after a locator.
    LocatorSuffix,
}

impl SegmentKind {
    /// Name used on the wire and in diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentKind::Key => "key",
            SegmentKind::At => "at",
            SegmentKind::BracketOpen => "bracketOpen",
            SegmentKind::BracketClose => "bracketClose",
            SegmentKind::CurlyBracketOpen => "curlyBracketOpen",
            SegmentKind::CurlyBracketClose => "curlyBracketClose",
            SegmentKind::Separator => "separator",
            SegmentKind::Suppressor => "suppressor",
            SegmentKind::Prefix => "prefix",
            SegmentKind::Suffix => "suffix",
            SegmentKind::Locator => "locator",
            SegmentKind::LocatorLabel => "locatorLabel",
            SegmentKind::LocatorSuffix => "locatorSuffix",
        }
    }
}

/// One lexical unit of citation syntax.
///
/// `from..to` is a half-open UTF-8 byte range into the scanned buffer
/// (shifted by the base offset given to [`tokenize_at`](crate::tokenize_at)),
/// and `value` is the exact source slice for that range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    #[serde(rename = "type")]
    pub kind: SegmentKind,
    pub value: String,
    pub from: usize,
    pub to: usize,
}

impl Segment {
    pub fn new(kind: SegmentKind, value: impl Into<String>, from: usize, to: usize) -> Self {
        Self {
            kind,
            value: value.into(),
            from,
            to,
        }
    }

    pub fn len(&self) -> usize {
        self.to - self.from
    }

    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }

    /// True for the `;` separator that ends a citation inside a group, as
    /// opposed to the `,` that introduces a locator.
    pub fn is_citation_separator(&self) -> bool {
        self.kind == SegmentKind::Separator && self.value.trim_start().starts_with(';')
    }
}
