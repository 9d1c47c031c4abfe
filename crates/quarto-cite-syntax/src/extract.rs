/*
 * extract.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * Assembles citation records from a segment stream.
 */

use serde::{Deserialize, Serialize};

use crate::segment::{Segment, SegmentKind};

/// How a citation group is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CitationMode {
    /// A bare `@key` in running text ("Doe (1999) argues ...").
    InText,
    /// A bracketed group ("... (Doe 1999, 33)").
    Parenthetical,
}

/// One cited work inside a citation group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    /// The bibliographic key.
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    /// Suffix text, including any leading comma as typed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,

    /// Locator label as typed, e.g. `"pp."`.
    /// See [`locator_term`](crate::locator_term) for the CSL term.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator_label: Option<String>,

    #[serde(default)]
    pub suppress_author: bool,
}

impl Citation {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// One bracketed or bare citation construct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CitationGroup {
    pub citations: Vec<Citation>,
    pub mode: CitationMode,
    /// Start of the group in the source (the `[` or the `@`).
    pub from: usize,
    /// End of the group in the source (past the `]` or the key).
    pub to: usize,
}

impl CitationGroup {
    /// Cited ids in declaration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.citations.iter().map(|c| c.id.as_str())
    }
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Fields of the citation currently being assembled inside a group.
#[derive(Debug, Default)]
struct Slot {
    prefix: String,
    suppress_author: bool,
    id: Option<String>,
    locator: Option<String>,
    locator_label: Option<String>,
    suffix: Option<String>,
    malformed: bool,
}

impl Slot {
    fn finish(self) -> Option<Citation> {
        if self.malformed {
            tracing::trace!(id = ?self.id, "dropping malformed citation");
            return None;
        }
        let Some(id) = self.id else {
            tracing::trace!(prefix = %self.prefix, "dropping citation without a key");
            return None;
        };
        Some(Citation {
            id,
            prefix: non_empty(&self.prefix),
            suffix: self.suffix,
            locator: self.locator,
            locator_label: self.locator_label,
            suppress_author: self.suppress_author,
        })
    }

    /// Record a field that may only follow the key.
    fn after_key(&mut self, field: SegmentKind, value: &str) {
        if self.id.is_none() {
            self.malformed = true;
            return;
        }
        match field {
            SegmentKind::Locator => self.locator = non_empty(value),
            SegmentKind::LocatorLabel => self.locator_label = non_empty(value),
            _ => self.suffix = non_empty(value),
        }
    }
}

#[derive(Debug)]
struct OpenGroup {
    from: usize,
    citations: Vec<Citation>,
    slot: Slot,
}

impl OpenGroup {
    fn new(from: usize) -> Self {
        Self {
            from,
            citations: Vec::new(),
            slot: Slot::default(),
        }
    }

    fn end_slot(&mut self) {
        if let Some(citation) = std::mem::take(&mut self.slot).finish() {
            self.citations.push(citation);
        }
    }

    fn accept(&mut self, segment: &Segment) {
        let slot = &mut self.slot;
        match segment.kind {
            SegmentKind::Prefix => {
                if slot.id.is_some() {
                    slot.malformed = true;
                } else {
                    slot.prefix.push_str(&segment.value);
                }
            }
            SegmentKind::Suppressor => slot.suppress_author = true,
            SegmentKind::Key => {
                if slot.id.is_some() {
                    slot.malformed = true;
                } else {
                    slot.id = Some(segment.value.clone());
                }
            }
            SegmentKind::Separator if segment.is_citation_separator() => self.end_slot(),
            SegmentKind::Separator => {
                if slot.id.is_none() {
                    slot.malformed = true;
                }
            }
            kind @ (SegmentKind::Locator
            | SegmentKind::LocatorLabel
            | SegmentKind::LocatorSuffix
            | SegmentKind::Suffix) => slot.after_key(kind, &segment.value),
            SegmentKind::At
            | SegmentKind::CurlyBracketOpen
            | SegmentKind::CurlyBracketClose
            | SegmentKind::BracketOpen
            | SegmentKind::BracketClose => {}
        }
    }

    fn close(mut self, to: usize) -> Option<CitationGroup> {
        self.end_slot();
        if self.citations.is_empty() {
            return None;
        }
        Some(CitationGroup {
            citations: self.citations,
            mode: CitationMode::Parenthetical,
            from: self.from,
            to,
        })
    }
}

/// Assemble citation groups from a segment stream, in source order.
///
/// Malformed citations are dropped from their group rather than failing the
/// group; groups left without citations, and groups whose closing bracket is
/// missing, are dropped entirely.
pub fn extract(segments: &[Segment]) -> Vec<CitationGroup> {
    let mut groups = Vec::new();
    let mut open: Option<OpenGroup> = None;
    let mut iter = segments.iter().peekable();

    while let Some(segment) = iter.next() {
        match segment.kind {
            SegmentKind::BracketOpen => {
                if let Some(previous) = open.replace(OpenGroup::new(segment.from)) {
                    tracing::trace!(from = previous.from, "unterminated citation group");
                }
            }
            SegmentKind::BracketClose => {
                if let Some(group) = open.take().and_then(|g| g.close(segment.to)) {
                    groups.push(group);
                }
            }
            SegmentKind::At if open.is_none() => {
                if let Some(key) = iter.next_if(|s| s.kind == SegmentKind::Key) {
                    groups.push(CitationGroup {
                        citations: vec![Citation::new(key.value.clone())],
                        mode: CitationMode::InText,
                        from: segment.from,
                        to: key.to,
                    });
                }
            }
            _ => {
                if let Some(group) = open.as_mut() {
                    group.accept(segment);
                }
            }
        }
    }

    if let Some(group) = open {
        tracing::trace!(from = group.from, "unterminated citation group");
    }
    groups
}
