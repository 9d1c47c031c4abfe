/*
 * tokenizer.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * Scans free-form text for Pandoc citation syntax.
 */

//! Segment tokenizer.
//!
//! The tokenizer makes a single left-to-right pass over a buffer and emits
//! every candidate citation construct it finds. It knows nothing about code
//! spans, math or templating: callers that care discard segments falling
//! inside such regions using their own syntax information.
//!
//! Two constructs are recognized:
//!
//! - bracketed groups, `[see @doe99, p. 33; -@smith04]`, whose segments cover
//!   the bracketed text byte for byte;
//! - bare in-text citations, `@doe99`, emitted as an `at`/`key` pair.

use crate::locator::{skip_whitespace, split_locator};
use crate::segment::{Segment, SegmentKind};

/// Punctuation allowed inside a key when followed by more key characters.
const KEY_PUNCTUATION: &[char] = &[
    ':', '.', '#', '$', '%', '&', '-', '+', '?', '<', '>', '~', '/',
];

fn is_key_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// End offset of the key starting at `start` (just past an `@`).
///
/// Inner punctuation is accepted only when more key characters follow it,
/// so `@smith99.` yields `smith99`.
pub(crate) fn scan_key(text: &str, start: usize) -> Option<usize> {
    let rest = &text[start..];
    let first = rest.chars().next()?;
    if !is_key_char(first) {
        return None;
    }
    let mut end = first.len_utf8();
    for (offset, c) in rest.char_indices().skip(1) {
        if is_key_char(c) {
            end = offset + c.len_utf8();
        } else if !KEY_PUNCTUATION.contains(&c) {
            break;
        }
    }
    Some(start + end)
}

/// Whether an `@` at `at` may open a bare citation. Rules out e-mail
/// addresses, doubled sigils and escapes.
fn can_start_bare(text: &str, at: usize) -> bool {
    match text[..at].chars().next_back() {
        None => true,
        Some(c) => !(c.is_alphanumeric() || matches!(c, '@' | '_' | '`' | '\\')),
    }
}

/// Position of a key inside one citation slot, relative to the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct KeyMatch {
    suppressor: Option<usize>,
    at: usize,
    key_end: usize,
}

/// Find the first key at a citation position in `slot`: at the start, after
/// whitespace, or after a `-` that itself starts a word.
fn find_key(slot: &str) -> Option<KeyMatch> {
    for (at, _) in slot.match_indices('@') {
        let suppressor = match slot[..at].chars().next_back() {
            None => None,
            Some(c) if c.is_whitespace() => None,
            Some('-')
                if slot[..at - 1]
                    .chars()
                    .next_back()
                    .is_none_or(char::is_whitespace) =>
            {
                Some(at - 1)
            }
            Some(_) => continue,
        };
        if let Some(key_end) = scan_key(slot, at + 1) {
            return Some(KeyMatch {
                suppressor,
                at,
                key_end,
            });
        }
    }
    None
}

/// Tokenize `text`, reporting offsets relative to its start.
pub fn tokenize(text: &str) -> Vec<Segment> {
    tokenize_at(text, 0)
}

/// Tokenize `text`, adding `base` to every reported offset.
///
/// Editors usually scan only the visible range of a document; passing the
/// range start as `base` yields document offsets directly.
pub fn tokenize_at(text: &str, base: usize) -> Vec<Segment> {
    let mut scanner = Scanner {
        text,
        base,
        segments: Vec::new(),
    };
    scanner.run();
    scanner.segments
}

struct Scanner<'a> {
    text: &'a str,
    base: usize,
    segments: Vec<Segment>,
}

impl Scanner<'_> {
    fn push(&mut self, kind: SegmentKind, from: usize, to: usize) {
        self.segments.push(Segment::new(
            kind,
            &self.text[from..to],
            self.base + from,
            self.base + to,
        ));
    }

    fn run(&mut self) {
        // Only ASCII bytes are inspected, so every `pos` we slice at is a
        // char boundary.
        let bytes = self.text.as_bytes();
        let mut pos = 0;
        while pos < bytes.len() {
            match bytes[pos] {
                b'[' => {
                    if let Some(close) = self.group_end(pos) {
                        self.scan_group(pos, close);
                        pos = close + 1;
                        continue;
                    }
                }
                b'@' if can_start_bare(self.text, pos) => {
                    if let Some(end) = scan_key(self.text, pos + 1) {
                        self.push(SegmentKind::At, pos, pos + 1);
                        self.push(SegmentKind::Key, pos + 1, end);
                        pos = end;
                        continue;
                    }
                }
                _ => {}
            }
            pos += 1;
        }
    }

    /// Offset of the `]` closing a citation group opened at `open`.
    ///
    /// The group may not span lines or contain another `[`, may not be
    /// link text (`](`), and must be blank or cite at least one key.
    fn group_end(&self, open: usize) -> Option<usize> {
        let rest = &self.text[open + 1..];
        let rel = rest.find(['[', ']', '\n'])?;
        if rest.as_bytes()[rel] != b']' {
            return None;
        }
        let close = open + 1 + rel;
        if self.text[close + 1..].starts_with('(') {
            return None;
        }
        let inner = &self.text[open + 1..close];
        let cites = inner.split(';').any(|slot| find_key(slot).is_some());
        (cites || inner.trim().is_empty()).then_some(close)
    }

    fn scan_group(&mut self, open: usize, close: usize) {
        self.push(SegmentKind::BracketOpen, open, open + 1);
        let mut slot_start = open + 1;
        loop {
            let slot_end = self.text[slot_start..close]
                .find(';')
                .map_or(close, |rel| slot_start + rel);
            self.scan_slot(slot_start, slot_end);
            if slot_end == close {
                break;
            }
            let next = skip_whitespace(self.text, slot_end + 1, close);
            self.push(SegmentKind::Separator, slot_end, next);
            slot_start = next;
        }
        self.push(SegmentKind::BracketClose, close, close + 1);
    }

    fn scan_slot(&mut self, start: usize, end: usize) {
        if start == end {
            return;
        }
        let Some(found) = find_key(&self.text[start..end]) else {
            self.push(SegmentKind::Prefix, start, end);
            return;
        };

        let cite_start = start + found.suppressor.unwrap_or(found.at);
        if cite_start > start {
            self.push(SegmentKind::Prefix, start, cite_start);
        }
        if let Some(dash) = found.suppressor {
            self.push(SegmentKind::Suppressor, start + dash, start + dash + 1);
        }
        let at = start + found.at;
        self.push(SegmentKind::At, at, at + 1);
        self.push(SegmentKind::Key, at + 1, start + found.key_end);
        self.scan_tail(start + found.key_end, end);
    }

    fn scan_tail(&mut self, from: usize, end: usize) {
        if from == end {
            return;
        }
        match split_locator(&self.text[from..end]) {
            Some(parts) => {
                for (kind, range) in parts {
                    self.push(kind, from + range.start, from + range.end);
                }
            }
            None => self.push(SegmentKind::Suffix, from, end),
        }
    }
}
