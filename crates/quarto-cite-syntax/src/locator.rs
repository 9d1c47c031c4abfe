/*
 * locator.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * Locator labels and the locator grammar that follows a citation key.
 */

use std::ops::Range;

use crate::segment::SegmentKind;

/// Locator labels Pandoc recognizes in English, paired with the CSL locator
/// term each one stands for.
const LOCATOR_LABELS: &[(&str, &str)] = &[
    ("book", "book"),
    ("books", "book"),
    ("bk.", "book"),
    ("bks.", "book"),
    ("chapter", "chapter"),
    ("chapters", "chapter"),
    ("chap.", "chapter"),
    ("chaps.", "chapter"),
    ("column", "column"),
    ("columns", "column"),
    ("col.", "column"),
    ("cols.", "column"),
    ("figure", "figure"),
    ("figures", "figure"),
    ("fig.", "figure"),
    ("figs.", "figure"),
    ("folio", "folio"),
    ("folios", "folio"),
    ("fol.", "folio"),
    ("fols.", "folio"),
    ("number", "number"),
    ("numbers", "number"),
    ("no.", "number"),
    ("nos.", "number"),
    ("line", "line"),
    ("lines", "line"),
    ("l.", "line"),
    ("ll.", "line"),
    ("note", "note"),
    ("notes", "note"),
    ("n.", "note"),
    ("nn.", "note"),
    ("opus", "opus"),
    ("opera", "opus"),
    ("op.", "opus"),
    ("opp.", "opus"),
    ("page", "page"),
    ("pages", "page"),
    ("p.", "page"),
    ("pp.", "page"),
    ("paragraph", "paragraph"),
    ("paragraphs", "paragraph"),
    ("para.", "paragraph"),
    ("paras.", "paragraph"),
    ("¶¶", "paragraph"),
    ("¶", "paragraph"),
    ("part", "part"),
    ("parts", "part"),
    ("pt.", "part"),
    ("pts.", "part"),
    ("section", "section"),
    ("sections", "section"),
    ("sec.", "section"),
    ("secs.", "section"),
    ("§§", "section"),
    ("§", "section"),
    ("sub verbo", "sub verbo"),
    ("sub verbis", "sub verbo"),
    ("s.v.", "sub verbo"),
    ("s.vv.", "sub verbo"),
    ("verse", "verse"),
    ("verses", "verse"),
    ("v.", "verse"),
    ("vv.", "verse"),
    ("volume", "volume"),
    ("volumes", "volume"),
    ("vol.", "volume"),
    ("vols.", "volume"),
];

/// Map a locator label as typed (`"pp."`, `"Chapter"`) to its CSL locator
/// term (`"page"`, `"chapter"`).
pub fn locator_term(label: &str) -> Option<&'static str> {
    let label = label.trim();
    LOCATOR_LABELS
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(label))
        .map(|(_, term)| *term)
}

/// Length in bytes of the locator label at the start of `s`, if any.
///
/// Matching is ASCII case-insensitive and prefers the longest label. A label
/// ending in a letter must be followed by whitespace or the end of input so
/// that `"page"` does not match inside `"pageant"`; abbreviations may be
/// followed by anything that is not a letter.
pub(crate) fn match_label(s: &str) -> Option<usize> {
    LOCATOR_LABELS
        .iter()
        .filter_map(|(label, _)| {
            let head = s.get(..label.len())?;
            if !head.eq_ignore_ascii_case(label) {
                return None;
            }
            let next = s[label.len()..].chars().next();
            let ends_in_letter = label.chars().next_back().is_some_and(char::is_alphabetic);
            let boundary = match next {
                None => true,
                Some(c) if c.is_whitespace() => true,
                Some(c) => !ends_in_letter && !c.is_alphabetic(),
            };
            boundary.then_some(label.len())
        })
        .max()
}

fn is_roman_numeral(c: char) -> bool {
    matches!(
        c.to_ascii_lowercase(),
        'i' | 'v' | 'x' | 'l' | 'c' | 'd' | 'm'
    )
}

pub(crate) fn skip_whitespace(s: &str, from: usize, limit: usize) -> usize {
    let trimmed = s[from..limit].trim_start();
    limit - trimmed.len()
}

/// Length of the locator value at the start of `s`.
///
/// A value starts with a digit or a roman numeral and runs over letters,
/// digits and inner `- – : .` connectors. A comma continues the value only
/// when a digit follows it (`33, 35`).
fn locator_value_len(s: &str) -> usize {
    let Some(first) = s.chars().next() else {
        return 0;
    };
    if !first.is_ascii_digit() {
        let word: String = s.chars().take_while(|c| c.is_alphabetic()).collect();
        if word.is_empty() || !word.chars().all(is_roman_numeral) {
            return 0;
        }
    }

    let mut end = 0;
    let mut pos = 0;
    while let Some(c) = s[pos..].chars().next() {
        if c.is_alphanumeric() {
            pos += c.len_utf8();
            end = pos;
        } else if matches!(c, '-' | '–' | ':' | '.') {
            pos += c.len_utf8();
        } else if c == ',' && end == pos {
            let next = skip_whitespace(s, pos + 1, s.len());
            if s[next..].starts_with(|d: char| d.is_ascii_digit()) {
                pos = next;
            } else {
                break;
            }
        } else {
            break;
        }
    }
    end
}

/// Split the text following a citation key into locator segments.
///
/// Returns the segment kinds with ranges relative to `tail`, covering it
/// completely, or `None` when the tail does not open with a locator (in
/// which case the caller emits the whole tail as a suffix).
pub(crate) fn split_locator(tail: &str) -> Option<Vec<(SegmentKind, Range<usize>)>> {
    let lead = tail.len() - tail.trim_start().len();
    if !tail[lead..].starts_with(',') {
        return None;
    }
    let value_area = skip_whitespace(tail, lead + 1, tail.len());
    let mut parts = vec![(SegmentKind::Separator, 0..value_area)];

    if tail[value_area..].starts_with('{') {
        let close = value_area + tail[value_area..].find('}')?;
        let inner = value_area + 1;
        parts.push((SegmentKind::CurlyBracketOpen, value_area..inner));

        let mut value_start = inner;
        if let Some(label_len) = match_label(&tail[inner..close]) {
            value_start = skip_whitespace(tail, inner + label_len, close);
            parts.push((SegmentKind::LocatorLabel, inner..value_start));
        }
        if tail[value_start..close].trim().is_empty() {
            return None;
        }
        parts.push((SegmentKind::Locator, value_start..close));
        parts.push((SegmentKind::CurlyBracketClose, close..close + 1));
        if close + 1 < tail.len() {
            parts.push((SegmentKind::LocatorSuffix, close + 1..tail.len()));
        }
        return Some(parts);
    }

    let mut value_start = value_area;
    if let Some(label_len) = match_label(&tail[value_area..]) {
        value_start = skip_whitespace(tail, value_area + label_len, tail.len());
        parts.push((SegmentKind::LocatorLabel, value_area..value_start));
    } else if !tail[value_area..].starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }

    let value_end = value_start + locator_value_len(&tail[value_start..]);
    if value_end == value_start {
        return None;
    }
    parts.push((SegmentKind::Locator, value_start..value_end));
    if value_end < tail.len() {
        parts.push((SegmentKind::LocatorSuffix, value_end..tail.len()));
    }
    Some(parts)
}
