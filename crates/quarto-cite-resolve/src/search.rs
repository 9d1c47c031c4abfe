/*
 * search.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * Fuzzy search over bibliography entries.
 */

use serde::Serialize;

use crate::bibliography::Bibliography;

/// A search match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub score: u32,
}

#[derive(Debug, Clone)]
struct Item {
    id: String,
    id_lower: String,
    /// Lowercased id, title, creators and year, space separated.
    haystack: String,
}

/// Index for completing citation keys as the user types.
///
/// Every whitespace-separated query term must match as a case-insensitive
/// subsequence of an entry's id, title, creators or year. Hits are ranked by
/// contiguous runs, word starts and id prefix matches.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    items: Vec<Item>,
}

impl SearchIndex {
    pub fn build(bibliography: &Bibliography) -> Self {
        let items = bibliography
            .entries()
            .map(|entry| {
                let mut haystack = entry.id.to_lowercase();
                for field in [entry.title.as_deref(), entry.year().as_deref()]
                    .into_iter()
                    .flatten()
                {
                    haystack.push(' ');
                    haystack.push_str(&field.to_lowercase());
                }
                for name in entry.creators() {
                    if let Some(name) = name.display() {
                        haystack.push(' ');
                        haystack.push_str(&name.to_lowercase());
                    }
                }
                Item {
                    id: entry.id.clone(),
                    id_lower: entry.id.to_lowercase(),
                    haystack,
                }
            })
            .collect();
        Self { items }
    }

    /// Best `limit` matches for `query`, best first. An empty query lists
    /// entries in bibliography order.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let query = query.trim().trim_start_matches('@').to_lowercase();
        let terms: Vec<&str> = query.split_whitespace().collect();

        let mut hits: Vec<SearchHit> = self
            .items
            .iter()
            .filter_map(|item| {
                let mut score: u32 = 0;
                for term in &terms {
                    score = score.saturating_add(fuzzy_score(term, &item.haystack)?);
                    if item.id_lower.starts_with(term) {
                        let len = u32::try_from(term.chars().count()).unwrap_or(u32::MAX);
                        score = score.saturating_add(len.saturating_mul(10));
                    }
                }
                Some(SearchHit {
                    id: item.id.clone(),
                    score,
                })
            })
            .collect();

        // Stable, so equal scores keep bibliography order.
        hits.sort_by(|a, b| b.score.cmp(&a.score));
        hits.truncate(limit);
        hits
    }
}

/// Score `needle` as a subsequence of `haystack`, or `None` if it is not one.
fn fuzzy_score(needle: &str, haystack: &str) -> Option<u32> {
    let mut score: u32 = 0;
    let mut wanted = needle.chars().peekable();
    let mut previous: Option<char> = None;
    let mut run: u32 = 0;

    for c in haystack.chars() {
        let Some(&next) = wanted.peek() else { break };
        if c == next {
            wanted.next();
            score = score.saturating_add(1);
            run = run.saturating_add(1);
            if run > 1 {
                score = score.saturating_add(run.saturating_mul(2));
            }
            if previous.is_none_or(|p| !p.is_alphanumeric()) {
                score = score.saturating_add(5);
            }
        } else {
            run = 0;
        }
        previous = Some(c);
    }

    wanted.peek().is_none().then_some(score)
}
