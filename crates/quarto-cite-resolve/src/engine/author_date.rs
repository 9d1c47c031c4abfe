/*
 * engine/author_date.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * Built-in author-date and note renderer.
 */

use std::sync::Arc;

use quarto_cite_syntax::{Citation, CitationGroup, CitationMode, locator_term};

use super::csl_xml::{LocaleTerms, StyleClass, StyleInfo, read_locale, read_style};
use super::{
    BibliographyMetadata, BibliographyOutput, CitationEngine, EngineFactory, EngineInputs,
    RenderedCitation,
};
use crate::bibliography::{BibEntry, Bibliography, Name};
use crate::error::{Error, Result};

/// Builds [`AuthorDateEngine`]s.
///
/// Only the style's class, title and bibliography layout are read; citation
/// and bibliography layouts are fixed. Locale terms come from the engine's
/// locale when it is loaded, English otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorDateFactory;

impl EngineFactory for AuthorDateFactory {
    fn build(&self, inputs: EngineInputs) -> Result<Box<dyn CitationEngine>> {
        let style = read_style(&inputs.style)?;
        let terms = match inputs.locales.get(&inputs.lang) {
            Some(locale) => read_locale(&inputs.lang, &locale)?,
            None => {
                tracing::debug!(lang = %inputs.lang, "locale not loaded, using English terms");
                LocaleTerms::default()
            }
        };
        Ok(Box::new(AuthorDateEngine::new(
            style,
            terms,
            inputs.bibliography,
        )))
    }
}

/// Renders `(Doe 1999, 33)` / `Doe (1999)` citations, or numbered footnotes
/// for note styles, and an HTML bibliography sorted by creator and year.
pub struct AuthorDateEngine {
    style: StyleInfo,
    terms: LocaleTerms,
    bibliography: Arc<Bibliography>,
    cited: Vec<String>,
}

fn escape_html(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '&' => "&amp;".to_string(),
            '<' => "&lt;".to_string(),
            '>' => "&gt;".to_string(),
            '"' => "&quot;".to_string(),
            '\'' => "&#39;".to_string(),
            _ => c.to_string(),
        })
        .collect()
}

/// Join `parts` as sentences, adding a period where one is missing.
fn sentences(parts: &[String]) -> String {
    parts
        .iter()
        .map(|part| {
            if part.ends_with(['.', '?', '!']) {
                part.clone()
            } else {
                format!("{part}.")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_article(entry: &BibEntry) -> bool {
    entry.entry_type.starts_with("article")
        || matches!(
            entry.entry_type.as_str(),
            "chapter" | "paper-conference" | "entry-encyclopedia" | "entry-dictionary"
        )
}

impl AuthorDateEngine {
    pub fn new(style: StyleInfo, terms: LocaleTerms, bibliography: Arc<Bibliography>) -> Self {
        Self {
            style,
            terms,
            bibliography,
            cited: Vec::new(),
        }
    }

    fn entry(&self, id: &str) -> Result<&BibEntry> {
        self.bibliography
            .get(id)
            .ok_or_else(|| Error::Render(format!("unknown reference '{id}'")))
    }

    fn short_names(&self, entry: &BibEntry) -> String {
        let names: Vec<&str> = entry.creators().iter().filter_map(Name::short).collect();
        match names.as_slice() {
            [] => entry.title.clone().unwrap_or_else(|| entry.id.clone()),
            [one] => one.to_string(),
            [first, second] => format!("{first} {} {second}", self.terms.and),
            [first, ..] => format!("{first} {}", self.terms.et_al),
        }
    }

    fn year(&self, entry: &BibEntry) -> String {
        entry.year().unwrap_or_else(|| self.terms.no_date.clone())
    }

    /// Page locators print bare; other locators keep their label.
    fn locator(citation: &Citation) -> Option<String> {
        let locator = citation.locator.as_deref()?;
        match citation.locator_label.as_deref() {
            Some(label) if locator_term(label) != Some("page") => {
                Some(format!("{label} {locator}"))
            }
            _ => Some(locator.to_string()),
        }
    }

    fn render_cite(&self, citation: &Citation, mode: CitationMode) -> Result<String> {
        let entry = self.entry(&citation.id)?;
        let mut date = self.year(entry);
        if let Some(locator) = Self::locator(citation) {
            date = format!("{date}, {locator}");
        }
        let date = escape_html(&date);
        let names = escape_html(&self.short_names(entry));

        let core = match (mode, citation.suppress_author) {
            (_, true) => date,
            (CitationMode::InText, false) => format!("{names} ({date})"),
            (CitationMode::Parenthetical, false) => format!("{names} {date}"),
        };

        let mut out = String::new();
        if let Some(prefix) = &citation.prefix {
            out.push_str(&escape_html(prefix));
            out.push(' ');
        }
        out.push_str(&core);
        if let Some(suffix) = &citation.suffix {
            if !suffix.starts_with([',', ';', '.', ':']) {
                out.push(' ');
            }
            out.push_str(&escape_html(suffix));
        }
        Ok(out)
    }

    fn render_group(&self, group: &CitationGroup, mode: CitationMode) -> Result<String> {
        let parts = group
            .citations
            .iter()
            .map(|citation| self.render_cite(citation, mode))
            .collect::<Result<Vec<_>>>()?;
        Ok(parts.join("; "))
    }

    fn bibliography_names(&self, names: &[Name]) -> Option<String> {
        let mut rendered = Vec::new();
        for (i, name) in names.iter().enumerate() {
            let text = if i == 0 { name.inverted() } else { name.display() };
            rendered.extend(text);
        }
        match rendered.as_slice() {
            [] => None,
            [one] => Some(one.clone()),
            [init @ .., last] => Some(format!("{}, {} {last}", init.join(", "), self.terms.and)),
        }
    }

    fn format_entry(&self, entry: &BibEntry) -> String {
        let mut parts = Vec::new();
        if let Some(names) = self.bibliography_names(entry.creators()) {
            parts.push(escape_html(&names));
        }
        parts.push(escape_html(&self.year(entry)));
        if let Some(title) = &entry.title {
            if is_article(entry) {
                parts.push(format!("“{}”", escape_html(title)));
            } else {
                parts.push(format!("<i>{}</i>", escape_html(title)));
            }
        }
        if let Some(container) = &entry.container_title {
            let mut source = format!("<i>{}</i>", escape_html(container));
            if let Some(volume) = &entry.volume {
                source.push_str(&format!(" {}", escape_html(&volume.to_string())));
            }
            if let Some(page) = &entry.page {
                source.push_str(&format!(": {}", escape_html(&page.to_string())));
            }
            parts.push(source);
        }
        if let Some(publisher) = &entry.publisher {
            parts.push(escape_html(publisher));
        }
        if let Some(doi) = &entry.doi {
            parts.push(escape_html(&format!("https://doi.org/{doi}")));
        } else if let Some(url) = &entry.url {
            parts.push(escape_html(url));
        }
        format!("<div class=\"csl-entry\">{}</div>", sentences(&parts))
    }

    fn sort_key(entry: &BibEntry) -> (String, String, String) {
        let lead = entry
            .creators()
            .first()
            .and_then(Name::inverted)
            .or_else(|| entry.title.clone())
            .unwrap_or_else(|| entry.id.clone());
        (
            lead.to_lowercase(),
            entry.year().unwrap_or_default(),
            entry.title.as_deref().unwrap_or_default().to_lowercase(),
        )
    }
}

impl CitationEngine for AuthorDateEngine {
    fn render_citations(&mut self, groups: &[CitationGroup]) -> Result<Vec<RenderedCitation>> {
        self.cited.clear();
        for id in groups.iter().flat_map(CitationGroup::ids) {
            if !self.cited.iter().any(|c| c == id) {
                self.cited.push(id.to_string());
            }
        }

        let mut note_index = 0;
        groups
            .iter()
            .map(|group| {
                let (val, note, index) = match (self.style.class, group.mode) {
                    (StyleClass::Note, _) => {
                        note_index += 1;
                        let body = self.render_group(group, CitationMode::Parenthetical)?;
                        (
                            format!("<sup>{note_index}</sup>"),
                            Some(sentences(&[body])),
                            Some(note_index),
                        )
                    }
                    (StyleClass::InText, CitationMode::InText) => {
                        (self.render_group(group, CitationMode::InText)?, None, None)
                    }
                    (StyleClass::InText, CitationMode::Parenthetical) => {
                        let body = self.render_group(group, CitationMode::Parenthetical)?;
                        (format!("({body})"), None, None)
                    }
                };
                Ok(RenderedCitation {
                    citations: group.citations.clone(),
                    val,
                    from: group.from,
                    to: group.to,
                    note,
                    note_index: index,
                })
            })
            .collect()
    }

    fn render_bibliography(&mut self) -> Result<Option<BibliographyOutput>> {
        let mut entries: Vec<&BibEntry> = self
            .cited
            .iter()
            .filter_map(|id| self.bibliography.get(id))
            .collect();
        if entries.is_empty() {
            return Ok(None);
        }
        entries.sort_by_cached_key(|entry| Self::sort_key(entry));

        let layout = self.style.bibliography;
        Ok(Some(BibliographyOutput {
            metadata: BibliographyMetadata {
                entry_ids: entries.iter().map(|e| e.id.clone()).collect(),
                entry_spacing: layout.entry_spacing,
                line_spacing: layout.line_spacing,
                hanging_indent: layout.hanging_indent,
            },
            entries: entries.iter().map(|e| self.format_entry(e)).collect(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarto_cite_syntax::parse_citations;

    fn bibliography() -> Arc<Bibliography> {
        Arc::new(
            Bibliography::from_csl_json(
                r#"[
                {"id": "smith99", "type": "book", "title": "Linear Models",
                 "author": [{"family": "Smith", "given": "Jane"}],
                 "issued": {"date-parts": [[1999]]}, "publisher": "Acme"},
                {"id": "doe2000", "type": "article-journal", "title": "On <Smoothing>",
                 "container-title": "Stat Journal", "volume": 12, "page": "33-45",
                 "author": [{"family": "Doe", "given": "John"}, {"family": "Roe", "given": "Rita"}],
                 "issued": {"date-parts": [[2000]]}, "DOI": "10.1000/xyz"},
                {"id": "many", "type": "report",
                 "author": [{"family": "Ames"}, {"family": "Bell"}, {"family": "Cole"}]}
            ]"#,
            )
            .unwrap(),
        )
    }

    fn engine(class: StyleClass) -> AuthorDateEngine {
        let style = StyleInfo {
            class,
            ..Default::default()
        };
        AuthorDateEngine::new(style, LocaleTerms::default(), bibliography())
    }

    fn render(engine: &mut AuthorDateEngine, text: &str) -> Vec<String> {
        engine
            .render_citations(&parse_citations(text))
            .unwrap()
            .into_iter()
            .map(|c| c.val)
            .collect()
    }

    #[test]
    fn test_author_date_citations() {
        let mut engine = engine(StyleClass::InText);
        assert_eq!(
            render(&mut engine, "@smith99 says [see @doe2000, p. 33; -@smith99, chap. 2]"),
            vec![
                "Smith (1999)",
                "(see Doe and Roe 2000, 33; 1999, chap. 2)",
            ]
        );
        assert_eq!(render(&mut engine, "[@many, for details]"), vec!["(Ames et al. n.d., for details)"]);
    }

    #[test]
    fn test_unknown_reference_is_an_error() {
        let mut engine = engine(StyleClass::InText);
        let err = engine
            .render_citations(&parse_citations("[@nobody]"))
            .unwrap_err();
        assert!(matches!(err, Error::Render(_)));
    }

    #[test]
    fn test_note_style_numbers_footnotes() {
        let mut engine = engine(StyleClass::Note);
        let rendered = engine
            .render_citations(&parse_citations("A @smith99. B [@doe2000, p. 4]."))
            .unwrap();
        assert_eq!(rendered[0].val, "<sup>1</sup>");
        assert_eq!(rendered[0].note.as_deref(), Some("Smith 1999."));
        assert_eq!(rendered[1].note_index, Some(2));
        assert_eq!(rendered[1].note.as_deref(), Some("Doe and Roe 2000, 4."));
    }

    #[test]
    fn test_bibliography_covers_last_render() {
        let mut engine = engine(StyleClass::InText);
        assert_eq!(engine.render_bibliography().unwrap(), None);

        engine
            .render_citations(&parse_citations("[@smith99; @doe2000] @smith99"))
            .unwrap();
        let output = engine.render_bibliography().unwrap().unwrap();
        assert_eq!(output.metadata.entry_ids, vec!["doe2000", "smith99"]);
        insta::assert_snapshot!(output.entries.join("\n"), @r#"
        <div class="csl-entry">Doe, John, and Rita Roe. 2000. “On &lt;Smoothing&gt;”. <i>Stat Journal</i> 12: 33-45. https://doi.org/10.1000/xyz.</div>
        <div class="csl-entry">Smith, Jane. 1999. <i>Linear Models</i>. Acme.</div>
        "#);

        engine.render_citations(&parse_citations("@doe2000")).unwrap();
        let output = engine.render_bibliography().unwrap().unwrap();
        assert_eq!(output.metadata.entry_ids, vec!["doe2000"]);
    }
}
