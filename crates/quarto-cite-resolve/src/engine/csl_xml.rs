/*
 * engine/csl_xml.rs
 * Copyright (c) 2026 Posit, PBC
 *
 * Reads the parts of CSL styles and locales the built-in engine uses.
 */

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};

/// Whether citations render inline or as footnotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StyleClass {
    #[default]
    InText,
    Note,
}

/// Bibliography layout options from a style's `<bibliography>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BibliographyLayout {
    pub hanging_indent: bool,
    pub entry_spacing: u32,
    pub line_spacing: u32,
}

impl Default for BibliographyLayout {
    fn default() -> Self {
        Self {
            hanging_indent: false,
            entry_spacing: 1,
            line_spacing: 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleInfo {
    pub title: Option<String>,
    pub class: StyleClass,
    pub bibliography: BibliographyLayout,
}

/// Locale terms used by the built-in engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleTerms {
    pub and: String,
    pub et_al: String,
    pub no_date: String,
}

impl Default for LocaleTerms {
    fn default() -> Self {
        Self {
            and: "and".to_string(),
            et_al: "et al.".to_string(),
            no_date: "n.d.".to_string(),
        }
    }
}

#[derive(Debug)]
enum Node {
    Open {
        name: String,
        attrs: Vec<(String, String)>,
        empty: bool,
    },
    Text(String),
    Close,
}

impl Node {
    fn attr<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
        attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn open(e: &BytesStart<'_>, empty: bool) -> std::result::Result<Node, String> {
    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| err.to_string())?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| format!("invalid value for attribute '{key}': {err}"))?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(Node::Open { name, attrs, empty })
}

/// Flatten a document into open/text/close nodes.
fn nodes(text: &str) -> std::result::Result<Vec<Node>, String> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut nodes = Vec::new();
    let mut depth = 0usize;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                nodes.push(open(&e, false)?);
                depth += 1;
            }
            Ok(Event::Empty(e)) => nodes.push(open(&e, true)?),
            Ok(Event::End(_)) => {
                nodes.push(Node::Close);
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|err| err.to_string())?;
                nodes.push(Node::Text(text.into_owned()));
            }
            Ok(Event::CData(e)) => {
                nodes.push(Node::Text(
                    String::from_utf8_lossy(&e.into_inner()).into_owned(),
                ));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(format!("at byte {}: {err}", reader.error_position())),
        }
    }
    if depth != 0 {
        return Err("unexpected end of document".to_string());
    }
    Ok(nodes)
}

fn parse_u32(value: Option<&str>, default: u32) -> u32 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// Read the class, title and bibliography layout of a CSL style.
pub fn read_style(text: &str) -> Result<StyleInfo> {
    let nodes = nodes(text).map_err(Error::StyleParse)?;
    let mut info: Option<StyleInfo> = None;
    let mut path: Vec<&str> = Vec::new();

    for node in &nodes {
        match node {
            Node::Open { name, attrs, empty } => {
                if path.is_empty() {
                    if name != "style" {
                        return Err(Error::StyleParse(format!(
                            "expected a <style> element, found <{name}>"
                        )));
                    }
                    let class = match Node::attr(attrs, "class") {
                        None | Some("in-text") => StyleClass::InText,
                        Some("note") => StyleClass::Note,
                        Some(other) => {
                            return Err(Error::StyleParse(format!(
                                "unknown style class '{other}'"
                            )));
                        }
                    };
                    info = Some(StyleInfo {
                        class,
                        ..Default::default()
                    });
                } else if path[..] == ["style"] && name == "bibliography" {
                    if let Some(info) = info.as_mut() {
                        let defaults = BibliographyLayout::default();
                        info.bibliography = BibliographyLayout {
                            hanging_indent: Node::attr(attrs, "hanging-indent") == Some("true"),
                            entry_spacing: parse_u32(
                                Node::attr(attrs, "entry-spacing"),
                                defaults.entry_spacing,
                            ),
                            line_spacing: parse_u32(
                                Node::attr(attrs, "line-spacing"),
                                defaults.line_spacing,
                            ),
                        };
                    }
                }
                if !empty {
                    path.push(name);
                }
            }
            Node::Text(text) => {
                if path[..] == ["style", "info", "title"]
                    && let Some(info) = info.as_mut()
                {
                    info.title = Some(text.clone());
                }
            }
            Node::Close => {
                path.pop();
            }
        }
    }

    info.ok_or_else(|| Error::StyleParse("document has no root element".to_string()))
}

/// Read the terms the built-in engine needs from a CSL locale. Terms the
/// locale does not define keep their English defaults.
pub fn read_locale(lang: &str, text: &str) -> Result<LocaleTerms> {
    let parse_error = |message: String| Error::LocaleParse {
        lang: lang.to_string(),
        message,
    };
    let nodes = nodes(text).map_err(parse_error)?;
    let mut terms = LocaleTerms::default();
    let mut path: Vec<&str> = Vec::new();
    // (name, form) of the <term> being read.
    let mut current: Option<(&str, &str)> = None;

    for node in &nodes {
        match node {
            Node::Open { name, attrs, empty } => {
                if path.is_empty() && name != "locale" {
                    return Err(parse_error(format!(
                        "expected a <locale> element, found <{name}>"
                    )));
                }
                if path[..] == ["locale", "terms"] && name == "term" {
                    current = Node::attr(attrs, "name")
                        .map(|term| (term, Node::attr(attrs, "form").unwrap_or("long")));
                }
                if !empty {
                    path.push(name);
                }
            }
            Node::Text(text) => {
                if path.last() != Some(&"term") {
                    continue;
                }
                match current {
                    Some(("and", "long")) => terms.and = text.clone(),
                    Some(("et-al", "long")) => terms.et_al = text.clone(),
                    Some(("no date", "short")) => terms.no_date = text.clone(),
                    _ => {}
                }
            }
            Node::Close => {
                if path.pop() == Some("term") {
                    current = None;
                }
            }
        }
    }
    Ok(terms)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUILTIN_STYLE: &str = include_str!("../../resources/chicago-author-date.csl");
    const BUILTIN_LOCALE: &str = include_str!("../../resources/locales-en-US.xml");

    #[test]
    fn test_read_builtin_style() {
        let info = read_style(BUILTIN_STYLE).unwrap();
        assert_eq!(info.class, StyleClass::InText);
        assert_eq!(
            info.title.as_deref(),
            Some("Chicago Manual of Style 17th edition (author-date)")
        );
        assert_eq!(
            info.bibliography,
            BibliographyLayout {
                hanging_indent: true,
                entry_spacing: 0,
                line_spacing: 2,
            }
        );
    }

    #[test]
    fn test_note_style_and_defaults() {
        let info = read_style(r#"<style class="note"><info><title>Notes &amp; More</title></info></style>"#)
            .unwrap();
        assert_eq!(info.class, StyleClass::Note);
        assert_eq!(info.title.as_deref(), Some("Notes & More"));
        assert_eq!(info.bibliography, BibliographyLayout::default());
    }

    #[test]
    fn test_style_errors() {
        assert!(matches!(read_style("<locale/>"), Err(Error::StyleParse(_))));
        assert!(matches!(read_style(""), Err(Error::StyleParse(_))));
        assert!(matches!(
            read_style("<style><info></style>"),
            Err(Error::StyleParse(_))
        ));
        assert!(matches!(
            read_style(r#"<style class="sidebar"/>"#),
            Err(Error::StyleParse(_))
        ));
    }

    #[test]
    fn test_read_builtin_locale() {
        assert_eq!(
            read_locale("en-US", BUILTIN_LOCALE).unwrap(),
            LocaleTerms::default()
        );
    }

    #[test]
    fn test_read_locale_terms() {
        let german = r#"<locale xml:lang="de-DE"><terms>
            <term name="and">und</term>
            <term name="and" form="symbol">&amp;</term>
            <term name="et-al">u. a.</term>
            <term name="no date" form="short">o. J.</term>
        </terms></locale>"#;
        assert_eq!(
            read_locale("de-DE", german).unwrap(),
            LocaleTerms {
                and: "und".into(),
                et_al: "u. a.".into(),
                no_date: "o. J.".into(),
            }
        );
        assert!(matches!(
            read_locale("xx", "<style/>"),
            Err(Error::LocaleParse { .. })
        ));
    }
}
