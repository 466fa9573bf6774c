//! The Wikitext Parser external collaborator contract. The core only ever
//! relies on span coordinates and structural recursion over this tree, so a
//! real production parser is a drop-in as long as it builds one of these.

use std::ops::Range;

#[derive(Debug, Clone, PartialEq)]
pub enum SpanKind {
    Template,
    WikiLink,
    Italic,
    Bold,
    Tag,
    Comment,
    Section,
    List,
}

/// One parsed span of wikitext: a template invocation, a link, a formatting
/// run, a tag, a comment, a section header, or a list. `children` holds
/// nested spans found strictly inside this one (e.g. a template argument
/// that is itself a link), already sorted by start offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub kind: SpanKind,
    pub range: Range<usize>,
    /// Template name, link target, tag name, or section header text,
    /// depending on `kind`.
    pub name: Option<String>,
    /// Parsed `key=value` template parameters, in source order, `key` being
    /// the positional index as a string for unnamed parameters.
    pub params: Vec<(String, String)>,
    pub children: Vec<Span>,
}

impl Span {
    pub fn new(kind: SpanKind, range: Range<usize>) -> Self {
        Span {
            kind,
            range,
            name: None,
            params: Vec::new(),
            children: Vec::new(),
        }
    }
}

/// Produces a tree of spans over a wikitext body. The core never parses
/// wikitext itself; it only walks `Span`s returned from here.
pub trait WikitextParser {
    fn parse(&self, text: &str) -> Vec<Span>;
}

pub mod fixtures {
    use super::*;

    /// A small stand-in sufficient to drive this crate's own tests and the
    /// binary entrypoint's demo. It understands `{{name|pos1|...|k=v}}`
    /// templates and `[[target|display]]` links at the top level only; it
    /// is not a production wikitext parser.
    pub struct MiniWikitextParser;

    impl WikitextParser for MiniWikitextParser {
        fn parse(&self, text: &str) -> Vec<Span> {
            let mut spans = Vec::new();
            let bytes = text.as_bytes();
            let mut i = 0;
            while i < bytes.len() {
                if text[i..].starts_with("{{") {
                    if let Some(end) = text[i..].find("}}") {
                        let inner = &text[i + 2..i + end];
                        let close = i + end + 2;
                        spans.push(parse_template(inner, i..close));
                        i = close;
                        continue;
                    }
                }
                if text[i..].starts_with("[[") {
                    if let Some(end) = text[i..].find("]]") {
                        let inner = &text[i + 2..i + end];
                        let close = i + end + 2;
                        spans.push(parse_link(inner, i..close));
                        i = close;
                        continue;
                    }
                }
                i += 1;
            }
            spans
        }
    }

    fn parse_template(inner: &str, range: Range<usize>) -> Span {
        let mut parts = inner.split('|');
        let name = parts.next().unwrap_or_default().trim().to_owned();
        let mut span = Span::new(SpanKind::Template, range);
        span.name = Some(name);
        for (i, part) in parts.enumerate() {
            if let Some((k, v)) = part.split_once('=') {
                span.params.push((k.trim().to_owned(), v.trim().to_owned()));
            } else {
                span.params.push(((i + 1).to_string(), part.trim().to_owned()));
            }
        }
        span
    }

    fn parse_link(inner: &str, range: Range<usize>) -> Span {
        let mut span = Span::new(SpanKind::WikiLink, range);
        let (target, display) = inner.split_once('|').unwrap_or((inner, inner));
        span.name = Some(target.trim().to_owned());
        span.params.push(("display".to_owned(), display.trim().to_owned()));
        span
    }

    #[test]
    fn parses_a_template_and_a_link() {
        let parser = MiniWikitextParser;
        let spans = parser.parse("From {{inh|en|enm|cat}}, see also [[dog|Dog]].");
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].kind, SpanKind::Template);
        assert_eq!(spans[0].name.as_deref(), Some("inh"));
        assert_eq!(spans[1].kind, SpanKind::WikiLink);
        assert_eq!(spans[1].name.as_deref(), Some("dog"));
    }
}
