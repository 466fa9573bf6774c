//! The Rule Engine (spec §4.G): linearizes a section's wikitext into a flat
//! *chain*, then narrows it down, rule by rule, from raw tokens to
//! `LinkNormalization`s. This is the subsystem with the most moving parts in
//! the whole pipeline, so every rule gets its own function and its own
//! small scan, in the fixed total order the catalog specifies -- later
//! rules can always assume earlier ones already ran.

use std::collections::HashSet;

use etymograph_core::RelationType;
use lazy_static::lazy_static;
use regex::Regex;

use crate::template_handler::{LinkNormalization, LinkTarget, TargetSpec, TemplateHandler};
use crate::wikitext::{Span, SpanKind};

#[derive(Debug, Clone, PartialEq)]
pub enum Marker {
    Language(String),
    NameMaybe(String),
    Uncertain,
    Wiki { title: String, lang: Option<String> },
    Relation(RelationType),
    XyOf(String),
    Literally,
    QuoteStart,
    QuoteEnd,
    Bracket(char),
    Punct(char),
    From,
    Plus,
    MentionMaybe(String),
    Gloss(String),
    Mention {
        term: String,
        language: Option<String>,
        detail: Option<String>,
    },
    FormatBoundary { italic: bool, start: bool },
}

#[derive(Debug, Clone)]
pub enum ChainElement {
    Text(String),
    Template(Span),
    WikiLink(Span),
    Marker(Marker),
    Normalization(LinkNormalization),
}

pub type Chain = Vec<ChainElement>;

// ---------------------------------------------------------------------
// Linearization
// ---------------------------------------------------------------------

fn select_nonoverlapping(spans: &[Span]) -> Vec<&Span> {
    let mut sorted: Vec<&Span> = spans.iter().collect();
    sorted.sort_by(|a, b| a.range.start.cmp(&b.range.start).then(b.range.end.cmp(&a.range.end)));
    let mut out = Vec::new();
    let mut last_end = 0;
    for s in sorted {
        if s.range.start >= last_end {
            out.push(s);
            last_end = s.range.end;
        }
    }
    out
}

fn push_text(chain: &mut Chain, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        chain.push(ChainElement::Text(trimmed.to_owned()));
    }
}

/// Linearizes one section's wikitext into the initial chain (spec §4.G
/// "Sequence model"). `Italic`/`Bold` spans store their already-rendered
/// inner text in `name` (the parser's own job, not this function's); their
/// `children` hold any nested spans found inside, recursively linearized.
pub fn linearize(text: &str, spans: &[Span]) -> Chain {
    linearize_range(text, spans, 0, text.len())
}

/// `start`/`end` bound the text slice a recursive call is allowed to pull
/// trailing/leading text from -- nested spans carry offsets into the full
/// source text, not offsets relative to their parent, so a recursive call
/// must stay within its parent's own range rather than re-scanning from 0.
fn linearize_range(text: &str, spans: &[Span], start: usize, end: usize) -> Chain {
    let mut chain = Vec::new();
    let mut cursor = start;
    for span in select_nonoverlapping(spans) {
        if span.range.start > cursor {
            push_text(&mut chain, &text[cursor..span.range.start]);
        }
        emit_span(&mut chain, text, span);
        cursor = span.range.end;
    }
    if cursor < end {
        push_text(&mut chain, &text[cursor..end]);
    }
    chain
}

fn emit_span(chain: &mut Chain, text: &str, span: &Span) {
    match span.kind {
        SpanKind::Template => chain.push(ChainElement::Template(span.clone())),
        SpanKind::WikiLink => chain.push(ChainElement::WikiLink(span.clone())),
        SpanKind::Italic | SpanKind::Bold => {
            let italic = span.kind == SpanKind::Italic;
            chain.push(ChainElement::Marker(Marker::FormatBoundary { italic, start: true }));
            if span.children.is_empty() {
                push_text(chain, span.name.as_deref().unwrap_or_default());
            } else {
                chain.extend(linearize_range(text, &span.children, span.range.start, span.range.end));
            }
            chain.push(ChainElement::Marker(Marker::FormatBoundary { italic, start: false }));
        }
        SpanKind::Tag if span.name.as_deref() == Some("div") => {
            chain.extend(linearize_range(text, &span.children, span.range.start, span.range.end));
        }
        SpanKind::Tag | SpanKind::Comment | SpanKind::Section | SpanKind::List => {}
    }
}

// ---------------------------------------------------------------------
// Rule 1-11: annotation rules (mark up raw text, don't consume it)
// ---------------------------------------------------------------------

const LANGUAGE_DENYLIST: &[&str] = &[
    "The", "Are", "sign", "isolate", "mixed", "not a family", "constructed", "substrate",
];

/// Rule 1: case-sensitive boundary match against known language names.
pub fn language_annotator(chain: Chain, known_languages: &HashSet<String>) -> Chain {
    annotate_word_spans(chain, |word| {
        if word.len() <= 2 || LANGUAGE_DENYLIST.contains(&word) {
            return None;
        }
        known_languages.contains(word).then(|| Marker::Language(word.to_owned()))
    })
}

lazy_static! {
    static ref PROPER_NOUN: Regex = Regex::new(r"\b([A-Z][a-z]+(?:\s[A-Z][a-z]+)+)\b").unwrap();
    static ref UNCERTAIN_WORD: Regex = Regex::new(r"(?i)\b(maybe|possibly|probably|perhaps)\b").unwrap();
    static ref LITERALLY_WORD: Regex = Regex::new(r"(?i)\bliterally\b").unwrap();
    static ref SHORTENING_PATTERN: Regex = Regex::new(r"(?i)shorten(ed|ing)").unwrap();
    static ref RELATED_PATTERN: Regex = Regex::new(r"(?i)\b(related to|see|compare)\b").unwrap();
    static ref EPONYM_PATTERN: Regex = Regex::new(r"(?i)named (after|for)").unwrap();
    static ref UNKNOWN_PATTERN: Regex =
        Regex::new(r"(?i)(of|origin) (uncertain|unknown|unclear)").unwrap();
    static ref ONOM_PATTERN: Regex = Regex::new(r"(?i)\b(onomato\w*|imitat\w*)\b").unwrap();
    static ref ABBREV_PATTERN: Regex = Regex::new(r"(?i)\babbreviation\b").unwrap();
    static ref DERIVATION_PATTERN: Regex = Regex::new(r"(?i)\bderiv(ed|es|ation)\b").unwrap();
}

/// Rule 2: heuristic capitalized multi-word proper noun.
pub fn maybe_name_annotator(chain: Chain) -> Chain {
    map_text(chain, |text| {
        PROPER_NOUN
            .find(text)
            .map(|m| vec![ChainElement::Marker(Marker::NameMaybe(m.as_str().to_owned()))])
    })
}

/// Rule 3: case-insensitive `maybe|possibly|probably|perhaps`.
pub fn uncertain_annotator(chain: Chain) -> Chain {
    map_text(chain, |text| {
        UNCERTAIN_WORD.is_match(text).then(|| vec![ChainElement::Marker(Marker::Uncertain)])
    })
}

/// Rule 4: `{{w|title|lang=}}` or `[[w:lang:title]]` becomes a `Wiki` marker.
pub fn wikipedia_link_annotator(chain: Chain) -> Chain {
    chain
        .into_iter()
        .map(|el| match &el {
            ChainElement::Template(span) if span.name.as_deref() == Some("w") => {
                let title = span.params.first().map(|(_, v)| v.clone()).unwrap_or_default();
                let lang = span.params.iter().find(|(k, _)| k == "lang").map(|(_, v)| v.clone());
                ChainElement::Marker(Marker::Wiki { title, lang })
            }
            ChainElement::WikiLink(span) => {
                let target = span.name.clone().unwrap_or_default();
                if let Some(rest) = target.strip_prefix("w:") {
                    let (lang, title) = rest.split_once(':').map_or((None, rest), |(l, t)| (Some(l), t));
                    ChainElement::Marker(Marker::Wiki {
                        title: title.to_owned(),
                        lang: lang.map(str::to_owned),
                    })
                } else {
                    el
                }
            }
            _ => el,
        })
        .collect()
}

/// Finds the first of `phrases` (case-insensitive) occurring in `text`,
/// returning the matched slice of `text` itself so callers get it in its
/// original case.
fn find_relation_phrase<'a>(text: &'a str, phrases: &[(&'static str, RelationType)]) -> Option<(&'a str, RelationType)> {
    let lower = text.to_lowercase();
    phrases.iter().find_map(|(phrase, relation)| {
        lower.find(&phrase.to_lowercase()).map(|pos| (&text[pos..pos + phrase.len()], *relation))
    })
}

/// Rule 5: phrasing that signals a specific relation type -- a fixed set of
/// patterns for relations that are rarely named by a template (e.g. plain
/// "derived"/"related to" prose), plus every `relation_in_text` phrase the
/// Template Handler's own registry carries (e.g. "calque of", "doublet
/// of"), so prose stating a relation the Template Handler would otherwise
/// only recognize from an actual template invocation is still annotated.
pub fn relation_annotator(chain: Chain, handler: &TemplateHandler) -> Chain {
    let phrases = handler.relation_phrases();
    map_text(chain, |text| {
        let (relation, matched) = if let Some(m) = SHORTENING_PATTERN.find(text) {
            (RelationType::Shortening, m.as_str())
        } else if let Some(m) = RELATED_PATTERN.find(text) {
            (RelationType::Related, m.as_str())
        } else if let Some(m) = EPONYM_PATTERN.find(text) {
            (RelationType::Eponym, m.as_str())
        } else if let Some(m) = UNKNOWN_PATTERN.find(text) {
            (RelationType::Unknown, m.as_str())
        } else if let Some(m) = ONOM_PATTERN.find(text) {
            (RelationType::Onom, m.as_str())
        } else if let Some(m) = ABBREV_PATTERN.find(text) {
            (RelationType::Abbrev, m.as_str())
        } else if let Some(m) = DERIVATION_PATTERN.find(text) {
            (RelationType::Derivation, m.as_str())
        } else if let Some((matched, relation)) = find_relation_phrase(text, &phrases) {
            (relation, matched)
        } else {
            return None;
        };
        // Derivation prose is rarely as specific as a template; file it
        // under the generic Origin marker instead.
        let relation = if relation == RelationType::Derivation { RelationType::Origin } else { relation };
        Some(vec![ChainElement::Marker(Marker::Relation(relation)), ChainElement::Text(matched.to_owned())])
    })
}

/// Rule 6: case-insensitive match of `X of`-style forms (`"plural of"`,
/// `"feminine plural of"`, ...) loaded from a sidecar data file.
pub fn xy_annotator(chain: Chain, xy_forms: &[String]) -> Chain {
    map_text(chain, |text| {
        let lc = text.to_lowercase();
        xy_forms
            .iter()
            .find(|phrase| lc.contains(phrase.as_str()))
            .map(|phrase| vec![ChainElement::Marker(Marker::XyOf(phrase.clone()))])
    })
}

/// Rule 7: the word `literally`.
pub fn literally_annotator(chain: Chain) -> Chain {
    map_text(chain, |text| {
        LITERALLY_WORD.is_match(text).then(|| vec![ChainElement::Marker(Marker::Literally)])
    })
}

/// Rule 8: quote runs, alternating start/end markers.
pub fn quotes_annotator(chain: Chain) -> Chain {
    let mut out = Chain::new();
    for el in chain {
        match el {
            ChainElement::Text(text) => {
                let mut rest = text.as_str();
                while let Some(i) = rest.find(['"', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '`']) {
                    push_text(&mut out, &rest[..i]);
                    let is_open = matches!(rest.as_bytes()[i], b'"' | b'`') || i == 0;
                    out.push(ChainElement::Marker(if is_open { Marker::QuoteStart } else { Marker::QuoteEnd }));
                    rest = &rest[i + rest[i..].chars().next().unwrap().len_utf8()..];
                }
                push_text(&mut out, rest);
            }
            other => out.push(other),
        }
    }
    out
}

/// Rule 9: `BracketsAnnotator`, `PunctAnnotator`, `FromAnnotator`,
/// `PlusAnnotator` -- simple single-token annotators, run together since
/// none of their matches can overlap.
pub fn simple_token_annotators(chain: Chain) -> Chain {
    let mut out = Chain::new();
    for el in chain {
        match el {
            ChainElement::Text(text) => {
                let mut buf = String::new();
                for ch in text.chars() {
                    match ch {
                        '(' | ')' | '[' | ']' => {
                            flush_word(&mut out, &mut buf);
                            out.push(ChainElement::Marker(Marker::Bracket(ch)));
                        }
                        '.' | ',' | ';' | ':' => {
                            flush_word(&mut out, &mut buf);
                            out.push(ChainElement::Marker(Marker::Punct(ch)));
                        }
                        '+' => {
                            flush_word(&mut out, &mut buf);
                            out.push(ChainElement::Marker(Marker::Plus));
                        }
                        c if c.is_whitespace() => flush_word(&mut out, &mut buf),
                        c => buf.push(c),
                    }
                    if buf == "from" {
                        out.push(ChainElement::Marker(Marker::From));
                        buf.clear();
                    }
                }
                flush_word(&mut out, &mut buf);
            }
            other => out.push(other),
        }
    }
    out
}

fn flush_word(out: &mut Chain, buf: &mut String) {
    if !buf.is_empty() {
        push_text(out, buf);
        buf.clear();
    }
}

/// Rule 10: each unclaimed wikilink or italic/bold scope becomes a
/// `Mention?` candidate, its text the plain-text rendering of the scope.
pub fn maybe_mention_annotator(chain: Chain) -> Chain {
    let mut out = Chain::new();
    let mut i = 0;
    while i < chain.len() {
        match &chain[i] {
            ChainElement::WikiLink(span) => {
                let display = span
                    .params
                    .iter()
                    .find(|(k, _)| k == "display")
                    .map(|(_, v)| v.clone())
                    .unwrap_or_else(|| span.name.clone().unwrap_or_default());
                out.push(ChainElement::Marker(Marker::MentionMaybe(display)));
                i += 1;
            }
            ChainElement::Marker(Marker::FormatBoundary { start: true, .. }) => {
                let mut j = i + 1;
                let mut text = String::new();
                while j < chain.len() {
                    if matches!(chain[j], ChainElement::Marker(Marker::FormatBoundary { start: false, .. })) {
                        j += 1;
                        break;
                    }
                    let piece = match &chain[j] {
                        ChainElement::Text(t) => Some(t.clone()),
                        ChainElement::WikiLink(span) => Some(
                            span.params
                                .iter()
                                .find(|(k, _)| k == "display")
                                .map(|(_, v)| v.clone())
                                .unwrap_or_else(|| span.name.clone().unwrap_or_default()),
                        ),
                        _ => None,
                    };
                    if let Some(piece) = piece {
                        if !text.is_empty() {
                            text.push(' ');
                        }
                        text.push_str(&piece);
                    }
                    j += 1;
                }
                out.push(ChainElement::Marker(Marker::MentionMaybe(text)));
                i = j;
            }
            other => {
                out.push(other.clone());
                i += 1;
            }
        }
    }
    out
}

/// Rule 11: a `(...)` or quoted scope becomes a `Gloss?` marker holding the
/// inner text, stripping both layers when brackets wrap quotes.
pub fn maybe_gloss_annotator(chain: Chain) -> Chain {
    let mut out = Chain::new();
    let mut i = 0;
    while i < chain.len() {
        let scope = match &chain[i] {
            ChainElement::Marker(Marker::Bracket('(')) => Some(Marker::Bracket(')')),
            ChainElement::Marker(Marker::QuoteStart) => Some(Marker::QuoteEnd),
            _ => None,
        };
        if let Some(closer) = scope {
            let mut j = i + 1;
            let mut parts = Vec::new();
            while j < chain.len() && chain[j] != ChainElement::Marker(closer.clone()) {
                if let ChainElement::Text(t) = &chain[j] {
                    parts.push(t.clone());
                }
                j += 1;
            }
            if j < chain.len() {
                out.push(ChainElement::Marker(Marker::Gloss(parts.join(" "))));
                i = j + 1;
                continue;
            }
        }
        out.push(chain[i].clone());
        i += 1;
    }
    out
}

impl PartialEq for ChainElement {
    fn eq(&self, other: &Self) -> bool {
        matches!((self, other), (ChainElement::Marker(a), ChainElement::Marker(b)) if a == b)
    }
}

fn annotate_word_spans(chain: Chain, f: impl Fn(&str) -> Option<Marker>) -> Chain {
    let mut out = Chain::new();
    for el in chain {
        if let ChainElement::Text(text) = &el {
            if let Some(found) = text.split_whitespace().find_map(|w| f(w).map(|m| (w, m))) {
                let (word, marker) = found;
                if let Some(idx) = text.find(word) {
                    push_text(&mut out, &text[..idx]);
                    out.push(ChainElement::Marker(marker));
                    push_text(&mut out, &text[idx + word.len()..]);
                    continue;
                }
            }
        }
        out.push(el);
    }
    out
}

fn map_text(chain: Chain, f: impl Fn(&str) -> Option<Vec<ChainElement>>) -> Chain {
    let mut out = Chain::new();
    for el in chain {
        if let ChainElement::Text(text) = &el {
            if let Some(replacement) = f(text) {
                out.extend(replacement);
                continue;
            }
        }
        out.push(el);
    }
    out
}

// ---------------------------------------------------------------------
// Rule 12-21: conversion rules (build LinkNormalizations)
// ---------------------------------------------------------------------

/// Rule 12: each remaining `Template` becomes a `LinkNormalization` via the
/// Template Handler; templates the handler doesn't recognize are left as-is
/// (surfaced by the caller as `NotImplementedTemplate`).
pub fn apply_template_normalization(chain: Chain, handler: &TemplateHandler) -> Chain {
    chain
        .into_iter()
        .map(|el| match &el {
            ChainElement::Template(span) => match handler.to_normalization(span) {
                Some(norm) => ChainElement::Normalization(norm),
                None => el,
            },
            _ => el,
        })
        .collect()
}

/// Rule 13: each remaining raw string is split on whitespace into tokens.
pub fn apply_string_tokenization(chain: Chain) -> Chain {
    let mut out = Chain::new();
    for el in chain {
        if let ChainElement::Text(text) = el {
            for word in text.split_whitespace() {
                out.push(ChainElement::Text(word.to_owned()));
            }
        } else {
            out.push(el);
        }
    }
    out
}

fn is_stopper(el: &ChainElement) -> bool {
    matches!(el, ChainElement::Marker(Marker::Plus) | ChainElement::Marker(Marker::Punct(_)))
}

/// Rule 14: folds a `Mention?` with nearby `Language`/`Literally`/`Gloss?`
/// context into a concrete `Mention`.
pub fn mention_rule(chain: Chain) -> Chain {
    let mut out: Chain = Vec::with_capacity(chain.len());
    let mut i = 0;
    while i < chain.len() {
        if let ChainElement::Marker(Marker::MentionMaybe(term)) = &chain[i] {
            let term = term.clone();
            let language = left_context(&out, 2).into_iter().find_map(|el| match el {
                ChainElement::Marker(Marker::Language(l)) => Some(l.clone()),
                _ => None,
            });
            let detail = right_context(&chain, i + 1, 3).into_iter().find_map(|el| match el {
                ChainElement::Marker(Marker::Literally) => Some("(literally)".to_owned()),
                ChainElement::Marker(Marker::Gloss(g)) => Some(g.clone()),
                _ => None,
            });
            out.push(ChainElement::Marker(Marker::Mention { term, language, detail }));
            i += 1;
            continue;
        }
        out.push(chain[i].clone());
        i += 1;
    }
    out
}

fn left_context(out: &[ChainElement], n: usize) -> Vec<&ChainElement> {
    let start = out.len().saturating_sub(n);
    let mut window = Vec::new();
    for el in &out[start..] {
        if is_stopper(el) {
            window.clear();
            continue;
        }
        window.push(el);
    }
    window
}

fn right_context(chain: &[ChainElement], from: usize, n: usize) -> Vec<&ChainElement> {
    let mut window = Vec::new();
    for el in chain.iter().skip(from).take(n) {
        if is_stopper(el) {
            break;
        }
        window.push(el);
    }
    window
}

/// Rule 15: `Mention (+ Mention)+` within a window collapses into one
/// `MORPHOLOGICAL` normalization over every mention found.
pub fn compound_rule(chain: Chain) -> Chain {
    let mut out = Chain::new();
    let mut i = 0;
    while i < chain.len() {
        if chain[i] == ChainElement::Marker(Marker::Plus) {
            let (left, left_consumed) = collect_mentions_before(&out, 4);
            let (right, consumed) = collect_mentions_after(&chain, i + 1, 4);
            if !left.is_empty() && !right.is_empty() {
                out.truncate(out.len() - left_consumed);
                let mut targets: Vec<_> = left.iter().map(|m| target_from_mention_full(m)).collect();
                targets.extend(right.iter().map(target_from_mention_full));
                out.push(ChainElement::Normalization(LinkNormalization {
                    relation_type: RelationType::Morphological,
                    text: None,
                    uncertain: false,
                    target: TargetSpec::Many(targets),
                    source_language: None,
                }));
                i += 1 + consumed;
                continue;
            }
        }
        out.push(chain[i].clone());
        i += 1;
    }
    out
}

fn as_mention(el: &ChainElement) -> Option<&Marker> {
    match el {
        ChainElement::Marker(m @ Marker::Mention { .. }) => Some(m),
        _ => None,
    }
}

fn collect_mentions_before(out: &[ChainElement], window: usize) -> (Vec<Marker>, usize) {
    let start = out.len().saturating_sub(window);
    let mut mentions = Vec::new();
    let mut consumed = 0;
    for el in out[start..].iter().rev() {
        match as_mention(el) {
            Some(m) => {
                mentions.push(m.clone());
                consumed += 1;
            }
            None if matches!(el, ChainElement::Marker(Marker::Plus)) => consumed += 1,
            None => break,
        }
    }
    mentions.reverse();
    (mentions, consumed)
}

fn collect_mentions_after(chain: &[ChainElement], from: usize, window: usize) -> (Vec<Marker>, usize) {
    let mut mentions = Vec::new();
    let mut consumed = 0;
    let mut idx = from;
    while idx < chain.len() && consumed < window {
        match as_mention(&chain[idx]) {
            Some(m) => {
                mentions.push(m.clone());
                consumed = idx - from + 1;
                idx += 1;
            }
            None if chain[idx] == ChainElement::Marker(Marker::Plus) => {
                idx += 1;
                consumed += 1;
            }
            None => break,
        }
    }
    (mentions, consumed)
}

fn target_from_mention_full(m: &Marker) -> LinkTarget {
    let mut t = LinkTarget::new();
    if let Marker::Mention { term, language, detail } = m {
        t.insert("term".to_owned(), term.clone());
        if let Some(lang) = language {
            t.insert("language".to_owned(), lang.clone());
        }
        if let Some(d) = detail {
            t.insert("t".to_owned(), d.clone());
        }
    }
    t
}

/// Rule 16: `from` followed by a `Mention` (within 2 elements, stopping on
/// `Punct`) becomes an `ORIGIN` normalization; an adjacent RELATED
/// normalization is upgraded the same way.
pub fn from_rule(chain: Chain) -> Chain {
    let mut out = Chain::new();
    let mut i = 0;
    while i < chain.len() {
        if chain[i] == ChainElement::Marker(Marker::From) {
            if let Some((offset, mention)) = find_ahead_mention(&chain, i + 1, 2) {
                out.push(ChainElement::Normalization(LinkNormalization {
                    relation_type: RelationType::Origin,
                    text: None,
                    uncertain: false,
                    target: TargetSpec::One(target_from_mention_full(&mention)),
                    source_language: None,
                }));
                i += 1 + offset + 1;
                continue;
            }
            if let Some(ChainElement::Normalization(norm)) = chain.get(i + 1) {
                if norm.relation_type == RelationType::Related {
                    let mut upgraded = norm.clone();
                    upgraded.relation_type = RelationType::Origin;
                    out.push(ChainElement::Normalization(upgraded));
                    i += 2;
                    continue;
                }
            }
        }
        out.push(chain[i].clone());
        i += 1;
    }
    out
}

fn find_ahead_mention(chain: &[ChainElement], from: usize, window: usize) -> Option<(usize, Marker)> {
    for (offset, el) in chain.iter().skip(from).take(window).enumerate() {
        if is_stopper(el) {
            return None;
        }
        if let Some(m) = as_mention(el) {
            return Some((offset, m.clone()));
        }
    }
    None
}

/// Rule 17: a `Relation`/`XYOf` marker followed within 3 elements by a
/// `Mention` (or an adjacent RELATED normalization) becomes a
/// `LinkNormalization` of that type.
pub fn relation_rule(chain: Chain) -> Chain {
    let mut out = Chain::new();
    let mut i = 0;
    while i < chain.len() {
        let marker_relation = match &chain[i] {
            ChainElement::Marker(Marker::Relation(t)) => Some((*t, None)),
            ChainElement::Marker(Marker::XyOf(phrase)) => Some((RelationType::Related, Some(phrase.clone()))),
            _ => None,
        };
        if let Some((relation_type, text)) = marker_relation {
            if let Some((offset, mention)) = find_ahead_mention(&chain, i + 1, 3) {
                out.push(ChainElement::Normalization(LinkNormalization {
                    relation_type,
                    text,
                    uncertain: false,
                    target: TargetSpec::One(target_from_mention_full(&mention)),
                    source_language: None,
                }));
                i += 1 + offset + 1;
                continue;
            }
        }
        out.push(chain[i].clone());
        i += 1;
    }
    out
}

/// Rule 18: after an EPONYM relation marker, a `Wiki` or `Name?` within 8
/// elements (stopping at `Punct "."`) becomes an EPONYM normalization.
pub fn named_after_rule(chain: Chain) -> Chain {
    let mut out = Chain::new();
    let mut i = 0;
    while i < chain.len() {
        if chain[i] == ChainElement::Marker(Marker::Relation(RelationType::Eponym)) {
            let mut found = None;
            for (offset, el) in chain.iter().skip(i + 1).take(8).enumerate() {
                if *el == ChainElement::Marker(Marker::Punct('.')) {
                    break;
                }
                match el {
                    ChainElement::Marker(Marker::Wiki { title, .. }) => {
                        found = Some((offset, title.clone()));
                        break;
                    }
                    ChainElement::Marker(Marker::NameMaybe(name)) => {
                        found = Some((offset, name.clone()));
                        break;
                    }
                    _ => {}
                }
            }
            if let Some((offset, name)) = found {
                let mut target = LinkTarget::new();
                target.insert("name".to_owned(), name);
                out.push(ChainElement::Normalization(LinkNormalization {
                    relation_type: RelationType::Eponym,
                    text: None,
                    uncertain: false,
                    target: TargetSpec::One(target),
                    source_language: None,
                }));
                i += 1 + offset + 1;
                continue;
            }
        }
        out.push(chain[i].clone());
        i += 1;
    }
    out
}

/// Rule 19: a surviving `{{etyl|lang|...}}` template followed by a RELATED
/// normalization or a `Mention` rewrites it to ORIGIN and injects its
/// language.
pub fn etyl_mention_rule(chain: Chain) -> Chain {
    let mut out = Chain::new();
    let mut i = 0;
    while i < chain.len() {
        let etyl_lang = match &chain[i] {
            ChainElement::Template(span) if span.name.as_deref() == Some("etyl") => {
                span.params.first().map(|(_, v)| v.clone())
            }
            _ => None,
        };
        if let Some(lang) = etyl_lang {
            match chain.get(i + 1) {
                Some(ChainElement::Normalization(norm)) if norm.relation_type == RelationType::Related => {
                    let mut upgraded = norm.clone();
                    upgraded.relation_type = RelationType::Origin;
                    if let TargetSpec::One(ref mut t) = upgraded.target {
                        t.entry("language".to_owned()).or_insert(lang);
                    }
                    out.push(ChainElement::Normalization(upgraded));
                    i += 2;
                    continue;
                }
                Some(el) if as_mention(el).is_some() => {
                    let mention = as_mention(el).unwrap().clone();
                    let mut target = target_from_mention_full(&mention);
                    target.entry("language".to_owned()).or_insert(lang);
                    out.push(ChainElement::Normalization(LinkNormalization {
                        relation_type: RelationType::Origin,
                        text: None,
                        uncertain: false,
                        target: TargetSpec::One(target),
                        source_language: None,
                    }));
                    i += 2;
                    continue;
                }
                _ => {}
            }
        }
        out.push(chain[i].clone());
        i += 1;
    }
    out
}

/// Rule 20: an `Uncertain` marker within 3 elements before a
/// `LinkNormalization` sets its `uncertain` flag.
pub fn uncertain_rule(chain: Chain) -> Chain {
    let mut out: Chain = Vec::with_capacity(chain.len());
    for el in chain {
        if let ChainElement::Normalization(mut norm) = el {
            if left_context(&out, 3).into_iter().any(|e| *e == ChainElement::Marker(Marker::Uncertain)) {
                norm.uncertain = true;
            }
            out.push(ChainElement::Normalization(norm));
        } else {
            out.push(el);
        }
    }
    out
}

/// Rule 21: any surviving `Mention` becomes a RELATED normalization.
pub fn mention_fallback(chain: Chain) -> Chain {
    chain
        .into_iter()
        .map(|el| match &el {
            ChainElement::Marker(m @ Marker::Mention { .. }) => ChainElement::Normalization(LinkNormalization {
                relation_type: RelationType::Related,
                text: None,
                uncertain: false,
                target: TargetSpec::One(target_from_mention_full(m)),
                source_language: None,
            }),
            _ => el,
        })
        .collect()
}

/// Runs the full catalog in its fixed order (spec §4.G). `known_languages`
/// and `xy_forms` back rules 1 and 6 respectively.
pub fn run_rule_engine(
    text: &str,
    spans: &[Span],
    known_languages: &HashSet<String>,
    xy_forms: &[String],
    handler: &TemplateHandler,
) -> Chain {
    let chain = linearize(text, spans);
    let chain = language_annotator(chain, known_languages);
    let chain = maybe_name_annotator(chain);
    let chain = uncertain_annotator(chain);
    let chain = wikipedia_link_annotator(chain);
    let chain = relation_annotator(chain, handler);
    let chain = xy_annotator(chain, xy_forms);
    let chain = literally_annotator(chain);
    let chain = quotes_annotator(chain);
    let chain = simple_token_annotators(chain);
    let chain = maybe_mention_annotator(chain);
    let chain = maybe_gloss_annotator(chain);
    let chain = apply_template_normalization(chain, handler);
    let chain = apply_string_tokenization(chain);
    let chain = mention_rule(chain);
    let chain = compound_rule(chain);
    let chain = from_rule(chain);
    let chain = relation_rule(chain);
    let chain = named_after_rule(chain);
    let chain = etyl_mention_rule(chain);
    let chain = uncertain_rule(chain);
    mention_fallback(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wikitext::fixtures::MiniWikitextParser;
    use crate::wikitext::WikitextParser;

    #[test]
    fn linearizes_template_and_link_with_interleaved_text() {
        let text = "From {{inh|en|enm|cat}}, see also [[dog|Dog]].";
        let spans = MiniWikitextParser.parse(text);
        let chain = linearize(text, &spans);
        assert!(matches!(chain[0], ChainElement::Text(_)));
        assert!(matches!(chain[1], ChainElement::Template(_)));
    }

    #[test]
    fn language_annotator_matches_known_language() {
        let chain = vec![ChainElement::Text("From Latin cattus".to_owned())];
        let mut known = HashSet::new();
        known.insert("Latin".to_owned());
        let out = language_annotator(chain, &known);
        assert!(out.iter().any(|el| matches!(el, ChainElement::Marker(Marker::Language(l)) if l == "Latin")));
    }

    #[test]
    fn relation_annotator_recognizes_a_template_handlers_relation_phrase() {
        let handler = TemplateHandler::new();
        let chain = vec![ChainElement::Text("a doublet of the same Latin word".to_owned())];
        let out = relation_annotator(chain, &handler);
        let found = out.iter().any(|el| matches!(el, ChainElement::Marker(Marker::Relation(RelationType::Doublet))));
        assert!(found, "expected a Doublet relation marker from the registered \"doublet of\" phrase");
    }

    #[test]
    fn from_rule_produces_origin_normalization() {
        let chain = vec![
            ChainElement::Marker(Marker::From),
            ChainElement::Marker(Marker::Mention {
                term: "cattus".to_owned(),
                language: Some("Latin".to_owned()),
                detail: None,
            }),
        ];
        let out = from_rule(chain);
        assert_eq!(out.len(), 1);
        match &out[0] {
            ChainElement::Normalization(n) => assert_eq!(n.relation_type, RelationType::Origin),
            _ => panic!("expected a normalization"),
        }
    }

    #[test]
    fn compound_rule_collapses_plus_chain() {
        let chain = vec![
            ChainElement::Marker(Marker::Mention { term: "sun".to_owned(), language: None, detail: None }),
            ChainElement::Marker(Marker::Plus),
            ChainElement::Marker(Marker::Mention { term: "flower".to_owned(), language: None, detail: None }),
        ];
        let out = compound_rule(chain);
        assert_eq!(out.len(), 1);
        match &out[0] {
            ChainElement::Normalization(n) => {
                assert_eq!(n.relation_type, RelationType::Morphological);
                match &n.target {
                    TargetSpec::Many(targets) => assert_eq!(targets.len(), 2),
                    _ => panic!("expected multiple targets"),
                }
            }
            _ => panic!("expected a normalization"),
        }
    }

    #[test]
    fn maybe_mention_annotator_reads_wikilink_inside_italics() {
        let mut link = Span::new(SpanKind::WikiLink, 0..5);
        link.name = Some("black".to_owned());
        let chain = vec![
            ChainElement::Marker(Marker::FormatBoundary { italic: true, start: true }),
            ChainElement::WikiLink(link),
            ChainElement::Marker(Marker::FormatBoundary { italic: true, start: false }),
        ];
        let out = maybe_mention_annotator(chain);
        assert_eq!(out.len(), 1);
        assert!(matches!(&out[0], ChainElement::Marker(Marker::MentionMaybe(t)) if t == "black"));
    }

    #[test]
    fn linearize_recurses_within_parent_span_bounds() {
        let text = "From black.";
        let mut link = Span::new(SpanKind::WikiLink, 5..10);
        link.name = Some("black".to_owned());
        let mut italic = Span::new(SpanKind::Italic, 5..10);
        italic.children = vec![link];
        let chain = linearize(text, &[italic]);
        // A correct bounded recursion yields exactly one leading Text("From"),
        // not a duplicate re-scan of the parent's own leading text.
        let text_count = chain.iter().filter(|el| matches!(el, ChainElement::Text(t) if t == "From")).count();
        assert_eq!(text_count, 1);
    }

    #[test]
    fn mention_fallback_converts_surviving_mentions() {
        let chain = vec![ChainElement::Marker(Marker::Mention {
            term: "foo".to_owned(),
            language: None,
            detail: None,
        })];
        let out = mention_fallback(chain);
        match &out[0] {
            ChainElement::Normalization(n) => assert_eq!(n.relation_type, RelationType::Related),
            _ => panic!("expected a normalization"),
        }
    }
}
