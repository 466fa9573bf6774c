//! Black-box end-to-end scenarios run against the public pipeline entry
//! point with small in-memory test doubles, since no live wiktextract dump
//! is available to this crate.

use std::ops::Range;

use etymograph_core::RelationType;
use processor::config::PipelineConfig;
use processor::demo_language_mapper::DemoLanguageMapper;
use processor::entry::{Entry, VecEntryStore};
use processor::run_pipeline;
use processor::wikitext::fixtures::MiniWikitextParser;
use processor::wikitext::{Span, SpanKind, WikitextParser};

fn etymology_entry(title: &str, lang: &str, text: &str) -> Entry {
    Entry {
        title: title.to_owned(),
        namespace: String::new(),
        language: lang.to_owned(),
        sections: vec![vec!["Etymology".to_owned()]],
        texts: vec![text.to_owned()],
        etym_count: 1,
        _i: 0,
    }
}

#[test]
fn inherited_template_yields_one_edge() {
    let entries = vec![etymology_entry("cat", "en", "From {{inh|en|enm|cat}}.")];
    let store = VecEntryStore::new(entries);
    let languages = DemoLanguageMapper;
    let parser = MiniWikitextParser;
    let config = PipelineConfig::new("unused.txt");
    let graph = run_pipeline(&store, &languages, &parser, None, &config, &[]);

    assert_eq!(graph.len(), 1);
    assert_eq!(graph[0].attrs.r#type, RelationType::Inheritance);
}

#[test]
fn chain_resolution_anchors_each_link_on_the_previous_target() {
    let entries = vec![etymology_entry(
        "word",
        "en",
        "From {{inh|en|enm|word}}, from {{inh|enm|ang|word}}.",
    )];
    let store = VecEntryStore::new(entries);
    let languages = DemoLanguageMapper;
    let parser = MiniWikitextParser;
    let config = PipelineConfig::new("unused.txt");
    let graph = run_pipeline(&store, &languages, &parser, None, &config, &[]);

    assert_eq!(graph.len(), 2);
    assert!(graph.iter().all(|r| r.attrs.r#type == RelationType::Inheritance));
    // the second link's source must be the first link's target, not the
    // entry's own context lexeme -- this is what distinguishes real chain
    // threading ("A from B from C" => A->B, B->C) from two edges both
    // anchored back on A. The reduced graph's edge order isn't significant,
    // so look for the threading relationship in either direction.
    let threaded = graph[0].tgt == graph[1].src || graph[1].tgt == graph[0].src;
    assert!(threaded, "expected one edge's target to be the other's source");
    assert_ne!(graph[0].src, graph[1].src);
}

#[test]
fn named_after_resolves_to_an_entity_node() {
    let entries = vec![etymology_entry(
        "turing-machine",
        "en",
        "Named after {{w|Alan Turing}}.",
    )];
    let store = VecEntryStore::new(entries);
    let languages = DemoLanguageMapper;
    let parser = MiniWikitextParser;
    let config = PipelineConfig::new("unused.txt");
    let graph = run_pipeline(&store, &languages, &parser, None, &config, &[]);

    assert_eq!(graph.len(), 1);
    assert_eq!(graph[0].attrs.r#type, RelationType::Eponym);
    assert!(matches!(graph[0].tgt, etymograph_core::NodeRef::Entity(_)));
}

/// A production wikitext parser never hands `''[[x]]''` back as a literal
/// apostrophe run -- it resolves italics to an `Italic` span wrapping the
/// link it scopes, the markup itself consumed into the span's own range.
/// `MiniWikitextParser` only understands templates and bare links at the
/// top level, so this scenario builds the spans a real parser would
/// produce by hand rather than widening the test double.
struct ItalicWikilinkParser {
    links: Vec<(Range<usize>, &'static str)>,
}

impl WikitextParser for ItalicWikilinkParser {
    fn parse(&self, _text: &str) -> Vec<Span> {
        self.links
            .iter()
            .map(|(range, name)| {
                let mut link = Span::new(SpanKind::WikiLink, range.clone());
                link.name = Some((*name).to_owned());
                let mut italic = Span::new(SpanKind::Italic, range.clone());
                italic.children = vec![link];
                italic
            })
            .collect()
    }
}

#[test]
fn compound_rule_joins_two_italicized_wikilinks() {
    let text = "From black + bird.";
    let parser = ItalicWikilinkParser {
        links: vec![(5..10, "black"), (13..17, "bird")],
    };
    let entries = vec![etymology_entry("blackbird", "en", text)];
    let store = VecEntryStore::new(entries);
    let languages = DemoLanguageMapper;
    let config = PipelineConfig::new("unused.txt");
    let graph = run_pipeline(&store, &languages, &parser, None, &config, &[]);

    assert_eq!(graph.len(), 2);
    assert!(graph.iter().all(|r| r.attrs.r#type == RelationType::Morphological));
    assert_eq!(graph[0].src, graph[1].src);
    assert_ne!(graph[0].tgt, graph[1].tgt);
}
