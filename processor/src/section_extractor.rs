//! Section Extractors (spec §4.F): turn a parsed wikitext section into a
//! list of relation candidates, each flavor consulting the Template Handler
//! and Node Resolver differently depending on what kind of section it is.

use etymograph_core::{Lang, NodeRef, Relation, RelationAttributes, RelationType, Term};

use crate::chain::{run_rule_engine, ChainElement, Marker};
use crate::node_resolver::NodeResolver;
use crate::template_handler::{LinkNormalization, TemplateHandler};
use crate::wikitext::{Span, SpanKind};

/// A target for `relate_to_context_lexeme`: either an inline wikilink's raw
/// target text, or a template span to run through the Template Handler.
pub enum TargetObj<'a> {
    Link(&'a str),
    Template(&'a Span),
}

/// The common primitive every extractor variant bottoms out in (spec
/// §4.F). Builds zero relations for an inline link with no resolvable
/// target or a template with no registered handler.
pub fn relate_to_context_lexeme(
    resolver: &mut NodeResolver,
    handler: &TemplateHandler,
    target_obj: TargetObj,
    ctx_lexeme: Option<(Term, Lang)>,
    ctx_node: NodeRef,
    ctx_is_source: bool,
    default_relation_type: RelationType,
) -> Vec<Relation> {
    match target_obj {
        TargetObj::Link(link) => {
            let Some(target_node) = resolver.resolve_link(link, ctx_lexeme) else {
                return Vec::new();
            };
            vec![oriented_relation(ctx_node, target_node, default_relation_type, ctx_is_source)]
        }
        TargetObj::Template(span) => {
            let Some(normalization) = handler.to_normalization(span) else {
                return Vec::new();
            };
            build_relations(resolver, &normalization, ctx_lexeme, ctx_node, ctx_is_source)
        }
    }
}

fn build_relations(
    resolver: &mut NodeResolver,
    normalization: &LinkNormalization,
    ctx_lexeme: Option<(Term, Lang)>,
    ctx_node: NodeRef,
    ctx_is_source: bool,
) -> Vec<Relation> {
    let targets = resolver.resolve_targets(&normalization.target, ctx_lexeme);
    targets
        .into_iter()
        .map(|target_node| {
            let mut relation = oriented_relation(ctx_node, target_node, normalization.relation_type, ctx_is_source);
            if let Some(text) = &normalization.text {
                relation.attrs.text = Some(text.clone());
            }
            relation.attrs.uncertain = normalization.uncertain;
            relation
        })
        .collect()
}

fn oriented_relation(ctx_node: NodeRef, other: NodeRef, r#type: RelationType, ctx_is_source: bool) -> Relation {
    let attrs = RelationAttributes::new(r#type);
    if ctx_is_source {
        Relation::new(ctx_node, other, attrs)
    } else {
        Relation::new(other, ctx_node, attrs)
    }
}

fn top_level_templates(spans: &[Span]) -> impl Iterator<Item = &Span> {
    spans.iter().filter(|s| s.kind == SpanKind::Template)
}

/// Every non-nested template in the section; context lexeme is the source
/// unless the section itself is an Etymology section.
pub fn baseline_extractor(
    resolver: &mut NodeResolver,
    handler: &TemplateHandler,
    spans: &[Span],
    ctx_lexeme: Option<(Term, Lang)>,
    ctx_node: NodeRef,
    is_etymology_section: bool,
) -> Vec<Relation> {
    let ctx_is_source = !is_etymology_section;
    top_level_templates(spans)
        .flat_map(|span| {
            relate_to_context_lexeme(
                resolver,
                handler,
                TargetObj::Template(span),
                ctx_lexeme,
                ctx_node,
                ctx_is_source,
                RelationType::Related,
            )
        })
        .collect()
}

/// Related Terms / Derived Terms: templates and wikilinks are processed
/// identically, context lexeme always the source.
pub fn link_section_extractor(
    resolver: &mut NodeResolver,
    handler: &TemplateHandler,
    spans: &[Span],
    ctx_lexeme: Option<(Term, Lang)>,
    ctx_node: NodeRef,
) -> Vec<Relation> {
    spans
        .iter()
        .filter(|s| s.kind == SpanKind::Template || s.kind == SpanKind::WikiLink)
        .flat_map(|span| {
            let target_obj = match span.kind {
                SpanKind::WikiLink => TargetObj::Link(span.name.as_deref().unwrap_or_default()),
                _ => TargetObj::Template(span),
            };
            relate_to_context_lexeme(resolver, handler, target_obj, ctx_lexeme, ctx_node, true, RelationType::Related)
        })
        .collect()
}

/// One item of a Descendants section's nested list: its own templates (if
/// any) and any sublists nested directly under it. The Descendants
/// extractor consumes this shape rather than a raw `Span` tree, since the
/// tree-descendants walk (spec §4.F) only cares about an item's own
/// templates and its sub-items, not wikitext line/bullet bookkeeping.
pub struct ListItem {
    pub templates: Vec<Span>,
    pub sublists: Vec<Vec<ListItem>>,
}

/// Converts the `SpanKind::List` spans in `spans` into `ListItem`s. Each
/// `List`-kind span is one list item: its non-`List` children are its own
/// templates/links, and its `List`-kind children are the sub-items of the
/// one sublist nested directly under it.
pub fn list_items_from_spans(spans: &[Span]) -> Vec<ListItem> {
    spans
        .iter()
        .filter(|s| s.kind == SpanKind::List)
        .map(|item| {
            let templates = item.children.iter().filter(|c| c.kind != SpanKind::List).cloned().collect();
            let nested = list_items_from_spans(&item.children);
            let sublists = if nested.is_empty() { Vec::new() } else { vec![nested] };
            ListItem { templates, sublists }
        })
        .collect()
}

/// Walks nested lists, tracking a "tree descendants" sub-context: an item
/// with no template resets the sub-context to the outer one; an item whose
/// templates resolve to exactly one relation hands that relation's target
/// down as the sub-context for its own sublists.
pub fn descendants_section_extractor(
    resolver: &mut NodeResolver,
    handler: &TemplateHandler,
    section_level_templates: &[Span],
    items: &[ListItem],
    ctx_lexeme: Option<(Term, Lang)>,
    ctx_node: NodeRef,
) -> Vec<Relation> {
    let mut relations: Vec<Relation> = section_level_templates
        .iter()
        .flat_map(|span| {
            relate_to_context_lexeme(
                resolver,
                handler,
                TargetObj::Template(span),
                ctx_lexeme,
                ctx_node,
                true,
                RelationType::Related,
            )
        })
        .collect();
    walk_descendant_items(resolver, handler, items, ctx_lexeme, ctx_node, &mut relations);
    relations
}

fn walk_descendant_items(
    resolver: &mut NodeResolver,
    handler: &TemplateHandler,
    items: &[ListItem],
    outer_ctx_lexeme: Option<(Term, Lang)>,
    outer_ctx_node: NodeRef,
    relations: &mut Vec<Relation>,
) {
    for item in items {
        if item.templates.is_empty() {
            for sublist in &item.sublists {
                walk_descendant_items(resolver, handler, sublist, outer_ctx_lexeme, outer_ctx_node, relations);
            }
            continue;
        }
        let emitted: Vec<Relation> = item
            .templates
            .iter()
            .flat_map(|span| {
                relate_to_context_lexeme(
                    resolver,
                    handler,
                    TargetObj::Template(span),
                    outer_ctx_lexeme,
                    outer_ctx_node,
                    true,
                    RelationType::Related,
                )
            })
            .collect();
        let sub_ctx_node = if emitted.len() == 1 { emitted[0].tgt } else { outer_ctx_node };
        relations.extend(emitted);
        for sublist in &item.sublists {
            walk_descendant_items(resolver, handler, sublist, outer_ctx_lexeme, sub_ctx_node, relations);
        }
    }
}

/// Runs the Rule Engine over the section text, then stream-interprets the
/// resulting chain (spec §4.G "chain interpretation"): etymological chains
/// like "A from B from C" unpack into `A->B, B->C` by threading the prior
/// normalization's target forward as `last_origin_source`, the anchor for
/// the next one, reset at the end of the first sentence.
pub fn etymology_section_extractor(
    resolver: &mut NodeResolver,
    handler: &TemplateHandler,
    text: &str,
    spans: &[Span],
    known_languages: &std::collections::HashSet<String>,
    xy_forms: &[String],
    ctx_lexeme: Option<(Term, Lang)>,
    ctx_node: NodeRef,
    only_in_from_chain: bool,
) -> Vec<Relation> {
    let chain = run_rule_engine(text, spans, known_languages, xy_forms, handler);

    let mut relations = Vec::new();
    let mut last_origin_source: Option<NodeRef> = None;
    let mut from_chain_active = !only_in_from_chain;
    let mut first_sentence_active = true;

    for el in &chain {
        match el {
            ChainElement::Normalization(normalization) => {
                let chain_resolution_allowed = from_chain_active && first_sentence_active;
                let (src_node, src_lexeme) = match (chain_resolution_allowed, last_origin_source) {
                    (true, Some(origin)) => (origin, None),
                    _ => (ctx_node, ctx_lexeme),
                };
                let emitted = build_relations(resolver, normalization, src_lexeme, src_node, true);
                if emitted.len() == 1 && emitted[0].attrs.r#type.is_a(RelationType::Origin) {
                    last_origin_source = Some(emitted[0].tgt);
                }
                relations.extend(emitted);
            }
            ChainElement::Marker(Marker::Punct('.')) => {
                last_origin_source = None;
                first_sentence_active = false;
                from_chain_active = !only_in_from_chain;
            }
            ChainElement::Marker(Marker::From) => {
                from_chain_active = true;
            }
            _ => {}
        }
    }
    relations
}

/// Dispatches a parsed section to the appropriate extractor by the section
/// header's recognized kind. Any unrecognized header falls back to the
/// baseline extractor, oriented as a non-Etymology section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Etymology,
    RelatedTerms,
    DerivedTerms,
    Descendants,
    Other,
}

pub fn classify_section_header(header: &str) -> SectionKind {
    let lower = header.to_lowercase();
    if lower.starts_with("etymology") {
        SectionKind::Etymology
    } else if lower.starts_with("related term") {
        SectionKind::RelatedTerms
    } else if lower.starts_with("derived term") {
        SectionKind::DerivedTerms
    } else if lower.starts_with("descendant") {
        SectionKind::Descendants
    } else {
        SectionKind::Other
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use etymograph_core::{EntityStore, Lexicon, StringPool};

    use super::*;
    use crate::node_resolver::NodeResolver;
    use crate::template_handler::TemplateHandler;
    use crate::wikitext::fixtures::MiniWikitextParser;
    use crate::wikitext::WikitextParser;

    struct FakeMapper;
    impl etymograph_core::LanguageMapper for FakeMapper {
        fn contains(&self, code: &str) -> bool {
            matches!(code, "en" | "enm" | "la")
        }
        fn code2name(&self, code: &str) -> etymograph_core::LanguageMapperResult<String> {
            Ok(code.to_owned())
        }
        fn name2code(
            &self,
            name: &str,
            _allow_ambiguity: bool,
        ) -> etymograph_core::LanguageMapperResult<etymograph_core::NameResolution> {
            Ok(etymograph_core::NameResolution::One(name.to_owned()))
        }
        fn code2parent(&self, _code: &str) -> Option<String> {
            None
        }
        fn is_family(&self, _code: &str) -> bool {
            false
        }
        fn normalize(&self, term: &str, _code: Option<&str>) -> String {
            term.to_owned()
        }
        fn names(&self) -> &HashSet<String> {
            static NAMES: std::sync::OnceLock<HashSet<String>> = std::sync::OnceLock::new();
            NAMES.get_or_init(HashSet::new)
        }
    }

    fn setup() -> (StringPool, Lexicon, EntityStore, TemplateHandler) {
        (StringPool::new(), Lexicon::new(), EntityStore::new(), TemplateHandler::new())
    }

    #[test]
    fn baseline_extractor_orients_by_section_kind() {
        let (mut pool, mut lexicon, mut entities, handler) = setup();
        let mapper = FakeMapper;
        let mut resolver = NodeResolver::new(&mut pool, &mut lexicon, &mut entities, &mapper, None);

        let parser = MiniWikitextParser;
        let spans = parser.parse("{{inh|en|enm|cat}}");
        let ctx_node = resolver.resolve_section("cat", "en");

        let relations = baseline_extractor(&mut resolver, &handler, &spans, None, ctx_node, false);
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].src, ctx_node);
    }

    #[test]
    fn etymology_extractor_threads_from_chain() {
        let (mut pool, mut lexicon, mut entities, handler) = setup();
        let mapper = FakeMapper;
        let mut resolver = NodeResolver::new(&mut pool, &mut lexicon, &mut entities, &mapper, None);
        let ctx_node = resolver.resolve_section("catte", "enm");

        let text = "From Latin cattus.";
        let parser = MiniWikitextParser;
        let spans = parser.parse(text);
        let known_languages: HashSet<String> = ["Latin".to_owned()].into_iter().collect();
        let xy_forms: Vec<String> = Vec::new();

        let relations = etymology_section_extractor(
            &mut resolver,
            &handler,
            text,
            &spans,
            &known_languages,
            &xy_forms,
            None,
            ctx_node,
            false,
        );
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].attrs.r#type, RelationType::Origin);
    }

    #[test]
    fn descendants_extractor_chains_tree_descendants() {
        let (mut pool, mut lexicon, mut entities, handler) = setup();
        let mapper = FakeMapper;
        let mut resolver = NodeResolver::new(&mut pool, &mut lexicon, &mut entities, &mapper, None);
        let ctx_node = resolver.resolve_section("cattus", "la");

        let parser = MiniWikitextParser;
        let child_spans = parser.parse("{{desc|en|cat}}");
        let grandchild_spans = parser.parse("{{desc|enm|cat}}");

        let items = vec![ListItem {
            templates: child_spans,
            sublists: vec![vec![ListItem { templates: grandchild_spans, sublists: Vec::new() }]],
        }];

        let relations =
            descendants_section_extractor(&mut resolver, &handler, &[], &items, None, ctx_node);
        assert_eq!(relations.len(), 2);
    }

    #[test]
    fn list_items_from_spans_builds_one_sublist_per_nesting_level() {
        let mut template = Span::new(SpanKind::Template, 0..1);
        template.name = Some("desc".to_owned());

        let mut grandchild_template = Span::new(SpanKind::Template, 2..3);
        grandchild_template.name = Some("desc".to_owned());
        let mut grandchild = Span::new(SpanKind::List, 2..3);
        grandchild.children = vec![grandchild_template];

        let mut item = Span::new(SpanKind::List, 0..3);
        item.children = vec![template, grandchild];

        let items = list_items_from_spans(&[item]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].templates.len(), 1);
        assert_eq!(items[0].sublists.len(), 1);
        assert_eq!(items[0].sublists[0].len(), 1);
        assert!(items[0].sublists[0][0].sublists.is_empty());
    }

    #[test]
    fn classify_section_header_recognizes_known_kinds() {
        assert_eq!(classify_section_header("Etymology 2"), SectionKind::Etymology);
        assert_eq!(classify_section_header("Related terms"), SectionKind::RelatedTerms);
        assert_eq!(classify_section_header("Derived terms"), SectionKind::DerivedTerms);
        assert_eq!(classify_section_header("Descendants"), SectionKind::Descendants);
        assert_eq!(classify_section_header("Synonyms"), SectionKind::Other);
    }

}
