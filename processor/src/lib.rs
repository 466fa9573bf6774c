//! Pipeline from parsed wikitext sections to a reduced, typed etymology
//! relation graph (spec §1). The Relation Ontology, Lexicon, Entity Store,
//! and Reduced Relation Store live in `etymograph_core`; this crate covers
//! everything built on top of them: the Template Handler, the Node
//! Resolver, the Rule Engine, and the Section Extractors, plus the external
//! collaborator contracts (Entry Store, Wikitext Parser) and the binary
//! entrypoint's wiring.

pub mod chain;
pub mod config;
pub mod demo_language_mapper;
pub mod entry;
pub mod node_resolver;
pub mod section_extractor;
pub mod template_handler;
pub mod wikitext;

use std::collections::HashSet;

use etymograph_core::{EntityStore, Lang, LanguageMapper, LanguageTree, LexemeBase, Lexicon, Node, NodeRef, RelationStore, StringPool, Term};
use log::{debug, warn};

use crate::config::PipelineConfig;
use crate::entry::{Entry, EntryStore};
use crate::node_resolver::NodeResolver;
use crate::section_extractor::{
    baseline_extractor, classify_section_header, descendants_section_extractor, etymology_section_extractor,
    link_section_extractor, list_items_from_spans, SectionKind,
};
use crate::template_handler::TemplateHandler;
use crate::wikitext::{SpanKind, WikitextParser};

fn node_lang(lexicon: &Lexicon, node: NodeRef) -> Option<Lang> {
    match node {
        NodeRef::Lexeme(idx) => match lexicon.node(idx) {
            Node::SingleMeaningStub(s) => Some(s.lang()),
            Node::EntryLexeme(e) => Some(e.lang()),
            Node::NoEntryLexeme(n) => Some(n.lang()),
            Node::Entity(_) | Node::Phantom(_) => None,
        },
        NodeRef::Entity(_) | NodeRef::Phantom(_) => None,
    }
}

/// Runs the full pipeline (spec §2 data flow) over every entry the store
/// yields, returning the finalized reduced graph. `gloss_matcher` and
/// `known_languages`/`xy_forms` back the Node Resolver and Rule Engine
/// respectively; both are optional/empty-safe so a minimal configuration
/// still runs end to end. If `config.language_tree_path` is set, it backs
/// the historical-language swap at incremental `add` time (spec §4.H).
///
/// The tree is loaded here, into this function's own `StringPool`, rather
/// than accepted pre-built: `Lang` equality is a raw interner index, so a
/// tree built against any other pool instance would never match the
/// `Lang`s this function hands to the relation store.
pub fn run_pipeline(
    store: &dyn EntryStore,
    languages: &dyn LanguageMapper,
    parser: &dyn WikitextParser,
    gloss_matcher: Option<&dyn etymograph_core::GlossMatcher>,
    config: &PipelineConfig,
    xy_forms: &[String],
) -> etymograph_core::ReducedGraph {
    let mut pool = StringPool::new();
    let mut lexicon = Lexicon::new();
    let mut entities = EntityStore::new();

    let language_tree: Option<LanguageTree> = match &config.language_tree_path {
        Some(path) => match crate::config::load_language_tree(path, &mut pool) {
            Ok(tree) => Some(tree),
            Err(e) => {
                warn!("failed to load language tree at {}: {e}", path.display());
                None
            }
        },
        None => None,
    };
    let mut relation_store = RelationStore::new(language_tree);

    let handler = TemplateHandler::new();
    let known_languages: HashSet<String> = languages.names().clone();

    let entries: Box<dyn Iterator<Item = &Entry>> = match config.head {
        Some(n) => Box::new(store.entries().take(n)),
        None => Box::new(store.entries()),
    };

    for entry in entries {
        let lang_code = entry.language.as_str();
        if !languages.contains(lang_code) {
            warn!("unknown language code {lang_code:?} on entry {:?}", entry.title);
            continue;
        }
        let ctx_term = Term::new(&mut pool, &entry.title);
        let ctx_lang = Lang::new(&mut pool, lang_code);

        for (path, text) in entry.sections.iter().zip(entry.texts.iter()) {
            let Some(header) = path.last() else { continue };
            let kind = classify_section_header(header);
            let spans = parser.parse(text);

            let mut resolver = NodeResolver::new(&mut pool, &mut lexicon, &mut entities, languages, gloss_matcher);
            let ctx_node = resolver.resolve_section(&entry.title, lang_code);
            let ctx_lexeme = Some((ctx_term, ctx_lang));

            let relations = match kind {
                SectionKind::Etymology => etymology_section_extractor(
                    &mut resolver,
                    &handler,
                    text,
                    &spans,
                    &known_languages,
                    xy_forms,
                    ctx_lexeme,
                    ctx_node,
                    config.only_in_from_chain,
                ),
                SectionKind::RelatedTerms | SectionKind::DerivedTerms => {
                    link_section_extractor(&mut resolver, &handler, &spans, ctx_lexeme, ctx_node)
                }
                SectionKind::Descendants => {
                    let section_level: Vec<_> = spans.iter().filter(|s| s.kind != SpanKind::List).cloned().collect();
                    let items = list_items_from_spans(&spans);
                    descendants_section_extractor(&mut resolver, &handler, &section_level, &items, ctx_lexeme, ctx_node)
                }
                SectionKind::Other => baseline_extractor(&mut resolver, &handler, &spans, ctx_lexeme, ctx_node, false),
            };

            debug!("{} relation(s) from {:?} section {:?}", relations.len(), entry.title, header);
            for relation in relations {
                let langs = match (node_lang(&lexicon, relation.src), node_lang(&lexicon, relation.tgt)) {
                    (Some(src), Some(tgt)) => Some((src, tgt)),
                    _ => None,
                };
                if let Err(e) = relation_store.add(relation, langs) {
                    warn!("dropping relation: {e}");
                }
            }
        }
    }

    relation_store.finalize(true, true)
}
