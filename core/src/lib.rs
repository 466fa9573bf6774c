//! Core data model and reduction engine for the etymology graph: the Node
//! sum type, the Lexicon and Entity Store, the Relation Ontology, and the
//! Reduced Relation Store. Everything above this crate -- the wikitext
//! parser, the Template Handler, the Rule Engine, the Node Resolver -- is
//! built on top of these types but does not live here, so this crate stays
//! usable by any ingest front end, not just one tied to a specific dump
//! format.

pub mod entity_store;
pub mod error;
pub mod gloss_matcher;
pub mod lang;
pub mod language_tree;
pub mod langterm;
pub mod levenshtein;
pub mod lexicon;
pub mod node;
pub mod relation;
pub mod relation_store;
pub mod relation_type;
pub mod sequence_match;
pub mod string_pool;

pub use entity_store::EntityStore;
pub use error::{CoreError, CoreResult};
pub use gloss_matcher::{AllFeaturesGlossMatcher, GlossMatcher, GlossMatcherModel, NoFuzzyGlossMatcher};
pub use lang::{Lang, LanguageMapper, LanguageMapperError, LanguageMapperResult, NameResolution};
pub use language_tree::LanguageTree;
pub use langterm::{LangTerm, Term};
pub use lexicon::Lexicon;
pub use node::{Entity, EntryLexeme, LexemeBase, Node, NodeRef, NoEntryLexeme, SingleMeaningStub};
pub use relation::{DebugInfo, Relation, RelationAttributes, SubInfo, SubNodeInfo};
pub use relation_store::{ReducedGraph, ReductionEvent, ReductionListener, RelationStore};
pub use relation_type::RelationType;
pub use string_pool::{StringPool, Symbol};
