//! The Node sum type (spec §3): every referent a relation can point at.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    lang::Lang,
    langterm::Term,
    string_pool::StringPool,
};

pub type SenseIdx = u32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PronunciationKind {
    Plain,
    Phonetic,
    Phonemic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pronunciation {
    pub ipa: String,
    pub accent: Option<String>,
    pub kind: PronunciationKind,
}

/// One word-sense definition, with enough attribute structure for the Node
/// Resolver's sense-id/qualifier/POS disambiguation paths (§4.E, §3.1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Gloss {
    pub pos: Option<String>,
    pub text: String,
    pub sense_id: Option<String>,
    pub labels: Vec<String>,
    pub links: Vec<String>,
    pub tags: Vec<String>,
}

impl Gloss {
    /// Builds a single gloss out of whatever subset of `{pos, t, id, q}`
    /// template parameters is present. Returns `None` if none are.
    pub fn from_template_data(
        pos: Option<&str>,
        t: Option<&str>,
        id: Option<&str>,
        q: Option<&str>,
    ) -> Option<Self> {
        if pos.is_none() && t.is_none() && id.is_none() && q.is_none() {
            return None;
        }
        Some(Gloss {
            pos: pos.map(str::to_owned),
            text: t.unwrap_or_default().to_owned(),
            sense_id: id.map(str::to_owned),
            labels: q.map(|q| vec![q.to_owned()]).unwrap_or_default(),
            links: Vec::new(),
            tags: Vec::new(),
        })
    }
}

/// Identity of a lexeme-shaped node: `(term, language, sense_idx)`. Two
/// `LexemeBase` values are equal iff this triple matches.
pub trait LexemeBase {
    fn term(&self) -> Term;
    fn lang(&self) -> Lang;
    fn sense_idx(&self) -> SenseIdx;

    fn lexeme_id(&self) -> (Term, Lang, SenseIdx) {
        (self.term(), self.lang(), self.sense_idx())
    }

    fn describe(&self, pool: &StringPool) -> String {
        format!(
            "{}:{}[{}]",
            self.lang().resolve(pool),
            self.term().resolve(pool),
            self.sense_idx()
        )
    }
}

/// Placeholder for an entry known (from the external index) to have exactly
/// one sense. Cheap: carries no gloss/pronunciation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleMeaningStub {
    pub term: Term,
    pub lang: Lang,
}

impl LexemeBase for SingleMeaningStub {
    fn term(&self) -> Term {
        self.term
    }
    fn lang(&self) -> Lang {
        self.lang
    }
    fn sense_idx(&self) -> SenseIdx {
        0
    }
}

/// An entry with multiple senses or rich attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryLexeme {
    pub term: Term,
    pub lang: Lang,
    pub sense_idx: SenseIdx,
    pub glosses: Vec<Gloss>,
    pub pronunciations: Vec<Pronunciation>,
    pub etymology_text: Option<String>,
    pub etymid: Option<String>,
}

impl LexemeBase for EntryLexeme {
    fn term(&self) -> Term {
        self.term
    }
    fn lang(&self) -> Lang {
        self.lang
    }
    fn sense_idx(&self) -> SenseIdx {
        self.sense_idx
    }
}

/// Referenced from another entry, but with no entry of its own. Accumulates
/// glosses only by augmentation (§4.E `_merge_no_entry_lexeme`), never by
/// replacement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoEntryLexeme {
    pub term: Term,
    pub lang: Lang,
    pub sense_idx: SenseIdx,
    pub glosses: Vec<Gloss>,
}

impl LexemeBase for NoEntryLexeme {
    fn term(&self) -> Term {
        self.term
    }
    fn lang(&self) -> Lang {
        self.lang
    }
    fn sense_idx(&self) -> SenseIdx {
        self.sense_idx
    }
}

impl NoEntryLexeme {
    /// Appends a gloss built from template data, if any of its fields are
    /// present; a no-op otherwise. Never mutates existing glosses.
    pub fn augment_from_template_data(
        &mut self,
        pos: Option<&str>,
        t: Option<&str>,
        id: Option<&str>,
        q: Option<&str>,
    ) {
        if let Some(gloss) = Gloss::from_template_data(pos, t, id, q) {
            self.glosses.push(gloss);
        }
    }
}

/// A non-lexeme subject, e.g. the person in a `named-after` relation.
/// Identity is computed from currently-known attributes, matching the
/// source material's acknowledgment that incomplete information can yield
/// different ids for what is conceptually the same entity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub occupation: Option<String>,
    pub nationality: Option<String>,
    pub born: Option<String>,
    pub died: Option<String>,
    pub wplink: Option<String>,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Entity {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn from_template_data(fields: &HashMap<&str, String>) -> Self {
        Entity {
            name: fields.get("name").cloned().unwrap_or_default(),
            occupation: fields.get("occ").cloned(),
            nationality: fields.get("nat").cloned(),
            born: fields.get("born").cloned(),
            died: fields.get("died").cloned(),
            wplink: fields.get("wplink").cloned(),
        }
    }

    /// A stable-enough id for graph bookkeeping. Not a true content hash
    /// contract: two entities with different known subsets of attributes
    /// but the same underlying referent may legitimately get different ids
    /// until merged.
    pub fn id(&self) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let mut hasher = DefaultHasher::new();
        self.nationality.hash(&mut hasher);
        self.born.hash(&mut hasher);
        self.died.hash(&mut hasher);
        self.wplink.hash(&mut hasher);
        format!("{}{}", self.name, hasher.finish())
    }
}

/// A referent whose identity cannot be determined. Still a stable node: two
/// `Phantom`s are equal only if they share the same allocated id.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Phantom(pub u64);

pub type LexemeIdx = u32;
pub type EntityIdx = u32;

/// A cheap, `Copy` handle identifying any node without borrowing it:
/// lexemes and entities are indices into their owning store's arena,
/// phantoms carry their id inline. This is what the Reduced Relation Store
/// and the Rule Engine's chain elements actually move around; the full
/// `Node` data is fetched from the owning `Lexicon`/`EntityStore` only when
/// needed.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeRef {
    Lexeme(LexemeIdx),
    Entity(EntityIdx),
    Phantom(u64),
}

/// The Node sum type (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Node {
    SingleMeaningStub(SingleMeaningStub),
    EntryLexeme(EntryLexeme),
    NoEntryLexeme(NoEntryLexeme),
    Entity(Entity),
    Phantom(Phantom),
}

impl Node {
    pub fn as_lexeme_base(&self) -> Option<&dyn LexemeBase> {
        match self {
            Node::SingleMeaningStub(s) => Some(s),
            Node::EntryLexeme(e) => Some(e),
            Node::NoEntryLexeme(n) => Some(n),
            Node::Entity(_) | Node::Phantom(_) => None,
        }
    }

    pub fn glosses(&self) -> &[Gloss] {
        match self {
            Node::EntryLexeme(e) => &e.glosses,
            Node::NoEntryLexeme(n) => &n.glosses,
            _ => &[],
        }
    }
}
