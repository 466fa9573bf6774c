//! The Lexicon (spec §4.C): a dense index of every `(term, language,
//! sense_idx)` referenced by the dump, with single- vs multi-meaning fast
//! paths.

use std::collections::HashMap;

use crate::{
    error::{CoreError, CoreResult},
    lang::Lang,
    langterm::{LangTerm, Term},
    node::{EntryLexeme, LexemeBase, LexemeIdx, Node, NoEntryLexeme, NodeRef, SenseIdx, SingleMeaningStub},
    string_pool::StringPool,
};

#[derive(Default)]
pub struct Lexicon {
    arena: Vec<Node>,
    /// Grouped by term only: the common case holds one stub; cross-language
    /// homonyms (same term, several languages, all single-meaning) share a
    /// bucket.
    single_meanings: HashMap<Term, Vec<LexemeIdx>>,
    multi_meanings: HashMap<LangTerm, Vec<LexemeIdx>>,
    no_entries: HashMap<LangTerm, Vec<LexemeIdx>>,
}

impl Lexicon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, idx: LexemeIdx) -> &Node {
        &self.arena[idx as usize]
    }

    fn push(&mut self, node: Node) -> LexemeIdx {
        let idx = self.arena.len() as LexemeIdx;
        self.arena.push(node);
        idx
    }

    fn lang_of(&self, idx: LexemeIdx) -> Lang {
        match &self.arena[idx as usize] {
            Node::SingleMeaningStub(s) => s.lang,
            Node::EntryLexeme(e) => e.lang,
            Node::NoEntryLexeme(n) => n.lang,
            _ => unreachable!("lexicon arena only ever holds lexeme-shaped nodes"),
        }
    }

    fn sense_idx_of(&self, idx: LexemeIdx) -> SenseIdx {
        match &self.arena[idx as usize] {
            Node::SingleMeaningStub(s) => s.sense_idx(),
            Node::EntryLexeme(e) => e.sense_idx,
            Node::NoEntryLexeme(n) => n.sense_idx,
            _ => unreachable!("lexicon arena only ever holds lexeme-shaped nodes"),
        }
    }

    /// Populates `single_meanings` and reserves `multi_meanings` slots from
    /// an iterable of `(term, language, etym_count)`.
    pub fn build_from_index<I>(&mut self, index: I)
    where
        I: IntoIterator<Item = (Term, Lang, u32)>,
    {
        for (term, lang, etym_count) in index {
            if etym_count <= 1 {
                let idx = self.push(Node::SingleMeaningStub(SingleMeaningStub { term, lang }));
                self.single_meanings.entry(term).or_default().push(idx);
            } else {
                self.multi_meanings
                    .entry(LangTerm::new(lang, term))
                    .or_default();
            }
        }
    }

    /// Inserts parsed lexemes for a multi-meaning `(term, language)` slot.
    /// Fails if the slot was never reserved by `build_from_index` -- the
    /// index is the source of truth.
    pub fn add_from_entry(
        &mut self,
        term: Term,
        lang: Lang,
        lexemes: Vec<EntryLexeme>,
        pool: &StringPool,
    ) -> CoreResult<Vec<NodeRef>> {
        let key = LangTerm::new(lang, term);
        if !self.multi_meanings.contains_key(&key) {
            return Err(CoreError::UnknownLexiconSlot(format!(
                "{}:{}",
                lang.resolve(pool),
                term.resolve(pool)
            )));
        }
        let mut refs = Vec::with_capacity(lexemes.len());
        for lexeme in lexemes {
            let idx = self.push(Node::EntryLexeme(lexeme));
            self.multi_meanings.get_mut(&key).unwrap().push(idx);
            refs.push(NodeRef::Lexeme(idx));
        }
        Ok(refs)
    }

    /// Appends a `NoEntryLexeme`, never mutating existing entries.
    pub fn add_no_entry(&mut self, term: Term, lang: Lang) -> NodeRef {
        let key = LangTerm::new(lang, term);
        let sense_idx = self.no_entries.get(&key).map_or(0, |v| v.len() as SenseIdx);
        let idx = self.push(Node::NoEntryLexeme(NoEntryLexeme {
            term,
            lang,
            sense_idx,
            glosses: Vec::new(),
        }));
        self.no_entries.entry(key).or_default().push(idx);
        NodeRef::Lexeme(idx)
    }

    pub fn no_entry_mut(&mut self, idx: LexemeIdx) -> &mut NoEntryLexeme {
        match &mut self.arena[idx as usize] {
            Node::NoEntryLexeme(n) => n,
            _ => panic!("index did not refer to a NoEntryLexeme"),
        }
    }

    /// Searches single_meanings, then multi_meanings, then no_entries. When
    /// `sense_idx` is given for a multi-meaning slot, the candidate at that
    /// list position is preferred; on a mismatch (or an out-of-range
    /// index), the list is scanned for a lexeme whose stored `sense_idx`
    /// matches.
    pub fn get(&self, term: Term, lang: Lang, sense_idx: Option<SenseIdx>) -> Vec<NodeRef> {
        if let Some(bucket) = self.single_meanings.get(&term) {
            let matches: Vec<NodeRef> = bucket
                .iter()
                .filter(|&&idx| self.lang_of(idx) == lang)
                .map(|&idx| NodeRef::Lexeme(idx))
                .collect();
            if !matches.is_empty() {
                return matches;
            }
        }

        let key = LangTerm::new(lang, term);
        if let Some(list) = self.multi_meanings.get(&key) {
            if !list.is_empty() {
                if let Some(si) = sense_idx {
                    if let Some(&idx) = list.get(si as usize) {
                        if self.sense_idx_of(idx) == si {
                            return vec![NodeRef::Lexeme(idx)];
                        }
                    }
                    if let Some(&idx) = list.iter().find(|&&idx| self.sense_idx_of(idx) == si) {
                        return vec![NodeRef::Lexeme(idx)];
                    }
                    return Vec::new();
                }
                return list.iter().map(|&idx| NodeRef::Lexeme(idx)).collect();
            }
        }

        if let Some(list) = self.no_entries.get(&key) {
            if !list.is_empty() {
                return list.iter().map(|&idx| NodeRef::Lexeme(idx)).collect();
            }
        }

        Vec::new()
    }

    /// Whether a multi-meaning slot has been reserved for `(term, language)`.
    pub fn has_multi_meaning_slot(&self, term: Term, lang: Lang) -> bool {
        self.multi_meanings.contains_key(&LangTerm::new(lang, term))
    }

    /// Yields every lexeme exactly once.
    pub fn iter(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.single_meanings
            .values()
            .flatten()
            .chain(self.multi_meanings.values().flatten())
            .chain(self.no_entries.values().flatten())
            .map(|&idx| NodeRef::Lexeme(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Lexicon, StringPool, Term, Lang) {
        let mut pool = StringPool::new();
        let term = Term::new(&mut pool, "cat");
        let lang = Lang::new(&mut pool, "en");
        (Lexicon::new(), pool, term, lang)
    }

    #[test]
    fn single_meaning_fast_path() {
        let (mut lex, _pool, term, lang) = setup();
        lex.build_from_index([(term, lang, 1)]);
        let found = lex.get(term, lang, None);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn unknown_term_returns_empty() {
        let (lex, _pool, term, lang) = setup();
        assert!(lex.get(term, lang, None).is_empty());
    }

    #[test]
    fn add_from_entry_fails_without_reserved_slot() {
        let (mut lex, pool, term, lang) = setup();
        let lexeme = EntryLexeme {
            term,
            lang,
            sense_idx: 0,
            glosses: Vec::new(),
            pronunciations: Vec::new(),
            etymology_text: None,
            etymid: None,
        };
        assert!(lex.add_from_entry(term, lang, vec![lexeme], &pool).is_err());
    }

    #[test]
    fn add_from_entry_populates_multi_meaning_slot() {
        let (mut lex, pool, term, lang) = setup();
        lex.build_from_index([(term, lang, 2)]);
        let lexeme = EntryLexeme {
            term,
            lang,
            sense_idx: 0,
            glosses: Vec::new(),
            pronunciations: Vec::new(),
            etymology_text: None,
            etymid: None,
        };
        let refs = lex.add_from_entry(term, lang, vec![lexeme], &pool).unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(lex.get(term, lang, Some(0)).len(), 1);
    }

    #[test]
    fn add_no_entry_never_mutates_existing() {
        let (mut lex, _pool, term, lang) = setup();
        let r1 = lex.add_no_entry(term, lang);
        let r2 = lex.add_no_entry(term, lang);
        assert_ne!(r1, r2);
        assert_eq!(lex.get(term, lang, None).len(), 2);
    }

    #[test]
    fn iteration_yields_each_lexeme_once() {
        let (mut lex, _pool, term, lang) = setup();
        lex.build_from_index([(term, lang, 1)]);
        lex.add_no_entry(term, lang);
        assert_eq!(lex.iter().count(), 2);
    }
}
