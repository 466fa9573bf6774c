use serde::{Deserialize, Serialize};

use crate::{
    lang::Lang,
    string_pool::{StringPool, Symbol},
};

#[derive(Hash, Eq, PartialEq, Debug, Copy, Clone, Serialize, Deserialize)]
pub struct Term(Symbol);

impl From<Symbol> for Term {
    fn from(symbol: Symbol) -> Self {
        Self(symbol)
    }
}

impl Term {
    pub fn new(string_pool: &mut StringPool, term: &str) -> Self {
        Self(string_pool.get_or_intern(term))
    }

    pub fn resolve(self, string_pool: &StringPool) -> &str {
        string_pool.resolve(self.0)
    }
}

/// `(term, language)`, the key under which the Lexicon (§4.C) buckets every
/// referenced lexeme.
#[derive(Hash, Eq, PartialEq, Debug, Copy, Clone, Serialize, Deserialize)]
pub struct LangTerm {
    pub lang: Lang,
    pub term: Term,
}

impl LangTerm {
    pub fn new(lang: Lang, term: Term) -> Self {
        Self { lang, term }
    }
}
