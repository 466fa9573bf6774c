//! The `Language Mapper` external collaborator contract (spec §6). Only the
//! interface is owned by this crate; a real implementation backed by a full
//! language/family database is supplied by the host.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::string_pool::{StringPool, Symbol};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LanguageMapperError {
    #[error("unknown language code: {0}")]
    UnknownLanguageCode(String),
    #[error("ambiguous language name {name:?}: matches {codes:?}")]
    AmbiguousLanguageName { name: String, codes: Vec<String> },
}

pub type LanguageMapperResult<T> = Result<T, LanguageMapperError>;

/// A resolution of a language name to one or more codes, returned by
/// `name2code` when the caller allows ambiguity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameResolution {
    One(String),
    Many(Vec<String>),
}

/// Consumed, not owned: the real implementation knows the full set of
/// language/family codes, names, parents, and per-language normalization
/// rules (diacritic stripping, character substitution tables).
pub trait LanguageMapper {
    fn contains(&self, code: &str) -> bool;
    fn code2name(&self, code: &str) -> LanguageMapperResult<String>;
    fn name2code(&self, name: &str, allow_ambiguity: bool) -> LanguageMapperResult<NameResolution>;
    fn code2parent(&self, code: &str) -> Option<String>;
    fn is_family(&self, code: &str) -> bool;
    fn normalize(&self, term: &str, code: Option<&str>) -> String;
    fn names(&self) -> &HashSet<String>;
}

/// An interned language code. Equality/hash are by symbol, i.e. by the
/// underlying code string, never by address.
#[derive(Hash, Eq, PartialEq, Debug, Copy, Clone, Serialize, Deserialize)]
pub struct Lang(Symbol);

impl Lang {
    pub fn new(pool: &mut StringPool, code: &str) -> Self {
        Self(pool.get_or_intern(code))
    }

    pub fn resolve(self, pool: &StringPool) -> &str {
        pool.resolve(self.0)
    }
}
