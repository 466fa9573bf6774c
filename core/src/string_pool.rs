//! Interned string storage for terms and language codes, ported from the
//! pooling idiom used throughout this codebase's earlier generations.

use serde::{Deserialize, Serialize};
use string_interner::{
    backend::StringBackend, symbol::SymbolU32, StringInterner, Symbol as SymbolTrait,
};

#[derive(Hash, Eq, PartialEq, Debug, Copy, Clone)]
pub struct Symbol(SymbolU32);

impl SymbolTrait for Symbol {
    fn try_from_usize(index: usize) -> Option<Self> {
        let symbol_u32 = SymbolU32::try_from_usize(index)?;
        Some(Self(symbol_u32))
    }
    fn to_usize(self) -> usize {
        self.0.to_usize()
    }
}

impl Serialize for Symbol {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_usize().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = usize::deserialize(deserializer)?;
        Ok(Self::try_from_usize(s).expect("a Symbol converted to usize for serialize"))
    }
}

#[derive(Default, Serialize, Deserialize)]
pub struct StringPool {
    pool: StringInterner<StringBackend<Symbol>>,
}

impl StringPool {
    pub fn new() -> Self {
        Self {
            pool: StringInterner::new(),
        }
    }

    pub fn resolve(&self, symbol: Symbol) -> &str {
        self.pool
            .resolve(symbol)
            .expect("resolve an interned string from one of this pool's own symbols")
    }

    pub fn get_or_intern(&mut self, s: &str) -> Symbol {
        self.pool.get_or_intern(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let mut pool = StringPool::new();
        let sym = pool.get_or_intern("proto-indo-european");
        let json = serde_json::to_string(&sym).unwrap();
        let back: Symbol = serde_json::from_str(&json).unwrap();
        assert_eq!(pool.resolve(sym), pool.resolve(back));
    }

    #[test]
    fn interns_equal_strings_to_equal_symbols() {
        let mut pool = StringPool::new();
        let a = pool.get_or_intern("en");
        let b = pool.get_or_intern("en");
        assert_eq!(a, b);
    }
}
