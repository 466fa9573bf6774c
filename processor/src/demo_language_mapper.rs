//! A small, hardcoded `LanguageMapper` implementation (spec §2.1 Component
//! M: "test doubles in this crate"). A real deployment swaps this for a
//! mapper backed by a full language/family database; this one only knows
//! enough languages to drive the binary's demo run.

use std::collections::HashSet;

use etymograph_core::{LanguageMapper, LanguageMapperError, LanguageMapperResult, NameResolution};
use lazy_static::lazy_static;

struct LanguageEntry {
    code: &'static str,
    name: &'static str,
    parent: Option<&'static str>,
    family: bool,
}

const LANGUAGES: &[LanguageEntry] = &[
    LanguageEntry { code: "en", name: "English", parent: Some("enm"), family: false },
    LanguageEntry { code: "enm", name: "Middle English", parent: Some("ang"), family: false },
    LanguageEntry { code: "ang", name: "Old English", parent: Some("gem-pro"), family: false },
    LanguageEntry { code: "fr", name: "French", parent: Some("frm"), family: false },
    LanguageEntry { code: "frm", name: "Middle French", parent: Some("fro"), family: false },
    LanguageEntry { code: "fro", name: "Old French", parent: Some("la"), family: false },
    LanguageEntry { code: "la", name: "Latin", parent: Some("itc-pro"), family: false },
    LanguageEntry { code: "grc", name: "Ancient Greek", parent: None, family: false },
    LanguageEntry { code: "gem-pro", name: "Proto-Germanic", parent: None, family: true },
    LanguageEntry { code: "itc-pro", name: "Proto-Italic", parent: None, family: true },
];

lazy_static! {
    static ref NAMES: HashSet<String> = LANGUAGES.iter().map(|l| l.name.to_owned()).collect();
}

pub struct DemoLanguageMapper;

impl DemoLanguageMapper {
    fn entry(&self, code: &str) -> Option<&'static LanguageEntry> {
        LANGUAGES.iter().find(|l| l.code == code)
    }
}

impl LanguageMapper for DemoLanguageMapper {
    fn contains(&self, code: &str) -> bool {
        self.entry(code).is_some()
    }

    fn code2name(&self, code: &str) -> LanguageMapperResult<String> {
        self.entry(code)
            .map(|l| l.name.to_owned())
            .ok_or_else(|| LanguageMapperError::UnknownLanguageCode(code.to_owned()))
    }

    fn name2code(&self, name: &str, _allow_ambiguity: bool) -> LanguageMapperResult<NameResolution> {
        LANGUAGES
            .iter()
            .find(|l| l.name == name)
            .map(|l| NameResolution::One(l.code.to_owned()))
            .ok_or_else(|| LanguageMapperError::UnknownLanguageCode(name.to_owned()))
    }

    fn code2parent(&self, code: &str) -> Option<String> {
        self.entry(code).and_then(|l| l.parent).map(str::to_owned)
    }

    fn is_family(&self, code: &str) -> bool {
        self.entry(code).is_some_and(|l| l.family)
    }

    fn normalize(&self, term: &str, _code: Option<&str>) -> String {
        term.trim().to_owned()
    }

    fn names(&self) -> &HashSet<String> {
        &NAMES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_codes_and_parents() {
        let mapper = DemoLanguageMapper;
        assert!(mapper.contains("enm"));
        assert_eq!(mapper.code2name("enm").unwrap(), "Middle English");
        assert_eq!(mapper.code2parent("enm"), Some("ang".to_owned()));
        assert!(!mapper.is_family("enm"));
        assert!(mapper.is_family("gem-pro"));
    }

    #[test]
    fn unknown_code_is_an_error() {
        let mapper = DemoLanguageMapper;
        assert!(mapper.code2name("xx").is_err());
    }
}
