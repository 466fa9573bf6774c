//! The Entry Store external collaborator contract (spec §6): the shape of
//! one dump entry and a queryable/iterable source of them. The real store
//! is a document database fronting the dump; this crate only ever consumes
//! it through this trait.

/// One entry as retrieved from the external store. `sections[i]` is the
/// full header path of the i-th section (e.g. `["Etymology", "Etymology 1"]`)
/// and `texts[i]` is that section's wikitext body.
#[derive(Debug, Clone)]
pub struct Entry {
    pub title: String,
    pub namespace: String,
    pub language: String,
    pub sections: Vec<Vec<String>>,
    pub texts: Vec<String>,
    pub etym_count: u32,
    pub _i: u64,
}

impl Entry {
    pub fn section_text(&self, header: &[String]) -> Option<&str> {
        self.sections
            .iter()
            .position(|path| path == header)
            .map(|i| self.texts[i].as_str())
    }
}

/// Consumed, not owned (spec §1, §6): a real implementation fronts a
/// document store keyed by title/namespace/language; this crate only
/// iterates over what it returns.
pub trait EntryStore {
    fn entries(&self) -> Box<dyn Iterator<Item = &Entry> + '_>;
}

/// An in-memory stand-in sufficient to drive this crate's own tests and the
/// binary entrypoint's demo.
pub struct VecEntryStore {
    entries: Vec<Entry>,
}

impl VecEntryStore {
    pub fn new(entries: Vec<Entry>) -> Self {
        VecEntryStore { entries }
    }
}

impl EntryStore for VecEntryStore {
    fn entries(&self) -> Box<dyn Iterator<Item = &Entry> + '_> {
        Box::new(self.entries.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> Entry {
        Entry {
            title: "cat".to_owned(),
            namespace: "".to_owned(),
            language: "en".to_owned(),
            sections: vec![vec!["Etymology".to_owned()], vec!["Noun".to_owned()]],
            texts: vec!["From {{inh|en|enm|cat}}.".to_owned(), "A feline.".to_owned()],
            etym_count: 1,
            _i: 0,
        }
    }

    #[test]
    fn section_text_looks_up_by_header_path() {
        let entry = sample_entry();
        assert_eq!(entry.section_text(&["Etymology".to_owned()]), Some("From {{inh|en|enm|cat}}."));
        assert_eq!(entry.section_text(&["Pronunciation".to_owned()]), None);
    }

    #[test]
    fn vec_entry_store_iterates_in_order() {
        let store = VecEntryStore::new(vec![sample_entry(), sample_entry()]);
        assert_eq!(store.entries().count(), 2);
    }
}
