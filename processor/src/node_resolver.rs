//! The Node Resolver (spec §4.E): turns a template's or wikilink's target
//! fields into a concrete `NodeRef`, delegating sense disambiguation to the
//! Lexicon and, when several homonyms remain, to the Gloss Matcher.

use std::collections::HashMap;

use etymograph_core::{
    Entity, EntityStore, Gloss, GlossMatcher, Lang, LanguageMapper, Lexicon, Node,
    NodeRef, StringPool, Term,
};

use crate::template_handler::{LinkTarget, TargetSpec};

pub trait NodeResolverListener {
    fn on_event(&mut self, _event: NodeResolverEvent) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeResolverEvent {
    EtymidMatch,
    GlossIdMatch,
    SingleCandidateShortcut,
    SectionPathResolution,
    UniquePosMatch,
    GlossMatcherSelection,
    QualifierLabelMatch,
    Fallback,
}

pub struct NoopListener;
impl NodeResolverListener for NoopListener {}

pub struct NodeResolver<'a> {
    pool: &'a mut StringPool,
    lexicon: &'a mut Lexicon,
    entities: &'a mut EntityStore,
    languages: &'a dyn LanguageMapper,
    gloss_matcher: Option<&'a dyn GlossMatcher>,
    listener: Box<dyn NodeResolverListener>,
    next_phantom: u64,
}

impl<'a> NodeResolver<'a> {
    pub fn new(
        pool: &'a mut StringPool,
        lexicon: &'a mut Lexicon,
        entities: &'a mut EntityStore,
        languages: &'a dyn LanguageMapper,
        gloss_matcher: Option<&'a dyn GlossMatcher>,
    ) -> Self {
        NodeResolver {
            pool,
            lexicon,
            entities,
            languages,
            gloss_matcher,
            listener: Box::new(NoopListener),
            next_phantom: 0,
        }
    }

    pub fn with_listener(mut self, listener: Box<dyn NodeResolverListener>) -> Self {
        self.listener = listener;
        self
    }

    /// A section header or wikilink anchor with no template parameters
    /// beyond `term`/`language`, used to resolve the context lexeme of a
    /// Related/Derived Terms or Descendants section (§4.F).
    pub fn resolve_section(&mut self, term: &str, lang_code: &str) -> NodeRef {
        self.listener.on_event(NodeResolverEvent::SectionPathResolution);
        let code = self.languages.code2name(lang_code).is_ok();
        let normalized = self.languages.normalize(term, code.then_some(lang_code));
        let lang = Lang::new(self.pool, lang_code);
        let t = Term::new(self.pool, &normalized);
        self.identify_lexeme(t, lang, &LinkTarget::new())
    }

    /// Resolves one target dict from a `LinkNormalization` to a `NodeRef`,
    /// falling back to `ctx_lexeme`'s language when the target names no
    /// language of its own (spec §4.E step 2).
    pub fn resolve_template(
        &mut self,
        target: &LinkTarget,
        ctx_lexeme: Option<(Term, Lang)>,
    ) -> NodeRef {
        if let Some(name) = target.get("name") {
            let fields: HashMap<&str, String> =
                target.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
            let entity = Entity::from_template_data(&fields);
            return self.entities.identify(name, Some(entity));
        }

        let Some(term_str) = target.get("term") else {
            return NodeRef::Phantom(self.fresh_phantom_id());
        };

        let lang = match target.get("language") {
            Some(code) => Lang::new(self.pool, code),
            None => match ctx_lexeme {
                Some((_, lang)) => lang,
                None => return NodeRef::Phantom(self.fresh_phantom_id()),
            },
        };
        let lang_code = lang.resolve(self.pool).to_owned();
        let normalized = self.languages.normalize(term_str, Some(&lang_code));
        let term = Term::new(self.pool, &normalized);
        self.identify_lexeme(term, lang, target)
    }

    pub fn resolve_targets(
        &mut self,
        spec: &TargetSpec,
        ctx_lexeme: Option<(Term, Lang)>,
    ) -> Vec<NodeRef> {
        match spec {
            TargetSpec::One(t) => vec![self.resolve_template(t, ctx_lexeme)],
            TargetSpec::Many(ts) => ts.iter().map(|t| self.resolve_template(t, ctx_lexeme)).collect(),
            TargetSpec::NoTarget => vec![NodeRef::Phantom(self.fresh_phantom_id())],
        }
    }

    /// Resolves a bare wikilink target (`[[target|display]]`, already split
    /// by the Wikitext Parser). Category/File/Image namespace links and
    /// Wikipedia cross-references name no lexeme and are skipped.
    pub fn resolve_link(&mut self, link_target: &str, ctx_lexeme: Option<(Term, Lang)>) -> Option<NodeRef> {
        let trimmed = link_target.trim();
        for ns in ["Category:", "File:", "Image:", "w:", "wikipedia:"] {
            if trimmed.starts_with(ns) {
                return None;
            }
        }
        let mut target = LinkTarget::new();
        if let Some((lang_code, term)) = trimmed.split_once(':') {
            if self.languages.contains(lang_code) {
                target.insert("language".to_owned(), lang_code.to_owned());
                target.insert("term".to_owned(), term.to_owned());
                return Some(self.resolve_template(&target, ctx_lexeme));
            }
        }
        target.insert("term".to_owned(), trimmed.to_owned());
        Some(self.resolve_template(&target, ctx_lexeme))
    }

    /// The disambiguation cascade of §4.E.1: Lexicon lookup, `NoEntryLexeme`
    /// creation/augmentation, then (if several homonyms remain) etymid,
    /// gloss-id, unique-POS, Gloss Matcher, and qualifier-label matches, in
    /// that order, falling back to the first candidate.
    fn identify_lexeme(&mut self, term: Term, lang: Lang, target: &LinkTarget) -> NodeRef {
        let candidates = self.lexicon.get(term, lang, None);

        if candidates.is_empty() {
            let r = self.lexicon.add_no_entry(term, lang);
            if let NodeRef::Lexeme(idx) = r {
                self.lexicon.no_entry_mut(idx).augment_from_template_data(
                    target.get("pos").map(String::as_str),
                    target.get("t").map(String::as_str),
                    target.get("id").map(String::as_str),
                    target.get("q").map(String::as_str),
                );
            }
            return r;
        }

        if candidates.len() == 1 {
            self.listener.on_event(NodeResolverEvent::SingleCandidateShortcut);
            if let NodeRef::Lexeme(idx) = candidates[0] {
                if let Node::NoEntryLexeme(_) = self.lexicon.node(idx) {
                    self.lexicon.no_entry_mut(idx).augment_from_template_data(
                        target.get("pos").map(String::as_str),
                        target.get("t").map(String::as_str),
                        target.get("id").map(String::as_str),
                        target.get("q").map(String::as_str),
                    );
                }
            }
            return candidates[0];
        }

        if let Some(id) = target.get("id") {
            if let Some(found) = candidates.iter().find(|&&r| self.etymid_matches(r, id)) {
                self.listener.on_event(NodeResolverEvent::EtymidMatch);
                return *found;
            }
            if let Some(found) = candidates
                .iter()
                .find(|&&r| self.gloss_sense_id_matches(r, id))
            {
                self.listener.on_event(NodeResolverEvent::GlossIdMatch);
                return *found;
            }
        }

        let pos = crate::template_handler::determine_pos(
            target.get("pos").map(String::as_str),
            target.get("t").map(String::as_str),
        );
        if let Some(pos) = &pos {
            let matching: Vec<NodeRef> = candidates
                .iter()
                .copied()
                .filter(|&r| self.node_pos(r).as_deref() == Some(pos.as_str()))
                .collect();
            if matching.len() == 1 {
                self.listener.on_event(NodeResolverEvent::UniquePosMatch);
                return matching[0];
            }
        }

        if let (Some(matcher), Some(gloss)) = (self.gloss_matcher, target.get("t")) {
            let defs: Vec<String> = candidates.iter().map(|&r| self.node_def(r)).collect();
            if let Some(i) = matcher.select(gloss, &defs) {
                self.listener.on_event(NodeResolverEvent::GlossMatcherSelection);
                return candidates[i];
            }
        }

        if let Some(q) = target.get("q") {
            if let Some(found) = candidates.iter().find(|&&r| self.node_has_label(r, q)) {
                self.listener.on_event(NodeResolverEvent::QualifierLabelMatch);
                return *found;
            }
        }

        self.listener.on_event(NodeResolverEvent::Fallback);
        candidates[0]
    }

    fn etymid_matches(&self, r: NodeRef, id: &str) -> bool {
        if let NodeRef::Lexeme(idx) = r {
            if let Node::EntryLexeme(e) = self.lexicon.node(idx) {
                return e.etymid.as_deref() == Some(id);
            }
        }
        false
    }

    fn gloss_sense_id_matches(&self, r: NodeRef, id: &str) -> bool {
        self.glosses_of(r).iter().any(|g| g.sense_id.as_deref() == Some(id))
    }

    fn node_pos(&self, r: NodeRef) -> Option<String> {
        self.glosses_of(r).first().and_then(|g| g.pos.clone())
    }

    fn node_def(&self, r: NodeRef) -> String {
        self.glosses_of(r)
            .first()
            .map(|g| g.text.clone())
            .unwrap_or_default()
    }

    fn node_has_label(&self, r: NodeRef, label: &str) -> bool {
        self.glosses_of(r).iter().any(|g| g.labels.iter().any(|l| l == label))
    }

    fn glosses_of(&self, r: NodeRef) -> &[Gloss] {
        if let NodeRef::Lexeme(idx) = r {
            return self.lexicon.node(idx).glosses();
        }
        &[]
    }

    fn fresh_phantom_id(&mut self) -> u64 {
        let id = self.next_phantom;
        self.next_phantom += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use etymograph_core::{AllFeaturesGlossMatcher, EntryLexeme, GlossMatcherModel};
    use std::collections::HashSet;

    struct FakeMapper;
    impl LanguageMapper for FakeMapper {
        fn contains(&self, code: &str) -> bool {
            matches!(code, "en" | "enm" | "fr")
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

    #[test]
    fn new_term_creates_no_entry_lexeme() {
        let mut pool = StringPool::new();
        let mut lexicon = Lexicon::new();
        let mut entities = EntityStore::new();
        let mapper = FakeMapper;
        let mut resolver = NodeResolver::new(&mut pool, &mut lexicon, &mut entities, &mapper, None);
        let mut target = LinkTarget::new();
        target.insert("term".to_owned(), "cat".to_owned());
        target.insert("language".to_owned(), "en".to_owned());
        let r = resolver.resolve_template(&target, None);
        assert!(matches!(r, NodeRef::Lexeme(_)));
    }

    #[test]
    fn named_target_delegates_to_entity_store() {
        let mut pool = StringPool::new();
        let mut lexicon = Lexicon::new();
        let mut entities = EntityStore::new();
        let mapper = FakeMapper;
        let mut resolver = NodeResolver::new(&mut pool, &mut lexicon, &mut entities, &mapper, None);
        let mut target = LinkTarget::new();
        target.insert("name".to_owned(), "Alan Turing".to_owned());
        let r = resolver.resolve_template(&target, None);
        assert!(matches!(r, NodeRef::Entity(_)));
    }

    #[test]
    fn unique_pos_disambiguates_multi_meaning_slot() {
        let mut pool = StringPool::new();
        let mut lexicon = Lexicon::new();
        let mut entities = EntityStore::new();
        let mapper = FakeMapper;
        let term = Term::new(&mut pool, "light");
        let lang = Lang::new(&mut pool, "en");
        lexicon.build_from_index([(term, lang, 2)]);
        lexicon
            .add_from_entry(
                term,
                lang,
                vec![
                    EntryLexeme {
                        term,
                        lang,
                        sense_idx: 0,
                        glosses: vec![Gloss {
                            pos: Some("noun".to_owned()),
                            text: "illumination".to_owned(),
                            sense_id: None,
                            labels: Vec::new(),
                            links: Vec::new(),
                            tags: Vec::new(),
                        }],
                        pronunciations: Vec::new(),
                        etymology_text: None,
                        etymid: None,
                    },
                    EntryLexeme {
                        term,
                        lang,
                        sense_idx: 1,
                        glosses: vec![Gloss {
                            pos: Some("adjective".to_owned()),
                            text: "not heavy".to_owned(),
                            sense_id: None,
                            labels: Vec::new(),
                            links: Vec::new(),
                            tags: Vec::new(),
                        }],
                        pronunciations: Vec::new(),
                        etymology_text: None,
                        etymid: None,
                    },
                ],
                &pool,
            )
            .unwrap();

        let mut resolver = NodeResolver::new(&mut pool, &mut lexicon, &mut entities, &mapper, None);
        let mut target = LinkTarget::new();
        target.insert("term".to_owned(), "light".to_owned());
        target.insert("language".to_owned(), "en".to_owned());
        target.insert("pos".to_owned(), "adjective".to_owned());
        let r = resolver.resolve_template(&target, None);
        if let NodeRef::Lexeme(idx) = r {
            assert_eq!(lexicon.node(idx).glosses()[0].text, "not heavy");
        } else {
            panic!("expected a lexeme ref");
        }
    }

    #[test]
    fn gloss_matcher_breaks_remaining_ties() {
        let model = gloss_matcher_model_for_test();
        let matcher = AllFeaturesGlossMatcher::new(model);

        let mut pool = StringPool::new();
        let mut lexicon = Lexicon::new();
        let mut entities = EntityStore::new();
        let mapper = FakeMapper;
        let term = Term::new(&mut pool, "bank");
        let lang = Lang::new(&mut pool, "en");
        lexicon.build_from_index([(term, lang, 2)]);
        lexicon
            .add_from_entry(
                term,
                lang,
                vec![
                    EntryLexeme {
                        term,
                        lang,
                        sense_idx: 0,
                        glosses: vec![Gloss {
                            pos: None,
                            text: "a financial institution".to_owned(),
                            sense_id: None,
                            labels: Vec::new(),
                            links: Vec::new(),
                            tags: Vec::new(),
                        }],
                        pronunciations: Vec::new(),
                        etymology_text: None,
                        etymid: None,
                    },
                    EntryLexeme {
                        term,
                        lang,
                        sense_idx: 1,
                        glosses: vec![Gloss {
                            pos: None,
                            text: "the side of a river".to_owned(),
                            sense_id: None,
                            labels: Vec::new(),
                            links: Vec::new(),
                            tags: Vec::new(),
                        }],
                        pronunciations: Vec::new(),
                        etymology_text: None,
                        etymid: None,
                    },
                ],
                &pool,
            )
            .unwrap();

        let mut resolver =
            NodeResolver::new(&mut pool, &mut lexicon, &mut entities, &mapper, Some(&matcher));
        let mut target = LinkTarget::new();
        target.insert("term".to_owned(), "bank".to_owned());
        target.insert("language".to_owned(), "en".to_owned());
        target.insert("t".to_owned(), "a financial institution".to_owned());
        let r = resolver.resolve_template(&target, None);
        if let NodeRef::Lexeme(idx) = r {
            assert_eq!(lexicon.node(idx).glosses()[0].text, "a financial institution");
        } else {
            panic!("expected a lexeme ref");
        }
    }

    fn gloss_matcher_model_for_test() -> GlossMatcherModel {
        // A minimal char/word-equality model: enough to separate an exact
        // gloss match from an unrelated one without a real sidecar file.
        serde_json::from_str(
            r#"{
                "feature_names": ["char_eq", "word_eq"],
                "weights": [5.0, 5.0],
                "intercept": 0.0,
                "scaler_mean": [0.0, 0.0],
                "scaler_scale": [1.0, 1.0]
            }"#,
        )
        .unwrap()
    }
}
