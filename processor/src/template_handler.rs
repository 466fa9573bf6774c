//! The Template Handler (spec §4.D): turns a parsed template invocation
//! into a structured `LinkNormalization`, using a registry of per-template
//! semantics built once at startup (§4.D.1).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use etymograph_core::RelationType;

use crate::wikitext::Span;

pub type TemplateParams = HashMap<String, String>;

/// A single target of a normalized link: a bag of named fields (`term`,
/// `language`, `alt`, `t`, `pos`, `id`, `q`, or `name`/`occ`/`nat`/`born`/
/// `died`/`wplink` for an eponym's person reference).
pub type LinkTarget = TemplateParams;

#[derive(Debug, Clone)]
pub enum TargetSpec {
    One(LinkTarget),
    Many(Vec<LinkTarget>),
    /// `NO_TARGET`: the template names a relation with no resolvable
    /// referent; the Node Resolver yields a fresh `Phantom` for it.
    NoTarget,
}

#[derive(Debug, Clone)]
pub struct LinkNormalization {
    pub relation_type: RelationType,
    pub text: Option<String>,
    pub uncertain: bool,
    pub target: TargetSpec,
    pub source_language: Option<String>,
}

/// The policy converting `(default_relation, parameters)` into a
/// `LinkNormalization` (spec §4.D).
#[derive(Debug, Clone)]
pub enum LinkSemantics {
    /// First `language` param labels the source; the rest label one target.
    TargetWithSourceLang,
    /// All parameters describe one target.
    AllTargetParameters,
    /// Indexed parameters (`term1`, `term2`, ...) describe multiple targets.
    MultipleTargets {
        with_target_language: bool,
        joiner: &'static str,
    },
    /// Relation type is upgraded by boolean flag params (`bor`, `lbor`,
    /// `cal`, `sl`, `der`, ...); `unc` sets uncertain.
    DescendantsSemantics,
    /// Ordered positional terms, all in one shared language.
    PlainMultiLinks,
    /// Sentinel target, no resolvable referent.
    UnknownTarget,
    /// Positional arguments concatenated with spaces as one Arabic term.
    ArabicRoot,
    /// `linkto` param overrides the term; the original term becomes `alt`.
    JapaneseLink,
}

#[derive(Debug, Clone)]
pub struct SpecificHandler {
    pub default_relation: Option<RelationType>,
    pub positional_params: Vec<&'static str>,
    pub renames: Vec<(&'static str, &'static str)>,
    pub whitelist: Option<Vec<&'static str>>,
    pub semantics: Option<LinkSemantics>,
    pub relation_in_text: Option<&'static str>,
    pub lang_in_text: bool,
}

impl SpecificHandler {
    fn new() -> Self {
        SpecificHandler {
            default_relation: None,
            positional_params: Vec::new(),
            renames: Vec::new(),
            whitelist: None,
            semantics: None,
            relation_in_text: None,
            lang_in_text: false,
        }
    }

    /// Folds a template's positional + named arguments into a canonical
    /// parameter bag: positional args are named via `positional_params`,
    /// synonym names are rewritten via `renames`, and anything outside an
    /// explicit whitelist is dropped.
    fn preprocess(&self, span: &Span) -> TemplateParams {
        let mut out = TemplateParams::new();
        for (key, value) in &span.params {
            let mut name = key.clone();
            if let Ok(idx) = key.parse::<usize>() {
                if let Some(&pname) = self.positional_params.get(idx - 1) {
                    name = pname.to_owned();
                }
            }
            if let Some((_, canon)) = self.renames.iter().find(|(syn, _)| *syn == name) {
                name = (*canon).to_owned();
            }
            if let Some(whitelist) = &self.whitelist {
                if !whitelist.contains(&name.as_str()) && !name.chars().all(|c| c.is_ascii_digit()) {
                    continue;
                }
            }
            out.insert(name, value.clone());
        }
        out
    }

    fn to_normalization(&self, span: &Span) -> Option<LinkNormalization> {
        let semantics = self.semantics.as_ref()?;
        let params = self.preprocess(span);
        let default = self.default_relation;

        Some(match semantics {
            LinkSemantics::TargetWithSourceLang => {
                let source_language = params.get("language").cloned();
                let mut target = params.clone();
                target.remove("language");
                if let Some(lang2) = target.remove("language2") {
                    target.insert("language".to_owned(), lang2);
                }
                LinkNormalization {
                    relation_type: default.unwrap_or(RelationType::Related),
                    text: self.relation_in_text.map(str::to_owned),
                    uncertain: params.get("unc").is_some(),
                    target: TargetSpec::One(target),
                    source_language,
                }
            }
            LinkSemantics::AllTargetParameters => LinkNormalization {
                relation_type: default.unwrap_or(RelationType::Related),
                text: self.relation_in_text.map(str::to_owned),
                uncertain: params.get("unc").is_some(),
                target: TargetSpec::One(params),
                source_language: None,
            },
            LinkSemantics::MultipleTargets {
                with_target_language,
                joiner,
            } => {
                let source_language = params.get("language").cloned();
                let target_language = if *with_target_language {
                    params.get("language2").cloned().or_else(|| source_language.clone())
                } else {
                    source_language.clone()
                };
                let targets = fold_indexed_targets(&params, target_language.as_deref());
                LinkNormalization {
                    relation_type: default.unwrap_or(RelationType::Morphological),
                    text: Some(joiner.to_string()),
                    uncertain: params.get("unc").is_some(),
                    target: TargetSpec::Many(targets),
                    source_language,
                }
            }
            LinkSemantics::DescendantsSemantics => {
                let relation_type = descendants_relation_type(&params).unwrap_or(RelationType::Inheritance);
                LinkNormalization {
                    relation_type,
                    text: self.relation_in_text.map(str::to_owned),
                    uncertain: params.get("unc").is_some(),
                    target: TargetSpec::One(params),
                    source_language: None,
                }
            }
            LinkSemantics::PlainMultiLinks => {
                let source_language = params.get("language").cloned();
                let targets: Vec<LinkTarget> = params
                    .iter()
                    .filter(|(k, _)| k.chars().all(|c| c.is_ascii_digit()))
                    .map(|(_, term)| {
                        let mut t = LinkTarget::new();
                        t.insert("term".to_owned(), term.clone());
                        t
                    })
                    .collect();
                LinkNormalization {
                    relation_type: default.unwrap_or(RelationType::Related),
                    text: None,
                    uncertain: false,
                    target: TargetSpec::Many(targets),
                    source_language,
                }
            }
            LinkSemantics::UnknownTarget => LinkNormalization {
                relation_type: default.unwrap_or(RelationType::Unknown),
                text: self.relation_in_text.map(str::to_owned),
                uncertain: false,
                target: TargetSpec::NoTarget,
                source_language: None,
            },
            LinkSemantics::ArabicRoot => {
                let term = span
                    .params
                    .iter()
                    .filter(|(k, _)| k.parse::<usize>().is_ok())
                    .map(|(_, v)| v.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                let mut target = LinkTarget::new();
                target.insert("term".to_owned(), term);
                target.insert("language".to_owned(), "ar".to_owned());
                LinkNormalization {
                    relation_type: default.unwrap_or(RelationType::Root),
                    text: None,
                    uncertain: false,
                    target: TargetSpec::One(target),
                    source_language: Some("ar".to_owned()),
                }
            }
            LinkSemantics::JapaneseLink => {
                let mut target = params.clone();
                if let Some(linkto) = target.remove("linkto") {
                    if let Some(term) = target.insert("term".to_owned(), linkto) {
                        target.insert("alt".to_owned(), term);
                    }
                }
                LinkNormalization {
                    relation_type: default.unwrap_or(RelationType::Related),
                    text: None,
                    uncertain: false,
                    target: TargetSpec::One(target),
                    source_language: None,
                }
            }
        })
    }
}

fn fold_indexed_targets(params: &TemplateParams, target_language: Option<&str>) -> Vec<LinkTarget> {
    let mut indices: Vec<u32> = params
        .keys()
        .filter_map(|k| k.strip_prefix("term").and_then(|n| n.parse::<u32>().ok()))
        .collect();
    indices.sort_unstable();
    indices.dedup();

    if !indices.is_empty() {
        return indices
            .into_iter()
            .map(|i| {
                let mut t = LinkTarget::new();
                if let Some(term) = params.get(&format!("term{i}")) {
                    t.insert("term".to_owned(), term.clone());
                }
                if let Some(alt) = params.get(&format!("alt{i}")) {
                    t.insert("alt".to_owned(), alt.clone());
                }
                if let Some(t_) = params.get(&format!("t{i}")) {
                    t.insert("t".to_owned(), t_.clone());
                }
                if let Some(lang) = target_language {
                    t.insert("language".to_owned(), lang.to_owned());
                }
                t
            })
            .collect();
    }

    if let Some(term) = params.get("term") {
        let mut t = LinkTarget::new();
        t.insert("term".to_owned(), term.clone());
        if let Some(lang) = target_language {
            t.insert("language".to_owned(), lang.to_owned());
        }
        return vec![t];
    }

    // Bare numbered parameters left over after fixed positions (`language`,
    // `language2`, ...) are consumed: each is one more morpheme of an affix
    // chain (e.g. `{{com|en|2=sun|3=flower}}`), in ascending index order.
    let mut bare_indices: Vec<u32> = params
        .keys()
        .filter_map(|k| k.parse::<u32>().ok())
        .collect();
    bare_indices.sort_unstable();
    bare_indices
        .into_iter()
        .filter_map(|i| params.get(&i.to_string()).map(|term| (i, term)))
        .map(|(_, term)| {
            let mut t = LinkTarget::new();
            t.insert("term".to_owned(), term.clone());
            if let Some(lang) = target_language {
                t.insert("language".to_owned(), lang.to_owned());
            }
            t
        })
        .collect()
}

fn descendants_relation_type(params: &TemplateParams) -> Option<RelationType> {
    const FLAGS: &[(&str, RelationType)] = &[
        ("bor", RelationType::Borrowing),
        ("lbor", RelationType::LearnedBorrowing),
        ("cal", RelationType::Calque),
        ("sl", RelationType::SemanticLoan),
        ("der", RelationType::Derivation),
    ];
    FLAGS
        .iter()
        .find(|(flag, _)| params.get(*flag).is_some())
        .map(|(_, t)| *t)
}

/// Maps `template_pos` (a template's own `pos=` parameter) or, failing
/// that, heuristics over the gloss text, to a canonical part of speech.
pub fn determine_pos(template_pos: Option<&str>, gloss: Option<&str>) -> Option<String> {
    const CANONICAL: &[(&str, &str)] = &[
        ("n", "noun"),
        ("noun", "noun"),
        ("v", "verb"),
        ("verb", "verb"),
        ("adj", "adjective"),
        ("adjective", "adjective"),
        ("adv", "adverb"),
        ("adverb", "adverb"),
    ];
    if let Some(pos) = template_pos {
        let lc = pos.to_lowercase();
        if let Some((_, canon)) = CANONICAL.iter().find(|(k, _)| *k == lc) {
            return Some((*canon).to_owned());
        }
    }
    let gloss = gloss?.trim();
    let lc = gloss.to_lowercase();
    if lc.starts_with("to ") {
        return Some("verb".to_owned());
    }
    if lc.starts_with("a ") || lc.starts_with("an ") || lc.starts_with("the ") {
        return Some("noun".to_owned());
    }
    if gloss.ends_with("ly") {
        return Some("adverb".to_owned());
    }
    None
}

pub struct TemplateHandler {
    registry: HashMap<&'static str, Arc<SpecificHandler>>,
}

impl TemplateHandler {
    pub fn new() -> Self {
        let mut registry = HashMap::new();
        register_default_catalog(&mut registry);
        TemplateHandler { registry }
    }

    /// Every registered `relation_in_text` phrase paired with the relation
    /// type it signals, deduplicated by phrase text. The Rule Engine's
    /// `RelationAnnotator` (spec §4.G rule 5) matches these against prose
    /// that names a relation without an accompanying template, e.g. "a
    /// calque of Latin turris" with no `{{calque|...}}` present.
    pub fn relation_phrases(&self) -> Vec<(&'static str, RelationType)> {
        let mut seen = HashSet::new();
        let mut phrases = Vec::new();
        for handler in self.registry.values() {
            if let (Some(phrase), Some(relation)) = (handler.relation_in_text, handler.default_relation) {
                if seen.insert(phrase) {
                    phrases.push((phrase, relation));
                }
            }
        }
        phrases
    }

    pub fn handler_for(&self, name: &str) -> Option<&Arc<SpecificHandler>> {
        if let Some(h) = self.registry.get(name) {
            return Some(h);
        }
        if name.ends_with(" of") || name.ends_with("-of") {
            return self.registry.get("*-of");
        }
        if name.starts_with("sv-") && name.ends_with("-form") {
            return self.registry.get("sv-*-form");
        }
        if name.starts_with("sense") {
            return self.registry.get("sense*");
        }
        None
    }

    /// Converts a template span to a `LinkNormalization`. Returns `None`
    /// (logged at the call site as `NotImplementedTemplate`) if no handler
    /// is registered for this template name.
    pub fn to_normalization(&self, span: &Span) -> Option<LinkNormalization> {
        let name = span.name.as_deref()?;
        let handler = self.handler_for(name)?;
        handler.to_normalization(span)
    }
}

impl Default for TemplateHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn register(
    registry: &mut HashMap<&'static str, Arc<SpecificHandler>>,
    names: &[&'static str],
    handler: SpecificHandler,
) {
    let handler = Arc::new(handler);
    for name in names {
        registry.insert(name, handler.clone());
    }
}

fn register_default_catalog(registry: &mut HashMap<&'static str, Arc<SpecificHandler>>) {
    let two_lang_positional = vec!["language", "language2", "term", "alt", "t"];

    for (names, relation) in [
        (
            ["derived", "der", "der+"].as_slice(),
            RelationType::Derivation,
        ),
        (["inherited", "inh", "inh+"].as_slice(), RelationType::Inheritance),
        (["borrowed", "bor", "bor+"].as_slice(), RelationType::Borrowing),
    ] {
        register(
            registry,
            names,
            SpecificHandler {
                default_relation: Some(relation),
                positional_params: two_lang_positional.clone(),
                semantics: Some(LinkSemantics::TargetWithSourceLang),
                ..SpecificHandler::new()
            },
        );
    }

    for (names, relation) in [
        (
            ["learned borrowing", "lbor", "lbor+"].as_slice(),
            RelationType::LearnedBorrowing,
        ),
        (
            ["orthographic borrowing", "obor", "obor+"].as_slice(),
            RelationType::OrthographicBorrowing,
        ),
        (
            ["semi-learned borrowing", "slbor", "slb", "slb+"].as_slice(),
            RelationType::SemiLearnedBorrowing,
        ),
        (
            ["unadapted borrowing", "ubor", "ubor+"].as_slice(),
            RelationType::UnadaptedBorrowing,
        ),
    ] {
        register(
            registry,
            names,
            SpecificHandler {
                default_relation: Some(relation),
                positional_params: two_lang_positional.clone(),
                semantics: Some(LinkSemantics::TargetWithSourceLang),
                ..SpecificHandler::new()
            },
        );
    }

    register(
        registry,
        &["root"],
        SpecificHandler {
            default_relation: Some(RelationType::Root),
            positional_params: vec!["language", "language2"],
            semantics: Some(LinkSemantics::MultipleTargets {
                with_target_language: true,
                joiner: "",
            }),
            ..SpecificHandler::new()
        },
    );

    for (names, relation, phrase) in [
        (["calque", "cal", "clq", "calq"].as_slice(), RelationType::Calque, "calque of"),
        (["partial calque", "pclq"].as_slice(), RelationType::PartialCalque, "partial calque of"),
        (["semantic loan", "sl", "sml"].as_slice(), RelationType::SemanticLoan, "semantic loan of"),
        (
            ["phono-semantic matching", "psm"].as_slice(),
            RelationType::Psm,
            "phono-semantic matching of",
        ),
    ] {
        register(
            registry,
            names,
            SpecificHandler {
                default_relation: Some(relation),
                positional_params: two_lang_positional.clone(),
                semantics: Some(LinkSemantics::TargetWithSourceLang),
                relation_in_text: Some(phrase),
                lang_in_text: true,
                ..SpecificHandler::new()
            },
        );
    }

    register(
        registry,
        &["desc", "desctree", "descendant"],
        SpecificHandler {
            default_relation: Some(RelationType::Inheritance),
            positional_params: vec!["language", "term"],
            renames: vec![("calq", "cal"), ("calque", "cal")],
            semantics: Some(LinkSemantics::DescendantsSemantics),
            ..SpecificHandler::new()
        },
    );

    register(
        registry,
        &["m", "m+", "langname-mention", "m-self", "mention", "l", "l-self", "ll", "link"],
        SpecificHandler {
            default_relation: Some(RelationType::Related),
            positional_params: vec!["language", "term", "alt", "t"],
            semantics: Some(LinkSemantics::AllTargetParameters),
            ..SpecificHandler::new()
        },
    );

    register(
        registry,
        &["clipping"],
        SpecificHandler {
            default_relation: Some(RelationType::Clipping),
            positional_params: vec!["language", "term"],
            semantics: Some(LinkSemantics::AllTargetParameters),
            relation_in_text: Some("clipping of"),
            ..SpecificHandler::new()
        },
    );
    register(
        registry,
        &["back-formation", "back-form", "backform", "bf"],
        SpecificHandler {
            default_relation: Some(RelationType::Backform),
            positional_params: vec!["language", "term"],
            semantics: Some(LinkSemantics::AllTargetParameters),
            relation_in_text: Some("back-formation from"),
            ..SpecificHandler::new()
        },
    );

    register(
        registry,
        &["onomatopoeic", "onom"],
        SpecificHandler {
            default_relation: Some(RelationType::Onom),
            semantics: Some(LinkSemantics::UnknownTarget),
            relation_in_text: Some("onomatopoeic"),
            ..SpecificHandler::new()
        },
    );
    register(
        registry,
        &["unknown", "unk"],
        SpecificHandler {
            default_relation: Some(RelationType::Unknown),
            semantics: Some(LinkSemantics::UnknownTarget),
            relation_in_text: Some("of unknown origin"),
            ..SpecificHandler::new()
        },
    );

    for (names, relation, phrase) in [
        (["short for"].as_slice(), RelationType::Shortening, "short for"),
        (["abbrev"].as_slice(), RelationType::Abbrev, "abbreviation of"),
        (
            ["alternative form of", "alt form"].as_slice(),
            RelationType::Altform,
            "alternative form of",
        ),
    ] {
        register(
            registry,
            names,
            SpecificHandler {
                default_relation: Some(relation),
                positional_params: vec!["language", "term"],
                semantics: Some(LinkSemantics::AllTargetParameters),
                relation_in_text: Some(phrase),
                ..SpecificHandler::new()
            },
        );
    }

    register(
        registry,
        &["cognate", "cog"],
        SpecificHandler {
            default_relation: Some(RelationType::Cognate),
            positional_params: vec!["language", "term"],
            semantics: Some(LinkSemantics::AllTargetParameters),
            lang_in_text: true,
            ..SpecificHandler::new()
        },
    );
    register(
        registry,
        &["noncognate", "noncog", "ncog"],
        SpecificHandler {
            default_relation: Some(RelationType::Noncognate),
            positional_params: vec!["language", "term"],
            semantics: Some(LinkSemantics::AllTargetParameters),
            lang_in_text: true,
            ..SpecificHandler::new()
        },
    );

    register(
        registry,
        &["affix", "af"],
        SpecificHandler {
            default_relation: Some(RelationType::Affix),
            positional_params: vec!["language"],
            semantics: Some(LinkSemantics::MultipleTargets {
                with_target_language: false,
                joiner: " + ",
            }),
            ..SpecificHandler::new()
        },
    );

    for (names, relation) in [
        (["prefix", "pre"].as_slice(), RelationType::Prefix),
        (["confix", "con"].as_slice(), RelationType::Confix),
        (["infix"].as_slice(), RelationType::Infix),
        (["circumfix"].as_slice(), RelationType::Circumfix),
        (["suffix", "suf"].as_slice(), RelationType::Suffix),
        (["compound", "com"].as_slice(), RelationType::Compound),
        (["univerbation", "univ"].as_slice(), RelationType::Univerbation),
    ] {
        register(
            registry,
            names,
            SpecificHandler {
                default_relation: Some(relation),
                positional_params: vec!["language"],
                semantics: Some(LinkSemantics::MultipleTargets {
                    with_target_language: false,
                    joiner: " + ",
                }),
                ..SpecificHandler::new()
            },
        );
    }

    register(
        registry,
        &["blending", "blend"],
        SpecificHandler {
            default_relation: Some(RelationType::Blending),
            positional_params: vec!["language"],
            semantics: Some(LinkSemantics::MultipleTargets {
                with_target_language: false,
                joiner: " and ",
            }),
            relation_in_text: Some("blending of"),
            ..SpecificHandler::new()
        },
    );
    register(
        registry,
        &["doublet", "dbt"],
        SpecificHandler {
            default_relation: Some(RelationType::Doublet),
            positional_params: vec!["language"],
            semantics: Some(LinkSemantics::MultipleTargets {
                with_target_language: false,
                joiner: " and ",
            }),
            relation_in_text: Some("doublet of"),
            ..SpecificHandler::new()
        },
    );

    register(
        registry,
        &["named-after"],
        SpecificHandler {
            default_relation: Some(RelationType::Eponym),
            positional_params: vec!["language", "name"],
            whitelist: Some(vec!["language", "name", "occ", "nat", "born", "died", "wplink"]),
            renames: vec![("nationality", "nat"), ("occupation", "occ")],
            semantics: Some(LinkSemantics::TargetWithSourceLang),
            relation_in_text: Some("named after"),
            ..SpecificHandler::new()
        },
    );

    register(
        registry,
        &["*-of"],
        SpecificHandler {
            default_relation: Some(RelationType::Related),
            positional_params: vec!["language", "term"],
            semantics: Some(LinkSemantics::AllTargetParameters),
            ..SpecificHandler::new()
        },
    );

    register(
        registry,
        &["rel2", "rel3", "rel4", "col2", "col3", "col4"],
        SpecificHandler {
            default_relation: Some(RelationType::Related),
            renames: vec![("lang", "language")],
            whitelist: Some(vec!["language"]),
            semantics: Some(LinkSemantics::PlainMultiLinks),
            ..SpecificHandler::new()
        },
    );
    register(
        registry,
        &["der2", "der3", "der4"],
        SpecificHandler {
            default_relation: Some(RelationType::Derivation),
            renames: vec![("lang", "language")],
            whitelist: Some(vec!["language"]),
            semantics: Some(LinkSemantics::PlainMultiLinks),
            ..SpecificHandler::new()
        },
    );

    register(
        registry,
        &["ar-root"],
        SpecificHandler {
            default_relation: Some(RelationType::Root),
            semantics: Some(LinkSemantics::ArabicRoot),
            ..SpecificHandler::new()
        },
    );
    register(
        registry,
        &["ja-r"],
        SpecificHandler {
            default_relation: Some(RelationType::Related),
            positional_params: vec!["term", "ascii", "t"],
            whitelist: Some(vec!["linkto", "term", "ascii", "t"]),
            semantics: Some(LinkSemantics::JapaneseLink),
            ..SpecificHandler::new()
        },
    );

    // Non-relational, plain-text-only registrations: no LinkSemantics, so
    // `to_normalization` naturally returns None for these; they exist in
    // the registry so `handler_for` recognizes the name (the Rule Engine's
    // prose renderer consults the same table for surrounding-text markup).
    for name in [
        "etystub", "nonlemmas", "nonlemma", "rfe", "senseid", "quote-text", "rfdef", "gloss", "gl",
        "non-gloss definition", "non-gloss", "n-g", "ngd", "defdate", "sv-*-form", "qual", "qualifier",
        "q", "topics", "top", "ux", "uxi", "vern", "taxlink", "given name", "surname", "w", "wikipedia",
        "sense*", "etyl", "dercat",
    ] {
        registry.entry(name).or_insert_with(|| Arc::new(SpecificHandler::new()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wikitext::SpanKind;

    fn template(name: &str, params: &[(&str, &str)]) -> Span {
        let mut span = Span::new(SpanKind::Template, 0..1);
        span.name = Some(name.to_owned());
        span.params = params.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        span
    }

    #[test]
    fn inherited_template_yields_target_with_source_lang() {
        let handler = TemplateHandler::new();
        let span = template("inh", &[("1", "en"), ("2", "enm"), ("3", "cat")]);
        let norm = handler.to_normalization(&span).unwrap();
        assert_eq!(norm.relation_type, RelationType::Inheritance);
        assert_eq!(norm.source_language.as_deref(), Some("en"));
        match norm.target {
            TargetSpec::One(t) => assert_eq!(t.get("term").map(String::as_str), Some("cat")),
            _ => panic!("expected a single target"),
        }
    }

    #[test]
    fn compound_template_yields_multiple_targets() {
        let handler = TemplateHandler::new();
        let span = template(
            "com",
            &[("1", "en"), ("2", "sun"), ("3", "flower")],
        );
        let norm = handler.to_normalization(&span).unwrap();
        assert_eq!(norm.relation_type, RelationType::Compound);
        match norm.target {
            TargetSpec::Many(targets) => assert_eq!(targets.len(), 2),
            _ => panic!("expected multiple targets"),
        }
    }

    #[test]
    fn unrecognized_template_yields_none() {
        let handler = TemplateHandler::new();
        let span = template("some-unregistered-template", &[]);
        assert!(handler.to_normalization(&span).is_none());
    }

    #[test]
    fn xy_of_regex_fallback_matches() {
        let handler = TemplateHandler::new();
        let span = template("plural of", &[("1", "en"), ("2", "cat")]);
        let norm = handler.to_normalization(&span).unwrap();
        assert_eq!(norm.relation_type, RelationType::Related);
    }

    #[test]
    fn determine_pos_from_gloss_heuristics() {
        assert_eq!(determine_pos(None, Some("to run quickly")), Some("verb".to_owned()));
        assert_eq!(determine_pos(None, Some("a small house")), Some("noun".to_owned()));
        assert_eq!(determine_pos(None, Some("quickly")), Some("adverb".to_owned()));
        assert_eq!(determine_pos(Some("n"), Some("irrelevant")), Some("noun".to_owned()));
    }
}
