//! Pipeline configuration (spec §2.1 Ambient Component L): one record built
//! once by the binary entrypoint and passed down by reference. Nothing in
//! this crate reads ambient global state for configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use etymograph_core::{GlossMatcherModel, LanguageTree, StringPool};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub language_tree_path: Option<PathBuf>,
    pub gloss_matcher_model_path: Option<PathBuf>,
    pub no_fuzzy_gloss_matcher_model_path: Option<PathBuf>,
    pub xy_forms_path: PathBuf,
    pub head: Option<usize>,
    /// Mirrors the Rule Engine's "only-in-from-chain" toggle (spec §4.G
    /// chain interpretation): when set, chain resolution only threads
    /// `last_origin_source` forward while a `from` phrase is active.
    pub only_in_from_chain: bool,
}

impl PipelineConfig {
    pub fn new(xy_forms_path: impl Into<PathBuf>) -> Self {
        PipelineConfig {
            language_tree_path: None,
            gloss_matcher_model_path: None,
            no_fuzzy_gloss_matcher_model_path: None,
            xy_forms_path: xy_forms_path.into(),
            head: None,
            only_in_from_chain: false,
        }
    }

    pub fn with_language_tree(mut self, path: impl Into<PathBuf>) -> Self {
        self.language_tree_path = Some(path.into());
        self
    }

    pub fn with_gloss_matcher_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.gloss_matcher_model_path = Some(path.into());
        self
    }

    pub fn with_head(mut self, head: usize) -> Self {
        self.head = Some(head);
        self
    }
}

/// Reads the newline-delimited "X of"-forms list backing `XYAnnotator`
/// (spec §4.G rule 6, §6 "data files").
pub fn load_xy_forms(path: &Path) -> Result<Vec<String>> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("reading XY-of forms list at {}", path.display()))?;
    Ok(body.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_owned).collect())
}

pub fn load_gloss_matcher_model(path: &Path) -> Result<GlossMatcherModel> {
    GlossMatcherModel::load(path).with_context(|| format!("loading gloss matcher model at {}", path.display()))
}

/// Loads the optional phylogenetic language tree (older -> newer edges)
/// used by the Reduced Relation Store's historical-language swap.
///
/// Takes the pipeline's own `StringPool` rather than interning into a
/// throw-away one: `Lang` equality is a raw interner index (see
/// `string_pool.rs`/`lang.rs`), meaningful only against symbols from the
/// same pool as the `Lang`s `relation_store.rs` actually compares it
/// against. A tree built in its own pool would never match.
pub fn load_language_tree(path: &Path, pool: &mut StringPool) -> Result<LanguageTree> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("reading language tree at {}", path.display()))?;
    let edges: Vec<(String, String)> = serde_json::from_str(&body)
        .with_context(|| format!("parsing language tree at {}", path.display()))?;
    let edges: Vec<_> = edges
        .into_iter()
        .map(|(older, newer)| (etymograph_core::Lang::new(pool, &older), etymograph_core::Lang::new(pool, &newer)))
        .collect();
    Ok(LanguageTree::from_edges(edges))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_xy_forms_trims_blank_lines() {
        let path = std::env::temp_dir().join(format!("xy-forms-test-{}.txt", std::process::id()));
        std::fs::write(&path, "plural of\n\nfeminine plural of\n  diminutive of  \n").unwrap();
        let forms = load_xy_forms(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(forms, vec!["plural of", "feminine plural of", "diminutive of"]);
    }

    #[test]
    fn load_language_tree_lang_values_match_the_shared_pool() {
        let path = std::env::temp_dir().join(format!("lang-tree-test-{}.json", std::process::id()));
        std::fs::write(&path, r#"[["enm", "en"]]"#).unwrap();
        let mut pool = StringPool::new();
        let tree = load_language_tree(&path, &mut pool).unwrap();
        std::fs::remove_file(&path).unwrap();

        // Lang values interned into the same pool after loading must still
        // compare equal to the ones the tree was built from.
        let enm = etymograph_core::Lang::new(&mut pool, "enm");
        let en = etymograph_core::Lang::new(&mut pool, "en");
        assert!(tree.contains_path(enm, en));
    }
}
