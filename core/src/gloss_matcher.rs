//! The Gloss Matcher (spec §4.I): given a template's inline gloss and a set
//! of candidate `(homonym, definition)` pairs, pick the homonym whose
//! definition the gloss most plausibly describes. Scoring is a small,
//! pre-fit logistic regression over hand-computed string-similarity
//! features; this crate never trains it.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use crate::error::{CoreError, CoreResult};
use crate::levenshtein::{levenshtein_default, levenshtein_seq};
use crate::sequence_match::{longest_match_len, ratio};

const CHAR_LEVENSHTEIN_CAP: usize = 8;
const WORD_LEVENSHTEIN_CAP: usize = 5;
const TVERSKY_ALPHA: f64 = 0.32;
const FUZZY_TVERSKY_ALPHA: f64 = 0.06;

#[derive(Debug, Deserialize)]
pub struct GlossMatcherModel {
    feature_names: Vec<String>,
    weights: Vec<f64>,
    intercept: f64,
    scaler_mean: Vec<f64>,
    scaler_scale: Vec<f64>,
}

impl GlossMatcherModel {
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let file = File::open(path).map_err(|e| CoreError::GlossModelLoad(e.into()))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| CoreError::GlossModelLoad(e.into()))
    }

    fn score(&self, features: &HashMap<&'static str, f64>) -> f64 {
        let mut z = self.intercept;
        for (i, name) in self.feature_names.iter().enumerate() {
            let raw = features.get(name.as_str()).copied().unwrap_or(0.0);
            let scale = self.scaler_scale.get(i).copied().unwrap_or(1.0);
            let mean = self.scaler_mean.get(i).copied().unwrap_or(0.0);
            let scaled = if scale != 0.0 { (raw - mean) / scale } else { 0.0 };
            z += scaled * self.weights[i];
        }
        1.0 / (1.0 + (-z).exp())
    }
}

fn tokenize(s: &str) -> Vec<String> {
    s.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .collect()
}

fn tversky(def_words: &HashSet<&str>, tmpl_words: &HashSet<&str>, alpha: f64) -> (f64, bool, bool) {
    let t1 = def_words.intersection(tmpl_words).count();
    let t2 = def_words.difference(tmpl_words).count();
    let t3 = tmpl_words.difference(def_words).count();
    let score = if t1 > 0 {
        t1 as f64 / (t1 as f64 + alpha * t2 as f64 + (1.0 - alpha) * t3 as f64)
    } else {
        0.0
    };
    (score, t3 == 0, t2 == 0)
}

fn fuzzy_tversky(def_words: &[String], tmpl_words: &[String]) -> f64 {
    let sim = |a: &str, b: &str| {
        let dist = levenshtein_default(a, b).unwrap_or_else(|| a.len().max(b.len()));
        1.0 / (1.0 + dist as f64)
    };
    let ds: Vec<f64> = def_words
        .iter()
        .map(|d| {
            tmpl_words
                .iter()
                .map(|t| sim(d, t))
                .fold(0.0_f64, f64::max)
        })
        .collect();
    let ts: Vec<f64> = tmpl_words
        .iter()
        .map(|t| {
            def_words
                .iter()
                .map(|d| sim(d, t))
                .fold(0.0_f64, f64::max)
        })
        .collect();
    let t1 = (ds.iter().sum::<f64>() + ts.iter().sum::<f64>()) / 2.0;
    let t2: f64 = ds.iter().map(|d| 1.0 - d).sum();
    let t3: f64 = ts.iter().map(|t| 1.0 - t).sum();
    if t1 > 0.0 {
        t1 / (t1 + FUZZY_TVERSKY_ALPHA * t2 + (1.0 - FUZZY_TVERSKY_ALPHA) * t3)
    } else {
        0.0
    }
}

/// Computes the shared character/word equality, containment, longest-match,
/// ratio, and plain-Tversky features common to both matcher variants.
fn base_features(tmpl: &str, def: &str) -> HashMap<&'static str, f64> {
    let tmpl_lc = tmpl.trim().to_lowercase();
    let def_lc = def.trim().to_lowercase();
    let tmpl_chars: Vec<char> = tmpl_lc.chars().collect();
    let def_chars: Vec<char> = def_lc.chars().collect();

    let tmpl_words = tokenize(&tmpl_lc);
    let def_words = tokenize(&def_lc);
    let tmpl_word_set: HashSet<&str> = tmpl_words.iter().map(String::as_str).collect();
    let def_word_set: HashSet<&str> = def_words.iter().map(String::as_str).collect();
    let (tversky_score, word_temp_in_def, word_def_in_temp) =
        tversky(&def_word_set, &tmpl_word_set, TVERSKY_ALPHA);

    let mut f: HashMap<&'static str, f64> = HashMap::new();
    f.insert("char_eq", (tmpl_lc == def_lc) as i32 as f64);
    f.insert("char_temp_in_def", def_lc.contains(&tmpl_lc) as i32 as f64);
    f.insert("char_def_in_temp", tmpl_lc.contains(&def_lc) as i32 as f64);
    f.insert(
        "char_longest_match",
        longest_match_len(&tmpl_chars, &def_chars) as f64,
    );
    f.insert("char_ratio", ratio(&tmpl_chars, &def_chars));

    f.insert("word_eq", (tmpl_words == def_words) as i32 as f64);
    f.insert("word_temp_in_def", word_temp_in_def as i32 as f64);
    f.insert("word_def_in_temp", word_def_in_temp as i32 as f64);
    f.insert(
        "word_longest_match",
        longest_match_len(&tmpl_words, &def_words) as f64,
    );
    f.insert("word_ratio", ratio(&tmpl_words, &def_words));
    f.insert("tversky_0.32", tversky_score);

    f
}

pub trait GlossMatcher {
    fn model(&self) -> &GlossMatcherModel;
    fn compute_features(&self, template_gloss: &str, def: &str) -> HashMap<&'static str, f64>;

    /// Returns the index, within `candidates`, of the definition the
    /// template gloss most plausibly matches; `None` if `candidates` is
    /// empty.
    fn select(&self, template_gloss: &str, candidates: &[String]) -> Option<usize> {
        candidates
            .iter()
            .enumerate()
            .map(|(i, def)| (i, self.model().score(&self.compute_features(template_gloss, def))))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .map(|(i, _)| i)
    }
}

/// Uses the full feature set, including the early-exit Levenshtein distance
/// features and the fuzzy Tversky index.
pub struct AllFeaturesGlossMatcher {
    model: GlossMatcherModel,
}

impl AllFeaturesGlossMatcher {
    pub fn new(model: GlossMatcherModel) -> Self {
        AllFeaturesGlossMatcher { model }
    }
}

impl GlossMatcher for AllFeaturesGlossMatcher {
    fn model(&self) -> &GlossMatcherModel {
        &self.model
    }

    fn compute_features(&self, template_gloss: &str, def: &str) -> HashMap<&'static str, f64> {
        let mut f = base_features(template_gloss, def);
        let tmpl_lc = template_gloss.trim().to_lowercase();
        let def_lc = def.trim().to_lowercase();
        let tmpl_words = tokenize(&tmpl_lc);
        let def_words = tokenize(&def_lc);

        let char_lev = levenshtein_default(&tmpl_lc, &def_lc);
        let word_lev = levenshtein_seq(&tmpl_words, &def_words, 50, 50);
        f.insert(
            "char_levenshtein_co8",
            char_lev.map(|d| d.min(CHAR_LEVENSHTEIN_CAP)).unwrap_or(CHAR_LEVENSHTEIN_CAP) as f64,
        );
        f.insert(
            "word_levenshtein_co5",
            word_lev.map(|d| d.min(WORD_LEVENSHTEIN_CAP)).unwrap_or(WORD_LEVENSHTEIN_CAP) as f64,
        );
        f.insert("fuzzy_tversky_0.06", fuzzy_tversky(&def_words, &tmpl_words));
        f
    }
}

/// Uses only the character/word equality, containment, longest-match,
/// ratio, and plain-Tversky features -- no Levenshtein, no fuzzy Tversky.
pub struct NoFuzzyGlossMatcher {
    model: GlossMatcherModel,
}

impl NoFuzzyGlossMatcher {
    pub fn new(model: GlossMatcherModel) -> Self {
        NoFuzzyGlossMatcher { model }
    }
}

impl GlossMatcher for NoFuzzyGlossMatcher {
    fn model(&self) -> &GlossMatcherModel {
        &self.model
    }

    fn compute_features(&self, template_gloss: &str, def: &str) -> HashMap<&'static str, f64> {
        base_features(template_gloss, def)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_model(feature_names: &[&str]) -> GlossMatcherModel {
        let n = feature_names.len();
        GlossMatcherModel {
            feature_names: feature_names.iter().map(|s| s.to_string()).collect(),
            weights: vec![1.0; n],
            intercept: 0.0,
            scaler_mean: vec![0.0; n],
            scaler_scale: vec![1.0; n],
        }
    }

    #[test]
    fn exact_match_scores_highest() {
        let matcher = NoFuzzyGlossMatcher::new(toy_model(&["char_eq", "word_eq", "tversky_0.32"]));
        let candidates = vec![
            "a domesticated feline".to_string(),
            "a domesticated carnivorous mammal".to_string(),
        ];
        let best = matcher
            .select("a domesticated feline", &candidates)
            .unwrap();
        assert_eq!(best, 0);
    }

    #[test]
    fn all_features_variant_includes_levenshtein_and_fuzzy_tversky() {
        let matcher = AllFeaturesGlossMatcher::new(toy_model(&[
            "char_levenshtein_co8",
            "word_levenshtein_co5",
            "fuzzy_tversky_0.06",
        ]));
        let features = matcher.compute_features("small cat", "small dog");
        assert!(features.contains_key("char_levenshtein_co8"));
        assert!(features.contains_key("fuzzy_tversky_0.06"));
    }

    #[test]
    fn no_fuzzy_variant_omits_levenshtein_features() {
        let matcher = NoFuzzyGlossMatcher::new(toy_model(&["char_eq"]));
        let features = matcher.compute_features("a", "b");
        assert!(!features.contains_key("char_levenshtein_co8"));
        assert!(!features.contains_key("fuzzy_tversky_0.06"));
    }

    #[test]
    fn select_returns_none_for_empty_candidates() {
        let matcher = NoFuzzyGlossMatcher::new(toy_model(&["char_eq"]));
        assert_eq!(matcher.select("gloss", &[]), None);
    }
}
