//! The Relation Ontology (spec §4.A): a closed set of relation types with a
//! fixed parent/child lattice, rooted at `Related`. `is_a` is precomputed at
//! load into an ancestors-inclusive-of-self set per type, so lookups never
//! recurse.

use std::collections::HashSet;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::error::{CoreError, CoreResult};

#[derive(
    Hash,
    Eq,
    PartialEq,
    Debug,
    Copy,
    Clone,
    AsRefStr,
    IntoStaticStr,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
pub enum RelationType {
    Related,
    Sibling,
    Cognate,
    Noncognate,
    Doublet,
    Altform,
    Origin,
    Historical,
    Inheritance,
    Derivation,
    Root,
    Borrowing,
    LearnedBorrowing,
    SemiLearnedBorrowing,
    OrthographicBorrowing,
    UnadaptedBorrowing,
    Calque,
    PartialCalque,
    SemanticLoan,
    Psm,
    Morphological,
    Affix,
    Prefix,
    Infix,
    Suffix,
    Confix,
    Circumfix,
    Compound,
    Univerbation,
    Blending,
    Clipping,
    Backform,
    Abbrev,
    Shortening,
    Other,
    Unknown,
    Eponym,
    Onom,
}

/// The literal hierarchy of §6, expressed as immediate-parent links. `None`
/// marks the lattice root.
fn parent(t: RelationType) -> Option<RelationType> {
    use RelationType::*;
    match t {
        Related => None,
        Sibling => Some(Related),
        Cognate | Noncognate | Doublet | Altform => Some(Sibling),
        Origin => Some(Related),
        Historical => Some(Origin),
        Inheritance | Derivation | Root => Some(Historical),
        Borrowing => Some(Origin),
        LearnedBorrowing | SemiLearnedBorrowing | OrthographicBorrowing | UnadaptedBorrowing
        | Calque | PartialCalque | SemanticLoan | Psm => Some(Borrowing),
        Morphological => Some(Origin),
        Affix => Some(Morphological),
        Prefix | Infix | Suffix | Confix | Circumfix => Some(Affix),
        Compound | Univerbation | Blending | Clipping | Backform | Abbrev | Shortening => {
            Some(Morphological)
        }
        Other => Some(Origin),
        Unknown | Eponym | Onom => Some(Other),
    }
}

fn ancestors_inclusive(t: RelationType) -> HashSet<RelationType> {
    let mut set = HashSet::new();
    let mut cur = Some(t);
    while let Some(c) = cur {
        set.insert(c);
        cur = parent(c);
    }
    set
}

lazy_static! {
    static ref ANCESTORS: std::collections::HashMap<RelationType, HashSet<RelationType>> =
        RelationType::iter()
            .map(|t| (t, ancestors_inclusive(t)))
            .collect();
}

impl RelationType {
    /// `t.is_a(u)` iff `u` is an ancestor of (or equal to) `t`.
    pub fn is_a(self, other: RelationType) -> bool {
        ANCESTORS
            .get(&self)
            .expect("every variant has a precomputed ancestor set")
            .contains(&other)
    }

    /// A type is directed iff it lies under `Origin`.
    pub fn directed(self) -> bool {
        self.is_a(RelationType::Origin)
    }

    pub fn human_name(self) -> &'static str {
        self.into()
    }

    /// Parses a relation type from its variant name (e.g. `"Doublet"`).
    /// Fails with `UnknownRelationType` for any name outside the closed set.
    pub fn parse(name: &str) -> CoreResult<RelationType> {
        RelationType::from_str(name).map_err(|_| CoreError::UnknownRelationType(name.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RelationType::*;

    #[test]
    fn every_type_is_a_itself_and_related() {
        for t in RelationType::iter() {
            assert!(t.is_a(t));
            assert!(t.is_a(Related));
        }
    }

    #[test]
    fn directedness_matches_origin_ancestry() {
        for t in RelationType::iter() {
            assert_eq!(t.directed(), t.is_a(Origin));
        }
    }

    #[test]
    fn leaf_is_a_chain() {
        assert!(LearnedBorrowing.is_a(Borrowing));
        assert!(LearnedBorrowing.is_a(Origin));
        assert!(LearnedBorrowing.is_a(Related));
        assert!(!LearnedBorrowing.is_a(Sibling));
        assert!(!Cognate.is_a(Origin));
    }

    #[test]
    fn morphological_subtree() {
        assert!(Prefix.is_a(Affix));
        assert!(Prefix.is_a(Morphological));
        assert!(Compound.is_a(Morphological));
        assert!(!Compound.is_a(Affix));
    }

    #[test]
    fn directed_iff_under_origin() {
        assert!(Inheritance.directed());
        assert!(Eponym.directed());
        assert!(!Sibling.directed());
        assert!(!Doublet.directed());
        assert!(!Related.directed());
    }

    #[test]
    fn parse_accepts_every_variant_name() {
        for t in RelationType::iter() {
            assert_eq!(RelationType::parse(t.human_name()).unwrap(), t);
        }
    }

    #[test]
    fn parse_rejects_unknown_name() {
        let err = RelationType::parse("Frobnication").unwrap_err();
        assert!(matches!(err, crate::error::CoreError::UnknownRelationType(name) if name == "Frobnication"));
    }
}
