//! Relations between nodes, and the attribute payload carried on each edge.

use serde::{Deserialize, Serialize};

use crate::{node::NodeRef, relation_type::RelationType};

/// Side information about the wikitext span a relation's endpoint was
/// extracted from (kept separately from `RelationAttributes` since it is
/// debugging/telemetry data, not part of edge identity or merge rules).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubNodeInfo {
    pub language: Option<String>,
    pub pos: Option<String>,
    pub t: Option<String>,
}

impl SubNodeInfo {
    /// Returns `None` if every field is absent, matching the "maybe
    /// construct" convention used when extra detail is simply unavailable.
    pub fn maybe_new(
        language: Option<String>,
        pos: Option<String>,
        t: Option<String>,
    ) -> Option<Self> {
        if language.is_none() && pos.is_none() && t.is_none() {
            return None;
        }
        Some(SubNodeInfo { language, pos, t })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubInfo {
    pub src: Option<SubNodeInfo>,
    pub tgt: Option<SubNodeInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebugInfo {
    pub ext_section: Option<String>,
    pub ext_mechanism: Option<String>,
    pub other: Option<String>,
}

/// `{type, text?, uncertain?, sub?}`, the payload carried by every
/// `Relation` and by every edge in the Reduced Relation Store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationAttributes {
    pub r#type: RelationType,
    pub text: Option<String>,
    pub uncertain: bool,
    pub sub: Option<SubInfo>,
    pub debug: Option<DebugInfo>,
}

impl RelationAttributes {
    pub fn new(r#type: RelationType) -> Self {
        RelationAttributes {
            r#type,
            text: None,
            uncertain: false,
            sub: None,
            debug: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_uncertain(mut self, uncertain: bool) -> Self {
        self.uncertain = uncertain;
        self
    }

    /// Combines two attribute sets describing the same edge after a merge:
    /// `text` is joined with `"; "` if both are present (else whichever is
    /// present), and `uncertain` is the logical OR. The caller decides which
    /// side's `type` wins.
    pub fn merge_into(&mut self, other: &RelationAttributes) {
        self.text = match (self.text.take(), &other.text) {
            (Some(a), Some(b)) => Some(format!("{a}; {b}")),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b.clone()),
            (None, None) => None,
        };
        self.uncertain = self.uncertain || other.uncertain;
        // todo merge remaining attrs (sub/debug) once a concrete use arises
    }
}

/// `(source, target, attrs)`. Edge identity in the final graph is
/// `(source, target, type)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub src: NodeRef,
    pub tgt: NodeRef,
    pub attrs: RelationAttributes,
}

impl Relation {
    pub fn new(src: NodeRef, tgt: NodeRef, attrs: RelationAttributes) -> Self {
        Relation { src, tgt, attrs }
    }
}
