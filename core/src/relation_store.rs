//! The Reduced Relation Store (spec §4.H): the incremental merge/shelve
//! state machine that turns a stream of raw `Relation`s into a DAG of
//! `origin` edges plus `sibling`/`related` side stores, and the batch
//! `finalize()` pass (cycle removal, transitive reduction, unspecific-edge
//! reduction) that turns that state into the final multi-typed graph.
//!
//! Internally this is plain `HashMap`s keyed by node pair rather than a live
//! `petgraph` graph: `sibling` and the directed overflow bucket both need
//! multiple coexisting edges per pair (parallel, non-mergeable relations),
//! which `petgraph::graphmap` cannot represent directly. A `petgraph::Graph`
//! is built only transiently inside `finalize()`, for the algorithms that
//! actually need graph structure (SCC detection, transitive reduction).

use std::collections::{HashMap, HashSet};

use petgraph::algo::{has_path_connecting, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};

use crate::{
    error::{CoreError, CoreResult},
    lang::Lang,
    language_tree::LanguageTree,
    node::NodeRef,
    relation::{Relation, RelationAttributes},
    relation_type::RelationType,
};

/// Observability hook mirroring the reduction decisions the store makes, so
/// tests (and callers who want progress output) can assert *why* an edge
/// ended up where it did, not just the final graph.
pub trait ReductionListener {
    fn on_event(&mut self, _event: ReductionEvent) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReductionEvent {
    SelfLoopDropped,
    HistoricalLanguageSwapped,
    MergedMoreSpecific,
    MergedEqual,
    ShelvedIncompatible,
    ShelvedCycle,
    TransitiveReductionRemoved,
    IntraComponentRelatedRemoved,
}

pub struct NoopListener;
impl ReductionListener for NoopListener {}

/// A fully reduced, multi-typed directed graph: one `Relation` per
/// `(src, tgt, type)` triple that survived reduction.
pub type ReducedGraph = Vec<Relation>;

type Pair = (NodeRef, NodeRef);

fn canonical_key(a: NodeRef, b: NodeRef) -> Pair {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

pub struct RelationStore {
    related: HashMap<Pair, RelationAttributes>,
    sibling: HashMap<Pair, Vec<RelationAttributes>>,
    origin: HashMap<Pair, RelationAttributes>,
    origin_overflow: HashMap<Pair, Vec<RelationAttributes>>,
    language_tree: Option<LanguageTree>,
    listener: Box<dyn ReductionListener>,
    finalized: bool,
    cached_graph: Option<ReducedGraph>,
}

impl RelationStore {
    pub fn new(language_tree: Option<LanguageTree>) -> Self {
        RelationStore {
            related: HashMap::new(),
            sibling: HashMap::new(),
            origin: HashMap::new(),
            origin_overflow: HashMap::new(),
            language_tree,
            listener: Box::new(NoopListener),
            finalized: false,
            cached_graph: None,
        }
    }

    pub fn with_listener(mut self, listener: Box<dyn ReductionListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Feeds one raw relation through the incremental merge/shelve rules.
    /// `langs`, when given, are `(lang(src), lang(tgt))`; only consulted for
    /// `HISTORICAL`-family relations, to orient them against the language
    /// tree. The store holds no reference to a `Lexicon`, so callers supply
    /// this rather than it being looked up here.
    pub fn add(&mut self, relation: Relation, langs: Option<(Lang, Lang)>) -> CoreResult<()> {
        if self.finalized {
            return Err(CoreError::AlreadyFinalized);
        }
        let Relation {
            mut src,
            mut tgt,
            attrs,
        } = relation;

        if src == tgt {
            self.listener.on_event(ReductionEvent::SelfLoopDropped);
            return Ok(());
        }

        if attrs.r#type.is_a(RelationType::Historical) {
            if let (Some(tree), Some((src_lang, tgt_lang))) = (&self.language_tree, langs) {
                if tree.contains_path(tgt_lang, src_lang) {
                    std::mem::swap(&mut src, &mut tgt);
                    self.listener
                        .on_event(ReductionEvent::HistoricalLanguageSwapped);
                }
            }
        }

        if attrs.r#type.directed() {
            self.add_directed(src, tgt, attrs);
        } else if attrs.r#type.is_a(RelationType::Sibling) {
            self.add_sibling(src, tgt, attrs);
        } else {
            self.add_related(src, tgt, attrs);
        }
        Ok(())
    }

    fn add_directed(&mut self, src: NodeRef, tgt: NodeRef, attrs: RelationAttributes) {
        let ckey = canonical_key(src, tgt);
        self.related.remove(&ckey);

        if let Some(existing) = self.origin.get_mut(&(src, tgt)) {
            if merge_if_possible(existing, &attrs) {
                self.listener.on_event(ReductionEvent::MergedMoreSpecific);
            } else {
                self.origin_overflow.entry((src, tgt)).or_default().push(attrs);
                self.listener.on_event(ReductionEvent::ShelvedIncompatible);
            }
            return;
        }

        if self.origin.contains_key(&(tgt, src)) {
            self.origin_overflow.entry((src, tgt)).or_default().push(attrs);
            self.listener.on_event(ReductionEvent::ShelvedCycle);
            return;
        }

        if let Some(bucket) = self.origin_overflow.get_mut(&(src, tgt)) {
            if !bucket.is_empty() {
                for existing in bucket.iter_mut() {
                    if merge_if_possible(existing, &attrs) {
                        self.listener.on_event(ReductionEvent::MergedMoreSpecific);
                        return;
                    }
                }
                bucket.push(attrs);
                self.listener.on_event(ReductionEvent::ShelvedIncompatible);
                return;
            }
        }

        self.origin.insert((src, tgt), attrs);
    }

    fn add_sibling(&mut self, src: NodeRef, tgt: NodeRef, attrs: RelationAttributes) {
        let ckey = canonical_key(src, tgt);
        self.related.remove(&ckey);
        let bucket = self.sibling.entry(ckey).or_default();
        if let Some(existing) = bucket.iter_mut().find(|e| e.r#type == attrs.r#type) {
            existing.merge_into(&attrs);
            self.listener.on_event(ReductionEvent::MergedEqual);
        } else {
            bucket.push(attrs);
        }
    }

    fn add_related(&mut self, src: NodeRef, tgt: NodeRef, attrs: RelationAttributes) {
        if let Some(existing) = self.origin.get_mut(&(src, tgt)) {
            existing.merge_into(&attrs);
            self.listener.on_event(ReductionEvent::MergedMoreSpecific);
            return;
        }
        if let Some(existing) = self.origin.get_mut(&(tgt, src)) {
            existing.merge_into(&attrs);
            self.listener.on_event(ReductionEvent::MergedMoreSpecific);
            return;
        }
        let ckey = canonical_key(src, tgt);
        if let Some(existing) = self.sibling.get_mut(&ckey).and_then(|b| b.first_mut()) {
            existing.merge_into(&attrs);
            self.listener.on_event(ReductionEvent::MergedMoreSpecific);
            return;
        }
        match self.related.get_mut(&ckey) {
            Some(existing) => {
                existing.merge_into(&attrs);
                self.listener.on_event(ReductionEvent::MergedEqual);
            }
            None => {
                self.related.insert(ckey, attrs);
            }
        }
    }

    /// Runs cycle removal, and optionally transitive reduction and
    /// unspecific-`RELATED` reduction, then merges all four stores into one
    /// graph. Idempotent: a second call returns the same graph without
    /// repeating the reduction passes.
    pub fn finalize(&mut self, transitive_reduce: bool, reduce_unspecific: bool) -> ReducedGraph {
        if self.finalized {
            return self
                .cached_graph
                .clone()
                .expect("finalized implies a cached graph");
        }

        self.remove_cycles();
        if transitive_reduce {
            self.transitive_reduce();
        }
        if reduce_unspecific {
            self.reduce_unspecific();
        }

        let mut edges = Vec::new();
        for (&(src, tgt), attrs) in &self.related {
            edges.push(Relation::new(src, tgt, attrs.clone()));
        }
        for (&(src, tgt), bucket) in &self.sibling {
            edges.extend(bucket.iter().map(|a| Relation::new(src, tgt, a.clone())));
        }
        for (&(src, tgt), attrs) in &self.origin {
            edges.push(Relation::new(src, tgt, attrs.clone()));
        }
        for (&(src, tgt), bucket) in &self.origin_overflow {
            edges.extend(bucket.iter().map(|a| Relation::new(src, tgt, a.clone())));
        }

        self.finalized = true;
        self.cached_graph = Some(edges.clone());
        edges
    }

    /// Shelves every edge of every simple cycle in `origin` into
    /// `origin_overflow`, repeating per strongly-connected component until
    /// none remain with internal edges. Each pass strictly shrinks the edge
    /// count of its component, so this always terminates.
    fn remove_cycles(&mut self) {
        loop {
            let (graph, _) = self.build_origin_graph();
            let mut shelved_any = false;

            for scc in tarjan_scc(&graph) {
                if scc.len() < 2 {
                    continue;
                }
                let scc_set: HashSet<NodeIndex> = scc.iter().copied().collect();
                if let Some(cycle_edges) = find_cycle_in(&graph, scc[0], &scc_set) {
                    for (a, b) in cycle_edges {
                        let src = graph[a];
                        let tgt = graph[b];
                        if let Some(attrs) = self.origin.remove(&(src, tgt)) {
                            self.origin_overflow.entry((src, tgt)).or_default().push(attrs);
                            self.listener.on_event(ReductionEvent::ShelvedCycle);
                            shelved_any = true;
                        }
                    }
                }
            }

            if !shelved_any {
                break;
            }
        }
    }

    /// Drops every `origin` edge `u -> v` for which a longer path `u -> .. -> v`
    /// still exists without it -- the edge is implied, not lost information.
    fn transitive_reduce(&mut self) {
        let (mut graph, idx_of) = self.build_origin_graph();
        let pairs: Vec<Pair> = self.origin.keys().copied().collect();

        for (src, tgt) in pairs {
            let (Some(&si), Some(&ti)) = (idx_of.get(&src), idx_of.get(&tgt)) else {
                continue;
            };
            let Some(eidx) = graph.find_edge(si, ti) else {
                continue;
            };
            graph.remove_edge(eidx);
            if has_path_connecting(&graph, si, ti, None) {
                self.origin.remove(&(src, tgt));
                self.listener
                    .on_event(ReductionEvent::TransitiveReductionRemoved);
            } else {
                graph.add_edge(si, ti, ());
            }
        }
    }

    /// Drops `related` edges whose endpoints already lie in the same weakly
    /// connected component of `origin ∪ sibling`: a bare `RELATED` edge adds
    /// no information once a more specific relation already connects the
    /// pair through some chain of edges.
    fn reduce_unspecific(&mut self) {
        let mut dsu: HashMap<NodeRef, NodeRef> = HashMap::new();
        for &(a, b) in self.origin.keys() {
            union(&mut dsu, a, b);
        }
        for &(a, b) in self.sibling.keys() {
            union(&mut dsu, a, b);
        }

        let redundant: Vec<Pair> = self
            .related
            .keys()
            .copied()
            .filter(|&(a, b)| {
                dsu.contains_key(&a) && dsu.contains_key(&b) && find(&mut dsu, a) == find(&mut dsu, b)
            })
            .collect();

        for key in redundant {
            self.related.remove(&key);
            self.listener
                .on_event(ReductionEvent::IntraComponentRelatedRemoved);
        }
    }

    fn build_origin_graph(&self) -> (DiGraph<NodeRef, ()>, HashMap<NodeRef, NodeIndex>) {
        let mut graph = DiGraph::new();
        let mut idx_of = HashMap::new();
        for (&(src, tgt), _) in &self.origin {
            let si = *idx_of.entry(src).or_insert_with(|| graph.add_node(src));
            let ti = *idx_of.entry(tgt).or_insert_with(|| graph.add_node(tgt));
            graph.add_edge(si, ti, ());
        }
        (graph, idx_of)
    }

    #[cfg(test)]
    pub fn origin_len(&self) -> usize {
        self.origin.len()
    }

    #[cfg(test)]
    pub fn origin_overflow_len(&self) -> usize {
        self.origin_overflow.values().map(Vec::len).sum()
    }

    #[cfg(test)]
    pub fn origin_attrs(&self, src: NodeRef, tgt: NodeRef) -> Option<&RelationAttributes> {
        self.origin.get(&(src, tgt))
    }

    #[cfg(test)]
    pub fn related_len(&self) -> usize {
        self.related.len()
    }
}

fn merge_if_possible(existing: &mut RelationAttributes, new: &RelationAttributes) -> bool {
    if existing.r#type.is_a(new.r#type) {
        existing.merge_into(new);
        true
    } else if new.r#type.is_a(existing.r#type) {
        existing.r#type = new.r#type;
        existing.merge_into(new);
        true
    } else {
        false
    }
}

fn find(dsu: &mut HashMap<NodeRef, NodeRef>, x: NodeRef) -> NodeRef {
    let parent = *dsu.entry(x).or_insert(x);
    if parent == x {
        x
    } else {
        let root = find(dsu, parent);
        dsu.insert(x, root);
        root
    }
}

fn union(dsu: &mut HashMap<NodeRef, NodeRef>, a: NodeRef, b: NodeRef) {
    let ra = find(dsu, a);
    let rb = find(dsu, b);
    if ra != rb {
        dsu.insert(ra, rb);
    }
}

/// Depth-first search from `start`, restricted to `scc_set`, that returns the
/// edge list of the first cycle it finds. Since `scc_set` is a non-trivial
/// strongly connected component, a cycle reachable from any of its members
/// always exists.
fn find_cycle_in(
    graph: &DiGraph<NodeRef, ()>,
    start: NodeIndex,
    scc_set: &HashSet<NodeIndex>,
) -> Option<Vec<(NodeIndex, NodeIndex)>> {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Unvisited,
        OnStack,
        Done,
    }

    let mut state: HashMap<NodeIndex, State> = scc_set.iter().map(|&n| (n, State::Unvisited)).collect();
    let mut path = Vec::new();

    fn visit(
        node: NodeIndex,
        graph: &DiGraph<NodeRef, ()>,
        scc_set: &HashSet<NodeIndex>,
        state: &mut HashMap<NodeIndex, State>,
        path: &mut Vec<NodeIndex>,
    ) -> Option<Vec<(NodeIndex, NodeIndex)>> {
        state.insert(node, State::OnStack);
        path.push(node);
        for neighbor in graph.neighbors(node) {
            if !scc_set.contains(&neighbor) {
                continue;
            }
            match state.get(&neighbor).copied().unwrap_or(State::Unvisited) {
                State::OnStack => {
                    let start_pos = path.iter().position(|&n| n == neighbor).unwrap();
                    let cycle_nodes = path[start_pos..].to_vec();
                    let mut edges: Vec<(NodeIndex, NodeIndex)> = cycle_nodes
                        .windows(2)
                        .map(|w| (w[0], w[1]))
                        .collect();
                    edges.push((*cycle_nodes.last().unwrap(), neighbor));
                    return Some(edges);
                }
                State::Unvisited => {
                    if let Some(cycle) = visit(neighbor, graph, scc_set, state, path) {
                        return Some(cycle);
                    }
                }
                State::Done => {}
            }
        }
        path.pop();
        state.insert(node, State::Done);
        None
    }

    visit(start, graph, scc_set, &mut state, &mut path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::RelationAttributes;

    fn lex(i: u32) -> NodeRef {
        NodeRef::Lexeme(i)
    }

    #[test]
    fn self_loop_is_dropped() {
        let mut store = RelationStore::new(None);
        let a = lex(0);
        store
            .add(
                Relation::new(a, a, RelationAttributes::new(RelationType::Borrowing)),
                None,
            )
            .unwrap();
        assert_eq!(store.origin_len(), 0);
    }

    #[test]
    fn more_specific_merge_then_more_specific_again() {
        // scenario: RELATED, then LEARNED_BORROWING, then BORROWING -- the
        // most specific type observed (LEARNED_BORROWING) wins.
        let mut store = RelationStore::new(None);
        let (a, b) = (lex(0), lex(1));
        store
            .add(
                Relation::new(a, b, RelationAttributes::new(RelationType::Related)),
                None,
            )
            .unwrap();
        store
            .add(
                Relation::new(a, b, RelationAttributes::new(RelationType::LearnedBorrowing)),
                None,
            )
            .unwrap();
        store
            .add(
                Relation::new(a, b, RelationAttributes::new(RelationType::Borrowing)),
                None,
            )
            .unwrap();
        assert_eq!(store.related_len(), 0);
        let attrs = store.origin_attrs(a, b).unwrap();
        assert_eq!(attrs.r#type, RelationType::LearnedBorrowing);
    }

    #[test]
    fn cycle_of_three_shelves_all_three_edges() {
        let mut store = RelationStore::new(None);
        let (a, b, c, d) = (lex(0), lex(1), lex(2), lex(3));
        for (x, y) in [(a, b), (b, c), (c, a), (c, d)] {
            store
                .add(
                    Relation::new(x, y, RelationAttributes::new(RelationType::Compound)),
                    None,
                )
                .unwrap();
        }
        assert_eq!(store.origin_len(), 4);
        let graph = store.finalize(false, false);
        let origin_edges: Vec<_> = graph
            .iter()
            .filter(|r| r.attrs.r#type.directed())
            .collect();
        assert_eq!(origin_edges.len(), 4);
        assert!(origin_edges.iter().any(|r| r.src == c && r.tgt == d));
        assert_eq!(store.origin_overflow_len(), 3);
    }

    #[test]
    fn historical_swap_orients_to_older_language() {
        let mut pool = crate::string_pool::StringPool::new();
        let enm = Lang::new(&mut pool, "enm");
        let en = Lang::new(&mut pool, "en");
        let tree = LanguageTree::from_edges([(enm, en)]);
        let mut store = RelationStore::new(Some(tree));
        let (en_word, enm_word) = (lex(0), lex(1));
        store
            .add(
                Relation::new(en_word, enm_word, RelationAttributes::new(RelationType::Inheritance)),
                Some((en, enm)),
            )
            .unwrap();
        assert!(store.origin_attrs(enm_word, en_word).is_some());
        assert!(store.origin_attrs(en_word, enm_word).is_none());
    }

    #[test]
    fn transitive_reduction_drops_implied_edge() {
        let mut store = RelationStore::new(None);
        let (a, b, c) = (lex(0), lex(1), lex(2));
        for (x, y) in [(a, b), (b, c), (a, c)] {
            store
                .add(
                    Relation::new(x, y, RelationAttributes::new(RelationType::Inheritance)),
                    None,
                )
                .unwrap();
        }
        let graph = store.finalize(true, false);
        assert!(!graph.iter().any(|r| r.src == a && r.tgt == c));
        assert!(graph.iter().any(|r| r.src == a && r.tgt == b));
        assert!(graph.iter().any(|r| r.src == b && r.tgt == c));
    }

    #[test]
    fn unspecific_related_dropped_once_component_connected() {
        let mut store = RelationStore::new(None);
        let (a, b) = (lex(0), lex(1));
        store
            .add(
                Relation::new(a, b, RelationAttributes::new(RelationType::Related)),
                None,
            )
            .unwrap();
        store
            .add(
                Relation::new(a, b, RelationAttributes::new(RelationType::Borrowing)),
                None,
            )
            .unwrap();
        assert_eq!(store.related_len(), 0);

        let (c, d) = (lex(2), lex(3));
        store
            .add(
                Relation::new(c, d, RelationAttributes::new(RelationType::Related)),
                None,
            )
            .unwrap();
        store
            .add(
                Relation::new(d, c, RelationAttributes::new(RelationType::Cognate)),
                None,
            )
            .unwrap();
        assert_eq!(store.related_len(), 0);

        let graph = store.finalize(false, true);
        assert!(!graph.iter().any(|r| r.attrs.r#type == RelationType::Related));
    }

    #[test]
    fn add_after_finalize_is_rejected() {
        let mut store = RelationStore::new(None);
        store.finalize(false, false);
        let err = store.add(
            Relation::new(lex(0), lex(1), RelationAttributes::new(RelationType::Related)),
            None,
        );
        assert!(matches!(err, Err(CoreError::AlreadyFinalized)));
    }

    #[test]
    fn finalize_is_idempotent() {
        let mut store = RelationStore::new(None);
        store
            .add(
                Relation::new(lex(0), lex(1), RelationAttributes::new(RelationType::Root)),
                None,
            )
            .unwrap();
        let first = store.finalize(true, true);
        let second = store.finalize(true, true);
        assert_eq!(first.len(), second.len());
    }
}
