//! Candidate indexes: pattern node -> ranking `{ score -> data nodes }`.
//!
//! A score is an upper bound on the duration of any match that binds the
//! node to that pattern position, so "all nodes with score ≥ θ" is a sound
//! candidate set for a run at threshold θ.
//!
//! Four indexes are provided, all read-only side tables built per
//! (graph, pattern, query):
//!
//! - [`LabelIndex`]: label activity inside the query interval.
//! - [`NeighborLabelIndex`]: additionally requires the labels reachable by
//!   `h`-hop walks in the pattern to be reachable from the data node.
//! - [`CountedNeighborLabelIndex`]: as above, with walk counts checked per
//!   instant.
//! - [`PathLabelIndex`]: requires every label path leaving the pattern node
//!   to be walkable from the data node while its edges are alive.

mod label;
mod neighbor;
mod path;

pub use label::LabelIndex;
pub use neighbor::{CountedNeighborLabelIndex, NeighborLabelIndex, NeighborProfile, PatternProfile};
pub use path::{path_life, PathLabelIndex, PatternPaths};

use crate::config::QueryConfig;
use crate::context::QueryContext;
use durograph_temporal::{Lifespan, NodeId, PatternNodeId};
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Ranking
// ============================================================================

/// Ascending `score -> nodes` map for one pattern node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    by_score: BTreeMap<u32, RoaringBitmap>,
}

impl Ranking {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, score: u32, node: NodeId) {
        self.by_score.entry(score).or_default().insert(node);
    }

    pub fn is_empty(&self) -> bool {
        self.by_score.is_empty()
    }

    /// Number of distinct scores.
    pub fn len(&self) -> usize {
        self.by_score.len()
    }

    pub fn max_score(&self) -> Option<u32> {
        self.by_score.keys().next_back().copied()
    }

    pub fn min_score(&self) -> Option<u32> {
        self.by_score.keys().next().copied()
    }

    /// Union of all entries with score ≥ `theta`.
    pub fn candidates_at_least(&self, theta: u32) -> RoaringBitmap {
        let mut out = RoaringBitmap::new();
        for nodes in self.by_score.range(theta..).map(|(_, nodes)| nodes) {
            out |= nodes;
        }
        out
    }

    pub fn count_at_least(&self, theta: u32) -> u64 {
        self.by_score.range(theta..).map(|(_, nodes)| nodes.len()).sum()
    }

    pub fn greatest_score_below(&self, theta: u32) -> Option<u32> {
        self.by_score.range(..theta).next_back().map(|(&score, _)| score)
    }

    pub fn scores_descending(&self) -> impl Iterator<Item = u32> + '_ {
        self.by_score.keys().rev().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &RoaringBitmap)> + '_ {
        self.by_score.iter().map(|(&score, nodes)| (score, nodes))
    }

    /// Total number of ranked nodes.
    pub fn node_count(&self) -> u64 {
        self.count_at_least(0)
    }
}

/// One ranking per pattern node, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateRankings {
    rankings: Vec<Ranking>,
}

impl CandidateRankings {
    pub fn new(rankings: Vec<Ranking>) -> Self {
        Self { rankings }
    }

    pub fn len(&self) -> usize {
        self.rankings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rankings.is_empty()
    }

    pub fn get(&self, p: PatternNodeId) -> Option<&Ranking> {
        self.rankings.get(p)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ranking> + '_ {
        self.rankings.iter()
    }
}

// ============================================================================
// Index interface
// ============================================================================

/// Read-only candidate source consulted once per threshold run.
pub trait CandidateIndex: Send + Sync {
    /// Short name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Number of pattern nodes covered.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ranking(&self, p: PatternNodeId) -> Option<&Ranking>;
}

impl CandidateIndex for CandidateRankings {
    fn name(&self) -> &'static str {
        "rankings"
    }

    fn len(&self) -> usize {
        self.rankings.len()
    }

    fn ranking(&self, p: PatternNodeId) -> Option<&Ranking> {
        self.rankings.get(p)
    }
}

/// Build the index selected by `config.index`.
pub fn build_candidate_index(ctx: &QueryContext<'_>, config: &QueryConfig) -> Box<dyn CandidateIndex> {
    let min_score = config.min_score;
    let selection = config.index;
    if let Some(radius) = selection.neighbor_radius {
        Box::new(NeighborLabelIndex::build(ctx, radius, min_score))
    } else if let Some(radius) = selection.counted_neighbor_radius {
        Box::new(CountedNeighborLabelIndex::build(ctx, radius, min_score))
    } else if let Some(depth) = selection.path_depth {
        Box::new(PathLabelIndex::build(ctx, depth, min_score))
    } else {
        Box::new(LabelIndex::build(ctx, min_score))
    }
}

/// Upper bound on the lifespan of any match binding `node` at `p`, or
/// `None` if `node` can never be bound there.
///
/// With label tracking this is `interval ∩ label`. Without it, labels only
/// gate membership and the bound is `interval ∩ ⋃ out-edge lifetimes` when
/// `p` has outgoing pattern edges.
pub(crate) fn base_lifespan(ctx: &QueryContext<'_>, node: NodeId, p: PatternNodeId) -> Option<Lifespan> {
    let label = ctx.label_life(node, ctx.pattern.label(p))?;
    if ctx.track_labels {
        return Some(ctx.interval.intersect(label));
    }
    if ctx.pattern.adjacency(p).is_empty() {
        return Some(ctx.interval.clone());
    }
    let mut edges = Lifespan::new();
    for (_, lifetime) in ctx.graph.adjacency(node) {
        edges.union_with(lifetime);
    }
    edges.intersect_with(ctx.interval);
    Some(edges)
}
