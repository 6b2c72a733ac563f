//! Neighborhood-aware candidate indexes.
//!
//! Both indexes compare the `h`-hop walks leaving a pattern node with the
//! `h`-hop walks leaving a data node, for `h` in `1..=radius`. Data walks
//! ignore edge lifetimes, and an injective embedding maps distinct pattern
//! walks to distinct data walks, so neither filter drops a node that takes
//! part in a match.

use super::{base_lifespan, CandidateIndex, CandidateRankings, Ranking};
use crate::context::QueryContext;
use ahash::AHashMap;
use dashmap::DashMap;
use durograph_temporal::{LabelId, Lifespan, NodeId, PatternGraph, PatternNodeId, TemporalGraph};
use rayon::prelude::*;
use std::sync::Arc;

// ============================================================================
// Profiles
// ============================================================================

/// Walk endpoints of one data node: `walks[h - 1][m]` is the number of
/// walks of length `h` from the node to `m`.
#[derive(Debug, Clone, Default)]
pub struct NeighborProfile {
    walks: Vec<AHashMap<NodeId, u64>>,
}

impl NeighborProfile {
    pub fn build(graph: &TemporalGraph, node: NodeId, radius: usize) -> Self {
        let mut walks = Vec::with_capacity(radius);
        let mut frontier: AHashMap<NodeId, u64> = AHashMap::new();
        frontier.insert(node, 1);

        for _ in 0..radius {
            let mut next: AHashMap<NodeId, u64> = AHashMap::new();
            for (&from, &count) in &frontier {
                for (to, _) in graph.adjacency(from) {
                    let slot = next.entry(to).or_insert(0);
                    *slot = slot.saturating_add(count);
                }
            }
            walks.push(next.clone());
            frontier = next;
        }

        Self { walks }
    }

    pub fn radius(&self) -> usize {
        self.walks.len()
    }

    fn endpoints(&self, hop: usize) -> impl Iterator<Item = (NodeId, u64)> + '_ {
        self.walks
            .get(hop - 1)
            .into_iter()
            .flat_map(|ends| ends.iter().map(|(&node, &count)| (node, count)))
    }

    /// Instants at which some `hop`-walk ends at a node holding `label`.
    pub fn label_life(&self, graph: &TemporalGraph, hop: usize, label: LabelId) -> Lifespan {
        let mut life = Lifespan::new();
        for (node, _) in self.endpoints(hop) {
            if let Some(held) = graph.label_lifespan(node, label) {
                life.union_with(held);
            }
        }
        life
    }

    /// Walks of length `hop` ending at a node that ever holds `label`.
    pub fn count_holding(&self, graph: &TemporalGraph, hop: usize, label: LabelId) -> u64 {
        self.endpoints(hop)
            .filter(|&(node, _)| graph.label_lifespan(node, label).is_some())
            .fold(0u64, |acc, (_, count)| acc.saturating_add(count))
    }

    /// Walks of length `hop` ending at a node holding `label` at instant `t`.
    pub fn count_at(&self, graph: &TemporalGraph, hop: usize, label: LabelId, t: u32) -> u64 {
        self.endpoints(hop)
            .filter(|&(node, _)| graph.label_lifespan(node, label).is_some_and(|l| l.contains(t)))
            .fold(0u64, |acc, (_, count)| acc.saturating_add(count))
    }
}

/// Label demand of one pattern node: `required[h - 1][label]` is the number
/// of `h`-walks from the node ending at a pattern node with that label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternProfile {
    required: Vec<AHashMap<LabelId, u64>>,
}

impl PatternProfile {
    pub fn build(pattern: &PatternGraph, p: PatternNodeId, radius: usize) -> Self {
        let mut required = Vec::with_capacity(radius);
        let mut frontier: AHashMap<PatternNodeId, u64> = AHashMap::new();
        frontier.insert(p, 1);

        for _ in 0..radius {
            let mut next: AHashMap<PatternNodeId, u64> = AHashMap::new();
            for (&from, &count) in &frontier {
                for &to in pattern.adjacency(from) {
                    let slot = next.entry(to).or_insert(0);
                    *slot = slot.saturating_add(count);
                }
            }

            let mut by_label: AHashMap<LabelId, u64> = AHashMap::new();
            for (&node, &count) in &next {
                let slot = by_label.entry(pattern.label(node)).or_insert(0);
                *slot = slot.saturating_add(count);
            }
            required.push(by_label);
            frontier = next;
        }

        Self { required }
    }

    /// `(hop, label, walks)` triples, hops starting at 1.
    pub fn demands(&self) -> impl Iterator<Item = (usize, LabelId, u64)> + '_ {
        self.required.iter().enumerate().flat_map(|(i, labels)| {
            labels.iter().map(move |(&label, &count)| (i + 1, label, count))
        })
    }
}

/// Profiles computed on demand and shared by the per-pattern-node workers.
struct ProfileCache<'g> {
    graph: &'g TemporalGraph,
    radius: usize,
    profiles: DashMap<NodeId, Arc<NeighborProfile>>,
}

impl<'g> ProfileCache<'g> {
    fn new(graph: &'g TemporalGraph, radius: usize) -> Self {
        Self {
            graph,
            radius,
            profiles: DashMap::new(),
        }
    }

    fn get(&self, node: NodeId) -> Arc<NeighborProfile> {
        if let Some(found) = self.profiles.get(&node) {
            return Arc::clone(found.value());
        }
        let built = Arc::new(NeighborProfile::build(self.graph, node, self.radius));
        Arc::clone(self.profiles.entry(node).or_insert(built).value())
    }
}

// ============================================================================
// Filters
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Filter {
    Presence,
    Counted,
}

/// Narrow `life` to the instants at which the neighborhood demands hold.
/// Returns `false` when the node cannot serve the pattern node at all.
fn apply_filter(
    ctx: &QueryContext<'_>,
    filter: Filter,
    profile: &NeighborProfile,
    wanted: &PatternProfile,
    life: &mut Lifespan,
) -> bool {
    let graph = ctx.graph;
    match (filter, ctx.track_labels) {
        (Filter::Presence, true) => {
            for (hop, label, _) in wanted.demands() {
                life.intersect_with(&profile.label_life(graph, hop, label));
                if life.is_empty() {
                    return false;
                }
            }
        }
        (Filter::Presence, false) => {
            if wanted
                .demands()
                .any(|(hop, label, _)| profile.count_holding(graph, hop, label) == 0)
            {
                return false;
            }
        }
        (Filter::Counted, true) => {
            let demands: Vec<_> = wanted.demands().collect();
            life.retain(|t| {
                demands
                    .iter()
                    .all(|&(hop, label, need)| profile.count_at(graph, hop, label, t) >= need)
            });
        }
        (Filter::Counted, false) => {
            if wanted
                .demands()
                .any(|(hop, label, need)| profile.count_holding(graph, hop, label) < need)
            {
                return false;
            }
        }
    }
    !life.is_empty()
}

fn build_rankings(ctx: &QueryContext<'_>, radius: usize, min_score: u32, filter: Filter) -> CandidateRankings {
    let cache = ProfileCache::new(ctx.graph, radius);

    let rankings = (0..ctx.pattern.len())
        .into_par_iter()
        .map(|p| {
            let mut ranking = Ranking::new();
            let Some(holders) = ctx.graph.nodes_with_label(ctx.pattern.label(p)) else {
                return ranking;
            };
            let wanted = PatternProfile::build(ctx.pattern, p, radius);

            for node in holders.iter() {
                let Some(mut life) = base_lifespan(ctx, node, p) else {
                    continue;
                };
                let profile = cache.get(node);
                if !apply_filter(ctx, filter, &profile, &wanted, &mut life) {
                    continue;
                }
                let score = ctx.duration(&life);
                if score >= min_score {
                    ranking.insert(score, node);
                }
            }
            ranking
        })
        .collect();

    CandidateRankings::new(rankings)
}

// ============================================================================
// Indexes
// ============================================================================

/// Label index narrowed by the labels reachable within `radius` hops.
#[derive(Debug, Clone)]
pub struct NeighborLabelIndex {
    radius: usize,
    rankings: CandidateRankings,
}

impl NeighborLabelIndex {
    pub fn build(ctx: &QueryContext<'_>, radius: usize, min_score: u32) -> Self {
        Self {
            radius,
            rankings: build_rankings(ctx, radius, min_score, Filter::Presence),
        }
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn rankings(&self) -> &CandidateRankings {
        &self.rankings
    }
}

impl CandidateIndex for NeighborLabelIndex {
    fn name(&self) -> &'static str {
        "neighbor-label"
    }

    fn len(&self) -> usize {
        self.rankings.len()
    }

    fn ranking(&self, p: PatternNodeId) -> Option<&Ranking> {
        self.rankings.get(p)
    }
}

/// Label index narrowed by per-instant walk counts within `radius` hops.
#[derive(Debug, Clone)]
pub struct CountedNeighborLabelIndex {
    radius: usize,
    rankings: CandidateRankings,
}

impl CountedNeighborLabelIndex {
    pub fn build(ctx: &QueryContext<'_>, radius: usize, min_score: u32) -> Self {
        Self {
            radius,
            rankings: build_rankings(ctx, radius, min_score, Filter::Counted),
        }
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn rankings(&self) -> &CandidateRankings {
        &self.rankings
    }
}

impl CandidateIndex for CountedNeighborLabelIndex {
    fn name(&self) -> &'static str {
        "counted-neighbor-label"
    }

    fn len(&self) -> usize {
        self.rankings.len()
    }

    fn ranking(&self, p: PatternNodeId) -> Option<&Ranking> {
        self.rankings.get(p)
    }
}
