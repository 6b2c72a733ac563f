//! Path-label candidate index.
//!
//! For every pattern node the index collects the label sequences of the
//! non-backtracking walks of up to `depth` edges that leave it. A data node
//! keeps only the instants at which it starts a walk with each of those
//! label sequences whose edges (and, when tracked, labels) are alive.
//!
//! An injective embedding maps a non-backtracking pattern walk to a
//! non-backtracking data walk with the same labels, alive throughout the
//! match, so the filter never drops an instant a match needs.

use super::{base_lifespan, CandidateIndex, CandidateRankings, Ranking};
use crate::context::QueryContext;
use dashmap::DashMap;
use durograph_temporal::{LabelId, Lifespan, NodeId, PatternGraph, PatternNodeId};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Maximal label paths leaving one pattern node.
///
/// A path that is a strict prefix of another is dropped: every walk with the
/// longer label sequence starts with a walk carrying the shorter one, so the
/// longer path's lifespan is already contained in the shorter one's.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternPaths {
    paths: Vec<Vec<LabelId>>,
}

impl PatternPaths {
    pub fn build(pattern: &PatternGraph, p: PatternNodeId, depth: usize) -> Self {
        let mut found: BTreeSet<Vec<LabelId>> = BTreeSet::new();
        let mut stack: Vec<(Option<PatternNodeId>, PatternNodeId, Vec<LabelId>)> = vec![(None, p, Vec::new())];

        while let Some((prev, at, labels)) = stack.pop() {
            if labels.len() == depth {
                found.insert(labels);
                continue;
            }
            let mut extended = false;
            for &next in pattern.adjacency(at) {
                if Some(next) == prev {
                    continue;
                }
                let mut longer = labels.clone();
                longer.push(pattern.label(next));
                stack.push((Some(at), next, longer));
                extended = true;
            }
            if !extended && !labels.is_empty() {
                found.insert(labels);
            }
        }

        let all: Vec<Vec<LabelId>> = found.into_iter().collect();
        let paths = all
            .iter()
            .filter(|path| {
                !all.iter()
                    .any(|other| other.len() > path.len() && other.starts_with(path))
            })
            .cloned()
            .collect();
        Self { paths }
    }

    pub fn paths(&self) -> &[Vec<LabelId>] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Lifespans of `(data node, label path)` pairs, shared by the
/// per-pattern-node workers of one build.
struct PathLifeCache<'a> {
    ctx: QueryContext<'a>,
    lives: DashMap<(NodeId, Vec<LabelId>), Arc<Lifespan>>,
}

impl<'a> PathLifeCache<'a> {
    fn new(ctx: QueryContext<'a>) -> Self {
        Self {
            ctx,
            lives: DashMap::new(),
        }
    }

    fn get(&self, node: NodeId, path: &[LabelId]) -> Arc<Lifespan> {
        let key = (node, path.to_vec());
        if let Some(found) = self.lives.get(&key) {
            return Arc::clone(found.value());
        }
        let built = Arc::new(path_life(&self.ctx, node, path));
        Arc::clone(self.lives.entry(key).or_insert(built).value())
    }
}

/// Instants of the query interval at which some non-backtracking walk from
/// `start` follows `path` with every edge alive (and every label held, when
/// label changes are tracked).
pub fn path_life(ctx: &QueryContext<'_>, start: NodeId, path: &[LabelId]) -> Lifespan {
    let mut out = Lifespan::new();
    extend(ctx, None, start, path, ctx.interval, &mut out);
    out
}

fn extend(
    ctx: &QueryContext<'_>,
    prev: Option<NodeId>,
    at: NodeId,
    rest: &[LabelId],
    life: &Lifespan,
    out: &mut Lifespan,
) {
    let Some((&label, rest)) = rest.split_first() else {
        out.union_with(life);
        return;
    };

    for (next, lifetime) in ctx.graph.adjacency(at) {
        if Some(next) == prev {
            continue;
        }
        let Some(held) = ctx.label_life(next, label) else {
            continue;
        };
        let mut step = life.intersect(lifetime);
        if ctx.track_labels {
            step.intersect_with(held);
        }
        if !step.is_empty() {
            extend(ctx, Some(at), next, rest, &step, out);
        }
    }
}

/// Label index narrowed by the label paths of up to `depth` edges.
#[derive(Debug, Clone)]
pub struct PathLabelIndex {
    depth: usize,
    rankings: CandidateRankings,
}

impl PathLabelIndex {
    pub fn build(ctx: &QueryContext<'_>, depth: usize, min_score: u32) -> Self {
        let cache = PathLifeCache::new(*ctx);

        let rankings = (0..ctx.pattern.len())
            .into_par_iter()
            .map(|p| {
                let mut ranking = Ranking::new();
                let Some(holders) = ctx.graph.nodes_with_label(ctx.pattern.label(p)) else {
                    return ranking;
                };
                let wanted = PatternPaths::build(ctx.pattern, p, depth);

                'nodes: for node in holders.iter() {
                    let Some(mut life) = base_lifespan(ctx, node, p) else {
                        continue;
                    };
                    for path in wanted.paths() {
                        if life.is_empty() {
                            continue 'nodes;
                        }
                        life.intersect_with(&cache.get(node, path));
                    }
                    let score = ctx.duration(&life);
                    if score >= min_score {
                        ranking.insert(score, node);
                    }
                }
                ranking
            })
            .collect();

        Self {
            depth,
            rankings: CandidateRankings::new(rankings),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn rankings(&self) -> &CandidateRankings {
        &self.rankings
    }
}

impl CandidateIndex for PathLabelIndex {
    fn name(&self) -> &'static str {
        "path-label"
    }

    fn len(&self) -> usize {
        self.rankings.len()
    }

    fn ranking(&self, p: PatternNodeId) -> Option<&Ranking> {
        self.rankings.get(p)
    }
}
