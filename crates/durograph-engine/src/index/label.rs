use super::{base_lifespan, CandidateIndex, CandidateRankings, Ranking};
use crate::context::QueryContext;
use durograph_temporal::PatternNodeId;
use rayon::prelude::*;

/// Per-label index: a node is a candidate for `p` when it holds `p`'s label
/// inside the interval; its score is the duration of that activity.
#[derive(Debug, Clone)]
pub struct LabelIndex {
    rankings: CandidateRankings,
}

impl LabelIndex {
    pub fn build(ctx: &QueryContext<'_>, min_score: u32) -> Self {
        let rankings = (0..ctx.pattern.len())
            .into_par_iter()
            .map(|p| rank_pattern_node(ctx, p, min_score))
            .collect();
        Self {
            rankings: CandidateRankings::new(rankings),
        }
    }

    pub fn rankings(&self) -> &CandidateRankings {
        &self.rankings
    }
}

fn rank_pattern_node(ctx: &QueryContext<'_>, p: PatternNodeId, min_score: u32) -> Ranking {
    let mut ranking = Ranking::new();
    let Some(holders) = ctx.graph.nodes_with_label(ctx.pattern.label(p)) else {
        return ranking;
    };

    for node in holders.iter() {
        let Some(life) = base_lifespan(ctx, node, p) else {
            continue;
        };
        let score = ctx.duration(&life);
        if score >= min_score {
            ranking.insert(score, node);
        }
    }
    ranking
}

impl CandidateIndex for LabelIndex {
    fn name(&self) -> &'static str {
        "label"
    }

    fn len(&self) -> usize {
        self.rankings.len()
    }

    fn ranking(&self, p: PatternNodeId) -> Option<&Ranking> {
        self.rankings.get(p)
    }
}
