//! MatchEvaluator: exact lifespan of a full assignment and the
//! accept/replace/dedup rules that keep the result set globally correct.

use crate::config::{QueryConfig, QueryMode, RankingPolicy};
use crate::context::QueryContext;
use crate::results::{BestMatches, Match, ResultSet, TopKMatches};
use durograph_temporal::{Lifespan, NodeId};
use std::collections::BTreeSet;

/// What happened to one evaluated assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Lifespan fell below the threshold (or a bound edge is missing).
    TooShort,
    /// Signature already reported.
    Duplicate,
    /// Valid but not kept (cap reached, or tied with a full heap's minimum).
    Dropped,
    Accepted,
}

pub struct MatchEvaluator<'a> {
    ctx: QueryContext<'a>,
    policy: RankingPolicy,
    result_cap: usize,
    dedup: bool,
    threshold: u32,
    tried: BTreeSet<u32>,
    results: ResultSet,
}

impl<'a> MatchEvaluator<'a> {
    pub fn new(ctx: QueryContext<'a>, config: &QueryConfig) -> Self {
        let results = match config.mode {
            QueryMode::Best => ResultSet::Best(BestMatches::default()),
            QueryMode::TopK { k } => ResultSet::TopK(TopKMatches::new(k)),
        };
        Self {
            ctx,
            policy: config.policy,
            result_cap: config.result_cap,
            dedup: config.dedup_signatures(),
            threshold: 0,
            tried: BTreeSet::new(),
            results,
        }
    }

    /// Prepare for a run at `theta`; results from earlier runs are kept.
    pub fn start_run(&mut self, theta: u32, tried: &BTreeSet<u32>) {
        self.threshold = theta;
        self.tried.clone_from(tried);
    }

    /// Current threshold. It only rises during a run.
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    pub fn into_results(self) -> ResultSet {
        self.results
    }

    /// Whether the search must stop because best mode hit the result cap.
    /// Never true under the min policy or in top-k mode.
    pub fn is_capped(&self) -> bool {
        match &self.results {
            ResultSet::Best(best) => self.policy != RankingPolicy::Min && best.len() >= self.result_cap,
            ResultSet::TopK(_) => false,
        }
    }

    /// Whether the matches required by the query mode are present.
    pub fn is_satisfied(&self) -> bool {
        match &self.results {
            ResultSet::Best(best) => !best.is_empty(),
            ResultSet::TopK(top) => top.is_full(),
        }
    }

    /// Lifespan of `assignment`, rebuilt from scratch. `None` as soon as an
    /// intermediate intersection drops below the threshold.
    pub fn lifespan(&self, assignment: &[NodeId]) -> Option<Lifespan> {
        let ctx = &self.ctx;
        let floor = self.threshold.max(1);
        let mut life = ctx.interval.clone();

        if ctx.track_labels {
            for (p, &node) in assignment.iter().enumerate() {
                life.intersect_with(ctx.label_life(node, ctx.pattern.label(p))?);
                if ctx.duration(&life) < floor {
                    return None;
                }
            }
        }

        for (parent, child) in ctx.pattern.edges() {
            let lifetime = ctx.graph.edge(assignment[parent], assignment[child])?;
            life.intersect_with(lifetime);
            if ctx.duration(&life) < floor {
                return None;
            }
        }

        if ctx.duration(&life) < floor {
            return None;
        }
        Some(life)
    }

    pub fn evaluate(&mut self, assignment: &[NodeId]) -> Verdict {
        let Some(lifespan) = self.lifespan(assignment) else {
            return Verdict::TooShort;
        };
        let found = Match {
            duration: self.ctx.duration(&lifespan),
            lifespan,
            assignment: assignment.to_vec(),
        };

        match &mut self.results {
            ResultSet::Best(best) => {
                if self.dedup && best.contains_signature(&found.assignment) {
                    return Verdict::Duplicate;
                }
                if found.duration > best.best_duration() {
                    best.reset_to(found.duration);
                    self.threshold = self.threshold.max(found.duration);
                    best.push(found);
                    Verdict::Accepted
                } else if found.duration == best.best_duration() && best.len() < self.result_cap {
                    best.push(found);
                    Verdict::Accepted
                } else {
                    Verdict::Dropped
                }
            }
            ResultSet::TopK(top) => {
                if self.dedup && top.contains_signature(&found.assignment) {
                    return Verdict::Duplicate;
                }
                let duration = found.duration;
                match top.min_duration() {
                    _ if !top.is_full() => {
                        top.push(found);
                        if top.is_full() {
                            if let Some(min) = top.min_duration() {
                                self.threshold = self.threshold.max(min);
                            }
                        }
                        Verdict::Accepted
                    }
                    Some(min) if duration > min => {
                        top.pop_min();
                        top.push(found);
                        if let Some(min) = top.min_duration() {
                            self.threshold = self.threshold.max(min);
                        }
                        Verdict::Accepted
                    }
                    Some(min) if duration == min => {
                        let mut raised = duration + 1;
                        if self.policy == RankingPolicy::Adaptive {
                            while self.tried.contains(&raised) {
                                raised += 1;
                            }
                        }
                        self.threshold = self.threshold.max(raised);
                        Verdict::Dropped
                    }
                    _ => Verdict::Dropped,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use durograph_temporal::{LabelId, PatternGraph, TemporalGraph};

    /// Two-node pattern over a star whose spokes live 5, 5 and 3 instants.
    fn fixture() -> (TemporalGraph, PatternGraph) {
        let (hub, leaf) = (LabelId::new(0), LabelId::new(1));
        let mut builder = TemporalGraph::builder(8, true);
        builder.set_label_span(0, hub, 0..8).unwrap();
        for node in 1..4 {
            builder.set_label_span(node, leaf, 0..8).unwrap();
        }
        builder.add_edge_span(0, 1, 0..5).unwrap();
        builder.add_edge_span(0, 2, 3..8).unwrap();
        builder.add_edge_span(0, 3, 0..3).unwrap();

        let mut pattern = PatternGraph::new(0, true);
        let a = pattern.add_node(hub);
        let b = pattern.add_node(leaf);
        pattern.add_edge(a, b).unwrap();
        (builder.build(), pattern)
    }

    fn evaluator<'a>(
        graph: &'a TemporalGraph,
        pattern: &'a PatternGraph,
        config: &'a QueryConfig,
    ) -> MatchEvaluator<'a> {
        let ctx = QueryContext::new(
            graph,
            pattern,
            &config.interval,
            config.duration_mode,
            config.track_label_changes,
        );
        let mut evaluator = MatchEvaluator::new(ctx, config);
        evaluator.start_run(2, &BTreeSet::new());
        evaluator
    }

    #[test]
    fn best_mode_replaces_on_longer_and_rejects_duplicates() {
        let (graph, pattern) = fixture();
        let config = QueryConfig::builder(Lifespan::full(8)).build().unwrap();
        let mut eval = evaluator(&graph, &pattern, &config);

        assert_eq!(eval.evaluate(&[0, 3]), Verdict::Accepted);
        assert_eq!(eval.threshold(), 3);
        assert_eq!(eval.evaluate(&[0, 1]), Verdict::Accepted);
        assert_eq!(eval.threshold(), 5);
        assert_eq!(eval.evaluate(&[0, 2]), Verdict::Accepted);
        assert_eq!(eval.evaluate(&[0, 2]), Verdict::Duplicate);
        assert_eq!(eval.evaluate(&[0, 3]), Verdict::TooShort);

        let matches = eval.into_results().into_sorted();
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|m| m.duration == 5));
    }

    #[test]
    fn top_k_raises_threshold_on_tie_with_full_heap() {
        let (graph, pattern) = fixture();
        let config = QueryConfig::builder(Lifespan::full(8)).top_k(1).build().unwrap();
        let mut eval = evaluator(&graph, &pattern, &config);

        assert_eq!(eval.evaluate(&[0, 1]), Verdict::Accepted);
        assert_eq!(eval.threshold(), 5);
        assert_eq!(eval.evaluate(&[0, 2]), Verdict::Dropped);
        assert_eq!(eval.threshold(), 6);
        assert!(eval.is_satisfied());
    }

    #[test]
    fn cap_stops_best_mode_except_under_min() {
        let (graph, pattern) = fixture();
        let capped = QueryConfig::builder(Lifespan::full(8)).result_cap(1).build().unwrap();
        let mut eval = evaluator(&graph, &pattern, &capped);
        eval.evaluate(&[0, 1]);
        assert!(eval.is_capped());
        assert_eq!(eval.evaluate(&[0, 2]), Verdict::Dropped);

        let min = QueryConfig::builder(Lifespan::full(8))
            .result_cap(1)
            .policy(RankingPolicy::Min)
            .build()
            .unwrap();
        let mut eval = evaluator(&graph, &pattern, &min);
        eval.evaluate(&[0, 1]);
        assert!(!eval.is_capped());
    }
}
