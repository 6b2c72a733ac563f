//! Query dispatch over a rayon worker pool.
//!
//! Every pattern gets one candidate index, shared read-only by the jobs that
//! run it under each requested ranking policy.

use anyhow::{Context, Result};
use durograph_engine::{
    build_candidate_index, DurableMatcher, QueryConfig, QueryContext, QueryReport, RankingPolicy,
};
use durograph_temporal::{PatternGraph, TemporalGraph};
use rayon::prelude::*;

/// Run every `(pattern, policy)` combination on a pool of `workers` threads
/// (0 = one per core). Reports come back in pattern order, then policy order.
pub fn run_queries(
    graph: &TemporalGraph,
    patterns: &[PatternGraph],
    base: &QueryConfig,
    policies: &[RankingPolicy],
    workers: usize,
) -> Result<Vec<QueryReport>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("durograph-worker-{i}"))
        .build()
        .context("starting worker pool")?;

    let matcher = DurableMatcher::new(graph);

    let per_pattern: Vec<Vec<QueryReport>> = pool.install(|| {
        patterns
            .par_iter()
            .map(|pattern| run_pattern(&matcher, pattern, base, policies))
            .collect::<Result<Vec<_>>>()
    })?;

    Ok(per_pattern.into_iter().flatten().collect())
}

fn run_pattern(
    matcher: &DurableMatcher<'_>,
    pattern: &PatternGraph,
    base: &QueryConfig,
    policies: &[RankingPolicy],
) -> Result<Vec<QueryReport>> {
    let ctx = QueryContext::new(
        matcher.graph(),
        pattern,
        &base.interval,
        base.duration_mode,
        base.track_label_changes,
    );
    let index = build_candidate_index(&ctx, base);
    tracing::debug!(pattern = pattern.id(), index = index.name(), "index ready");

    policies
        .par_iter()
        .map(|&policy| {
            let config = QueryConfig {
                policy,
                ..base.clone()
            };
            let outcome = matcher
                .run_with_index(pattern, &config, index.as_ref())
                .with_context(|| format!("pattern {} ({policy})", pattern.id()))?;
            Ok(QueryReport::new(pattern.id(), &config, &outcome))
        })
        .collect()
}
