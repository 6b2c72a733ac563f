//! Engine tests: end-to-end queries, limits, and brute-force cross-checks.

use durograph_engine::*;
use durograph_temporal::{LabelId, Lifespan, NodeId, PatternGraph, TemporalGraph};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::time::Duration;

const A: LabelId = LabelId::new(0);
const B: LabelId = LabelId::new(1);
const C: LabelId = LabelId::new(2);

fn pattern(directed: bool, labels: &[LabelId], edges: &[(usize, usize)]) -> PatternGraph {
    let mut pattern = PatternGraph::new(0, directed);
    for &label in labels {
        pattern.add_node(label);
    }
    for &(src, dst) in edges {
        pattern.add_edge(src, dst).unwrap();
    }
    pattern
}

fn run(graph: &TemporalGraph, pattern: &PatternGraph, config: &QueryConfig) -> QueryOutcome {
    DurableMatcher::new(graph).run(pattern, config).unwrap()
}

/// Triangle 0-1-2 (labels A, B, C) alive together during {1, 2, 3}, plus a
/// long-lived edge 0-3 that closes no triangle.
fn triangle_graph() -> TemporalGraph {
    let mut builder = TemporalGraph::builder(8, false);
    builder.set_label_span(0, A, 0..8).unwrap();
    builder.set_label_span(1, B, 0..8).unwrap();
    builder.set_label_span(2, C, 0..8).unwrap();
    builder.set_label_span(3, B, 0..8).unwrap();
    builder.add_edge_span(0, 1, 1..5).unwrap();
    builder.add_edge_span(1, 2, 0..4).unwrap();
    builder.add_edge_span(0, 2, 1..4).unwrap();
    builder.add_edge(0, 2, 5).unwrap();
    builder.add_edge_span(0, 3, 0..8).unwrap();
    builder.build()
}

/// Directed star: hub 0 with spokes to 1, 2, 3 living 5, 5 and 3 instants.
fn star_graph() -> TemporalGraph {
    let mut builder = TemporalGraph::builder(8, true);
    builder.set_label_span(0, A, 0..8).unwrap();
    for leaf in 1..4 {
        builder.set_label_span(leaf, B, 0..8).unwrap();
    }
    builder.add_edge_span(0, 1, 0..5).unwrap();
    builder.add_edge_span(0, 2, 3..8).unwrap();
    builder.add_edge_span(0, 3, 0..3).unwrap();
    builder.build()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_triangle_best_match() {
    let graph = triangle_graph();
    let triangle = pattern(false, &[A, B, C], &[(0, 1), (1, 2), (0, 2)]);

    for policy in RankingPolicy::ALL {
        let config = QueryConfig::builder(Lifespan::full(8)).policy(policy).build().unwrap();
        let outcome = run(&graph, &triangle, &config);

        assert_eq!(outcome.status, QueryStatus::Satisfied, "policy {policy}");
        assert_eq!(outcome.matches.len(), 1);
        let found = &outcome.matches[0];
        assert_eq!(found.duration, 3);
        assert_eq!(found.lifespan.to_vec(), vec![1, 2, 3]);
        assert_eq!(found.assignment, vec![0, 1, 2]);
    }
}

#[test]
fn test_edge_outside_interval_yields_no_matches() {
    let mut builder = TemporalGraph::builder(8, true);
    builder.set_label_span(0, A, 0..8).unwrap();
    builder.set_label_span(1, B, 0..8).unwrap();
    builder.add_edge(0, 1, 6).unwrap();
    let graph = builder.build();
    let edge = pattern(true, &[A, B], &[(0, 1)]);

    for policy in RankingPolicy::ALL {
        let config = QueryConfig::builder(Lifespan::span(0..4)).policy(policy).build().unwrap();
        let outcome = run(&graph, &edge, &config);
        assert_eq!(outcome.status, QueryStatus::Exhausted);
        assert!(outcome.matches.is_empty());
    }
}

#[test]
fn test_top_two_keeps_the_two_longest() {
    let graph = star_graph();
    let spoke = pattern(true, &[A, B], &[(0, 1)]);

    for policy in RankingPolicy::ALL {
        let config = QueryConfig::builder(Lifespan::full(8))
            .policy(policy)
            .top_k(2)
            .build()
            .unwrap();
        let outcome = run(&graph, &spoke, &config);

        assert_eq!(outcome.status, QueryStatus::Satisfied, "policy {policy}");
        let found: Vec<_> = outcome
            .matches
            .iter()
            .map(|m| (m.duration, m.assignment.clone()))
            .collect();
        assert_eq!(found, vec![(5, vec![0, 1]), (5, vec![0, 2])]);
    }
}

#[test]
fn test_contiguous_and_total_durations() {
    let mut builder = TemporalGraph::builder(10, false);
    builder.set_label_span(0, A, 0..10).unwrap();
    builder.set_label_span(1, B, 0..10).unwrap();
    for t in [1, 2, 3, 7, 8] {
        builder.add_edge(0, 1, t).unwrap();
    }
    let graph = builder.build();
    let edge = pattern(false, &[A, B], &[(0, 1)]);

    let contiguous = QueryConfig::builder(Lifespan::full(10))
        .duration_mode(DurationMode::Contiguous)
        .build()
        .unwrap();
    assert_eq!(run(&graph, &edge, &contiguous).best_duration(), Some(3));

    let total = QueryConfig::builder(Lifespan::full(10)).build().unwrap();
    let outcome = run(&graph, &edge, &total);
    assert_eq!(outcome.best_duration(), Some(5));
    assert_eq!(outcome.matches[0].lifespan.to_vec(), vec![1, 2, 3, 7, 8]);
}

// ============================================================================
// Matching Semantics
// ============================================================================

#[test]
fn test_assignments_are_injective() {
    let mut builder = TemporalGraph::builder(8, false);
    builder.set_label_span(0, A, 0..8).unwrap();
    builder.set_label_span(1, A, 0..8).unwrap();
    builder.add_edge_span(0, 0, 0..8).unwrap();
    builder.add_edge_span(0, 1, 0..3).unwrap();
    let graph = builder.build();
    let pair = pattern(false, &[A, A], &[(0, 1)]);

    let config = QueryConfig::builder(Lifespan::full(8)).build().unwrap();
    let outcome = run(&graph, &pair, &config);

    assert_eq!(outcome.best_duration(), Some(3));
    for found in &outcome.matches {
        assert_ne!(found.assignment[0], found.assignment[1]);
    }
}

#[test]
fn test_reruns_do_not_duplicate_matches() {
    let graph = star_graph();
    let spoke = pattern(true, &[A, B], &[(0, 1)]);
    let config = QueryConfig::builder(Lifespan::full(8))
        .policy(RankingPolicy::Max)
        .top_k(10)
        .build()
        .unwrap();

    let outcome = run(&graph, &spoke, &config);
    assert_eq!(outcome.status, QueryStatus::Exhausted);
    assert!(outcome.threshold_iterations > 1);

    let signatures: BTreeSet<_> = outcome.matches.iter().map(|m| m.assignment.clone()).collect();
    assert_eq!(signatures.len(), outcome.matches.len());
    let durations: Vec<_> = outcome.matches.iter().map(|m| m.duration).collect();
    assert_eq!(durations, vec![5, 5, 3]);
}

#[test]
fn test_rerunning_a_query_is_idempotent() {
    let graph = triangle_graph();
    let path = pattern(false, &[B, A, B], &[(0, 1), (1, 2)]);
    let config = QueryConfig::builder(Lifespan::full(8)).top_k(3).build().unwrap();

    let matcher = DurableMatcher::new(&graph);
    let first = matcher.run(&path, &config).unwrap();
    let second = matcher.run(&path, &config).unwrap();
    assert_eq!(first.matches, second.matches);
    assert_eq!(first.status, second.status);
}

#[test]
fn test_label_tracking_can_be_disabled() {
    let mut builder = TemporalGraph::builder(8, true);
    builder.set_label(0, A, 0).unwrap();
    builder.set_label_span(1, B, 0..8).unwrap();
    builder.add_edge_span(0, 1, 0..6).unwrap();
    let graph = builder.build();
    let edge = pattern(true, &[A, B], &[(0, 1)]);

    let tracked = QueryConfig::builder(Lifespan::full(8)).build().unwrap();
    let outcome = run(&graph, &edge, &tracked);
    assert_eq!(outcome.status, QueryStatus::NoCandidates);

    let untracked = QueryConfig::builder(Lifespan::full(8))
        .track_label_changes(false)
        .build()
        .unwrap();
    let outcome = run(&graph, &edge, &untracked);
    assert_eq!(outcome.status, QueryStatus::Satisfied);
    assert_eq!(outcome.best_duration(), Some(6));
}

#[test]
fn test_min_policy_without_dedup_runs_once() {
    let graph = star_graph();
    let spoke = pattern(true, &[A, B], &[(0, 1)]);
    let config = QueryConfig::builder(Lifespan::full(8))
        .policy(RankingPolicy::Min)
        .dedup_under_min(false)
        .top_k(5)
        .build()
        .unwrap();

    let outcome = run(&graph, &spoke, &config);
    assert_eq!(outcome.threshold_iterations, 1);
    assert_eq!(outcome.final_threshold, 2);
    assert_eq!(outcome.matches.len(), 3);
}

#[test]
fn test_neighbor_indexes_agree_with_label_index() {
    let graph = triangle_graph();
    let triangle = pattern(false, &[A, B, C], &[(0, 1), (1, 2), (0, 2)]);

    for index in [
        IndexSelection::label_only(),
        IndexSelection::neighbor(2),
        IndexSelection::counted_neighbor(2),
    ] {
        let config = QueryConfig::builder(Lifespan::full(8)).index(index).build().unwrap();
        let outcome = run(&graph, &triangle, &config);
        assert_eq!(outcome.best_duration(), Some(3), "{index:?}");
    }
}

// ============================================================================
// Limits and Errors
// ============================================================================

#[test]
fn test_zero_time_limit_times_out() {
    let graph = triangle_graph();
    let triangle = pattern(false, &[A, B, C], &[(0, 1), (1, 2), (0, 2)]);
    let config = QueryConfig::builder(Lifespan::full(8))
        .time_limit(Duration::ZERO)
        .build()
        .unwrap();

    let outcome = run(&graph, &triangle, &config);
    assert_eq!(outcome.status, QueryStatus::TimedOut);
    assert!(outcome.matches.is_empty());
}

#[test]
fn test_result_cap_stops_best_mode() {
    let mut builder = TemporalGraph::builder(6, false);
    for node in 0..3 {
        builder.set_label_span(node, A, 0..6).unwrap();
    }
    builder.add_edge_span(0, 1, 0..6).unwrap();
    builder.add_edge_span(1, 2, 0..6).unwrap();
    builder.add_edge_span(0, 2, 0..6).unwrap();
    let graph = builder.build();
    let triangle = pattern(false, &[A, A, A], &[(0, 1), (1, 2), (0, 2)]);

    let capped = QueryConfig::builder(Lifespan::full(6)).result_cap(1).build().unwrap();
    let outcome = run(&graph, &triangle, &capped);
    assert_eq!(outcome.status, QueryStatus::Capped);
    assert_eq!(outcome.matches.len(), 1);

    let uncapped = QueryConfig::builder(Lifespan::full(6)).build().unwrap();
    let outcome = run(&graph, &triangle, &uncapped);
    assert_eq!(outcome.status, QueryStatus::Satisfied);
    assert_eq!(outcome.matches.len(), 6);
}

#[test]
fn test_unknown_label_reports_no_candidates() {
    let graph = triangle_graph();
    let missing = pattern(false, &[A, LabelId::new(9)], &[(0, 1)]);
    let config = QueryConfig::builder(Lifespan::full(8)).build().unwrap();

    let outcome = run(&graph, &missing, &config);
    assert_eq!(outcome.status, QueryStatus::NoCandidates);
    assert_eq!(outcome.threshold_iterations, 0);
}

#[test]
fn test_invalid_queries_are_rejected_before_matching() {
    let graph = triangle_graph();
    let matcher = DurableMatcher::new(&graph);
    let edge = pattern(false, &[A, B], &[(0, 1)]);

    let mut conflicting = QueryConfig::builder(Lifespan::full(8)).build().unwrap();
    conflicting.index = IndexSelection {
        neighbor_radius: Some(1),
        path_depth: Some(2),
        ..IndexSelection::default()
    };
    assert!(matches!(
        matcher.run(&edge, &conflicting),
        Err(QueryError::ConfigurationConflict(_))
    ));

    let too_long = QueryConfig::builder(Lifespan::full(20)).build().unwrap();
    assert!(matches!(
        matcher.run(&edge, &too_long),
        Err(QueryError::IntervalOutsideHorizon { end: 20, horizon: 8 })
    ));

    let directed = pattern(true, &[A, B], &[(0, 1)]);
    let config = QueryConfig::builder(Lifespan::full(8)).build().unwrap();
    assert!(matches!(
        matcher.run(&directed, &config),
        Err(QueryError::DirectionMismatch { .. })
    ));

    assert!(matches!(
        matcher.run(&PatternGraph::new(1, false), &config),
        Err(QueryError::EmptyPattern)
    ));

    let short_index = CandidateRankings::new(vec![Ranking::new()]);
    assert!(matches!(
        matcher.run_with_index(&edge, &config, &short_index),
        Err(QueryError::IndexMismatch { index: 1, pattern: 2 })
    ));
}

// ============================================================================
// Property Tests
// ============================================================================

const HORIZON: u32 = 8;

#[derive(Debug, Clone)]
struct RandomGraph {
    directed: bool,
    labels: Vec<(u8, u8)>,
    edges: Vec<(u32, u32, u8)>,
}

fn random_graph() -> impl Strategy<Value = RandomGraph> {
    (2usize..6).prop_flat_map(|n| {
        (
            any::<bool>(),
            prop::collection::vec((0u8..2, any::<u8>()), n),
            prop::collection::vec((0..n as u32, 0..n as u32, any::<u8>()), 0..10),
        )
            .prop_map(|(directed, labels, edges)| RandomGraph {
                directed,
                labels,
                edges,
            })
    })
}

fn instants(mask: u8) -> impl Iterator<Item = u32> {
    (0..HORIZON).filter(move |t| mask & (1 << t) != 0)
}

fn build(random: &RandomGraph) -> TemporalGraph {
    let mut builder = TemporalGraph::builder(HORIZON, random.directed);
    for (node, &(label, mask)) in random.labels.iter().enumerate() {
        builder.add_node(node as NodeId);
        for t in instants(mask) {
            builder.set_label(node as NodeId, LabelId::new(u32::from(label)), t).unwrap();
        }
    }
    for &(src, dst, mask) in &random.edges {
        if src == dst {
            continue;
        }
        for t in instants(mask) {
            builder.add_edge(src, dst, t).unwrap();
        }
    }
    builder.build()
}

/// How the brute force scores an assignment.
#[derive(Debug, Clone, Copy)]
struct Scoring {
    mode: DurationMode,
    track_labels: bool,
}

impl Scoring {
    const TOTAL: Scoring = Scoring {
        mode: DurationMode::Total,
        track_labels: true,
    };
}

/// Every injective assignment with its duration, longest first.
fn brute_force(
    graph: &TemporalGraph,
    pattern: &PatternGraph,
    interval: &Lifespan,
    scoring: Scoring,
) -> Vec<(u32, Vec<NodeId>)> {
    fn extend(
        graph: &TemporalGraph,
        pattern: &PatternGraph,
        interval: &Lifespan,
        scoring: Scoring,
        partial: &mut Vec<NodeId>,
        out: &mut Vec<(u32, Vec<NodeId>)>,
    ) {
        if partial.len() == pattern.len() {
            let mut life = interval.clone();
            for (p, &node) in partial.iter().enumerate() {
                match graph.label_lifespan(node, pattern.label(p)) {
                    Some(held) if scoring.track_labels => life.intersect_with(held),
                    Some(_) => {}
                    None => return,
                }
            }
            for (parent, child) in pattern.edges() {
                match graph.edge(partial[parent], partial[child]) {
                    Some(lifetime) => life.intersect_with(lifetime),
                    None => return,
                }
            }
            let duration = life.duration(scoring.mode);
            if duration >= 2 {
                out.push((duration, partial.clone()));
            }
            return;
        }
        for node in 0..graph.len() as NodeId {
            if !partial.contains(&node) {
                partial.push(node);
                extend(graph, pattern, interval, scoring, partial, out);
                partial.pop();
            }
        }
    }

    let mut out = Vec::new();
    extend(graph, pattern, interval, scoring, &mut Vec::new(), &mut out);
    out.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    out
}

/// Connected pattern: node `i` hangs off an earlier node picked by
/// `parents[i - 1]` (paths and stars), and `chords` close cycles.
fn random_pattern(
    directed: bool,
    labels: &[u8],
    parents: &[prop::sample::Index],
    chords: &[(prop::sample::Index, prop::sample::Index)],
) -> PatternGraph {
    let n = labels.len();
    let labels: Vec<LabelId> = labels.iter().map(|&l| LabelId::new(u32::from(l))).collect();
    let mut edges: Vec<(usize, usize)> = (1..n).map(|i| (parents[i - 1].index(i), i)).collect();
    edges.extend(
        chords
            .iter()
            .map(|(a, b)| (a.index(n), b.index(n)))
            .filter(|(a, b)| a != b),
    );
    pattern(directed, &labels, &edges)
}

fn pattern_shape() -> impl Strategy<
    Value = (
        Vec<u8>,
        Vec<prop::sample::Index>,
        Vec<(prop::sample::Index, prop::sample::Index)>,
    ),
> {
    (
        prop::collection::vec(0u8..2, 2..5),
        prop::collection::vec(any::<prop::sample::Index>(), 4),
        prop::collection::vec((any::<prop::sample::Index>(), any::<prop::sample::Index>()), 0..3),
    )
}

fn index_selection(kind: usize, size: usize) -> IndexSelection {
    match kind {
        0 => IndexSelection::label_only(),
        1 => IndexSelection::neighbor(size),
        2 => IndexSelection::counted_neighbor(size),
        _ => IndexSelection::path(size),
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn best_mode_matches_brute_force(
        random in random_graph(),
        (labels, parents, chords) in pattern_shape(),
        policy in prop::sample::select(RankingPolicy::ALL.to_vec()),
        index_kind in 0usize..4,
        index_size in 1usize..4,
        contiguous in any::<bool>(),
        track_labels in any::<bool>(),
    ) {
        let graph = build(&random);
        let pattern = random_pattern(random.directed, &labels, &parents, &chords);
        let interval = Lifespan::full(HORIZON);
        let config = QueryConfig::builder(interval.clone())
            .policy(policy)
            .index(index_selection(index_kind, index_size))
            .contiguous(contiguous)
            .track_label_changes(track_labels)
            .build()
            .unwrap();
        let scoring = Scoring {
            mode: config.duration_mode,
            track_labels,
        };

        let outcome = DurableMatcher::new(&graph).run(&pattern, &config).unwrap();
        let expected = brute_force(&graph, &pattern, &interval, scoring);

        match expected.first() {
            None => prop_assert!(outcome.matches.is_empty()),
            Some(&(best, _)) => {
                let want: Vec<_> = expected
                    .iter()
                    .filter(|(d, _)| *d == best)
                    .map(|(_, a)| a.clone())
                    .collect();
                let got: Vec<_> = outcome.matches.iter().map(|m| m.assignment.clone()).collect();
                prop_assert_eq!(outcome.status, QueryStatus::Satisfied);
                prop_assert_eq!(got, want);
            }
        }
    }

    #[test]
    fn top_k_durations_match_brute_force(
        random in random_graph(),
        (labels, parents, chords) in pattern_shape(),
        policy in prop::sample::select(RankingPolicy::ALL.to_vec()),
        index_kind in 0usize..4,
        k in 1usize..5,
    ) {
        let graph = build(&random);
        let pattern = random_pattern(random.directed, &labels, &parents, &chords);
        let interval = Lifespan::full(HORIZON);
        let config = QueryConfig::builder(interval.clone())
            .policy(policy)
            .index(index_selection(index_kind, 2))
            .top_k(k)
            .build()
            .unwrap();

        let outcome = DurableMatcher::new(&graph).run(&pattern, &config).unwrap();
        let expected: Vec<u32> = brute_force(&graph, &pattern, &interval, Scoring::TOTAL)
            .into_iter()
            .map(|(d, _)| d)
            .take(k)
            .collect();
        let got: Vec<u32> = outcome.matches.iter().map(|m| m.duration).collect();
        prop_assert_eq!(got, expected);

        let signatures: BTreeSet<_> = outcome.matches.iter().map(|m| m.assignment.clone()).collect();
        prop_assert_eq!(signatures.len(), outcome.matches.len());
        for found in &outcome.matches {
            prop_assert_eq!(found.lifespan.cardinality(), found.duration);
        }
    }

    #[test]
    fn thresholds_strictly_decrease_and_terminate(
        scores in prop::collection::vec(prop::collection::vec(2u32..40, 1..6), 1..4),
        policy in prop::sample::select(RankingPolicy::ALL.to_vec()),
        k in prop::option::of(1usize..6),
    ) {
        let rankings = CandidateRankings::new(
            scores
                .iter()
                .map(|node_scores| {
                    let mut ranking = Ranking::new();
                    for (node, &score) in node_scores.iter().enumerate() {
                        ranking.insert(score, node as NodeId);
                    }
                    ranking
                })
                .collect(),
        );
        let mut builder = QueryConfig::builder(Lifespan::full(64)).policy(policy);
        if let Some(k) = k {
            builder = builder.top_k(k);
        }
        let config = builder.build().unwrap();

        let mut controller = ThresholdController::new(&rankings, &config);
        let mut previous = u32::MAX;
        let mut steps = 0;
        while let ThresholdState::Trying(theta) = controller.state() {
            prop_assert!(theta < previous);
            prop_assert!(theta >= 2);
            previous = theta;
            steps += 1;
            prop_assert!(steps <= 41);
            controller.record(false);
        }
        prop_assert_eq!(controller.state(), ThresholdState::Exhausted);
    }
}
