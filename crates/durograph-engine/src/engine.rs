//! DurableMatcher: the threshold loop tying the stages together.

use crate::candidates::CandidateSets;
use crate::config::QueryConfig;
use crate::context::QueryContext;
use crate::error::QueryError;
use crate::evaluate::MatchEvaluator;
use crate::index::{build_candidate_index, CandidateIndex};
use crate::report::{QueryOutcome, QueryStatus};
use crate::search::{Search, SearchOutcome};
use crate::simulation::dual_simulation;
use crate::threshold::{ThresholdController, ThresholdState};
use durograph_temporal::{PatternGraph, TemporalGraph};
use std::time::{Duration, Instant};

/// Budget used when `time_limit` does not fit in an `Instant`.
const FALLBACK_LIMIT: Duration = Duration::from_secs(365 * 24 * 60 * 60);

fn direction(directed: bool) -> &'static str {
    if directed {
        "directed"
    } else {
        "undirected"
    }
}

/// Runs durable matching queries against one shared graph.
///
/// The matcher holds no per-query state; any number of queries may run on
/// the same matcher from different threads.
#[derive(Debug, Clone, Copy)]
pub struct DurableMatcher<'g> {
    graph: &'g TemporalGraph,
}

impl<'g> DurableMatcher<'g> {
    pub fn new(graph: &'g TemporalGraph) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &'g TemporalGraph {
        self.graph
    }

    fn check(&self, pattern: &PatternGraph, config: &QueryConfig) -> Result<(), QueryError> {
        config.validate()?;
        if pattern.is_empty() {
            return Err(QueryError::EmptyPattern);
        }
        if pattern.is_directed() != self.graph.is_directed() {
            return Err(QueryError::DirectionMismatch {
                pattern: direction(pattern.is_directed()),
                graph: direction(self.graph.is_directed()),
            });
        }
        let end = config.interval.end();
        if end > self.graph.horizon() {
            return Err(QueryError::IntervalOutsideHorizon {
                end,
                horizon: self.graph.horizon(),
            });
        }
        Ok(())
    }

    /// Build the configured candidate index, then run the query.
    pub fn run(&self, pattern: &PatternGraph, config: &QueryConfig) -> Result<QueryOutcome, QueryError> {
        self.check(pattern, config)?;
        let ctx = self.context(pattern, config);
        let index = build_candidate_index(&ctx, config);
        tracing::debug!(pattern = pattern.id(), index = index.name(), "built candidate index");
        self.run_with_index(pattern, config, index.as_ref())
    }

    /// Run the query against a prebuilt index covering `pattern`.
    pub fn run_with_index(
        &self,
        pattern: &PatternGraph,
        config: &QueryConfig,
        index: &dyn CandidateIndex,
    ) -> Result<QueryOutcome, QueryError> {
        self.check(pattern, config)?;
        if index.len() != pattern.len() {
            return Err(QueryError::IndexMismatch {
                index: index.len(),
                pattern: pattern.len(),
            });
        }
        if let Some(p) = (0..pattern.len()).find(|&p| index.ranking(p).is_none()) {
            return Err(QueryError::MissingRanking(p));
        }

        let started = Instant::now();
        let deadline = started
            .checked_add(config.time_limit)
            .unwrap_or_else(|| started + FALLBACK_LIMIT);

        let ctx = self.context(pattern, config);
        let mut controller = ThresholdController::new(index, config);
        let mut evaluator = MatchEvaluator::new(ctx, config);

        let mut status = None;
        let mut recursions = 0u64;
        let mut iterations = 0u32;

        if controller.no_candidates() {
            status = Some(QueryStatus::NoCandidates);
        }

        while status.is_none() {
            let ThresholdState::Trying(theta) = controller.state() else {
                break;
            };
            if Instant::now() >= deadline {
                status = Some(QueryStatus::TimedOut);
                break;
            }
            iterations += 1;
            evaluator.start_run(theta, controller.tried());

            let sets = CandidateSets::new((0..pattern.len()).map(|p| {
                index
                    .ranking(p)
                    .map(|r| r.candidates_at_least(theta))
                    .unwrap_or_default()
            }));
            let indexed = sets.sizes();

            let mut run_recursions = 0;
            let outcome = match (!sets.has_empty()).then(|| dual_simulation(&ctx, theta, sets)).flatten() {
                Some(pruned) => {
                    let mut search = Search::new(ctx, &mut evaluator, deadline);
                    let outcome = search.run(&pruned);
                    run_recursions = search.recursions();
                    outcome
                }
                None => SearchOutcome::Completed,
            };
            recursions += run_recursions;

            tracing::debug!(
                pattern = pattern.id(),
                theta,
                candidates = ?indexed,
                recursions = run_recursions,
                matches = evaluator.results().len(),
                "threshold run finished"
            );

            match outcome {
                SearchOutcome::TimedOut => status = Some(QueryStatus::TimedOut),
                SearchOutcome::Capped => status = Some(QueryStatus::Capped),
                SearchOutcome::Completed => {
                    controller.record(evaluator.is_satisfied());
                }
            }
        }

        let status = status.unwrap_or(match controller.state() {
            ThresholdState::Satisfied => QueryStatus::Satisfied,
            _ => QueryStatus::Exhausted,
        });
        let matches = evaluator.into_results().into_sorted();
        let elapsed = started.elapsed();

        if status.is_truncated() {
            tracing::warn!(
                pattern = pattern.id(),
                status = %status,
                matches = matches.len(),
                "query truncated by a limit, results are partial"
            );
        }
        tracing::info!(
            pattern = pattern.id(),
            policy = %config.policy,
            mode = %config.mode,
            status = %status,
            matches = matches.len(),
            iterations,
            elapsed_ms = elapsed.as_millis() as u64,
            "query finished"
        );

        Ok(QueryOutcome {
            status,
            matches,
            recursions,
            threshold_iterations: iterations,
            final_threshold: controller.last(),
            elapsed,
        })
    }

    fn context<'a>(&self, pattern: &'a PatternGraph, config: &'a QueryConfig) -> QueryContext<'a>
    where
        'g: 'a,
    {
        QueryContext::new(
            self.graph,
            pattern,
            &config.interval,
            config.duration_mode,
            config.track_label_changes,
        )
    }
}
