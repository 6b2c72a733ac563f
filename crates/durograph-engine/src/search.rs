//! Backtracking enumeration of injective assignments.

use crate::candidates::CandidateSets;
use crate::context::QueryContext;
use crate::evaluate::MatchEvaluator;
use crate::simulation::refine;
use std::time::Instant;

/// How a search run ended. Limits unwind through this value, never a panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Completed,
    TimedOut,
    Capped,
}

pub struct Search<'s, 'a> {
    ctx: QueryContext<'a>,
    evaluator: &'s mut MatchEvaluator<'a>,
    deadline: Instant,
    recursions: u64,
}

impl<'s, 'a> Search<'s, 'a> {
    pub fn new(ctx: QueryContext<'a>, evaluator: &'s mut MatchEvaluator<'a>, deadline: Instant) -> Self {
        Self {
            ctx,
            evaluator,
            deadline,
            recursions: 0,
        }
    }

    /// Number of recursive calls made so far.
    pub fn recursions(&self) -> u64 {
        self.recursions
    }

    /// Enumerate every assignment consistent with `sets`, which must already
    /// be pruned for the evaluator's threshold.
    pub fn run(&mut self, sets: &CandidateSets) -> SearchOutcome {
        self.descend(0, sets)
    }

    fn descend(&mut self, depth: usize, sets: &CandidateSets) -> SearchOutcome {
        self.recursions += 1;

        if Instant::now() >= self.deadline {
            return SearchOutcome::TimedOut;
        }
        if self.evaluator.is_capped() {
            return SearchOutcome::Capped;
        }

        if depth == sets.len() {
            if let Some(assignment) = sets.assignment() {
                self.evaluator.evaluate(&assignment);
            }
            return SearchOutcome::Completed;
        }

        for node in sets.get(depth).iter() {
            if sets.bound_before(depth, node) {
                continue;
            }

            let mut branch = sets.clone();
            branch.collapse(depth, node);
            let Some(branch) = refine(&self.ctx, self.evaluator.threshold(), branch) else {
                continue;
            };

            let outcome = self.descend(depth + 1, &branch);
            if outcome != SearchOutcome::Completed {
                return outcome;
            }
        }

        SearchOutcome::Completed
    }
}
