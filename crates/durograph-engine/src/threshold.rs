//! ThresholdController: picks the duration threshold θ for each rerun.
//!
//! θ starts at the smallest per-node maximum score, so the first run only
//! sees nodes that could take part in the longest possible match, and then
//! decreases strictly until a run satisfies the query mode or θ ≤ 1.

use crate::config::{QueryConfig, QueryMode, RankingPolicy};
use crate::index::{CandidateIndex, Ranking};
use std::collections::BTreeSet;

/// Lowest threshold worth running: one instant is not durable.
pub const MIN_THRESHOLD: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdState {
    Trying(u32),
    Satisfied,
    Exhausted,
}

pub struct ThresholdController<'a> {
    policy: RankingPolicy,
    mode: QueryMode,
    factor: f64,
    growth: f64,
    rankings: Vec<&'a Ranking>,
    /// Every score present in any ranking.
    scores: BTreeSet<u32>,
    tried: BTreeSet<u32>,
    last: u32,
    state: ThresholdState,
    no_candidates: bool,
}

impl<'a> ThresholdController<'a> {
    /// Pattern nodes without a ranking count as empty.
    pub fn new(index: &'a dyn CandidateIndex, config: &QueryConfig) -> Self {
        let rankings: Vec<&Ranking> = (0..index.len()).filter_map(|p| index.ranking(p)).collect();
        let no_candidates =
            rankings.len() < index.len() || rankings.is_empty() || rankings.iter().any(|r| r.is_empty());
        let scores = rankings.iter().flat_map(|r| r.scores_descending()).collect();

        let mut controller = Self {
            policy: config.policy,
            mode: config.mode,
            factor: config.adaptive_factor,
            growth: config.candidate_growth,
            rankings,
            scores,
            tried: BTreeSet::new(),
            last: 0,
            state: ThresholdState::Exhausted,
            no_candidates,
        };

        if !no_candidates {
            let theta = controller.initial_threshold();
            controller.enter(theta);
        }
        controller
    }

    pub fn state(&self) -> ThresholdState {
        self.state
    }

    /// True when some pattern node had no candidate at all.
    pub fn no_candidates(&self) -> bool {
        self.no_candidates
    }

    pub fn tried(&self) -> &BTreeSet<u32> {
        &self.tried
    }

    pub fn last(&self) -> u32 {
        self.last
    }

    fn min_max_score(&self) -> u32 {
        self.rankings
            .iter()
            .filter_map(|r| r.max_score())
            .min()
            .unwrap_or(MIN_THRESHOLD)
    }

    fn initial_threshold(&self) -> u32 {
        match (self.policy, self.mode) {
            (RankingPolicy::Min, _) => MIN_THRESHOLD,
            (RankingPolicy::Adaptive, QueryMode::TopK { k }) => self.initial_top_k(k as u64),
            _ => self.min_max_score(),
        }
    }

    /// Highest θ at which a pattern node already ranks `k` candidates,
    /// taken over the nodes that can reach `k` at all.
    fn initial_top_k(&self, k: u64) -> u32 {
        let reaching = self
            .rankings
            .iter()
            .filter_map(|r| r.scores_descending().find(|&score| r.count_at_least(score) >= k))
            .min();
        match reaching {
            Some(theta) => theta.min(self.min_max_score()).max(MIN_THRESHOLD),
            None => MIN_THRESHOLD,
        }
    }

    fn enter(&mut self, theta: u32) {
        if theta <= 1 {
            self.state = ThresholdState::Exhausted;
            return;
        }
        self.tried.insert(theta);
        self.last = theta;
        self.state = ThresholdState::Trying(theta);
    }

    /// Report the outcome of the run at the current θ and move on.
    pub fn record(&mut self, satisfied: bool) -> ThresholdState {
        if !matches!(self.state, ThresholdState::Trying(_)) {
            return self.state;
        }
        if satisfied {
            self.state = ThresholdState::Satisfied;
            return self.state;
        }
        if self.policy == RankingPolicy::Min {
            self.state = ThresholdState::Exhausted;
            return self.state;
        }

        let next = self.skip_tried(self.next_threshold());
        self.enter(next);
        self.state
    }

    fn next_threshold(&self) -> u32 {
        let last = self.last;
        match self.policy {
            RankingPolicy::Min => 1,
            RankingPolicy::Max => self.scores.range(..last).next_back().copied().unwrap_or(last - 1),
            RankingPolicy::Adaptive => match self.mode {
                QueryMode::TopK { .. } => self
                    .growing_candidates()
                    .unwrap_or_else(|| self.geometric_step()),
                QueryMode::Best => self.geometric_step(),
            },
            RankingPolicy::Halfway => {
                let lowest = self.scores.first().copied().unwrap_or(MIN_THRESHOLD).max(MIN_THRESHOLD);
                let mid = (last + lowest) / 2;
                if mid >= last {
                    last - 1
                } else {
                    mid
                }
            }
        }
    }

    /// `θ - round(f·θ)` with a step of at least one; a step below 2 lands on
    /// 2 once, then terminates.
    fn geometric_step(&self) -> u32 {
        let last = self.last;
        if last <= MIN_THRESHOLD {
            return 1;
        }
        let step = ((self.factor * f64::from(last)).round() as u32).max(1);
        last.saturating_sub(step).max(MIN_THRESHOLD)
    }

    /// Highest score below θ at which every pattern node ranks at least
    /// `(1 + growth)` times the smallest current candidate count.
    fn growing_candidates(&self) -> Option<u32> {
        let smallest = self
            .rankings
            .iter()
            .map(|r| r.count_at_least(self.last))
            .min()?;
        let target = ((smallest.max(1) as f64) * (1.0 + self.growth)).ceil() as u64;

        self.scores
            .range(..self.last)
            .rev()
            .copied()
            .find(|&theta| self.rankings.iter().all(|r| r.count_at_least(theta) >= target))
    }

    fn skip_tried(&self, mut theta: u32) -> u32 {
        while theta > 1 && self.tried.contains(&theta) {
            theta -= 1;
        }
        theta
    }
}
