//! Serializable per-query reports.

use crate::config::{QueryConfig, QueryMode, RankingPolicy};
use crate::results::Match;
use durograph_temporal::{DurationMode, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How a query ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    /// A run produced the matches the query mode asks for.
    Satisfied,
    /// Every threshold was tried; results (if any) are partial.
    Exhausted,
    /// Wall-clock budget spent; results are partial.
    TimedOut,
    /// Best-mode result cap reached; results are partial.
    Capped,
    /// Some pattern node has no candidate in the interval.
    NoCandidates,
}

impl QueryStatus {
    /// Whether the search was cut short by a limit.
    pub fn is_truncated(self) -> bool {
        matches!(self, QueryStatus::TimedOut | QueryStatus::Capped)
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryStatus::Satisfied => "satisfied",
            QueryStatus::Exhausted => "exhausted",
            QueryStatus::TimedOut => "timed-out",
            QueryStatus::Capped => "capped",
            QueryStatus::NoCandidates => "no-candidates",
        };
        f.write_str(name)
    }
}

/// What the engine hands back for one query.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub status: QueryStatus,
    /// Longest first, ties by assignment.
    pub matches: Vec<Match>,
    pub recursions: u64,
    pub threshold_iterations: u32,
    /// Threshold of the last run, 0 if none ran.
    pub final_threshold: u32,
    pub elapsed: Duration,
}

impl QueryOutcome {
    pub fn best_duration(&self) -> Option<u32> {
        self.matches.first().map(|m| m.duration)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub duration: u32,
    /// Sorted instants.
    pub lifespan: Vec<u32>,
    /// `assignment[p]` is the data node bound to pattern node `p`.
    pub assignment: Vec<NodeId>,
}

impl From<&Match> for MatchRecord {
    fn from(found: &Match) -> Self {
        Self {
            duration: found.duration,
            lifespan: found.lifespan.to_vec(),
            assignment: found.assignment.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryReport {
    pub pattern_id: u32,
    pub policy: RankingPolicy,
    pub mode: QueryMode,
    pub duration_mode: DurationMode,
    pub status: QueryStatus,
    pub matches: Vec<MatchRecord>,
    pub recursions: u64,
    pub threshold_iterations: u32,
    pub elapsed_ms: u64,
}

impl QueryReport {
    pub fn new(pattern_id: u32, config: &QueryConfig, outcome: &QueryOutcome) -> Self {
        Self {
            pattern_id,
            policy: config.policy,
            mode: config.mode,
            duration_mode: config.duration_mode,
            status: outcome.status,
            matches: outcome.matches.iter().map(MatchRecord::from).collect(),
            recursions: outcome.recursions,
            threshold_iterations: outcome.threshold_iterations,
            elapsed_ms: outcome.elapsed.as_millis() as u64,
        }
    }

    pub fn best_duration(&self) -> Option<u32> {
        self.matches.first().map(|m| m.duration)
    }
}
