//! Query configuration.
//!
//! Everything the engine needs to know about a query is carried by an
//! immutable [`QueryConfig`] value; there is no process-wide state, so any
//! number of queries with different settings can run side by side.

use crate::error::QueryError;
use durograph_temporal::{DurationMode, Lifespan};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How the duration threshold evolves between search reruns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingPolicy {
    /// Step down to the next score class present in the rankings.
    Max,
    /// Geometric shrink (`θ - round(f·θ)`), a.k.a. max-binary.
    Adaptive,
    /// Single run at θ = 2, no narrowing (a.k.a. zero ranking).
    Min,
    /// Jump halfway towards the lowest score in the rankings.
    Halfway,
}

impl RankingPolicy {
    pub const ALL: [RankingPolicy; 4] = [
        RankingPolicy::Max,
        RankingPolicy::Adaptive,
        RankingPolicy::Min,
        RankingPolicy::Halfway,
    ];
}

impl fmt::Display for RankingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RankingPolicy::Max => "max",
            RankingPolicy::Adaptive => "adaptive",
            RankingPolicy::Min => "min",
            RankingPolicy::Halfway => "halfway",
        };
        f.write_str(name)
    }
}

impl FromStr for RankingPolicy {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "max" => Ok(RankingPolicy::Max),
            "adaptive" | "maxbinary" | "max-binary" => Ok(RankingPolicy::Adaptive),
            "min" | "zero" => Ok(RankingPolicy::Min),
            "halfway" => Ok(RankingPolicy::Halfway),
            other => Err(QueryError::UnknownPolicy(other.to_string())),
        }
    }
}

/// Which matches a query reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    /// Every match achieving the single maximum duration.
    Best,
    /// The `k` matches with the largest durations.
    TopK { k: usize },
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryMode::Best => f.write_str("best"),
            QueryMode::TopK { k } => write!(f, "top-{k}"),
        }
    }
}

/// Which structure-aware candidate index to build on top of the plain
/// per-label index. At most one may be enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSelection {
    /// Neighbor-label index over walks of up to `r` hops.
    #[serde(default)]
    pub neighbor_radius: Option<usize>,
    /// Counted neighbor-label index over walks of up to `r` hops.
    #[serde(default)]
    pub counted_neighbor_radius: Option<usize>,
    /// Path-label index over label paths of up to `d` edges.
    #[serde(default)]
    pub path_depth: Option<usize>,
}

impl IndexSelection {
    pub fn label_only() -> Self {
        Self::default()
    }

    pub fn neighbor(radius: usize) -> Self {
        Self {
            neighbor_radius: Some(radius),
            ..Self::default()
        }
    }

    pub fn counted_neighbor(radius: usize) -> Self {
        Self {
            counted_neighbor_radius: Some(radius),
            ..Self::default()
        }
    }

    pub fn path(depth: usize) -> Self {
        Self {
            path_depth: Some(depth),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        let enabled = [
            ("neighbor_radius", self.neighbor_radius),
            ("counted_neighbor_radius", self.counted_neighbor_radius),
            ("path_depth", self.path_depth),
        ];
        let chosen: Vec<_> = enabled.iter().filter(|(_, value)| value.is_some()).collect();
        if chosen.len() > 1 {
            let names: Vec<_> = chosen.iter().map(|(name, _)| *name).collect();
            return Err(QueryError::ConfigurationConflict(format!(
                "only one structural index may be enabled, got {}",
                names.join(" and ")
            )));
        }
        match chosen.first() {
            Some(&&(name, Some(0))) => Err(QueryError::invalid(name, "must be at least 1")),
            _ => Ok(()),
        }
    }
}

/// Immutable per-query settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Instants the match must live in.
    pub interval: Lifespan,
    pub duration_mode: DurationMode,
    pub policy: RankingPolicy,
    pub mode: QueryMode,
    /// Wall-clock budget for the whole threshold loop.
    pub time_limit: Duration,
    /// Maximum number of equal-duration matches kept in best mode.
    pub result_cap: usize,
    /// Whether node labels vary over time. When off, label lifespans take no
    /// part in time joins or match lifespans.
    pub track_label_changes: bool,
    /// Smallest candidate score worth indexing.
    pub min_score: u32,
    /// Shrink factor of the adaptive policy.
    pub adaptive_factor: f64,
    /// Growth of the smallest candidate set the adaptive top-k policy asks
    /// for between reruns.
    pub candidate_growth: f64,
    /// Suppress duplicate signatures under the min policy as well.
    pub dedup_under_min: bool,
    pub index: IndexSelection,
}

impl QueryConfig {
    pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(600);
    pub const DEFAULT_RESULT_CAP: usize = 1000;

    pub fn builder(interval: Lifespan) -> QueryConfigBuilder {
        QueryConfigBuilder::new(interval)
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        self.index.validate()?;

        if self.interval.is_empty() {
            return Err(QueryError::invalid("interval", "must contain at least one instant"));
        }
        if let QueryMode::TopK { k: 0 } = self.mode {
            return Err(QueryError::invalid("k", "must be at least 1"));
        }
        if self.result_cap == 0 {
            return Err(QueryError::invalid("result_cap", "must be at least 1"));
        }
        if self.min_score == 0 {
            return Err(QueryError::invalid("min_score", "must be at least 1"));
        }
        if !(self.adaptive_factor > 0.0 && self.adaptive_factor < 1.0) {
            return Err(QueryError::invalid(
                "adaptive_factor",
                format!("{} is not in (0, 1)", self.adaptive_factor),
            ));
        }
        if !(self.candidate_growth >= 0.0 && self.candidate_growth.is_finite()) {
            return Err(QueryError::invalid(
                "candidate_growth",
                format!("{} is not a finite non-negative number", self.candidate_growth),
            ));
        }
        Ok(())
    }

    /// Whether matches must carry distinct signatures.
    pub fn dedup_signatures(&self) -> bool {
        self.policy != RankingPolicy::Min || self.dedup_under_min
    }
}

/// Fluent builder for [`QueryConfig`]; `build` validates.
#[derive(Debug, Clone)]
pub struct QueryConfigBuilder {
    config: QueryConfig,
}

impl QueryConfigBuilder {
    pub fn new(interval: Lifespan) -> Self {
        Self {
            config: QueryConfig {
                interval,
                duration_mode: DurationMode::Total,
                policy: RankingPolicy::Max,
                mode: QueryMode::Best,
                time_limit: QueryConfig::DEFAULT_TIME_LIMIT,
                result_cap: QueryConfig::DEFAULT_RESULT_CAP,
                track_label_changes: true,
                min_score: 2,
                adaptive_factor: 0.5,
                candidate_growth: 0.5,
                dedup_under_min: true,
                index: IndexSelection::default(),
            },
        }
    }

    pub fn duration_mode(mut self, mode: DurationMode) -> Self {
        self.config.duration_mode = mode;
        self
    }

    pub fn contiguous(self, contiguous: bool) -> Self {
        self.duration_mode(if contiguous {
            DurationMode::Contiguous
        } else {
            DurationMode::Total
        })
    }

    pub fn policy(mut self, policy: RankingPolicy) -> Self {
        self.config.policy = policy;
        self
    }

    pub fn best(mut self) -> Self {
        self.config.mode = QueryMode::Best;
        self
    }

    pub fn top_k(mut self, k: usize) -> Self {
        self.config.mode = QueryMode::TopK { k };
        self
    }

    pub fn time_limit(mut self, limit: Duration) -> Self {
        self.config.time_limit = limit;
        self
    }

    pub fn result_cap(mut self, cap: usize) -> Self {
        self.config.result_cap = cap;
        self
    }

    pub fn track_label_changes(mut self, track: bool) -> Self {
        self.config.track_label_changes = track;
        self
    }

    pub fn min_score(mut self, score: u32) -> Self {
        self.config.min_score = score;
        self
    }

    pub fn adaptive_factor(mut self, factor: f64) -> Self {
        self.config.adaptive_factor = factor;
        self
    }

    pub fn candidate_growth(mut self, growth: f64) -> Self {
        self.config.candidate_growth = growth;
        self
    }

    pub fn dedup_under_min(mut self, dedup: bool) -> Self {
        self.config.dedup_under_min = dedup;
        self
    }

    pub fn index(mut self, index: IndexSelection) -> Self {
        self.config.index = index;
        self
    }

    pub fn build(self) -> Result<QueryConfig, QueryError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_neighbor_indexes_conflict() {
        let err = QueryConfig::builder(Lifespan::full(4))
            .index(IndexSelection {
                neighbor_radius: Some(1),
                counted_neighbor_radius: Some(2),
                path_depth: None,
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, QueryError::ConfigurationConflict(_)));

        let err = QueryConfig::builder(Lifespan::full(4))
            .index(IndexSelection {
                path_depth: Some(2),
                ..IndexSelection::counted_neighbor(1)
            })
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("counted_neighbor_radius and path_depth"));
    }

    #[test]
    fn zero_radius_and_zero_k_are_invalid() {
        let interval = Lifespan::full(4);
        assert!(QueryConfig::builder(interval.clone())
            .index(IndexSelection::neighbor(0))
            .build()
            .is_err());
        let err = QueryConfig::builder(interval.clone())
            .index(IndexSelection::path(0))
            .build()
            .unwrap_err();
        assert_eq!(err, QueryError::invalid("path_depth", "must be at least 1"));
        assert!(QueryConfig::builder(interval).top_k(0).build().is_err());
    }

    #[test]
    fn empty_interval_is_invalid() {
        assert!(QueryConfig::builder(Lifespan::new()).build().is_err());
    }

    #[test]
    fn policies_parse_with_historical_aliases() {
        assert_eq!("zero".parse::<RankingPolicy>().unwrap(), RankingPolicy::Min);
        assert_eq!("MaxBinary".parse::<RankingPolicy>().unwrap(), RankingPolicy::Adaptive);
        for policy in RankingPolicy::ALL {
            assert_eq!(policy.to_string().parse::<RankingPolicy>().unwrap(), policy);
        }
        assert!("sideways".parse::<RankingPolicy>().is_err());
    }

    #[test]
    fn config_serializes_with_readable_enums() {
        let config = QueryConfig::builder(Lifespan::span(2..5))
            .policy(RankingPolicy::Halfway)
            .top_k(3)
            .build()
            .unwrap();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["policy"], "halfway");
        assert_eq!(json["mode"], serde_json::json!({ "top_k": { "k": 3 } }));
        assert_eq!(json["duration_mode"], "total");

        let back: QueryConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn dedup_is_optional_only_under_min() {
        let config = QueryConfig::builder(Lifespan::full(4))
            .dedup_under_min(false)
            .build()
            .unwrap();
        assert!(config.dedup_signatures());

        let min = QueryConfig::builder(Lifespan::full(4))
            .policy(RankingPolicy::Min)
            .dedup_under_min(false)
            .build()
            .unwrap();
        assert!(!min.dedup_signatures());
    }
}
