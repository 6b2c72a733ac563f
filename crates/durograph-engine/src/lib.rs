//! Durograph matching engine
//!
//! Finds occurrences of a pattern graph in a temporal graph whose nodes,
//! labels and edges stay alive together for as long as possible.
//!
//! ## Pipeline
//!
//! ```text
//! ThresholdController ── θ ──► CandidateIndex ── C ──► dual_simulation
//!        ▲                                                  │
//!        │ satisfied?                                       ▼
//!   MatchEvaluator ◄── assignment ── Search (DFS + refine + time_join)
//! ```
//!
//! Each run at threshold θ only considers nodes whose index score is at
//! least θ; θ decreases between runs according to a [`RankingPolicy`]
//! until the query mode is satisfied or the thresholds are exhausted.
//!
//! ## Example
//!
//! ```
//! use durograph_engine::{DurableMatcher, QueryConfig, QueryStatus};
//! use durograph_temporal::{LabelInterner, Lifespan, PatternGraph, TemporalGraph};
//!
//! let labels = LabelInterner::new();
//! let person = labels.intern("person");
//!
//! let mut builder = TemporalGraph::builder(6, false);
//! builder.set_label_span(0, person, 0..6).unwrap();
//! builder.set_label_span(1, person, 0..6).unwrap();
//! builder.add_edge_span(0, 1, 1..4).unwrap();
//! let graph = builder.build();
//!
//! let mut pattern = PatternGraph::new(0, false);
//! let a = pattern.add_node(person);
//! let b = pattern.add_node(person);
//! pattern.add_edge(a, b).unwrap();
//!
//! let config = QueryConfig::builder(Lifespan::full(6)).build().unwrap();
//! let outcome = DurableMatcher::new(&graph).run(&pattern, &config).unwrap();
//! assert_eq!(outcome.status, QueryStatus::Satisfied);
//! assert_eq!(outcome.best_duration(), Some(3));
//! ```

pub mod candidates;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod evaluate;
pub mod index;
pub mod join;
pub mod report;
pub mod results;
pub mod search;
pub mod simulation;
pub mod threshold;

pub use candidates::CandidateSets;
pub use config::{IndexSelection, QueryConfig, QueryConfigBuilder, QueryMode, RankingPolicy};
pub use context::QueryContext;
pub use durograph_temporal::DurationMode;
pub use engine::DurableMatcher;
pub use error::QueryError;
pub use evaluate::{MatchEvaluator, Verdict};
pub use index::{
    build_candidate_index, CandidateIndex, CandidateRankings, CountedNeighborLabelIndex, LabelIndex,
    NeighborLabelIndex, PathLabelIndex, Ranking,
};
pub use report::{MatchRecord, QueryOutcome, QueryReport, QueryStatus};
pub use results::{Match, ResultSet};
pub use search::{Search, SearchOutcome};
pub use simulation::{dual_simulation, refine};
pub use threshold::{ThresholdController, ThresholdState};
