//! Durograph temporal storage
//!
//! The read-only side of durable pattern matching:
//!
//! 1. **Lifespans**: every temporal fact is a Roaring bitmap over the
//!    instants `0..T`; intersection is bitmap AND and duration is either the
//!    cardinality or the longest consecutive run.
//! 2. **Temporal graph**: nodes carry per-label activity lifespans and own
//!    their outgoing edges, each with a lifetime lifespan.
//! 3. **Pattern graph**: the small labeled shape a query searches for.
//! 4. **Label interning** and **binary snapshots** for loading large graphs
//!    once and sharing them between query workers.

pub mod error;
pub mod graph;
pub mod interner;
pub mod lifespan;
pub mod pattern;
mod snapshot;

pub use error::GraphError;
pub use graph::{Edge, LabelId, NodeId, TemporalGraph, TemporalGraphBuilder, TemporalNode};
pub use interner::LabelInterner;
pub use lifespan::{DurationMode, Lifespan};
pub use pattern::{PatternGraph, PatternNode, PatternNodeId};
