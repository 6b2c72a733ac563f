//! The temporal (labeled, versioned) data graph.
//!
//! A `TemporalGraph` is built once through [`TemporalGraphBuilder`] and is
//! read-only afterwards, so it can be shared by reference across query
//! workers without synchronization.

use crate::error::GraphError;
use crate::lifespan::Lifespan;
use ahash::AHashMap;
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Data-graph node identifier (dense, `0..graph.len()`).
pub type NodeId = u32;

/// Interned label identifier (4 bytes instead of a `String`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct LabelId(u32);

impl LabelId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

// ============================================================================
// Nodes and Edges
// ============================================================================

/// A directed edge owned by its source node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    target: NodeId,
    lifetime: Lifespan,
}

impl Edge {
    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn lifetime(&self) -> &Lifespan {
        &self.lifetime
    }
}

/// A data node: per-label activity lifespans plus outgoing edges.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemporalNode {
    id: NodeId,
    labels: AHashMap<LabelId, Lifespan>,
    adjacency: AHashMap<NodeId, Edge>,
}

impl TemporalNode {
    fn new(id: NodeId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Activity lifespan of `label` on this node, if the node ever holds it.
    pub fn label(&self, label: LabelId) -> Option<&Lifespan> {
        self.labels.get(&label)
    }

    pub fn labels(&self) -> impl Iterator<Item = (LabelId, &Lifespan)> + '_ {
        self.labels.iter().map(|(&label, life)| (label, life))
    }

    /// The edge towards `target`, if any.
    pub fn edge(&self, target: NodeId) -> Option<&Edge> {
        self.adjacency.get(&target)
    }

    pub fn adjacency(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.adjacency.values()
    }

    pub fn degree(&self) -> usize {
        self.adjacency.len()
    }
}

// ============================================================================
// TemporalGraph
// ============================================================================

/// Immutable temporal graph over the instants `0..horizon`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalGraph {
    horizon: u32,
    directed: bool,
    nodes: Vec<TemporalNode>,
    /// label -> nodes that hold the label at some instant
    label_index: AHashMap<LabelId, RoaringBitmap>,
}

impl TemporalGraph {
    pub fn builder(horizon: u32, directed: bool) -> TemporalGraphBuilder {
        TemporalGraphBuilder::new(horizon, directed)
    }

    /// Number of time instants (`T`).
    pub fn horizon(&self) -> u32 {
        self.horizon
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&TemporalNode> {
        self.nodes.get(id as usize)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TemporalNode> + '_ {
        self.nodes.iter()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(TemporalNode::degree).sum()
    }

    pub fn label_count(&self) -> usize {
        self.label_index.len()
    }

    pub fn label_lifespan(&self, node: NodeId, label: LabelId) -> Option<&Lifespan> {
        self.node(node)?.label(label)
    }

    /// Lifetime of the edge `src -> dst`.
    pub fn edge(&self, src: NodeId, dst: NodeId) -> Option<&Lifespan> {
        self.node(src)?.edge(dst).map(Edge::lifetime)
    }

    /// `(neighbor, lifetime)` pairs for the outgoing edges of `node`.
    pub fn adjacency(&self, node: NodeId) -> impl Iterator<Item = (NodeId, &Lifespan)> + '_ {
        self.node(node)
            .into_iter()
            .flat_map(|n| n.adjacency().map(|e| (e.target(), e.lifetime())))
    }

    /// Nodes that hold `label` at some instant.
    pub fn nodes_with_label(&self, label: LabelId) -> Option<&RoaringBitmap> {
        self.label_index.get(&label)
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Accumulates label activity and edge instants, then freezes the graph.
#[derive(Debug, Clone)]
pub struct TemporalGraphBuilder {
    horizon: u32,
    directed: bool,
    nodes: Vec<TemporalNode>,
}

impl TemporalGraphBuilder {
    pub fn new(horizon: u32, directed: bool) -> Self {
        Self {
            horizon,
            directed,
            nodes: Vec::new(),
        }
    }

    pub fn horizon(&self) -> u32 {
        self.horizon
    }

    /// Make sure `id` exists (nodes are dense, so lower ids are created too).
    pub fn add_node(&mut self, id: NodeId) -> &mut Self {
        let needed = id as usize + 1;
        if self.nodes.len() < needed {
            let start = self.nodes.len() as NodeId;
            self.nodes.extend((start..=id).map(TemporalNode::new));
        }
        self
    }

    /// Mark `label` active on `node` at instant `t`.
    pub fn set_label(&mut self, node: NodeId, label: LabelId, t: u32) -> Result<&mut Self, GraphError> {
        self.check_instant(t)?;
        self.add_node(node);
        self.nodes[node as usize]
            .labels
            .entry(label)
            .or_default()
            .set(t);
        Ok(self)
    }

    /// Mark `label` active on `node` for every instant in `span`.
    pub fn set_label_span(
        &mut self,
        node: NodeId,
        label: LabelId,
        span: Range<u32>,
    ) -> Result<&mut Self, GraphError> {
        self.check_span(&span)?;
        self.add_node(node);
        self.nodes[node as usize]
            .labels
            .entry(label)
            .or_default()
            .set_span(span);
        Ok(self)
    }

    /// Record that `src -> dst` exists at instant `t` (both directions when
    /// the graph is undirected).
    pub fn add_edge(&mut self, src: NodeId, dst: NodeId, t: u32) -> Result<&mut Self, GraphError> {
        self.check_instant(t)?;
        self.edge_lifetime(src, dst).set(t);
        if !self.directed {
            self.edge_lifetime(dst, src).set(t);
        }
        Ok(self)
    }

    pub fn add_edge_span(
        &mut self,
        src: NodeId,
        dst: NodeId,
        span: Range<u32>,
    ) -> Result<&mut Self, GraphError> {
        self.check_span(&span)?;
        self.edge_lifetime(src, dst).set_span(span.clone());
        if !self.directed {
            self.edge_lifetime(dst, src).set_span(span);
        }
        Ok(self)
    }

    pub fn build(mut self) -> TemporalGraph {
        let mut label_index: AHashMap<LabelId, RoaringBitmap> = AHashMap::new();

        for node in &mut self.nodes {
            node.labels.retain(|_, life| !life.is_empty());
            node.adjacency.retain(|_, edge| !edge.lifetime.is_empty());
            for &label in node.labels.keys() {
                label_index.entry(label).or_default().insert(node.id);
            }
        }

        TemporalGraph {
            horizon: self.horizon,
            directed: self.directed,
            nodes: self.nodes,
            label_index,
        }
    }

    fn edge_lifetime(&mut self, src: NodeId, dst: NodeId) -> &mut Lifespan {
        self.add_node(src.max(dst));
        &mut self.nodes[src as usize]
            .adjacency
            .entry(dst)
            .or_insert_with(|| Edge {
                target: dst,
                lifetime: Lifespan::new(),
            })
            .lifetime
    }

    fn check_instant(&self, t: u32) -> Result<(), GraphError> {
        if t >= self.horizon {
            return Err(GraphError::InstantOutOfRange {
                instant: t,
                horizon: self.horizon,
            });
        }
        Ok(())
    }

    fn check_span(&self, span: &Range<u32>) -> Result<(), GraphError> {
        if span.start >= span.end {
            return Err(GraphError::EmptySpan {
                start: span.start,
                end: span.end,
            });
        }
        self.check_instant(span.end - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: LabelId = LabelId::new(0);
    const B: LabelId = LabelId::new(1);

    #[test]
    fn undirected_edges_are_stored_both_ways() {
        let mut builder = TemporalGraph::builder(5, false);
        builder.add_edge(0, 1, 2).unwrap().add_edge(0, 1, 3).unwrap();
        let graph = builder.build();

        let forward = graph.edge(0, 1).unwrap();
        let backward = graph.edge(1, 0).unwrap();
        assert_eq!(forward.to_vec(), vec![2, 3]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn directed_edges_are_one_way() {
        let mut builder = TemporalGraph::builder(5, true);
        builder.add_edge(0, 1, 2).unwrap();
        let graph = builder.build();

        assert!(graph.edge(0, 1).is_some());
        assert!(graph.edge(1, 0).is_none());
    }

    #[test]
    fn instants_outside_horizon_are_rejected() {
        let mut builder = TemporalGraph::builder(4, false);
        assert_eq!(
            builder.set_label(0, A, 4).unwrap_err(),
            GraphError::InstantOutOfRange {
                instant: 4,
                horizon: 4
            }
        );
        assert!(builder.add_edge_span(0, 1, 2..2).is_err());
    }

    #[test]
    fn label_index_tracks_holders() {
        let mut builder = TemporalGraph::builder(4, false);
        builder.set_label_span(0, A, 0..4).unwrap();
        builder.set_label(1, B, 1).unwrap();
        builder.set_label(2, A, 3).unwrap();
        let graph = builder.build();

        let holders: Vec<NodeId> = graph.nodes_with_label(A).unwrap().iter().collect();
        assert_eq!(holders, vec![0, 2]);
        assert_eq!(graph.label_count(), 2);
        assert_eq!(graph.label_lifespan(1, B).unwrap().to_vec(), vec![1]);
        assert!(graph.label_lifespan(1, A).is_none());
    }

    #[test]
    fn adding_a_high_id_creates_dense_nodes() {
        let mut builder = TemporalGraph::builder(2, true);
        builder.add_node(3);
        let graph = builder.build();
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.node(2).unwrap().id(), 2);
    }
}
