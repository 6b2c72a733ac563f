//! Pattern graphs: the small, time-less shape a query looks for.

use crate::error::GraphError;
use crate::graph::LabelId;
use serde::{Deserialize, Serialize};

/// Position of a node in its pattern; doubles as the backtracking depth.
pub type PatternNodeId = usize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternNode {
    id: PatternNodeId,
    label: LabelId,
    adjacency: Vec<PatternNodeId>,
}

impl PatternNode {
    pub fn id(&self) -> PatternNodeId {
        self.id
    }

    pub fn label(&self) -> LabelId {
        self.label
    }

    pub fn adjacency(&self) -> &[PatternNodeId] {
        &self.adjacency
    }
}

/// An ordered list of labeled pattern nodes with (directed) adjacency lists.
///
/// For undirected datasets every edge is recorded in both directions, which
/// is what the candidate pruning expects. Deserialization re-checks the
/// adjacency lists with the same rules as [`PatternGraph::add_edge`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPatternGraph")]
pub struct PatternGraph {
    id: u32,
    directed: bool,
    nodes: Vec<PatternNode>,
}

impl PatternGraph {
    pub fn new(id: u32, directed: bool) -> Self {
        Self {
            id,
            directed,
            nodes: Vec::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    pub fn add_node(&mut self, label: LabelId) -> PatternNodeId {
        let id = self.nodes.len();
        self.nodes.push(PatternNode {
            id,
            label,
            adjacency: Vec::new(),
        });
        id
    }

    /// Add `src -> dst` (and `dst -> src` when undirected). Duplicate edges
    /// are ignored.
    pub fn add_edge(&mut self, src: PatternNodeId, dst: PatternNodeId) -> Result<(), GraphError> {
        for id in [src, dst] {
            if id >= self.nodes.len() {
                return Err(GraphError::UnknownPatternNode(id));
            }
        }
        if src == dst {
            return Err(GraphError::PatternSelfLoop(src));
        }

        self.link(src, dst);
        if !self.directed {
            self.link(dst, src);
        }
        Ok(())
    }

    fn link(&mut self, src: PatternNodeId, dst: PatternNodeId) {
        let adjacency = &mut self.nodes[src].adjacency;
        if !adjacency.contains(&dst) {
            adjacency.push(dst);
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[PatternNode] {
        &self.nodes
    }

    pub fn node(&self, id: PatternNodeId) -> Option<&PatternNode> {
        self.nodes.get(id)
    }

    /// Label of pattern node `id`.
    ///
    /// Panics if `id` is out of range; callers iterate `0..len()`.
    pub fn label(&self, id: PatternNodeId) -> LabelId {
        self.nodes[id].label
    }

    pub fn adjacency(&self, id: PatternNodeId) -> &[PatternNodeId] {
        &self.nodes[id].adjacency
    }

    /// All directed pattern edges `(parent, child)` in node order.
    pub fn edges(&self) -> impl Iterator<Item = (PatternNodeId, PatternNodeId)> + '_ {
        self.nodes
            .iter()
            .flat_map(|n| n.adjacency.iter().map(move |&child| (n.id, child)))
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.adjacency.len()).sum()
    }
}

/// Wire form of a [`PatternGraph`] before its adjacency is checked.
#[derive(Deserialize)]
struct RawPatternGraph {
    id: u32,
    directed: bool,
    nodes: Vec<PatternNode>,
}

impl TryFrom<RawPatternGraph> for PatternGraph {
    type Error = GraphError;

    fn try_from(raw: RawPatternGraph) -> Result<Self, Self::Error> {
        let len = raw.nodes.len();
        let mut nodes = raw.nodes;
        for (position, node) in nodes.iter_mut().enumerate() {
            node.id = position;
        }

        for node in &nodes {
            for (i, &dst) in node.adjacency.iter().enumerate() {
                if dst >= len {
                    return Err(GraphError::UnknownPatternNode(dst));
                }
                if dst == node.id {
                    return Err(GraphError::PatternSelfLoop(dst));
                }
                if node.adjacency[..i].contains(&dst) {
                    return Err(GraphError::DuplicatePatternEdge { src: node.id, dst });
                }
                if !raw.directed && !nodes[dst].adjacency.contains(&node.id) {
                    return Err(GraphError::AsymmetricPatternEdge { src: node.id, dst });
                }
            }
        }

        Ok(Self {
            id: raw.id,
            directed: raw.directed,
            nodes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undirected_pattern_edges_are_symmetric() {
        let mut pattern = PatternGraph::new(7, false);
        let a = pattern.add_node(LabelId::new(1));
        let b = pattern.add_node(LabelId::new(2));
        pattern.add_edge(a, b).unwrap();
        pattern.add_edge(b, a).unwrap();

        assert_eq!(pattern.adjacency(a), &[b]);
        assert_eq!(pattern.adjacency(b), &[a]);
        assert_eq!(pattern.edges().collect::<Vec<_>>(), vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn bad_pattern_edges_are_rejected() {
        let mut pattern = PatternGraph::new(0, true);
        let a = pattern.add_node(LabelId::new(0));
        assert_eq!(pattern.add_edge(a, 3), Err(GraphError::UnknownPatternNode(3)));
        assert_eq!(pattern.add_edge(a, a), Err(GraphError::PatternSelfLoop(a)));
    }

    /// Same field layout as `PatternGraph`, without the checks.
    #[derive(Serialize)]
    struct Unchecked {
        id: u32,
        directed: bool,
        nodes: Vec<(PatternNodeId, LabelId, Vec<PatternNodeId>)>,
    }

    fn decode(nodes: Vec<(PatternNodeId, LabelId, Vec<PatternNodeId>)>, directed: bool) -> Result<PatternGraph, bincode::Error> {
        let bytes = bincode::serialize(&Unchecked { id: 3, directed, nodes }).unwrap();
        bincode::deserialize(&bytes)
    }

    #[test]
    fn deserialized_patterns_are_checked() {
        let (a, b) = (LabelId::new(0), LabelId::new(1));

        let mut pattern = PatternGraph::new(3, false);
        let x = pattern.add_node(a);
        let y = pattern.add_node(b);
        pattern.add_edge(x, y).unwrap();
        let bytes = bincode::serialize(&pattern).unwrap();
        let back: PatternGraph = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, pattern);

        assert!(decode(vec![(0, a, vec![5]), (1, b, vec![])], true).is_err());
        assert!(decode(vec![(0, a, vec![0])], true).is_err());
        assert!(decode(vec![(0, a, vec![1, 1]), (1, b, vec![])], true).is_err());
        assert!(decode(vec![(0, a, vec![1]), (1, b, vec![])], false).is_err());
        assert!(decode(vec![(0, a, vec![1]), (1, b, vec![])], true).is_ok());
    }
}
