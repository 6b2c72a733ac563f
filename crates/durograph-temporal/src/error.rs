use crate::{NodeId, PatternNodeId};

/// Errors raised while building temporal or pattern graphs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("instant {instant} is outside the graph horizon 0..{horizon}")]
    InstantOutOfRange { instant: u32, horizon: u32 },

    #[error("empty time span {start}..{end}")]
    EmptySpan { start: u32, end: u32 },

    #[error("node {0} is not in the graph")]
    UnknownNode(NodeId),

    #[error("pattern node {0} does not exist")]
    UnknownPatternNode(PatternNodeId),

    #[error("pattern edge {0} -> {0} is a self loop")]
    PatternSelfLoop(PatternNodeId),

    #[error("pattern edge {src} -> {dst} is listed twice")]
    DuplicatePatternEdge { src: PatternNodeId, dst: PatternNodeId },

    #[error("undirected pattern edge {src} -> {dst} has no reverse entry")]
    AsymmetricPatternEdge { src: PatternNodeId, dst: PatternNodeId },
}
