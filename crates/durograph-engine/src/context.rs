//! Read-only view shared by every stage of one query.

use durograph_temporal::{DurationMode, LabelId, Lifespan, NodeId, PatternGraph, PatternNodeId, TemporalGraph};
use std::borrow::Cow;

/// Borrowed graph, pattern and the query settings the hot path reads.
#[derive(Debug, Clone, Copy)]
pub struct QueryContext<'a> {
    pub graph: &'a TemporalGraph,
    pub pattern: &'a PatternGraph,
    pub interval: &'a Lifespan,
    pub mode: DurationMode,
    pub track_labels: bool,
}

impl<'a> QueryContext<'a> {
    pub fn new(
        graph: &'a TemporalGraph,
        pattern: &'a PatternGraph,
        interval: &'a Lifespan,
        mode: DurationMode,
        track_labels: bool,
    ) -> Self {
        Self {
            graph,
            pattern,
            interval,
            mode,
            track_labels,
        }
    }

    pub fn duration(&self, life: &Lifespan) -> u32 {
        life.duration(self.mode)
    }

    /// Label lifespan of `node` for `label`, or `None` if the node never
    /// holds it.
    pub fn label_life(&self, node: NodeId, label: LabelId) -> Option<&'a Lifespan> {
        self.graph.label_lifespan(node, label)
    }

    /// `interval ∩ node.label(p.label)`, or the bare interval when label
    /// changes are not tracked. `None` if the node never holds the label.
    pub fn bound_life(&self, node: NodeId, p: PatternNodeId) -> Option<Cow<'a, Lifespan>> {
        if !self.track_labels {
            return Some(Cow::Borrowed(self.interval));
        }
        let label = self.label_life(node, self.pattern.label(p))?;
        Some(Cow::Owned(self.interval.intersect(label)))
    }
}
