//! TimeJoin: extend one bound data node along one pattern edge.

use crate::context::QueryContext;
use durograph_temporal::{Lifespan, NodeId, PatternNodeId};
use roaring::RoaringBitmap;

/// Candidates of `child` reachable from `node` (bound at `parent`) through
/// an edge whose joint lifespan with both labels lasts at least `theta`.
///
/// An empty result means `node` cannot be extended along `parent -> child`.
pub fn time_join(
    ctx: &QueryContext<'_>,
    node: NodeId,
    parent: PatternNodeId,
    child: PatternNodeId,
    theta: u32,
    candidates: &RoaringBitmap,
) -> RoaringBitmap {
    let mut kept = RoaringBitmap::new();

    let Some(label_life) = ctx.bound_life(node, parent) else {
        return kept;
    };
    if ctx.duration(&label_life) < theta {
        return kept;
    }
    let Some(source) = ctx.graph.node(node) else {
        return kept;
    };
    let child_label = ctx.pattern.label(child);

    let mut consider = |ngb: NodeId, lifetime: &Lifespan| {
        let mut inter = label_life.intersect(lifetime);
        if ctx.track_labels {
            match ctx.label_life(ngb, child_label) {
                Some(held) => inter.intersect_with(held),
                None => return,
            }
        }
        if ctx.duration(&inter) >= theta {
            kept.insert(ngb);
        }
    };

    // Walk whichever side is smaller.
    if (source.degree() as u64) <= candidates.len() {
        for edge in source.adjacency() {
            if candidates.contains(edge.target()) {
                consider(edge.target(), edge.lifetime());
            }
        }
    } else {
        for ngb in candidates.iter() {
            if let Some(edge) = source.edge(ngb) {
                consider(ngb, edge.lifetime());
            }
        }
    }

    kept
}
