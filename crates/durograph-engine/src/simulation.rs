//! Candidate pruning by dual simulation.
//!
//! Infeasibility is an ordinary outcome here: every function returns `None`
//! as soon as some pattern node runs out of candidates.

use crate::candidates::CandidateSets;
use crate::context::QueryContext;
use crate::join::time_join;
use roaring::RoaringBitmap;

/// Prune `sets` to a fixed point under threshold `theta`.
pub fn dual_simulation(ctx: &QueryContext<'_>, theta: u32, mut sets: CandidateSets) -> Option<CandidateSets> {
    while prune_pass(ctx, theta, &mut sets)? {}
    Some(sets)
}

/// A single forward pruning pass, used after each backtracking step.
pub fn refine(ctx: &QueryContext<'_>, theta: u32, mut sets: CandidateSets) -> Option<CandidateSets> {
    prune_pass(ctx, theta, &mut sets)?;
    Some(sets)
}

/// One pass over all pattern edges. `Some(changed)` or `None` if infeasible.
fn prune_pass(ctx: &QueryContext<'_>, theta: u32, sets: &mut CandidateSets) -> Option<bool> {
    let mut changed = false;

    for (parent, child) in ctx.pattern.edges() {
        let members = sets.shared(parent);
        let mut survivors = RoaringBitmap::new();
        let mut rebuilt = RoaringBitmap::new();

        for node in members.iter() {
            let joined = time_join(ctx, node, parent, child, theta, sets.get(child));
            if joined.is_empty() {
                changed = true;
            } else {
                survivors.insert(node);
                rebuilt |= joined;
            }
        }

        if survivors.is_empty() || rebuilt.is_empty() {
            return None;
        }
        if survivors.len() < members.len() {
            sets.replace(parent, survivors);
        }
        if rebuilt.len() < sets.get(child).len() {
            sets.replace(child, rebuilt);
            changed = true;
        }
    }

    Some(changed)
}
