//! Copy-on-write candidate state `C`: pattern node -> data nodes.
//!
//! Cloning a [`CandidateSets`] only bumps reference counts; a set is copied
//! the first time a branch writes to it, so sibling backtracking branches
//! never observe each other's narrowing.

use durograph_temporal::{NodeId, PatternNodeId};
use roaring::RoaringBitmap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSets {
    sets: Vec<Arc<RoaringBitmap>>,
}

impl CandidateSets {
    pub fn new(sets: impl IntoIterator<Item = RoaringBitmap>) -> Self {
        Self {
            sets: sets.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn get(&self, p: PatternNodeId) -> &RoaringBitmap {
        &self.sets[p]
    }

    /// Shared handle to `C[p]`, for iterating while `self` is mutated.
    pub fn shared(&self, p: PatternNodeId) -> Arc<RoaringBitmap> {
        Arc::clone(&self.sets[p])
    }

    pub fn replace(&mut self, p: PatternNodeId, set: RoaringBitmap) {
        self.sets[p] = Arc::new(set);
    }

    /// Narrow `C[p]` to the single node `node`.
    pub fn collapse(&mut self, p: PatternNodeId, node: NodeId) {
        let set = Arc::make_mut(&mut self.sets[p]);
        set.clear();
        set.insert(node);
    }

    /// Whether `node` is already bound at a depth before `depth`.
    pub fn bound_before(&self, depth: usize, node: NodeId) -> bool {
        self.sets[..depth].iter().any(|set| set.contains(node))
    }

    /// True when some pattern node has no candidate left.
    pub fn has_empty(&self) -> bool {
        self.sets.iter().any(|set| set.is_empty())
    }

    /// One data node per pattern node, in pattern order, if every set is
    /// non-empty. After a full descent every set is a singleton.
    pub fn assignment(&self) -> Option<Vec<NodeId>> {
        self.sets.iter().map(|set| set.min()).collect()
    }

    pub fn sizes(&self) -> Vec<u64> {
        self.sets.iter().map(|set| set.len()).collect()
    }

    pub fn smallest(&self) -> u64 {
        self.sets.iter().map(|set| set.len()).min().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(nodes: &[u32]) -> RoaringBitmap {
        nodes.iter().copied().collect()
    }

    #[test]
    fn clones_do_not_see_each_others_writes() {
        let base = CandidateSets::new([bits(&[1, 2, 3]), bits(&[4, 5])]);
        let mut branch = base.clone();
        branch.collapse(0, 2);

        assert_eq!(base.get(0).len(), 3);
        assert_eq!(branch.get(0).len(), 1);
        assert!(Arc::ptr_eq(&base.shared(1), &branch.shared(1)));
    }

    #[test]
    fn assignment_and_binding() {
        let mut sets = CandidateSets::new([bits(&[7]), bits(&[3, 9])]);
        assert!(sets.bound_before(1, 7));
        assert!(!sets.bound_before(1, 3));
        sets.collapse(1, 9);
        assert_eq!(sets.assignment(), Some(vec![7, 9]));
        assert_eq!(sets.sizes(), vec![1, 1]);

        sets.replace(0, RoaringBitmap::new());
        assert!(sets.has_empty());
        assert_eq!(sets.assignment(), None);
        assert_eq!(sets.smallest(), 0);
    }
}
