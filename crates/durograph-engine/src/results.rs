//! Result sets: all matches of the best duration, or the bounded top-k.

use ahash::AHashSet;
use durograph_temporal::{Lifespan, NodeId};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// One accepted occurrence of the pattern.
///
/// `assignment[p]` is the data node bound to pattern node `p`; the
/// assignment doubles as the deduplication signature.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub duration: u32,
    pub lifespan: Lifespan,
    pub assignment: Vec<NodeId>,
}

impl Match {
    pub fn signature(&self) -> &[NodeId] {
        &self.assignment
    }
}

/// Longest first, then by signature.
fn report_order(a: &Match, b: &Match) -> Ordering {
    b.duration
        .cmp(&a.duration)
        .then_with(|| a.assignment.cmp(&b.assignment))
}

// ============================================================================
// Best matches
// ============================================================================

/// Every match achieving the current maximum duration.
#[derive(Debug, Clone, Default)]
pub struct BestMatches {
    best: u32,
    matches: Vec<Match>,
    signatures: AHashSet<Vec<NodeId>>,
}

impl BestMatches {
    pub fn best_duration(&self) -> u32 {
        self.best
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn contains_signature(&self, signature: &[NodeId]) -> bool {
        self.signatures.contains(signature)
    }

    /// Drop everything and start over at a longer duration.
    pub fn reset_to(&mut self, duration: u32) {
        self.best = duration;
        self.matches.clear();
        self.signatures.clear();
    }

    pub fn push(&mut self, found: Match) {
        self.signatures.insert(found.assignment.clone());
        self.matches.push(found);
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }
}

// ============================================================================
// Top-k
// ============================================================================

/// Heap entry ordered by `(duration, signature)` so that eviction is
/// deterministic among equal durations.
#[derive(Debug, Clone, PartialEq)]
struct Ranked(Match);

impl Eq for Ranked {}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .duration
            .cmp(&other.0.duration)
            .then_with(|| self.0.assignment.cmp(&other.0.assignment))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Bounded min-heap of at most `k` matches plus their signatures.
#[derive(Debug, Clone)]
pub struct TopKMatches {
    k: usize,
    heap: BinaryHeap<Reverse<Ranked>>,
    signatures: AHashSet<Vec<NodeId>>,
}

impl TopKMatches {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k + 1),
            signatures: AHashSet::new(),
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.k
    }

    /// Smallest duration held, if any.
    pub fn min_duration(&self) -> Option<u32> {
        self.heap.peek().map(|Reverse(Ranked(m))| m.duration)
    }

    pub fn contains_signature(&self, signature: &[NodeId]) -> bool {
        self.signatures.contains(signature)
    }

    pub fn push(&mut self, found: Match) {
        self.signatures.insert(found.assignment.clone());
        self.heap.push(Reverse(Ranked(found)));
    }

    /// Remove the minimum together with its signature.
    pub fn pop_min(&mut self) -> Option<Match> {
        let Reverse(Ranked(evicted)) = self.heap.pop()?;
        self.signatures.remove(&evicted.assignment);
        Some(evicted)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Match> + '_ {
        self.heap.iter().map(|Reverse(Ranked(m))| m)
    }
}

// ============================================================================
// ResultSet
// ============================================================================

#[derive(Debug, Clone)]
pub enum ResultSet {
    Best(BestMatches),
    TopK(TopKMatches),
}

impl ResultSet {
    pub fn len(&self) -> usize {
        match self {
            ResultSet::Best(best) => best.len(),
            ResultSet::TopK(top) => top.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Matches sorted longest first, ties by signature.
    pub fn into_sorted(self) -> Vec<Match> {
        let mut matches: Vec<Match> = match self {
            ResultSet::Best(best) => best.matches,
            ResultSet::TopK(top) => top.heap.into_iter().map(|Reverse(Ranked(m))| m).collect(),
        };
        matches.sort_by(report_order);
        matches
    }
}
