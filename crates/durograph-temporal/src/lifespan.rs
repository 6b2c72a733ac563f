//! Lifespans: sets of discrete time instants backed by Roaring bitmaps.
//!
//! Every temporal fact in the graph (a label being active on a node, an edge
//! existing) is a `Lifespan` over the instants `0..horizon`. Intersection is
//! bitmap AND; the *duration* of a lifespan is either its cardinality or the
//! length of its longest run of consecutive instants.

use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// How the duration of a lifespan is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationMode {
    /// Number of instants in the lifespan.
    #[default]
    Total,
    /// Length of the longest run of consecutive instants.
    Contiguous,
}

impl fmt::Display for DurationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DurationMode::Total => f.write_str("total"),
            DurationMode::Contiguous => f.write_str("contiguous"),
        }
    }
}

impl FromStr for DurationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "total" => Ok(DurationMode::Total),
            "contiguous" | "continuous" => Ok(DurationMode::Contiguous),
            other => Err(format!("unknown duration mode `{other}` (expected total|contiguous)")),
        }
    }
}

/// A set of time instants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lifespan(RoaringBitmap);

impl Lifespan {
    pub fn new() -> Self {
        Self(RoaringBitmap::new())
    }

    /// All instants in `0..horizon`.
    pub fn full(horizon: u32) -> Self {
        Self::span(0..horizon)
    }

    /// All instants in the half-open range.
    pub fn span(range: Range<u32>) -> Self {
        let mut bits = RoaringBitmap::new();
        bits.insert_range(range);
        Self(bits)
    }

    pub fn from_bitmap(bits: RoaringBitmap) -> Self {
        Self(bits)
    }

    pub fn as_bitmap(&self) -> &RoaringBitmap {
        &self.0
    }

    pub fn into_bitmap(self) -> RoaringBitmap {
        self.0
    }

    /// Mark instant `t`; returns `true` if it was not set before.
    pub fn set(&mut self, t: u32) -> bool {
        self.0.insert(t)
    }

    pub fn set_span(&mut self, range: Range<u32>) {
        self.0.insert_range(range);
    }

    pub fn contains(&self, t: u32) -> bool {
        self.0.contains(t)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of instants (total duration).
    pub fn cardinality(&self) -> u32 {
        self.0.len() as u32
    }

    /// Length of the longest run of consecutive instants (contiguous duration).
    pub fn longest_run(&self) -> u32 {
        let mut best = 0u32;
        let mut run = 0u32;
        let mut prev: Option<u32> = None;

        for t in self.0.iter() {
            run = match prev {
                Some(p) if p + 1 == t => run + 1,
                _ => 1,
            };
            best = best.max(run);
            prev = Some(t);
        }

        best
    }

    pub fn duration(&self, mode: DurationMode) -> u32 {
        match mode {
            DurationMode::Total => self.cardinality(),
            DurationMode::Contiguous => self.longest_run(),
        }
    }

    /// Duration of `self ∩ other` without keeping the intersection around.
    pub fn intersection_duration(&self, other: &Lifespan, mode: DurationMode) -> u32 {
        match mode {
            DurationMode::Total => self.0.intersection_len(&other.0) as u32,
            DurationMode::Contiguous => self.intersect(other).longest_run(),
        }
    }

    pub fn intersect(&self, other: &Lifespan) -> Lifespan {
        Lifespan(&self.0 & &other.0)
    }

    pub fn intersect_with(&mut self, other: &Lifespan) {
        self.0 &= &other.0;
    }

    pub fn union_with(&mut self, other: &Lifespan) {
        self.0 |= &other.0;
    }

    /// Keep only the instants for which `keep` holds.
    pub fn retain(&mut self, mut keep: impl FnMut(u32) -> bool) {
        self.0 = self.0.iter().filter(|&t| keep(t)).collect();
    }

    /// Last instant plus one, or 0 when empty.
    pub fn end(&self) -> u32 {
        self.0.max().map(|t| t + 1).unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter()
    }

    pub fn to_vec(&self) -> Vec<u32> {
        self.0.iter().collect()
    }
}

impl FromIterator<u32> for Lifespan {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Lifespan {
    /// Renders maximal runs, e.g. `{1..4, 7}`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut runs: Vec<(u32, u32)> = Vec::new();
        for t in self.0.iter() {
            match runs.last_mut() {
                Some((_, end)) if *end + 1 == t => *end = t,
                _ => runs.push((t, t)),
            }
        }

        f.write_str("{")?;
        for (i, (start, end)) in runs.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if start == end {
                write!(f, "{start}")?;
            } else {
                write!(f, "{start}..{}", end + 1)?;
            }
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_run_and_cardinality_differ_on_gaps() {
        let life: Lifespan = [1, 2, 3, 7, 8].into_iter().collect();
        assert_eq!(life.duration(DurationMode::Contiguous), 3);
        assert_eq!(life.duration(DurationMode::Total), 5);
    }

    #[test]
    fn empty_lifespan_has_zero_duration() {
        let life = Lifespan::new();
        assert_eq!(life.longest_run(), 0);
        assert_eq!(life.cardinality(), 0);
        assert_eq!(life.end(), 0);
    }

    #[test]
    fn intersection_duration_matches_materialized_intersection() {
        let a = Lifespan::span(0..10);
        let b: Lifespan = [2, 3, 4, 8, 12].into_iter().collect();
        for mode in [DurationMode::Total, DurationMode::Contiguous] {
            assert_eq!(a.intersection_duration(&b, mode), a.intersect(&b).duration(mode));
        }
    }

    #[test]
    fn display_renders_runs() {
        let life: Lifespan = [1, 2, 3, 7].into_iter().collect();
        assert_eq!(life.to_string(), "{1..4, 7}");
    }

    #[test]
    fn duration_mode_parses_both_spellings() {
        assert_eq!("contiguous".parse::<DurationMode>().unwrap(), DurationMode::Contiguous);
        assert_eq!("continuous".parse::<DurationMode>().unwrap(), DurationMode::Contiguous);
        assert!("sometimes".parse::<DurationMode>().is_err());
    }
}
