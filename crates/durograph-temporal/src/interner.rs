//! Label interning: label names are stored once and referenced by `LabelId`.

use crate::graph::LabelId;
use anyhow::Result;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};

/// Maps label names to compact ids. Safe to share between loader threads.
pub struct LabelInterner {
    /// Name to ID mapping
    name_to_id: DashMap<String, LabelId>,
    /// ID to name mapping (for reporting)
    id_to_name: DashMap<LabelId, String>,
    /// Next available ID
    next_id: AtomicU32,
}

impl LabelInterner {
    pub fn new() -> Self {
        Self {
            name_to_id: DashMap::new(),
            id_to_name: DashMap::new(),
            next_id: AtomicU32::new(0),
        }
    }

    /// Intern a label name, returning its ID.
    pub fn intern(&self, name: &str) -> LabelId {
        if let Some(id) = self.name_to_id.get(name) {
            return *id;
        }

        // A racing thread may insert the name first; the closure only runs
        // for a vacant entry, so ids stay dense.
        let id = *self
            .name_to_id
            .entry(name.to_string())
            .or_insert_with(|| LabelId::new(self.next_id.fetch_add(1, Ordering::SeqCst)));
        self.id_to_name.entry(id).or_insert_with(|| name.to_string());
        id
    }

    /// Look up an existing ID without inserting.
    pub fn id_of(&self, name: &str) -> Option<LabelId> {
        self.name_to_id.get(name).map(|id| *id)
    }

    pub fn lookup(&self, id: LabelId) -> Option<String> {
        self.id_to_name.get(&id).map(|s| s.clone())
    }

    pub fn len(&self) -> usize {
        self.name_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name_to_id.is_empty()
    }

    /// Names in id order (ids with no name are skipped).
    pub fn names(&self) -> Vec<String> {
        (0..self.next_id.load(Ordering::SeqCst))
            .filter_map(|i| self.lookup(LabelId::new(i)))
            .collect()
    }

    /// Rebuild an interner whose ids follow the order of `names`.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let interner = Self::new();
        for name in names {
            interner.intern(name.as_ref());
        }
        interner
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&self.names())?)
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let names: Vec<String> = bincode::deserialize(bytes)?;
        Ok(Self::from_names(names))
    }
}

impl Default for LabelInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let interner = LabelInterner::new();
        let a = interner.intern("author");
        let b = interner.intern("venue");
        assert_eq!(interner.intern("author"), a);
        assert_ne!(a, b);
        assert_eq!(interner.lookup(b).as_deref(), Some("venue"));
        assert_eq!(interner.id_of("missing"), None);
    }

    #[test]
    fn concurrent_interning_assigns_dense_ids() {
        let interner = LabelInterner::new();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for name in ["a", "b", "c", "d", "e"] {
                        interner.intern(name);
                    }
                });
            }
        });
        assert_eq!(interner.len(), 5);
        let mut ids: Vec<u32> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|name| interner.id_of(name).unwrap().raw())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(interner.names().len(), 5);
    }

    #[test]
    fn names_roundtrip_preserves_ids() {
        let interner = LabelInterner::from_names(["x", "y", "z"]);
        let restored = LabelInterner::from_bytes(&interner.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.id_of("z"), Some(LabelId::new(2)));
        assert_eq!(restored.names(), vec!["x", "y", "z"]);
    }
}
