//! Commit interning for dense graph storage
//!
//! Maps commit hashes to u32 indices so the traversal works on plain
//! vectors instead of hashing strings on every edge.

use rustc_hash::FxHashMap;

/// Dense index of an interned commit
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct CommitId(pub u32);

impl CommitId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Commit interner. Ids are handed out in insertion order.
#[derive(Default, Debug)]
pub struct CommitInterner {
    map: FxHashMap<String, u32>,
    vec: Vec<String>,
}

impl CommitInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            vec: Vec::with_capacity(capacity),
        }
    }

    /// Intern a commit and return its id
    pub fn intern(&mut self, commit: &str) -> CommitId {
        if let Some(&id) = self.map.get(commit) {
            return CommitId(id);
        }
        let id = self.vec.len() as u32;
        self.map.insert(commit.to_owned(), id);
        self.vec.push(commit.to_owned());
        CommitId(id)
    }

    /// Look up a commit without interning it
    pub fn get(&self, commit: &str) -> Option<CommitId> {
        self.map.get(commit).copied().map(CommitId)
    }

    pub fn resolve(&self, id: CommitId) -> &str {
        &self.vec[id.index()]
    }

    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }
}
