//! Domain types for the visibility engine
//!
//! These types form the contract between the engine and its callers.

use rustc_hash::FxHashMap;

use crate::model::{UploadMeta, UploadRecord};

/// Commit hash to ordered parent hashes. Root commits map to an empty list.
pub type CommitGraph = FxHashMap<String, Vec<String>>;

/// Completed uploads grouped by the commit they are attached to
pub type UploadsByCommit = FxHashMap<String, Vec<UploadRecord>>;

/// Commit hash to the nearest upload for every visibility key reachable from it
pub type ReachabilityMap = FxHashMap<String, Vec<UploadMeta>>;

/// Everything the engine needs to know about one commit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitMeta {
    pub parents: Vec<String>,
    pub uploads: Vec<UploadRecord>,
}

impl CommitMeta {
    pub fn new(parents: Vec<String>, uploads: Vec<UploadRecord>) -> Self {
        Self { parents, uploads }
    }
}

/// Merge a parent map with the uploads attached to its commits.
///
/// Uploads on commits that are not part of the graph are dropped; they
/// cannot be reached from anywhere in it.
pub fn attach_uploads(graph: &CommitGraph, uploads: &UploadsByCommit) -> FxHashMap<String, CommitMeta> {
    graph
        .iter()
        .map(|(commit, parents)| {
            let attached = uploads.get(commit).cloned().unwrap_or_default();
            (commit.clone(), CommitMeta::new(parents.clone(), attached))
        })
        .collect()
}
