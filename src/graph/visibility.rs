//! Projection of reachability onto what the store persists

use serde::Serialize;

use crate::model::UploadMeta;

use super::error::Result;
use super::reachability::calculate_reachability;
use super::types::{attach_uploads, CommitGraph, ReachabilityMap, UploadsByCommit};

/// One row of the nearest-uploads table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NearestUploadRow<'a> {
    pub commit: &'a str,
    pub upload_id: i64,
    pub distance: u32,
}

/// Result of a visibility computation for one repository
#[derive(Debug, Clone, Default)]
pub struct VisibleUploads {
    pub nearest: ReachabilityMap,
    /// Uploads visible from the tip of the default branch, ascending
    pub visible_at_tip: Vec<i64>,
}

impl VisibleUploads {
    /// Uploads visible at `commit`, empty when none are reachable
    pub fn uploads_at(&self, commit: &str) -> &[UploadMeta] {
        self.nearest.get(commit).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of (commit, upload) pairs
    pub fn row_count(&self) -> usize {
        self.nearest.values().map(Vec::len).sum()
    }

    /// Flatten into rows, ordered by commit then upload id
    pub fn rows(&self) -> Vec<NearestUploadRow<'_>> {
        let mut commits: Vec<&String> = self.nearest.keys().collect();
        commits.sort_unstable();

        let mut rows = Vec::with_capacity(self.row_count());
        for commit in commits {
            for meta in &self.nearest[commit] {
                rows.push(NearestUploadRow {
                    commit: commit.as_str(),
                    upload_id: meta.upload_id,
                    distance: meta.distance,
                });
            }
        }
        rows
    }
}

/// Determine which uploads are visible from every commit of `graph`, and
/// which of them are visible from `tip_commit`.
///
/// A tip that is not part of the graph, or that reaches nothing, gives an
/// empty tip set.
pub fn calculate_visible_uploads(
    graph: &CommitGraph,
    uploads: &UploadsByCommit,
    tip_commit: &str,
) -> Result<VisibleUploads> {
    let nearest = calculate_reachability(&attach_uploads(graph, uploads))?;

    let mut visible_at_tip: Vec<i64> = nearest
        .get(tip_commit)
        .map(|metas| metas.iter().map(|m| m.upload_id).collect())
        .unwrap_or_default();
    visible_at_tip.sort_unstable();

    Ok(VisibleUploads {
        nearest,
        visible_at_tip,
    })
}
