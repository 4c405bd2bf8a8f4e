//! Commit graph sources
//!
//! Supplies the parent map and default-branch tip the visibility engine
//! works on.

use anyhow::{Context, Result};
use gix::ObjectId;
use rustc_hash::FxHashSet;
use std::path::Path;

use crate::graph::CommitGraph;

/// Default-branch tip together with the history walked from it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitHistory {
    pub tip: String,
    /// Commit -> parents map of every commit reachable from `tip`
    pub graph: CommitGraph,
}

/// Where commit graphs come from
pub trait CommitGraphSource {
    /// Resolve the tip once and walk the history from that same commit
    fn history(&self, repo_path: &Path) -> Result<CommitHistory>;
}

/// Reads commit graphs from a local git repository
#[derive(Debug, Clone, Default)]
pub struct GitGraphSource {
    max_commits: Option<usize>,
}

impl GitGraphSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only the first `max_commits` commits of the walk from HEAD.
    ///
    /// Parents that fall outside the window are dropped so the graph stays
    /// closed over its keys.
    pub fn with_max_commits(max_commits: Option<usize>) -> Self {
        Self { max_commits }
    }

    fn head_id(repo: &gix::Repository) -> Result<ObjectId> {
        let head = repo.head_commit().context("Failed to get HEAD commit")?;
        Ok(head.id().into())
    }
}

impl CommitGraphSource for GitGraphSource {
    fn history(&self, repo_path: &Path) -> Result<CommitHistory> {
        let repo = gix::open(repo_path)
            .with_context(|| format!("Failed to open git repository at {}", repo_path.display()))?;
        let head = Self::head_id(&repo)?;

        let limit = self.max_commits.unwrap_or(usize::MAX);
        let mut walked: Vec<(ObjectId, Vec<ObjectId>)> = Vec::new();
        for info in repo.rev_walk([head]).all()? {
            if walked.len() >= limit {
                break;
            }
            let info = info?;
            walked.push((info.id, info.parent_ids.iter().copied().collect()));
        }

        let truncated = walked.len() >= limit;
        let known: FxHashSet<ObjectId> = if truncated {
            walked.iter().map(|(id, _)| *id).collect()
        } else {
            FxHashSet::default()
        };

        let mut graph = CommitGraph::with_capacity_and_hasher(walked.len(), Default::default());
        for (id, parents) in walked {
            let parents = parents
                .into_iter()
                .filter(|p| !truncated || known.contains(p))
                .map(|p| p.to_hex().to_string())
                .collect();
            graph.insert(id.to_hex().to_string(), parents);
        }

        tracing::debug!(
            repo = %repo_path.display(),
            commits = graph.len(),
            truncated,
            "loaded commit graph"
        );
        Ok(CommitHistory {
            tip: head.to_hex().to_string(),
            graph,
        })
    }
}
