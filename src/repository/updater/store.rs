//! Store trait for the updater
//!
//! Decouples the update cycle from the SQLite implementation.

use anyhow::Result;
use std::path::PathBuf;

use crate::graph::CommitGraph;
use crate::model::DirtyRepository;
use crate::repository::VisibilityUpdate;

use super::progress::ProgressReporter;

/// Persistence needed by [`super::Updater`]
#[allow(async_fn_in_trait)]
pub trait VisibilityStore {
    /// On-disk location of a registered repository
    async fn repository_path(&self, repository_id: i64) -> Result<Option<PathBuf>>;

    /// Whether visibility data already covers the commit
    async fn has_commit(&self, repository_id: i64, commit: &str) -> Result<bool>;

    async fn mark_repository_as_dirty(&self, repository_id: i64) -> Result<()>;

    async fn dirty_repositories(&self) -> Result<Vec<DirtyRepository>>;

    /// Forget the dirty marks of a repository
    async fn remove_dirty_repository(&self, repository_id: i64) -> Result<()>;

    /// Replace the repository's visibility data atomically and clear the
    /// dirty marks up to `dirty_token`.
    async fn replace_visibility(
        &self,
        repository_id: i64,
        graph: &CommitGraph,
        tip_commit: &str,
        dirty_token: i64,
        progress: &dyn ProgressReporter,
    ) -> Result<VisibilityUpdate>;
}
