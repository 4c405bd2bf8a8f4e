//! Database implementation of VisibilityStore

use anyhow::Result;
use std::path::PathBuf;

use crate::graph::CommitGraph;
use crate::model::DirtyRepository;
use crate::repository::{Database, VisibilityUpdate};

use super::progress::ProgressReporter;
use super::store::VisibilityStore;

impl VisibilityStore for Database {
    async fn repository_path(&self, repository_id: i64) -> Result<Option<PathBuf>> {
        Ok(self
            .repository(repository_id)
            .await?
            .map(|repo| PathBuf::from(repo.path)))
    }

    async fn has_commit(&self, repository_id: i64, commit: &str) -> Result<bool> {
        Database::has_commit(self, repository_id, commit).await
    }

    async fn mark_repository_as_dirty(&self, repository_id: i64) -> Result<()> {
        Database::mark_repository_as_dirty(self, repository_id).await
    }

    async fn dirty_repositories(&self) -> Result<Vec<DirtyRepository>> {
        Database::dirty_repositories(self).await
    }

    async fn remove_dirty_repository(&self, repository_id: i64) -> Result<()> {
        Database::remove_dirty_repository(self, repository_id).await
    }

    async fn replace_visibility(
        &self,
        repository_id: i64,
        graph: &CommitGraph,
        tip_commit: &str,
        dirty_token: i64,
        progress: &dyn ProgressReporter,
    ) -> Result<VisibilityUpdate> {
        // Row count is only known once the engine has run
        let pb = progress.start("Writing nearest uploads", 0);
        let update = self
            .calculate_visible_uploads_with_callback(repository_id, graph, tip_commit, dirty_token, |n, total| {
                pb.set_total(total as u64);
                pb.inc(n as u64);
            })
            .await;
        pb.finish();
        update
    }
}
