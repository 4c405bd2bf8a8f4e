//! Visibility update cycle
//!
//! Recomputes which uploads are visible from which commits for every
//! repository flagged as dirty.
//!
//! # Architecture
//!
//! - **source**: Where commit graphs come from (git via gix)
//! - **store**: Persistence layer trait
//! - **db_store**: Database implementation of VisibilityStore
//! - **progress**: Progress reporting abstraction
//! - **updater**: The orchestrator below

mod db_store;
mod progress;
mod source;
mod store;

pub use progress::{reporter, IndicatifProgress, NoopProgress, ProgressHandle, ProgressReporter};
pub use source::{CommitGraphSource, CommitHistory, GitGraphSource};
pub use store::VisibilityStore;

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

use crate::model::DirtyRepository;
use crate::util::short_commit;

/// Outcome of processing the dirty repositories
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UpdateSummary {
    pub updated: Vec<i64>,
    pub failed: Vec<i64>,
    /// Dirty marks dropped because the repository is not registered
    pub removed: Vec<i64>,
}

/// Drives visibility recomputation for dirty repositories
pub struct Updater<G> {
    source: G,
    verbose: bool,
    profile: bool,
}

impl<G: CommitGraphSource> Updater<G> {
    pub fn new(source: G) -> Self {
        Self {
            source,
            verbose: true,
            profile: false,
        }
    }

    /// Create a quiet updater (no progress bars, used by tests)
    pub fn quiet(source: G) -> Self {
        Self {
            source,
            verbose: false,
            profile: false,
        }
    }

    /// Log per-phase timings.
    ///
    /// Progress bars stay off while profiling so they do not interleave
    /// with the timing lines, whatever `verbose` says.
    pub fn with_profile(mut self, profile: bool) -> Self {
        self.profile = profile;
        self
    }

    fn shows_progress(&self) -> bool {
        self.verbose && !self.profile
    }

    /// Note that a repository may have changed.
    ///
    /// When `check_commit` is given and visibility data already covers it,
    /// nothing needs to be recomputed. Returns whether the repository was
    /// marked dirty. Unregistered repositories are rejected.
    pub async fn update(
        &self,
        store: &impl VisibilityStore,
        repository_id: i64,
        check_commit: Option<&str>,
    ) -> Result<bool> {
        if store.repository_path(repository_id).await?.is_none() {
            bail!("Unknown repository {}", repository_id);
        }

        if let Some(commit) = check_commit {
            if store.has_commit(repository_id, commit).await? {
                info!(repository_id, commit, "commit already known, skipping");
                return Ok(false);
            }
        }

        store.mark_repository_as_dirty(repository_id).await?;
        info!(repository_id, "marked repository dirty");
        Ok(true)
    }

    /// Recompute visibility for every dirty repository.
    ///
    /// A failing repository is logged and keeps its dirty flag so the next
    /// cycle retries it from scratch; the others still proceed. Marks left
    /// for repositories that are not registered are dropped.
    pub async fn update_dirty(&self, store: &impl VisibilityStore) -> Result<UpdateSummary> {
        let total_start = Instant::now();
        let dirty = store.dirty_repositories().await?;
        info!(count = dirty.len(), "found dirty repositories");

        let mut summary = UpdateSummary::default();
        for repository in dirty {
            let repository_id = repository.repository_id;
            let Some(repo_path) = store.repository_path(repository_id).await? else {
                warn!(repository_id, "dropping dirty mark of unregistered repository");
                store.remove_dirty_repository(repository_id).await?;
                summary.removed.push(repository_id);
                continue;
            };

            match self.update_repository(store, repository, &repo_path).await {
                Ok(()) => summary.updated.push(repository_id),
                Err(err) => {
                    warn!(
                        repository_id,
                        error = %format!("{:#}", err),
                        "failed to update visible uploads"
                    );
                    summary.failed.push(repository_id);
                }
            }
        }

        self.profile_phase(
            &format!("Update {} repositories", summary.updated.len() + summary.failed.len()),
            total_start,
        );
        Ok(summary)
    }

    /// Recompute one repository
    async fn update_repository(
        &self,
        store: &impl VisibilityStore,
        repository: DirtyRepository,
        repo_path: &Path,
    ) -> Result<()> {
        let repository_id = repository.repository_id;

        // Phase 1: Read the commit graph
        let phase_start = Instant::now();
        let CommitHistory { tip, graph } = self
            .source
            .history(repo_path)
            .with_context(|| format!("Failed to read commit graph of {}", repo_path.display()))?;
        if !graph.contains_key(&tip) {
            bail!("Tip {} is missing from the commit graph of {}", tip, repo_path.display());
        }
        self.profile_phase(&format!("Load commit graph ({} commits)", graph.len()), phase_start);

        // Phase 2: Compute and replace visibility atomically
        let phase_start = Instant::now();
        let progress = reporter(self.shows_progress());
        let update = store
            .replace_visibility(repository_id, &graph, &tip, repository.dirty_token, progress.as_ref())
            .await?;
        self.profile_phase(
            &format!(
                "Replace visibility ({} rows in {} batches)",
                update.nearest_rows, update.batches
            ),
            phase_start,
        );

        info!(
            repository_id,
            tip = %short_commit(&tip),
            commits = graph.len(),
            nearest_rows = update.nearest_rows,
            visible_at_tip = update.visible_at_tip,
            "updated visible uploads"
        );
        Ok(())
    }

    fn profile_phase(&self, name: &str, start: Instant) {
        if self.profile {
            info!(elapsed = ?start.elapsed(), "[PROFILE] {}", name);
        }
    }
}
