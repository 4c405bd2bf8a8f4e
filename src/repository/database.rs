use anyhow::{Context, Result};
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, Pool, QueryBuilder, Row, Sqlite, Transaction};
use std::str::FromStr;
use time::OffsetDateTime;

use crate::graph::{calculate_visible_uploads, CommitGraph, NearestUploadRow, UploadsByCommit};
use crate::model::{DirtyRepository, RepositoryInfo, UploadMeta, UploadRecord, UploadState};

use super::SCHEMA_VERSION;

/// Highest number of bound parameters SQLite accepts in one statement
/// (SQLITE_MAX_VARIABLE_NUMBER since 3.32).
pub const MAX_SQLITE_PARAMETERS: usize = 32766;

const NEAREST_UPLOAD_COLUMNS: usize = 4;
const VISIBLE_AT_TIP_COLUMNS: usize = 2;

/// Number of rows that fit in one multi-row INSERT without exceeding
/// `max_parameters` bound values
pub fn rows_per_batch(max_parameters: usize, columns: usize) -> usize {
    (max_parameters / columns.max(1)).max(1)
}

/// Summary of one visibility replacement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisibilityUpdate {
    pub commits: usize,
    pub nearest_rows: usize,
    pub visible_at_tip: usize,
    pub batches: usize,
}

/// Database abstraction for SQLite operations
pub struct Database {
    pool: Pool<Sqlite>,
    max_parameters: usize,
}

impl Database {
    /// Create a new database connection
    pub async fn new(db_path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", db_path))?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .pragma("temp_store", "MEMORY")
            .pragma("cache_size", "-64000"); // 64MB cache

        // A single connection keeps `:memory:` databases shared and
        // serializes writers.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        Ok(Self {
            pool,
            max_parameters: MAX_SQLITE_PARAMETERS,
        })
    }

    /// Override the per-statement parameter limit used to size insert batches
    pub fn with_max_parameters(mut self, max_parameters: usize) -> Self {
        self.max_parameters = max_parameters.max(NEAREST_UPLOAD_COLUMNS);
        self
    }

    pub fn max_parameters(&self) -> usize {
        self.max_parameters
    }

    /// Initialize database schema, returns true if schema was rebuilt
    pub async fn init_schema(&self) -> Result<bool> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )"
        ).execute(&self.pool).await?;

        let stored_version: Option<String> = sqlx::query("SELECT value FROM metadata WHERE key = 'schema_version'")
            .fetch_optional(&self.pool)
            .await?
            .map(|row| row.get("value"));

        let needs_rebuild = stored_version.as_deref() != Some(SCHEMA_VERSION);

        if needs_rebuild {
            if let Some(old) = &stored_version {
                tracing::warn!(from = %old, to = SCHEMA_VERSION, "schema version changed, rebuilding store");
            }
            for table in [
                "nearest_uploads",
                "uploads_visible_at_tip",
                "dirty_repositories",
                "uploads",
                "repositories",
            ] {
                sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
                    .execute(&self.pool)
                    .await?;
            }
            sqlx::query("DELETE FROM metadata").execute(&self.pool).await?;
        }

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS repositories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                path TEXT NOT NULL
            )"
        ).execute(&self.pool).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS uploads (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                repository_id INTEGER NOT NULL,
                commit_hash TEXT NOT NULL,
                root TEXT NOT NULL,
                indexer TEXT NOT NULL,
                state TEXT NOT NULL
            )"
        ).execute(&self.pool).await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS uploads_repository_state ON uploads (repository_id, state)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS nearest_uploads (
                repository_id INTEGER NOT NULL,
                commit_hash TEXT NOT NULL,
                upload_id INTEGER NOT NULL,
                distance INTEGER NOT NULL
            )"
        ).execute(&self.pool).await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS nearest_uploads_repository_commit
                ON nearest_uploads (repository_id, commit_hash)"
        ).execute(&self.pool).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS uploads_visible_at_tip (
                repository_id INTEGER NOT NULL,
                upload_id INTEGER NOT NULL
            )"
        ).execute(&self.pool).await?;

        // Dirty while dirty_token > update_token
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS dirty_repositories (
                repository_id INTEGER PRIMARY KEY,
                dirty_token INTEGER NOT NULL DEFAULT 0,
                update_token INTEGER NOT NULL DEFAULT 0,
                last_updated_at INTEGER
            )"
        ).execute(&self.pool).await?;

        if needs_rebuild {
            sqlx::query("INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?)")
                .bind(SCHEMA_VERSION)
                .execute(&self.pool)
                .await?;
        }

        Ok(needs_rebuild)
    }

    /// Get metadata value by key
    pub async fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM metadata WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to read metadata {}", key))?;
        Ok(value)
    }

    /// Set metadata value
    pub async fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO metadata (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Register a repository and return its id
    pub async fn add_repository(&self, name: &str, path: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO repositories (name, path) VALUES (?, ?)")
            .bind(name)
            .bind(path)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to register repository {}", name))?;
        Ok(result.last_insert_rowid())
    }

    pub async fn repository(&self, repository_id: i64) -> Result<Option<RepositoryInfo>> {
        let row = sqlx::query(
            "SELECT r.id, r.name, r.path,
                    COALESCE(d.dirty_token > d.update_token, 0) AS dirty,
                    d.last_updated_at
             FROM repositories r
             LEFT JOIN dirty_repositories d ON d.repository_id = r.id
             WHERE r.id = ?"
        )
        .bind(repository_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| repository_from_row(&row)))
    }

    pub async fn repositories(&self) -> Result<Vec<RepositoryInfo>> {
        let rows = sqlx::query(
            "SELECT r.id, r.name, r.path,
                    COALESCE(d.dirty_token > d.update_token, 0) AS dirty,
                    d.last_updated_at
             FROM repositories r
             LEFT JOIN dirty_repositories d ON d.repository_id = r.id
             ORDER BY r.id"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(repository_from_row).collect())
    }

    /// Record an upload for a commit and return its id
    pub async fn insert_upload(
        &self,
        repository_id: i64,
        commit: &str,
        root: &str,
        indexer: &str,
        state: UploadState,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO uploads (repository_id, commit_hash, root, indexer, state) VALUES (?, ?, ?, ?, ?)"
        )
        .bind(repository_id)
        .bind(commit)
        .bind(root)
        .bind(indexer)
        .bind(state.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Change an upload's state, returns false when no such upload exists
    pub async fn set_upload_state(&self, upload_id: i64, state: UploadState) -> Result<bool> {
        let result = sqlx::query("UPDATE uploads SET state = ? WHERE id = ?")
            .bind(state.as_str())
            .bind(upload_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Repository id owning an upload
    pub async fn upload_repository(&self, upload_id: i64) -> Result<Option<i64>> {
        let id = sqlx::query_scalar("SELECT repository_id FROM uploads WHERE id = ?")
            .bind(upload_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    /// Whether any upload data exists for the repository
    pub async fn has_repository(&self, repository_id: i64) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM uploads WHERE repository_id = ? LIMIT 1")
            .bind(repository_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    /// Whether visibility data is known for the commit
    pub async fn has_commit(&self, repository_id: i64, commit: &str) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM nearest_uploads WHERE repository_id = ? AND commit_hash = ? LIMIT 1"
        )
        .bind(repository_id)
        .bind(commit)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found.is_some())
    }

    /// Mark the repository's commit graph as out of date
    pub async fn mark_repository_as_dirty(&self, repository_id: i64) -> Result<()> {
        sqlx::query(
            "INSERT INTO dirty_repositories (repository_id, dirty_token, update_token)
             VALUES (?, 1, 0)
             ON CONFLICT(repository_id) DO UPDATE SET dirty_token = dirty_token + 1"
        )
        .bind(repository_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Drop the dirty marks of a repository entirely
    pub async fn remove_dirty_repository(&self, repository_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM dirty_repositories WHERE repository_id = ?")
            .bind(repository_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Repositories whose visibility data is out of date
    pub async fn dirty_repositories(&self) -> Result<Vec<DirtyRepository>> {
        let rows = sqlx::query(
            "SELECT repository_id, dirty_token FROM dirty_repositories
             WHERE dirty_token > update_token
             ORDER BY repository_id"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| DirtyRepository {
                repository_id: row.get("repository_id"),
                dirty_token: row.get("dirty_token"),
            })
            .collect())
    }

    pub async fn is_repository_dirty(&self, repository_id: i64) -> Result<bool> {
        let dirty: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM dirty_repositories WHERE repository_id = ? AND dirty_token > update_token"
        )
        .bind(repository_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(dirty.is_some())
    }

    /// Completed uploads of the repository, grouped by commit
    pub async fn upload_meta(&self, repository_id: i64) -> Result<UploadsByCommit> {
        let mut conn = self.pool.acquire().await?;
        load_upload_meta(&mut conn, repository_id).await
    }

    /// Nearest uploads recorded for a commit, closest first
    pub async fn nearest_uploads(&self, repository_id: i64, commit: &str) -> Result<Vec<UploadMeta>> {
        let rows = sqlx::query(
            "SELECT n.upload_id, u.root, u.indexer, n.distance
             FROM nearest_uploads n
             JOIN uploads u ON u.id = n.upload_id
             WHERE n.repository_id = ? AND n.commit_hash = ?
             ORDER BY n.distance, n.upload_id"
        )
        .bind(repository_id)
        .bind(commit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| UploadMeta {
                upload_id: row.get("upload_id"),
                root: row.get("root"),
                indexer: row.get("indexer"),
                distance: row.get::<i64, _>("distance") as u32,
            })
            .collect())
    }

    /// Uploads visible from the tip of the default branch
    pub async fn uploads_visible_at_tip(&self, repository_id: i64) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar(
            "SELECT upload_id FROM uploads_visible_at_tip WHERE repository_id = ? ORDER BY upload_id"
        )
        .bind(repository_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// Recompute and replace all visibility data of a repository.
    ///
    /// See [`Database::calculate_visible_uploads_with_callback`].
    pub async fn calculate_visible_uploads(
        &self,
        repository_id: i64,
        graph: &CommitGraph,
        tip_commit: &str,
        dirty_token: i64,
    ) -> Result<VisibilityUpdate> {
        self.calculate_visible_uploads_with_callback(repository_id, graph, tip_commit, dirty_token, |_, _| {})
            .await
    }

    /// Recompute and replace all visibility data of a repository in ONE
    /// transaction.
    ///
    /// Loads the completed uploads, runs the visibility engine over `graph`,
    /// replaces the nearest-upload and visible-at-tip rows, then clears the
    /// dirty marks up to `dirty_token`. Any failure rolls everything back and
    /// leaves the repository dirty.
    ///
    /// `on_progress` receives `(rows_written, total_rows)` after each batch.
    pub async fn calculate_visible_uploads_with_callback<F>(
        &self,
        repository_id: i64,
        graph: &CommitGraph,
        tip_commit: &str,
        dirty_token: i64,
        mut on_progress: F,
    ) -> Result<VisibilityUpdate>
    where
        F: FnMut(usize, usize),
    {
        let mut tx = self.pool.begin().await?;

        let uploads = load_upload_meta(&mut tx, repository_id).await?;
        let visible = calculate_visible_uploads(graph, &uploads, tip_commit)
            .with_context(|| format!("Invalid commit graph for repository {}", repository_id))?;

        for table in ["nearest_uploads", "uploads_visible_at_tip"] {
            sqlx::query(&format!("DELETE FROM {} WHERE repository_id = ?", table))
                .bind(repository_id)
                .execute(&mut *tx)
                .await?;
        }

        let rows = visible.rows();
        let mut batches = self
            .insert_nearest_uploads_in_tx(&mut tx, repository_id, &rows, &mut on_progress)
            .await?;
        batches += self
            .insert_visible_at_tip_in_tx(&mut tx, repository_id, &visible.visible_at_tip)
            .await?;

        self.clear_dirty_in_tx(&mut tx, repository_id, dirty_token).await?;

        tx.commit().await?;

        Ok(VisibilityUpdate {
            commits: visible.nearest.len(),
            nearest_rows: rows.len(),
            visible_at_tip: visible.visible_at_tip.len(),
            batches,
        })
    }

    async fn insert_nearest_uploads_in_tx<F>(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        repository_id: i64,
        rows: &[NearestUploadRow<'_>],
        on_progress: &mut F,
    ) -> Result<usize>
    where
        F: FnMut(usize, usize),
    {
        let batch_size = rows_per_batch(self.max_parameters, NEAREST_UPLOAD_COLUMNS);
        let mut batches = 0;

        for chunk in rows.chunks(batch_size) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO nearest_uploads (repository_id, commit_hash, upload_id, distance) "
            );
            qb.push_values(chunk, |mut row, record| {
                row.push_bind(repository_id)
                    .push_bind(record.commit)
                    .push_bind(record.upload_id)
                    .push_bind(i64::from(record.distance));
            });
            qb.build().execute(&mut **tx).await?;

            batches += 1;
            on_progress(chunk.len(), rows.len());
        }

        Ok(batches)
    }

    async fn insert_visible_at_tip_in_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        repository_id: i64,
        upload_ids: &[i64],
    ) -> Result<usize> {
        let batch_size = rows_per_batch(self.max_parameters, VISIBLE_AT_TIP_COLUMNS);
        let mut batches = 0;

        for chunk in upload_ids.chunks(batch_size) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO uploads_visible_at_tip (repository_id, upload_id) "
            );
            qb.push_values(chunk, |mut row, upload_id| {
                row.push_bind(repository_id).push_bind(*upload_id);
            });
            qb.build().execute(&mut **tx).await?;
            batches += 1;
        }

        Ok(batches)
    }

    async fn clear_dirty_in_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        repository_id: i64,
        dirty_token: i64,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO dirty_repositories (repository_id, dirty_token, update_token, last_updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(repository_id) DO UPDATE SET
                update_token = MAX(update_token, excluded.update_token),
                last_updated_at = excluded.last_updated_at"
        )
        .bind(repository_id)
        .bind(dirty_token)
        .bind(dirty_token)
        .bind(OffsetDateTime::now_utc().unix_timestamp())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

fn repository_from_row(row: &sqlx::sqlite::SqliteRow) -> RepositoryInfo {
    RepositoryInfo {
        id: row.get("id"),
        name: row.get("name"),
        path: row.get("path"),
        dirty: row.get::<i64, _>("dirty") != 0,
        last_updated_at: row.get("last_updated_at"),
    }
}

async fn load_upload_meta(conn: &mut sqlx::SqliteConnection, repository_id: i64) -> Result<UploadsByCommit> {
    let rows = sqlx::query(
        "SELECT id, commit_hash, root, indexer FROM uploads
         WHERE state = ? AND repository_id = ?"
    )
    .bind(UploadState::Completed.as_str())
    .bind(repository_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut uploads = UploadsByCommit::default();
    for row in rows {
        let commit: String = row.get("commit_hash");
        uploads.entry(commit).or_default().push(UploadRecord {
            upload_id: row.get("id"),
            root: row.get("root"),
            indexer: row.get("indexer"),
        });
    }
    Ok(uploads)
}
