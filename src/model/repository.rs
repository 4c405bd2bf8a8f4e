use serde::Serialize;

/// A repository registered with the store
#[derive(Debug, Clone, Serialize)]
pub struct RepositoryInfo {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub dirty: bool,
    /// Unix timestamp of the last successful visibility update
    pub last_updated_at: Option<i64>,
}

/// A repository whose commit graph or uploads changed since the last update.
///
/// `dirty_token` grows every time the repository is marked dirty. An update
/// only clears the marks it has seen, so a mark that lands mid-update keeps
/// the repository dirty for the next cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct DirtyRepository {
    pub repository_id: i64,
    pub dirty_token: i64,
}
