use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// The (root, indexer) pair that decides which uploads compete with each other.
///
/// Two uploads with the same key describe the same slice of the repository,
/// so a commit only ever sees the nearest one of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VisibilityKey {
    pub root: String,
    pub indexer: String,
}

impl VisibilityKey {
    pub fn new(root: impl Into<String>, indexer: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            indexer: indexer.into(),
        }
    }
}

/// An upload attached directly to a commit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UploadRecord {
    pub upload_id: i64,
    /// Path prefix the upload covers, empty for the whole repository
    pub root: String,
    pub indexer: String,
}

impl UploadRecord {
    pub fn new(upload_id: i64, root: impl Into<String>, indexer: impl Into<String>) -> Self {
        Self {
            upload_id,
            root: root.into(),
            indexer: indexer.into(),
        }
    }

    pub fn key(&self) -> VisibilityKey {
        VisibilityKey::new(self.root.as_str(), self.indexer.as_str())
    }

    /// Attach a distance, producing the entry stored for a commit
    pub fn at_distance(&self, distance: u32) -> UploadMeta {
        UploadMeta {
            upload_id: self.upload_id,
            root: self.root.clone(),
            indexer: self.indexer.clone(),
            distance,
        }
    }
}

/// An upload as seen from some commit, `distance` commits away
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UploadMeta {
    pub upload_id: i64,
    pub root: String,
    pub indexer: String,
    pub distance: u32,
}

impl UploadMeta {
    pub fn key(&self) -> VisibilityKey {
        VisibilityKey::new(self.root.as_str(), self.indexer.as_str())
    }
}

/// Processing state of an upload row. Only completed uploads take part in
/// visibility.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadState {
    Queued,
    Completed,
    Errored,
}

impl UploadState {
    pub fn as_str(self) -> &'static str {
        match self {
            UploadState::Queued => "queued",
            UploadState::Completed => "completed",
            UploadState::Errored => "errored",
        }
    }
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UploadState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(UploadState::Queued),
            "completed" => Ok(UploadState::Completed),
            "errored" => Ok(UploadState::Errored),
            other => anyhow::bail!("unknown upload state: {}", other),
        }
    }
}
