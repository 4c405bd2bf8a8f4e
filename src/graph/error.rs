use thiserror::Error;

/// Reasons a commit graph cannot be processed.
///
/// All of these are fatal for the current computation: no partial
/// visibility data is produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("commit {commit} references unknown parent {parent}")]
    UnknownParent { commit: String, parent: String },

    #[error("commit graph contains a cycle through {commit}")]
    Cycle { commit: String },

    #[error("visibility propagation exceeded {limit} visits")]
    VisitLimitExceeded { limit: usize },
}

pub type Result<T> = std::result::Result<T, GraphError>;
