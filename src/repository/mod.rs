mod database;
mod updater;

pub use database::{rows_per_batch, Database, VisibilityUpdate, MAX_SQLITE_PARAMETERS};
pub use updater::{
    reporter, CommitGraphSource, CommitHistory, GitGraphSource, IndicatifProgress, NoopProgress, ProgressHandle,
    ProgressReporter, UpdateSummary, Updater, VisibilityStore,
};

// Re-export the schema version for callers who need it
pub const SCHEMA_VERSION: &str = "1";
