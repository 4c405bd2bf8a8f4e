mod repository;
mod upload;

pub use repository::{DirtyRepository, RepositoryInfo};
pub use upload::{UploadMeta, UploadRecord, UploadState, VisibilityKey};
