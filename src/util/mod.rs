mod format;

pub use format::{format_timestamp, short_commit};
