/// Abbreviate a commit hash for display
pub fn short_commit(commit: &str) -> &str {
    commit.get(..8).unwrap_or(commit)
}

/// Format a Unix timestamp as YYYY-MM-DD HH:MM string
pub fn format_timestamp(timestamp: Option<i64>) -> String {
    use time::OffsetDateTime;
    use time::macros::format_description;

    let Some(timestamp) = timestamp else {
        return "never".to_string();
    };

    OffsetDateTime::from_unix_timestamp(timestamp)
        .ok()
        .and_then(|dt| {
            let format = format_description!("[year]-[month]-[day] [hour]:[minute]");
            dt.format(&format).ok()
        })
        .unwrap_or_else(|| "unknown".to_string())
}
