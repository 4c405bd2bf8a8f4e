// Shared benchmark helpers
// Functions here are used across different benchmark files
#![allow(dead_code)]

use codeintel_commitgraph::graph::{CommitGraph, UploadsByCommit};
use codeintel_commitgraph::model::{UploadRecord, UploadState};
use codeintel_commitgraph::repository::Database;

pub fn commit_name(i: usize) -> String {
    format!("{:040x}", i)
}

/// Generate a history of N commits: a trunk where every tenth block forks
/// a one-commit side branch off commit 4 and merges it back at commit 8
pub fn generate_history(num_commits: usize) -> CommitGraph {
    let mut graph = CommitGraph::default();

    for i in 0..num_commits {
        let parents = match i % 10 {
            _ if i == 0 => vec![],
            7 => vec![commit_name(i - 3)],
            8 => vec![commit_name(i - 2), commit_name(i - 1)],
            _ => vec![commit_name(i - 1)],
        };
        graph.insert(commit_name(i), parents);
    }
    graph
}

/// Root/indexer pairs used for generated uploads
pub const KEYS: [(&str, &str); 4] = [
    ("", "lsif-go"),
    ("web/", "lsif-tsc"),
    ("api/", "lsif-go"),
    ("docs/", "lsif-node"),
];

/// Attach one upload every `stride` commits, cycling through `KEYS`
pub fn generate_uploads(num_commits: usize, stride: usize) -> UploadsByCommit {
    let mut uploads = UploadsByCommit::default();
    for (n, i) in (0..num_commits).step_by(stride.max(1)).enumerate() {
        let (root, indexer) = KEYS[n % KEYS.len()];
        uploads
            .entry(commit_name(i))
            .or_default()
            .push(UploadRecord::new(n as i64 + 1, root, indexer));
    }
    uploads
}

/// Create an in-memory database for benchmarking
pub async fn setup_bench_db() -> Database {
    let db = Database::new(":memory:").await.unwrap();
    db.init_schema().await.unwrap();
    db
}

/// Register a repository and store generated uploads for it
pub async fn seed_repository(db: &Database, uploads: &UploadsByCommit) -> i64 {
    let repo = db.add_repository("bench", "/bench").await.unwrap();
    let mut records: Vec<(&String, &UploadRecord)> = uploads
        .iter()
        .flat_map(|(commit, records)| records.iter().map(move |r| (commit, r)))
        .collect();
    records.sort_by_key(|(_, r)| r.upload_id);

    for (commit, record) in records {
        db.insert_upload(repo, commit, &record.root, &record.indexer, UploadState::Completed)
            .await
            .unwrap();
    }
    repo
}
