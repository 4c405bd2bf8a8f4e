// Shared test fixtures for integration tests
// Functions here are used across different test files
#![allow(dead_code)]

use codeintel_commitgraph::graph::{CommitGraph, UploadsByCommit};
use codeintel_commitgraph::model::UploadRecord;
use codeintel_commitgraph::repository::Database;
use git2::{Oid, Repository, Signature};
use std::path::PathBuf;
use tempfile::TempDir;

/// The 13-commit history used by the reachability fixtures.
///
/// `e66e8f9b` is the only root. History forks at `e66e8f9b`, `f635b8d1`,
/// `026b8df9`, `d6e54842` and `95dd4b2b`, and `5971b083` merges the
/// `0c5a779c` branch back with `95dd4b2b`.
pub fn test_graph() -> CommitGraph {
    graph(&[
        ("e66e8f9b", ""),
        ("0c5a779c", "e66e8f9b"),
        ("f635b8d1", "e66e8f9b"),
        ("4d36f88b", "f635b8d1"),
        ("026b8df9", "f635b8d1"),
        ("6c301adb", "026b8df9"),
        ("d6e54842", "026b8df9"),
        ("5340d471", "d6e54842"),
        ("cbc5cf7c", "5340d471"),
        ("95dd4b2b", "d6e54842"),
        ("5971b083", "0c5a779c 95dd4b2b"),
        ("7cb4a974", "95dd4b2b"),
        ("0ed556d3", "7cb4a974"),
    ])
}

/// Seven uploads over three (root, indexer) keys attached to `test_graph`
pub fn test_uploads() -> UploadsByCommit {
    uploads(&[
        ("e66e8f9b", 50, "sub1/", "lsif-go"),
        ("f635b8d1", 52, "sub3/", "lsif-go"),
        ("d6e54842", 53, "sub3/", "lsif-go"),
        ("5340d471", 54, "sub3/", "lsif-go"),
        ("95dd4b2b", 55, "sub3/", "lsif-go"),
        ("5971b083", 51, "sub2/", "lsif-go"),
        ("0ed556d3", 56, "sub3/", "lsif-go"),
    ])
}

/// Build a graph from `(commit, "parent1 parent2")` pairs
pub fn graph(edges: &[(&str, &str)]) -> CommitGraph {
    edges
        .iter()
        .map(|(commit, parents)| {
            let parents = parents.split_whitespace().map(str::to_string).collect();
            (commit.to_string(), parents)
        })
        .collect()
}

/// Group `(commit, id, root, indexer)` tuples by commit
pub fn uploads(entries: &[(&str, i64, &str, &str)]) -> UploadsByCommit {
    let mut by_commit = UploadsByCommit::default();
    for (commit, id, root, indexer) in entries {
        by_commit
            .entry(commit.to_string())
            .or_default()
            .push(UploadRecord::new(*id, *root, *indexer));
    }
    by_commit
}

/// Create an in-memory test database with the schema in place
pub async fn create_test_db() -> Database {
    let db = Database::new(":memory:").await.unwrap();
    db.init_schema().await.unwrap();
    db
}

/// Create a temporary git repository
pub fn create_test_repo() -> (TempDir, PathBuf, Repository) {
    let dir = TempDir::new().unwrap();
    let repo_path = dir.path().to_path_buf();
    let repo = Repository::init(&repo_path).unwrap();

    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Test User").unwrap();
    config.set_str("user.email", "test@example.com").unwrap();

    (dir, repo_path, repo)
}

/// Create a commit with explicit parents without moving any ref. The
/// message is written into a file so every commit gets its own tree.
pub fn commit(repo: &Repository, parents: &[Oid], message: &str) -> Oid {
    let sig = Signature::now("Test User", "test@example.com").unwrap();

    let blob = repo.blob(message.as_bytes()).unwrap();
    let mut builder = repo.treebuilder(None).unwrap();
    builder.insert("CHANGELOG", blob, 0o100644).unwrap();
    let tree_id = builder.write().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let parent_commits: Vec<git2::Commit<'_>> = parents
        .iter()
        .map(|oid| repo.find_commit(*oid).unwrap())
        .collect();
    let parent_refs: Vec<&git2::Commit<'_>> = parent_commits.iter().collect();

    repo.commit(None, &sig, &sig, message, &tree, &parent_refs)
        .unwrap()
}

/// Point the default branch at `tip` and check it out as HEAD
pub fn set_head(repo: &Repository, tip: Oid) {
    repo.reference("refs/heads/main", tip, true, "move main").unwrap();
    repo.set_head("refs/heads/main").unwrap();
}

/// Sort every commit's entries by upload id and reduce them to
/// `(upload_id, distance)` pairs
pub fn distance_table(
    map: &codeintel_commitgraph::graph::ReachabilityMap,
) -> std::collections::BTreeMap<String, Vec<(i64, u32)>> {
    map.iter()
        .map(|(commit, metas)| {
            let mut pairs: Vec<(i64, u32)> = metas.iter().map(|m| (m.upload_id, m.distance)).collect();
            pairs.sort_unstable();
            (commit.clone(), pairs)
        })
        .collect()
}
