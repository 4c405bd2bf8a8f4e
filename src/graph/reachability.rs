//! Nearest-upload propagation
//!
//! Every upload is a source at distance 0 on the commit it is attached to.
//! Visibility spreads level by level in two directions: towards descendants
//! along child edges, and towards ancestors along parent edges. A commit
//! keeps, per visibility key, the best `(distance, upload_id)` pair from
//! either direction, so the lowest upload id wins any tie.
//!
//! Both passes share one frontier keyed by `(commit, key)`. Uploads that
//! share a key never trigger separate traversals, which keeps the total work
//! at O((V + E) * K) for K distinct keys.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::model::{UploadMeta, UploadRecord, VisibilityKey};

use super::error::{GraphError, Result};
use super::indexed::IndexedGraph;
use super::interner::CommitId;
use super::toposort::topological_order;
use super::types::{CommitMeta, ReachabilityMap};

type KeyId = u32;

/// Best known upload for one key at one commit
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Candidate {
    distance: u32,
    upload_id: i64,
    /// Index into the flattened upload table
    upload: u32,
}

impl Candidate {
    #[inline]
    fn beats(&self, other: &Candidate) -> bool {
        (self.distance, self.upload_id) < (other.distance, other.upload_id)
    }

    #[inline]
    fn one_step_further(self) -> Candidate {
        Candidate {
            distance: self.distance + 1,
            ..self
        }
    }
}

type BestByKey = FxHashMap<KeyId, Candidate>;

/// Uploads flattened into dense tables, with their keys interned
struct Sources {
    uploads: Vec<UploadRecord>,
    seeds: Vec<(CommitId, KeyId, Candidate)>,
    key_count: usize,
}

impl Sources {
    fn collect(graph: &IndexedGraph, commits: &FxHashMap<String, CommitMeta>) -> Self {
        let mut keys: FxHashMap<VisibilityKey, KeyId> = FxHashMap::default();
        let mut uploads = Vec::new();
        let mut seeds = Vec::new();

        for id in graph.ids() {
            let Some(meta) = commits.get(graph.commit(id)) else {
                continue;
            };
            for upload in &meta.uploads {
                let next_key = keys.len() as KeyId;
                let key = *keys.entry(upload.key()).or_insert(next_key);
                let candidate = Candidate {
                    distance: 0,
                    upload_id: upload.upload_id,
                    upload: uploads.len() as u32,
                };
                uploads.push(upload.clone());
                seeds.push((id, key, candidate));
            }
        }

        Self {
            uploads,
            seeds,
            key_count: keys.len(),
        }
    }
}

/// Compute, for every commit, the nearest upload of each visibility key.
///
/// Distances count commits along a chain of parent edges or a chain of
/// child edges from the upload's commit. A commit with nothing reachable is
/// left out of the result rather than given an empty entry.
///
/// Fails when a parent is not one of the commits or the graph has a cycle.
pub fn calculate_reachability(commits: &FxHashMap<String, CommitMeta>) -> Result<ReachabilityMap> {
    let graph = IndexedGraph::build(
        commits
            .iter()
            .map(|(commit, meta)| (commit.as_str(), meta.parents.as_slice())),
    )?;
    // Rejects cycles up front; the visit budget below only backs this up.
    topological_order(&graph)?;

    let sources = Sources::collect(&graph, commits);
    let limit = (graph.edge_count() + graph.len()) * sources.key_count.max(1) + 1;

    let towards_descendants = propagate(graph.child_lists(), &sources, limit)?;
    let towards_ancestors = propagate(graph.parent_lists(), &sources, limit)?;

    let mut reachability = ReachabilityMap::with_capacity_and_hasher(graph.len(), Default::default());
    for id in graph.ids() {
        let mut best = towards_descendants[id.index()].clone();
        for (&key, candidate) in &towards_ancestors[id.index()] {
            offer(&mut best, key, *candidate);
        }
        if best.is_empty() {
            continue;
        }

        let mut visible: Vec<UploadMeta> = best
            .values()
            .map(|c| sources.uploads[c.upload as usize].at_distance(c.distance))
            .collect();
        visible.sort_unstable_by_key(|meta| meta.upload_id);
        reachability.insert(graph.commit(id).to_string(), visible);
    }

    debug!(
        commits = graph.len(),
        uploads = sources.uploads.len(),
        keys = sources.key_count,
        reachable_commits = reachability.len(),
        "calculated upload reachability"
    );

    Ok(reachability)
}

/// Record `candidate` if it beats the current entry. Returns whether the
/// slot was previously empty.
#[inline]
fn offer(best: &mut BestByKey, key: KeyId, candidate: Candidate) -> bool {
    match best.get_mut(&key) {
        None => {
            best.insert(key, candidate);
            true
        }
        Some(current) => {
            if candidate.beats(current) {
                *current = candidate;
            }
            false
        }
    }
}

/// Multi-source BFS over one edge direction.
///
/// Entries settled at level `d` are final before level `d + 1` is expanded,
/// so the frontier only carries `(commit, key)` and reads the winning
/// candidate when it is expanded.
fn propagate(adjacency: &[Vec<CommitId>], sources: &Sources, limit: usize) -> Result<Vec<BestByKey>> {
    let mut best: Vec<BestByKey> = vec![BestByKey::default(); adjacency.len()];
    let mut frontier: Vec<(CommitId, KeyId)> = Vec::new();

    for &(commit, key, candidate) in &sources.seeds {
        if offer(&mut best[commit.index()], key, candidate) {
            frontier.push((commit, key));
        }
    }

    let mut visits = 0usize;
    while !frontier.is_empty() {
        let mut next = Vec::new();
        for (commit, key) in frontier.drain(..) {
            let Some(&settled) = best[commit.index()].get(&key) else {
                continue;
            };
            let reached = settled.one_step_further();

            for &neighbor in &adjacency[commit.index()] {
                visits += 1;
                if visits > limit {
                    return Err(GraphError::VisitLimitExceeded { limit });
                }
                if offer(&mut best[neighbor.index()], key, reached) {
                    next.push((neighbor, key));
                }
            }
        }
        frontier = next;
    }

    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commits(entries: &[(&str, &str, Vec<UploadRecord>)]) -> FxHashMap<String, CommitMeta> {
        entries
            .iter()
            .map(|(commit, parents, uploads)| {
                let parents = parents.split_whitespace().map(str::to_string).collect();
                (commit.to_string(), CommitMeta::new(parents, uploads.clone()))
            })
            .collect()
    }

    fn distances(map: &ReachabilityMap, commit: &str) -> Vec<(i64, u32)> {
        map.get(commit)
            .map(|v| v.iter().map(|m| (m.upload_id, m.distance)).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_linear_history_sees_both_directions() {
        let up = vec![UploadRecord::new(1, "", "lsif-go")];
        let input = commits(&[("a", "", vec![]), ("b", "a", up.clone()), ("c", "b", vec![])]);
        let map = calculate_reachability(&input).unwrap();

        assert_eq!(distances(&map, "a"), vec![(1, 1)]);
        assert_eq!(distances(&map, "b"), vec![(1, 0)]);
        assert_eq!(distances(&map, "c"), vec![(1, 1)]);
    }

    #[test]
    fn test_equal_distance_prefers_lowest_upload_id() {
        // b is one step from both uploads, one above and one below
        let above = vec![UploadRecord::new(9, "", "lsif-go")];
        let below = vec![UploadRecord::new(4, "", "lsif-go")];
        let input = commits(&[("a", "", above.clone()), ("b", "a", vec![]), ("c", "b", below.clone())]);
        let map = calculate_reachability(&input).unwrap();
        assert_eq!(distances(&map, "b"), vec![(4, 1)]);
    }

    #[test]
    fn test_same_commit_same_key_keeps_lowest_id() {
        let ups = vec![UploadRecord::new(12, "", "lsif-go"), UploadRecord::new(11, "", "lsif-go")];
        let input = commits(&[("a", "", ups.clone()), ("b", "a", vec![])]);
        let map = calculate_reachability(&input).unwrap();
        assert_eq!(distances(&map, "a"), vec![(11, 0)]);
        assert_eq!(distances(&map, "b"), vec![(11, 1)]);
    }

    #[test]
    fn test_distinct_keys_do_not_compete() {
        let ups = vec![UploadRecord::new(1, "a/", "lsif-go"), UploadRecord::new(2, "b/", "lsif-go")];
        let other = vec![UploadRecord::new(3, "a/", "scip-typescript")];
        let input = commits(&[("a", "", ups.clone()), ("b", "a", other.clone())]);
        let map = calculate_reachability(&input).unwrap();
        assert_eq!(distances(&map, "a"), vec![(1, 0), (2, 0), (3, 1)]);
        assert_eq!(distances(&map, "b"), vec![(1, 1), (2, 1), (3, 0)]);
    }

    #[test]
    fn test_sibling_branch_is_not_visible() {
        // b and c both branch from a; only the ancestor chain or the
        // descendant chain counts, never a path that turns around at a.
        let up = vec![UploadRecord::new(1, "", "lsif-go")];
        let input = commits(&[("a", "", vec![]), ("b", "a", up.clone()), ("c", "a", vec![])]);
        let map = calculate_reachability(&input).unwrap();
        assert_eq!(distances(&map, "a"), vec![(1, 1)]);
        assert!(!map.contains_key("c"));
    }

    #[test]
    fn test_no_uploads_yields_empty_map() {
        let input = commits(&[("a", "", vec![]), ("b", "a", vec![])]);
        assert!(calculate_reachability(&input).unwrap().is_empty());
    }

    #[test]
    fn test_unreachable_commits_are_absent() {
        let up = vec![UploadRecord::new(1, "", "lsif-go")];
        let input = commits(&[("a", "", up.clone()), ("island", "", vec![])]);
        let map = calculate_reachability(&input).unwrap();
        assert!(map.contains_key("a"));
        assert!(!map.contains_key("island"));
    }

    #[test]
    fn test_cycle_rejected() {
        let up = vec![UploadRecord::new(1, "", "lsif-go")];
        let input = commits(&[("a", "b", up.clone()), ("b", "a", vec![])]);
        assert!(matches!(
            calculate_reachability(&input),
            Err(GraphError::Cycle { .. })
        ));
    }

    #[test]
    fn test_visit_budget_stops_propagation() {
        // Two commits pointing at each other, bypassing the cycle check
        let adjacency = vec![vec![CommitId(1)], vec![CommitId(0)]];
        let seed = Candidate {
            distance: 0,
            upload_id: 1,
            upload: 0,
        };
        let sources = Sources {
            uploads: vec![UploadRecord::new(1, "", "lsif-go")],
            seeds: vec![(CommitId(0), 0, seed)],
            key_count: 1,
        };

        assert_eq!(
            propagate(&adjacency, &sources, 1).unwrap_err(),
            GraphError::VisitLimitExceeded { limit: 1 }
        );

        // The normal budget, (edges + commits) * keys + 1, is enough
        let best = propagate(&adjacency, &sources, 5).unwrap();
        assert_eq!(best[1][&0].distance, 1);
        assert_eq!(best[0][&0].distance, 0);
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let input = commits(&[("a", "nope", vec![])]);
        assert!(matches!(
            calculate_reachability(&input),
            Err(GraphError::UnknownParent { .. })
        ));
    }
}
