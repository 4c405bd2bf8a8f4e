use std::collections::VecDeque;

use super::error::{GraphError, Result};
use super::indexed::IndexedGraph;
use super::interner::CommitId;
use super::types::CommitGraph;

/// Order commits so every commit comes before all of its ancestors.
///
/// For each commit `c` with parent `p`, `position(p) >= position(c)`. Any
/// ordering with that property is valid; this one is deterministic for a
/// given input.
pub fn topological_sort(graph: &CommitGraph) -> Result<Vec<String>> {
    let indexed = IndexedGraph::build(graph.iter().map(|(c, ps)| (c.as_str(), ps.as_slice())))?;
    let order = topological_order(&indexed)?;
    Ok(order
        .into_iter()
        .map(|id| indexed.commit(id).to_string())
        .collect())
}

/// Kahn's algorithm over child -> parent edges.
///
/// A commit is emitted once every child has been emitted. Each commit is
/// queued once and each edge is examined once, so a cycle simply leaves
/// commits behind instead of looping.
pub(crate) fn topological_order(graph: &IndexedGraph) -> Result<Vec<CommitId>> {
    let mut pending_children: Vec<usize> = graph.child_lists().iter().map(Vec::len).collect();

    let mut queue: VecDeque<CommitId> = graph
        .ids()
        .filter(|id| pending_children[id.index()] == 0)
        .collect();
    let mut order = Vec::with_capacity(graph.len());

    while let Some(id) = queue.pop_front() {
        order.push(id);
        for &parent in graph.parents(id) {
            let pending = &mut pending_children[parent.index()];
            *pending -= 1;
            if *pending == 0 {
                queue.push_back(parent);
            }
        }
    }

    if order.len() < graph.len() {
        let stuck = graph
            .ids()
            .find(|id| pending_children[id.index()] > 0)
            .map(|id| graph.commit(id).to_string())
            .unwrap_or_default();
        return Err(GraphError::Cycle { commit: stuck });
    }

    Ok(order)
}
