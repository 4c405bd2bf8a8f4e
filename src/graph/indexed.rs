//! Dense adjacency representation of a commit graph

use super::error::{GraphError, Result};
use super::interner::{CommitId, CommitInterner};

/// Commit graph with interned ids and both edge directions materialized.
///
/// Commits are interned in sorted hash order so every traversal over the
/// same input visits commits in the same order.
#[derive(Debug)]
pub struct IndexedGraph {
    interner: CommitInterner,
    parents: Vec<Vec<CommitId>>,
    children: Vec<Vec<CommitId>>,
    edge_count: usize,
}

impl IndexedGraph {
    /// Build from `(commit, parents)` pairs.
    ///
    /// Fails with [`GraphError::UnknownParent`] when a parent is not itself
    /// one of the commits.
    pub fn build<'a, I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a [String])>,
    {
        let mut entries: Vec<(&str, &[String])> = entries.into_iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));

        let mut interner = CommitInterner::with_capacity(entries.len());
        for (commit, _) in &entries {
            interner.intern(commit);
        }

        let n = interner.len();
        let mut parents: Vec<Vec<CommitId>> = vec![Vec::new(); n];
        let mut children: Vec<Vec<CommitId>> = vec![Vec::new(); n];
        let mut edge_count = 0;

        for (commit, commit_parents) in &entries {
            let Some(child) = interner.get(commit) else {
                continue;
            };
            for parent in commit_parents.iter() {
                let parent_id = interner.get(parent).ok_or_else(|| GraphError::UnknownParent {
                    commit: (*commit).to_string(),
                    parent: parent.clone(),
                })?;
                parents[child.index()].push(parent_id);
                children[parent_id.index()].push(child);
                edge_count += 1;
            }
        }

        Ok(Self {
            interner,
            parents,
            children,
            edge_count,
        })
    }

    pub fn len(&self) -> usize {
        self.interner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interner.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn parents(&self, id: CommitId) -> &[CommitId] {
        &self.parents[id.index()]
    }

    pub fn children(&self, id: CommitId) -> &[CommitId] {
        &self.children[id.index()]
    }

    pub fn id_of(&self, commit: &str) -> Option<CommitId> {
        self.interner.get(commit)
    }

    pub fn commit(&self, id: CommitId) -> &str {
        self.interner.resolve(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = CommitId> + '_ {
        (0..self.len() as u32).map(CommitId)
    }

    pub(crate) fn parent_lists(&self) -> &[Vec<CommitId>] {
        &self.parents
    }

    pub(crate) fn child_lists(&self) -> &[Vec<CommitId>] {
        &self.children
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry<'a>(commit: &'a str, parents: &'a [String]) -> (&'a str, &'a [String]) {
        (commit, parents)
    }

    #[test]
    fn test_build_links_both_directions() {
        let root: Vec<String> = vec![];
        let child = vec!["a".to_string()];
        let graph = IndexedGraph::build([entry("b", &child), entry("a", &root)]).unwrap();

        let a = graph.id_of("a").unwrap();
        let b = graph.id_of("b").unwrap();
        assert_eq!(a, CommitId(0), "commits are interned in sorted order");
        assert_eq!(graph.parents(b), &[a]);
        assert_eq!(graph.children(a), &[b]);
        assert!(graph.children(b).is_empty());
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let parents = vec!["ghost".to_string()];
        let err = IndexedGraph::build([entry("a", &parents)]).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownParent {
                commit: "a".to_string(),
                parent: "ghost".to_string(),
            }
        );
    }

    #[test]
    fn test_empty_graph() {
        let graph = IndexedGraph::build(std::iter::empty::<(&str, &[String])>()).unwrap();
        assert!(graph.is_empty());
        assert_eq!(graph.ids().count(), 0);
    }
}
