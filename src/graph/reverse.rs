use super::types::CommitGraph;

/// Invert a parent map into a child map.
///
/// Every commit of the input is a key of the output, including commits
/// that no other commit names as a parent. A parent missing from the
/// input's keys still gets an entry for the children that reference it.
pub fn reverse_graph(graph: &CommitGraph) -> CommitGraph {
    let mut reversed = CommitGraph::with_capacity_and_hasher(graph.len(), Default::default());
    for commit in graph.keys() {
        reversed.entry(commit.clone()).or_default();
    }

    for (commit, parents) in graph {
        for parent in parents {
            reversed.entry(parent.clone()).or_default().push(commit.clone());
        }
    }

    reversed
}

#[cfg(test)]
mod tests {
    use super::*;

    // Parents are given space separated: ("merge", "left right")
    fn graph(edges: &[(&str, &str)]) -> CommitGraph {
        edges
            .iter()
            .map(|(c, ps)| (c.to_string(), ps.split_whitespace().map(str::to_string).collect()))
            .collect()
    }

    #[test]
    fn test_leaves_keep_empty_entries() {
        let g = graph(&[("a", ""), ("b", "a"), ("c", "a")]);
        let mut r = reverse_graph(&g);
        for children in r.values_mut() {
            children.sort();
        }

        assert_eq!(r.len(), 3);
        assert_eq!(r["a"], vec!["b".to_string(), "c".to_string()]);
        assert!(r["b"].is_empty());
        assert!(r["c"].is_empty());
    }

    #[test]
    fn test_merge_commit_appears_under_each_parent() {
        let g = graph(&[("a", ""), ("b", ""), ("m", "a b")]);
        let r = reverse_graph(&g);
        assert_eq!(r["a"], vec!["m".to_string()]);
        assert_eq!(r["b"], vec!["m".to_string()]);
    }
}
