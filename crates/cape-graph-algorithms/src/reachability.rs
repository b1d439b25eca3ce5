//! Reachability with path materialization
//!
//! Depth-first traversal from each start node. Every traversal root keeps its
//! own visited set, so cycles terminate and each `(start, target)` pair is
//! reported at most once, along the DFS tree path that first discovered it.

use super::common::{GraphView, NodeId};

/// A directed path from `source` to `target`, endpoints included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReachPath {
    pub source: NodeId,
    pub target: NodeId,
    pub path: Vec<NodeId>,
}

impl ReachPath {
    /// Number of edges on the path
    pub fn hop_count(&self) -> usize {
        self.path.len().saturating_sub(1)
    }
}

/// Report every target reachable from each start node.
///
/// `is_target` decides which reached nodes are reported. A start node is never
/// reported as its own target, even when a cycle leads back to it. Results are
/// grouped by start in the order `starts` is given; within one start they follow
/// discovery order.
pub fn reachable_paths<F>(view: &GraphView, starts: &[NodeId], is_target: F) -> Vec<ReachPath>
where
    F: Fn(NodeId) -> bool,
{
    let mut results = Vec::new();
    let mut visited = vec![false; view.node_count];
    let mut parent: Vec<Option<usize>> = vec![None; view.node_count];

    for &start in starts {
        let Some(start_idx) = view.index_of(start) else {
            continue;
        };

        visited.iter_mut().for_each(|v| *v = false);
        parent.iter_mut().for_each(|p| *p = None);
        visited[start_idx] = true;

        // (node index, next successor cursor)
        let mut stack: Vec<(usize, usize)> = vec![(start_idx, 0)];

        while let Some(frame) = stack.last_mut() {
            let current = frame.0;
            let successors = view.successors(current);
            if frame.1 >= successors.len() {
                stack.pop();
                continue;
            }
            let next = successors[frame.1];
            frame.1 += 1;

            if visited[next] {
                continue;
            }
            visited[next] = true;
            parent[next] = Some(current);

            let next_id = view.index_to_node[next];
            if is_target(next_id) {
                results.push(ReachPath {
                    source: start,
                    target: next_id,
                    path: materialize(view, &parent, next),
                });
            }
            stack.push((next, 0));
        }
    }

    results
}

fn materialize(view: &GraphView, parent: &[Option<usize>], end: usize) -> Vec<NodeId> {
    let mut path = vec![view.index_to_node[end]];
    let mut curr = parent[end];
    while let Some(idx) = curr {
        path.push(view.index_to_node[idx]);
        curr = parent[idx];
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_reports_every_target() {
        // 1 -> 2 -> 3
        let view = GraphView::from_edges(&[1, 2, 3], &[(1, 2), (2, 3)]);
        let paths = reachable_paths(&view, &[1], |_| true);

        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].path, vec![1, 2]);
        assert_eq!(paths[1].path, vec![1, 2, 3]);
        assert_eq!(paths[1].hop_count(), 2);
    }

    #[test]
    fn test_cycle_terminates_without_duplicates() {
        // 1 <-> 2, 2 -> 3
        let view = GraphView::from_edges(&[1, 2, 3], &[(1, 2), (2, 1), (2, 3)]);
        let paths = reachable_paths(&view, &[1, 2], |_| true);

        let pairs: Vec<(NodeId, NodeId)> = paths.iter().map(|p| (p.source, p.target)).collect();
        assert_eq!(pairs, vec![(1, 2), (1, 3), (2, 1), (2, 3)]);
    }

    #[test]
    fn test_target_filter() {
        let view = GraphView::from_edges(&[1, 2, 3], &[(1, 2), (2, 3)]);
        let paths = reachable_paths(&view, &[1], |id| id == 3);

        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].path, vec![1, 2, 3]);
    }

    #[test]
    fn test_unknown_start_is_ignored() {
        let view = GraphView::from_edges(&[1, 2], &[(1, 2)]);
        assert!(reachable_paths(&view, &[7], |_| true).is_empty());
    }
}
