//! Community detection algorithms
//!
//! Strongly connected components (iterative Tarjan).

use super::common::{GraphView, NodeId};
use std::collections::HashMap;

/// Result of SCC algorithm
#[derive(Debug, Clone, Default)]
pub struct SccResult {
    /// Components, each sorted by NodeId
    pub components: Vec<Vec<NodeId>>,
    /// Map of NodeId -> position in `components`
    pub node_component: HashMap<NodeId, usize>,
}

impl SccResult {
    /// Components with more than one member, i.e. the nodes that sit on a cycle
    pub fn cyclic_components(&self) -> impl Iterator<Item = &Vec<NodeId>> {
        self.components.iter().filter(|c| c.len() > 1)
    }
}

const UNVISITED: usize = usize::MAX;

/// Strongly Connected Components (SCC)
///
/// Respects edge direction: two nodes share a component only when each can
/// reach the other.
pub fn strongly_connected_components(view: &GraphView) -> SccResult {
    let n = view.node_count;
    let mut index = vec![UNVISITED; n];
    let mut lowlink = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut next_index = 0usize;
    let mut result = SccResult::default();

    for root in 0..n {
        if index[root] != UNVISITED {
            continue;
        }

        index[root] = next_index;
        lowlink[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root] = true;

        let mut call_stack: Vec<(usize, usize)> = vec![(root, 0)];

        while let Some(frame) = call_stack.last_mut() {
            let v = frame.0;
            let successors = view.successors(v);

            if frame.1 < successors.len() {
                let w = successors[frame.1];
                frame.1 += 1;

                if index[w] == UNVISITED {
                    index[w] = next_index;
                    lowlink[w] = next_index;
                    next_index += 1;
                    stack.push(w);
                    on_stack[w] = true;
                    call_stack.push((w, 0));
                } else if on_stack[w] {
                    lowlink[v] = lowlink[v].min(index[w]);
                }
                continue;
            }

            call_stack.pop();
            if let Some(&(parent, _)) = call_stack.last() {
                lowlink[parent] = lowlink[parent].min(lowlink[v]);
            }

            if lowlink[v] == index[v] {
                let mut component = Vec::new();
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    component.push(view.index_to_node[w]);
                    if w == v {
                        break;
                    }
                }
                component.sort_unstable();
                let component_id = result.components.len();
                for &id in &component {
                    result.node_component.insert(id, component_id);
                }
                result.components.push(component);
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scc() {
        // 1 <-> 2 -> 3 -> 4 -> 3, 5 isolated
        let view = GraphView::from_edges(
            &[1, 2, 3, 4, 5],
            &[(1, 2), (2, 1), (2, 3), (3, 4), (4, 3)],
        );

        let result = strongly_connected_components(&view);

        assert_eq!(result.components.len(), 3);
        assert_eq!(result.node_component[&1], result.node_component[&2]);
        assert_eq!(result.node_component[&3], result.node_component[&4]);
        assert_ne!(result.node_component[&1], result.node_component[&3]);

        let cyclic: Vec<_> = result.cyclic_components().cloned().collect();
        assert!(cyclic.contains(&vec![1, 2]));
        assert!(cyclic.contains(&vec![3, 4]));
        assert_eq!(cyclic.len(), 2);
    }

    #[test]
    fn test_dag_has_only_singletons() {
        let view = GraphView::from_edges(&[1, 2, 3], &[(1, 2), (2, 3)]);
        let result = strongly_connected_components(&view);
        assert_eq!(result.components.len(), 3);
        assert_eq!(result.cyclic_components().count(), 0);
    }
}
