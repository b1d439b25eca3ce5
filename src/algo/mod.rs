//! Graph algorithms module
//!
//! Algorithms live in the `cape-graph-algorithms` crate and run on a dense
//! [`GraphView`]. This module builds that view from a [`PrivilegeGraph`] and
//! maps results back to ARNs.

pub mod paths;

use crate::graph::PrivilegeGraph;
use cape_graph_algorithms::{GraphView, NodeId as AlgoNodeId};
use std::collections::HashMap;

pub use cape_graph_algorithms::{
    bfs, reachable_paths, strongly_connected_components, PathResult, ReachPath, SccResult,
};
pub use paths::{find_admin_paths, inbound_paths, shortest_path, PathHop, PrivescPath};

/// Build a GraphView from the graph for algorithm execution.
///
/// Node ids are the vertex ids; neighbour order follows edge insertion order.
pub fn build_view(graph: &PrivilegeGraph) -> GraphView {
    // 1. Index mappings
    let mut index_to_node: Vec<AlgoNodeId> = Vec::with_capacity(graph.vertex_count());
    let mut node_to_index = HashMap::with_capacity(graph.vertex_count());
    for (id, _) in graph.vertices() {
        node_to_index.insert(id.as_u64(), index_to_node.len());
        index_to_node.push(id.as_u64());
    }
    let node_count = index_to_node.len();

    // 2. Adjacency lists
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    for edge in graph.edges() {
        let (Some(&u), Some(&v)) = (
            node_to_index.get(&edge.source.as_u64()),
            node_to_index.get(&edge.target.as_u64()),
        ) else {
            continue;
        };
        outgoing[u].push(v);
        incoming[v].push(u);
    }

    // 3. CSR
    GraphView::from_adjacency_list(node_count, index_to_node, node_to_index, outgoing, incoming)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{reason, PrincipalNode};

    #[test]
    fn test_build_view_matches_graph() {
        let mut graph = PrivilegeGraph::new();
        let a = graph.add_vertex(PrincipalNode::from_arn("arn:aws:iam::1:user/a")).unwrap();
        let b = graph.add_vertex(PrincipalNode::from_arn("arn:aws:iam::1:role/b")).unwrap();
        graph
            .add_edge("arn:aws:iam::1:user/a", "arn:aws:iam::1:role/b", reason("x", "y"))
            .unwrap();

        let view = build_view(&graph);
        assert_eq!(view.node_count, 2);
        let a_idx = view.index_of(a.as_u64()).unwrap();
        let b_idx = view.index_of(b.as_u64()).unwrap();
        assert_eq!(view.successors(a_idx), &[b_idx]);
        assert_eq!(view.predecessors(b_idx), &[a_idx]);
        assert_eq!(view.out_degree(b_idx), 0);
    }
}
