//! Shared utilities for graph algorithms
//!
//! Provides a read-only, optimized view of the graph topology for algorithm execution.

use std::collections::HashMap;

/// Node Identifier type (u64)
pub type NodeId = u64;

/// A dense, integer-indexed view of the graph topology using Compressed Sparse Row (CSR) format.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GraphView {
    /// Number of nodes
    pub node_count: usize,
    /// Mapping from dense index (0..N) back to NodeId
    pub index_to_node: Vec<NodeId>,
    /// Mapping from NodeId to dense index
    pub node_to_index: HashMap<NodeId, usize>,

    /// Outgoing edges CSR structure
    /// Offsets into `out_targets`. Size = node_count + 1
    pub out_offsets: Vec<usize>,
    /// Contiguous array of target node indices
    pub out_targets: Vec<usize>,

    /// Incoming edges CSR structure (Compressed Sparse Column effectively)
    /// Offsets into `in_sources`. Size = node_count + 1
    pub in_offsets: Vec<usize>,
    /// Contiguous array of source node indices
    pub in_sources: Vec<usize>,
}

impl GraphView {
    /// Get the out-degree of a node (by index)
    pub fn out_degree(&self, idx: usize) -> usize {
        self.out_offsets[idx + 1] - self.out_offsets[idx]
    }

    /// Get the in-degree of a node (by index)
    pub fn in_degree(&self, idx: usize) -> usize {
        self.in_offsets[idx + 1] - self.in_offsets[idx]
    }

    /// Get outgoing neighbors (successors) of a node
    pub fn successors(&self, idx: usize) -> &[usize] {
        let start = self.out_offsets[idx];
        let end = self.out_offsets[idx + 1];
        &self.out_targets[start..end]
    }

    /// Get incoming neighbors (predecessors) of a node
    pub fn predecessors(&self, idx: usize) -> &[usize] {
        let start = self.in_offsets[idx];
        let end = self.in_offsets[idx + 1];
        &self.in_sources[start..end]
    }

    /// Dense index of a node id, if the node is part of the view
    pub fn index_of(&self, node: NodeId) -> Option<usize> {
        self.node_to_index.get(&node).copied()
    }

    /// Build a view from node ids and directed `(source, target)` id pairs.
    ///
    /// Pairs referencing ids outside `nodes` are dropped. Neighbour lists keep
    /// the order in which pairs were supplied.
    pub fn from_edges(nodes: &[NodeId], edges: &[(NodeId, NodeId)]) -> Self {
        let mut index_to_node = Vec::with_capacity(nodes.len());
        let mut node_to_index = HashMap::with_capacity(nodes.len());
        for &id in nodes {
            if node_to_index.contains_key(&id) {
                continue;
            }
            node_to_index.insert(id, index_to_node.len());
            index_to_node.push(id);
        }

        let node_count = index_to_node.len();
        let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); node_count];
        let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); node_count];

        for (src, dst) in edges {
            let (Some(&u), Some(&v)) = (node_to_index.get(src), node_to_index.get(dst)) else {
                continue;
            };
            outgoing[u].push(v);
            incoming[v].push(u);
        }

        Self::from_adjacency_list(node_count, index_to_node, node_to_index, outgoing, incoming)
    }

    /// Helper to create GraphView from adjacency lists
    pub fn from_adjacency_list(
        node_count: usize,
        index_to_node: Vec<NodeId>,
        node_to_index: HashMap<NodeId, usize>,
        outgoing: Vec<Vec<usize>>,
        incoming: Vec<Vec<usize>>,
    ) -> Self {
        let mut out_offsets = Vec::with_capacity(node_count + 1);
        let mut out_targets = Vec::new();
        let mut in_offsets = Vec::with_capacity(node_count + 1);
        let mut in_sources = Vec::new();

        out_offsets.push(0);
        for neighbors in outgoing {
            out_targets.extend(neighbors);
            out_offsets.push(out_targets.len());
        }

        in_offsets.push(0);
        for sources in incoming {
            in_sources.extend(sources);
            in_offsets.push(in_sources.len());
        }

        GraphView {
            node_count,
            index_to_node,
            node_to_index,
            out_offsets,
            out_targets,
            in_offsets,
            in_sources,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_edges_builds_csr() {
        // 10 -> 20 -> 30, 10 -> 30
        let view = GraphView::from_edges(&[10, 20, 30], &[(10, 20), (20, 30), (10, 30)]);

        assert_eq!(view.node_count, 3);
        let a = view.index_of(10).unwrap();
        let b = view.index_of(20).unwrap();
        let c = view.index_of(30).unwrap();

        assert_eq!(view.successors(a), &[b, c]);
        assert_eq!(view.predecessors(c), &[b, a]);
        assert_eq!(view.out_degree(a), 2);
        assert_eq!(view.in_degree(a), 0);
    }

    #[test]
    fn test_from_edges_drops_unknown_endpoints() {
        let view = GraphView::from_edges(&[1, 2], &[(1, 2), (2, 99), (99, 1)]);
        assert_eq!(view.out_targets.len(), 1);
        assert_eq!(view.in_sources.len(), 1);
    }
}
