//! In-memory privilege graph storage
//!
//! Vertices are write-once: once an ARN is inserted its attributes cannot be
//! changed, only removed. Callers must therefore know a vertex's final
//! attributes before inserting it (see [`merge_nodes`](super::merge_nodes)).
//! Edges are unique per ordered pair and their reason maps may be replaced.

use super::edge::{Edge, Reasons};
use super::node::PrincipalNode;
use super::types::{PrincipalKind, VertexId};
use cape_graph_algorithms::strongly_connected_components;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during graph operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Vertex {0} not found")]
    VertexNotFound(String),

    #[error("Vertex {0} already exists")]
    VertexAlreadyExists(String),

    #[error("Edge {0} -> {1} not found")]
    EdgeNotFound(String, String),

    #[error("Edge {0} -> {1} already exists")]
    EdgeAlreadyExists(String, String),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Summary counters for an assembled graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub vertex_count: usize,
    pub edge_count: usize,
    pub admin_count: usize,
    pub vertices_by_kind: BTreeMap<PrincipalKind, usize>,
    /// Groups of two or more principals that can all reach each other
    pub cycle_groups: usize,
}

/// Directed privilege graph keyed by ARN
///
/// - vertices: VertexId -> PrincipalNode, in insertion order
/// - arn_index: ARN -> VertexId
/// - edges: (source, target) -> Edge, in insertion order
/// - outgoing / incoming: adjacency lists
#[derive(Debug)]
pub struct PrivilegeGraph {
    vertices: IndexMap<VertexId, PrincipalNode>,
    arn_index: FxHashMap<String, VertexId>,
    edges: IndexMap<(VertexId, VertexId), Edge>,
    outgoing: FxHashMap<VertexId, Vec<VertexId>>,
    incoming: FxHashMap<VertexId, Vec<VertexId>>,
    next_vertex_id: u64,
}

impl PrivilegeGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        PrivilegeGraph {
            vertices: IndexMap::new(),
            arn_index: FxHashMap::default(),
            edges: IndexMap::new(),
            outgoing: FxHashMap::default(),
            incoming: FxHashMap::default(),
            next_vertex_id: 1,
        }
    }

    /// Insert a vertex with its final attributes
    pub fn add_vertex(&mut self, node: PrincipalNode) -> GraphResult<VertexId> {
        if self.arn_index.contains_key(&node.arn) {
            return Err(GraphError::VertexAlreadyExists(node.arn));
        }

        let id = VertexId::new(self.next_vertex_id);
        self.next_vertex_id += 1;

        self.arn_index.insert(node.arn.clone(), id);
        self.vertices.insert(id, node);
        Ok(id)
    }

    /// Remove a vertex and every edge touching it
    pub fn remove_vertex(&mut self, arn: &str) -> GraphResult<PrincipalNode> {
        let id = self
            .arn_index
            .remove(arn)
            .ok_or_else(|| GraphError::VertexNotFound(arn.to_string()))?;

        for target in self.outgoing.remove(&id).unwrap_or_default() {
            self.edges.shift_remove(&(id, target));
            if let Some(sources) = self.incoming.get_mut(&target) {
                sources.retain(|s| *s != id);
            }
        }
        for source in self.incoming.remove(&id).unwrap_or_default() {
            self.edges.shift_remove(&(source, id));
            if let Some(targets) = self.outgoing.get_mut(&source) {
                targets.retain(|t| *t != id);
            }
        }

        self.vertices
            .shift_remove(&id)
            .ok_or_else(|| GraphError::VertexNotFound(arn.to_string()))
    }

    pub fn vertex(&self, arn: &str) -> Option<&PrincipalNode> {
        self.arn_index.get(arn).and_then(|id| self.vertices.get(id))
    }

    pub fn vertex_id(&self, arn: &str) -> Option<VertexId> {
        self.arn_index.get(arn).copied()
    }

    pub fn vertex_by_id(&self, id: VertexId) -> Option<&PrincipalNode> {
        self.vertices.get(&id)
    }

    pub fn arn_of(&self, id: VertexId) -> Option<&str> {
        self.vertices.get(&id).map(|n| n.arn.as_str())
    }

    pub fn has_vertex(&self, arn: &str) -> bool {
        self.arn_index.contains_key(arn)
    }

    /// All vertices in insertion order
    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, &PrincipalNode)> {
        self.vertices.iter().map(|(id, node)| (*id, node))
    }

    /// Create a directed edge between two existing vertices
    pub fn add_edge(&mut self, source: &str, target: &str, reasons: Reasons) -> GraphResult<()> {
        let (src, dst) = self.endpoints(source, target)?;
        if self.edges.contains_key(&(src, dst)) {
            return Err(GraphError::EdgeAlreadyExists(
                source.to_string(),
                target.to_string(),
            ));
        }

        self.edges.insert((src, dst), Edge::new(src, dst, reasons));
        self.outgoing.entry(src).or_default().push(dst);
        self.incoming.entry(dst).or_default().push(src);
        Ok(())
    }

    /// Replace the reasons carried by an existing edge
    pub fn update_edge(&mut self, source: &str, target: &str, reasons: Reasons) -> GraphResult<()> {
        let key = self.endpoints(source, target)?;
        let edge = self
            .edges
            .get_mut(&key)
            .ok_or_else(|| GraphError::EdgeNotFound(source.to_string(), target.to_string()))?;
        edge.reasons = reasons;
        Ok(())
    }

    pub fn edge(&self, source: &str, target: &str) -> GraphResult<&Edge> {
        let key = self.endpoints(source, target)?;
        self.edges
            .get(&key)
            .ok_or_else(|| GraphError::EdgeNotFound(source.to_string(), target.to_string()))
    }

    pub fn edge_between(&self, source: VertexId, target: VertexId) -> Option<&Edge> {
        self.edges.get(&(source, target))
    }

    /// All edges in insertion order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn outgoing_edges(&self, arn: &str) -> Vec<&Edge> {
        let Some(id) = self.vertex_id(arn) else {
            return Vec::new();
        };
        self.outgoing
            .get(&id)
            .map(|targets| {
                targets
                    .iter()
                    .filter_map(|t| self.edges.get(&(id, *t)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn incoming_edges(&self, arn: &str) -> Vec<&Edge> {
        let Some(id) = self.vertex_id(arn) else {
            return Vec::new();
        };
        self.incoming
            .get(&id)
            .map(|sources| {
                sources
                    .iter()
                    .filter_map(|s| self.edges.get(&(*s, id)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn statistics(&self) -> GraphStatistics {
        let mut stats = GraphStatistics {
            vertex_count: self.vertex_count(),
            edge_count: self.edge_count(),
            ..Default::default()
        };
        for node in self.vertices.values() {
            *stats.vertices_by_kind.entry(node.kind).or_insert(0) += 1;
            if node.is_admin.is_true() {
                stats.admin_count += 1;
            }
        }

        let view = crate::algo::build_view(self);
        stats.cycle_groups = strongly_connected_components(&view)
            .cyclic_components()
            .count();
        stats
    }

    fn endpoints(&self, source: &str, target: &str) -> GraphResult<(VertexId, VertexId)> {
        let src = self
            .vertex_id(source)
            .ok_or_else(|| GraphError::VertexNotFound(source.to_string()))?;
        let dst = self
            .vertex_id(target)
            .ok_or_else(|| GraphError::VertexNotFound(target.to_string()))?;
        Ok((src, dst))
    }
}

impl Default for PrivilegeGraph {
    fn default() -> Self {
        Self::new()
    }
}
