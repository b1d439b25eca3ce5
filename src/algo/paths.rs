//! Privilege-escalation path queries
//!
//! Paths are materialized from DFS reachability over the assembled graph and
//! carry the edge reasons of every hop.

use super::build_view;
use crate::graph::{PrivilegeGraph, Reasons, Tristate, VertexId};
use cape_graph_algorithms::{bfs, reachable_paths, NodeId};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One edge of a path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathHop {
    pub source: String,
    pub destination: String,
    pub reasons: Reasons,
}

/// A chain of edges from `source` to `destination`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivescPath {
    pub source: String,
    pub destination: String,
    pub destination_account_id: String,
    pub destination_is_admin: Tristate,
    pub hops: Vec<PathHop>,
    /// Reasons of every hop, in path order
    pub explanation: String,
}

impl PrivescPath {
    pub fn hop_count(&self) -> usize {
        self.hops.len()
    }

    /// ARNs along the path, endpoints included
    pub fn principals(&self) -> Vec<&str> {
        let mut arns = vec![self.source.as_str()];
        arns.extend(self.hops.iter().map(|h| h.destination.as_str()));
        arns
    }
}

/// Every path into admin principals (`admin_only`) or into any principal.
///
/// With `admin_only`, traversal starts at non-admin vertices and only admin
/// vertices are reported; traversal still passes through admins. Each
/// `(source, destination)` pair appears once. Output is ordered by
/// destination ARN, then source ARN.
pub fn find_admin_paths(graph: &PrivilegeGraph, admin_only: bool) -> Vec<PrivescPath> {
    let view = build_view(graph);

    let is_admin = |id: NodeId| {
        graph
            .vertex_by_id(VertexId::new(id))
            .map_or(false, |n| n.is_admin.is_true())
    };

    let starts: Vec<NodeId> = graph
        .vertices()
        .map(|(id, _)| id.as_u64())
        .filter(|id| !admin_only || !is_admin(*id))
        .collect();

    let admins: FxHashSet<NodeId> = graph
        .vertices()
        .filter(|(_, n)| n.is_admin.is_true())
        .map(|(id, _)| id.as_u64())
        .collect();

    let found = reachable_paths(&view, &starts, |id| !admin_only || admins.contains(&id));
    debug!(admin_only, "Found {} reachable pairs", found.len());

    let mut paths: Vec<PrivescPath> = found
        .iter()
        .filter_map(|reach| materialize(graph, &reach.path))
        .collect();
    paths.sort_by(|a, b| {
        a.destination
            .cmp(&b.destination)
            .then_with(|| a.source.cmp(&b.source))
    });
    paths
}

/// Fewest-hop path between two principals
pub fn shortest_path(graph: &PrivilegeGraph, from: &str, to: &str) -> Option<PrivescPath> {
    let source = graph.vertex_id(from)?;
    let target = graph.vertex_id(to)?;
    if source == target {
        return None;
    }
    let view = build_view(graph);
    let result = bfs(&view, source.as_u64(), target.as_u64())?;
    materialize(graph, &result.path)
}

/// Paths ending in the given account
pub fn inbound_paths(paths: &[PrivescPath], account_id: &str) -> Vec<PrivescPath> {
    paths
        .iter()
        .filter(|p| p.destination_account_id == account_id)
        .cloned()
        .collect()
}

fn materialize(graph: &PrivilegeGraph, ids: &[NodeId]) -> Option<PrivescPath> {
    let (&first, &last) = (ids.first()?, ids.last()?);
    let destination = graph.vertex_by_id(VertexId::new(last))?;

    let mut hops = Vec::with_capacity(ids.len().saturating_sub(1));
    for pair in ids.windows(2) {
        let (src, dst) = (VertexId::new(pair[0]), VertexId::new(pair[1]));
        let edge = graph.edge_between(src, dst)?;
        hops.push(PathHop {
            source: graph.arn_of(src)?.to_string(),
            destination: graph.arn_of(dst)?.to_string(),
            reasons: edge.reasons.clone(),
        });
    }

    Some(PrivescPath {
        source: graph.arn_of(VertexId::new(first))?.to_string(),
        destination: destination.arn.clone(),
        destination_account_id: destination.account_id.clone(),
        destination_is_admin: destination.is_admin,
        explanation: explain(&hops),
        hops,
    })
}

/// `[code] text; [code] text -> [code] text`
fn explain(hops: &[PathHop]) -> String {
    hops.iter()
        .map(|hop| {
            hop.reasons
                .iter()
                .map(|(code, text)| format!("[{}] {}", code, text))
                .collect::<Vec<_>>()
                .join("; ")
        })
        .collect::<Vec<_>>()
        .join(" -> ")
}
