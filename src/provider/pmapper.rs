//! Principal-mapper graph import
//!
//! Reads the per-account graph that principal-mapper stores on disk:
//!
//! ```text
//! <base>/<account_id>/graph/nodes.json
//! <base>/<account_id>/graph/edges.json
//! ```
//!
//! Nodes carry `is_admin`; edges carry a `short_reason` code and a `reason`
//! sentence. `can_privesc_to_admin` is read off the imported edges: a node
//! can escalate when an admin is reachable from it.

use super::{EscalationData, EscalationProvider, ProviderError, ProviderResult};
use crate::config::ProfileTarget;
use crate::graph::{EscalationEdge, PrincipalNode};
use crate::trust::TrustPolicy;
use async_trait::async_trait;
use cape_graph_algorithms::{reachable_paths, GraphView};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct RawNode {
    arn: String,
    #[serde(default)]
    is_admin: bool,
    #[serde(default)]
    trust_policy: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawEdge {
    source: String,
    destination: String,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    short_reason: String,
}

/// Escalation provider backed by principal-mapper storage
#[derive(Debug, Clone)]
pub struct PmapperProvider {
    base_path: PathBuf,
}

impl PmapperProvider {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        PmapperProvider {
            base_path: base_path.into(),
        }
    }

    pub fn graph_dir(&self, account_id: &str) -> PathBuf {
        self.base_path.join(account_id).join("graph")
    }

    pub async fn load(&self, account_id: &str) -> ProviderResult<EscalationData> {
        let dir = self.graph_dir(account_id);
        let raw_nodes: Vec<RawNode> = read_json(&dir.join("nodes.json")).await?;
        let raw_edges: Vec<RawEdge> = read_json(&dir.join("edges.json")).await?;
        debug!(
            account_id,
            "Read {} pmapper nodes and {} edges",
            raw_nodes.len(),
            raw_edges.len()
        );
        Ok(convert(raw_nodes, raw_edges))
    }
}

#[async_trait]
impl EscalationProvider for PmapperProvider {
    async fn escalation_data(&self, target: &ProfileTarget) -> ProviderResult<EscalationData> {
        self.load(&target.account_id).await
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> ProviderResult<T> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ProviderError::from_io(path, e))?;
    serde_json::from_str(&text).map_err(|e| ProviderError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn convert(raw_nodes: Vec<RawNode>, raw_edges: Vec<RawEdge>) -> EscalationData {
    let edges: Vec<EscalationEdge> = raw_edges
        .into_iter()
        .map(|e| {
            let code = if e.short_reason.is_empty() {
                "pmapper".to_string()
            } else {
                e.short_reason
            };
            EscalationEdge::new(e.source, e.destination, code, e.reason)
        })
        .collect();

    let escalates = admin_reachers(&raw_nodes, &edges);

    let nodes = raw_nodes
        .into_iter()
        .map(|raw| {
            let can_privesc = escalates.contains(&raw.arn);
            let mut node = PrincipalNode::from_arn(&raw.arn)
                .with_admin(raw.is_admin)
                .with_privesc(can_privesc);
            if let Some(doc) = raw.trust_policy.as_ref().filter(|d| !d.is_null()) {
                match TrustPolicy::from_value(doc) {
                    Ok(policy) => node.trust_policy = Some(policy),
                    Err(e) => warn!(arn = %raw.arn, "Ignoring unreadable trust policy: {}", e),
                }
            }
            node
        })
        .collect();

    EscalationData { nodes, edges }
}

/// ARNs from which an admin node is reachable over the imported edges
fn admin_reachers(nodes: &[RawNode], edges: &[EscalationEdge]) -> FxHashSet<String> {
    let ids: FxHashMap<&str, u64> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.arn.as_str(), i as u64))
        .collect();
    let node_ids: Vec<u64> = (0..nodes.len() as u64).collect();
    let pairs: Vec<(u64, u64)> = edges
        .iter()
        .filter_map(|e| Some((*ids.get(e.source.as_str())?, *ids.get(e.destination.as_str())?)))
        .collect();

    let view = GraphView::from_edges(&node_ids, &pairs);
    let admins: FxHashSet<u64> = nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.is_admin)
        .map(|(i, _)| i as u64)
        .collect();

    let mut reachers = FxHashSet::default();
    for path in reachable_paths(&view, &node_ids, |id| admins.contains(&id)) {
        reachers.insert(nodes[path.source as usize].arn.clone());
    }
    reachers
}
