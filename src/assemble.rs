//! Graph assembly
//!
//! Builds the cross-account [`PrivilegeGraph`] from per-account
//! contributions. The steps run in a fixed order:
//!
//! 1. gather every partial node (providers, listings, trust references)
//! 2. merge them once with [`merge_nodes`]
//! 3. insert each merged node, registering newly seen customer accounts
//! 4. drop ignored vertices
//! 5. import local escalation edges
//! 6. derive trust edges for every role
//!
//! Vertices are write-once, so step 2 has to see the complete node set.
//! Duplicate edges are merged, never reported.

use crate::collect::AccountContribution;
use crate::graph::{
    merge_nodes, reason, EscalationEdge, GraphError, GraphResult, GraphStatistics, PrincipalKind,
    PrincipalNode, PrivilegeGraph, Reasons,
};
use crate::ledger::AccountLedger;
use crate::trust::TrustDeriver;
use crate::vendor::VendorLookup;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// What happened to an edge handed to [`merge_edge`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    Created,
    /// The pair already had an edge; new reason codes were added to it
    Merged,
}

/// Insert an edge, or fold its reasons into the existing edge for the pair.
///
/// See [`Edge::add_reason`](crate::graph::Edge::add_reason) for how a repeated reason code is combined.
pub fn merge_edge(
    graph: &mut PrivilegeGraph,
    source: &str,
    target: &str,
    reasons: Reasons,
) -> GraphResult<EdgeOutcome> {
    match graph.edge(source, target) {
        Ok(existing) => {
            let mut merged = existing.clone();
            let mut changed = false;
            for (code, text) in reasons {
                changed |= merged.add_reason(code, text);
            }
            if changed {
                graph.update_edge(source, target, merged.reasons)?;
            }
            Ok(EdgeOutcome::Merged)
        }
        Err(GraphError::EdgeNotFound(..)) => {
            graph.add_edge(source, target, reasons)?;
            Ok(EdgeOutcome::Created)
        }
        Err(e) => Err(e),
    }
}

/// Summary of one assembly run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssemblyReport {
    pub statistics: GraphStatistics,
    /// Ignore-list entries that were present and removed
    pub ignored_removed: Vec<String>,
    /// Ignore-list entries that matched no vertex
    pub ignored_missing: Vec<String>,
    pub edges_created: usize,
    pub edges_merged: usize,
    /// Edges not created because an endpoint is absent (usually ignored)
    pub edges_skipped: usize,
    /// Trust grants whose statement carried conditions
    pub conditional_trust_edges: usize,
    pub discovered_accounts: Vec<String>,
}

pub struct GraphAssembler<'a> {
    vendors: &'a dyn VendorLookup,
    ignore_list: Vec<String>,
}

impl<'a> GraphAssembler<'a> {
    pub fn new(vendors: &'a dyn VendorLookup) -> Self {
        GraphAssembler {
            vendors,
            ignore_list: Vec::new(),
        }
    }

    pub fn with_ignore_list(mut self, arns: Vec<String>) -> Self {
        self.ignore_list = arns;
        self
    }

    pub fn assemble(
        &self,
        contributions: Vec<AccountContribution>,
        ledger: &mut AccountLedger,
    ) -> (PrivilegeGraph, AssemblyReport) {
        let deriver = TrustDeriver::new(self.vendors);
        let mut report = AssemblyReport::default();

        // 1. gather
        let mut partials = Vec::new();
        let mut escalation_edges = Vec::new();
        for contribution in contributions {
            partials.extend(contribution.nodes);
            escalation_edges.extend(contribution.escalation_edges);
        }
        let trusted: Vec<PrincipalNode> = partials
            .iter()
            .filter(|n| n.trust_policy.is_some())
            .flat_map(|role| deriver.principal_nodes(role))
            .collect();
        partials.extend(trusted);
        for node in partials.iter_mut() {
            self.label_vendor(node);
        }

        // 2. merge once
        let merged = merge_nodes(partials);
        info!("Making vertices for {} merged principals", merged.len());

        // 3. insert
        let mut graph = PrivilegeGraph::new();
        for mut node in merged {
            if !node.is_vendor()
                && !node.is_any_principal()
                && ledger.note_discovered(&node.account_id)
            {
                report.discovered_accounts.push(node.account_id.clone());
            }
            node.is_admin = ledger.risk_view(&node.account_id, node.is_admin);
            node.can_privesc_to_admin =
                ledger.risk_view(&node.account_id, node.can_privesc_to_admin);

            if let Err(e) = graph.add_vertex(node) {
                warn!("Skipping vertex: {}", e);
            }
        }

        // 4. ignore list
        for arn in &self.ignore_list {
            match graph.remove_vertex(arn) {
                Ok(_) => report.ignored_removed.push(arn.clone()),
                Err(_) => report.ignored_missing.push(arn.clone()),
            }
        }
        if !report.ignored_removed.is_empty() {
            info!("Ignored {} principals", report.ignored_removed.len());
        }

        // 5. local escalation edges
        info!("Making edges for all profiles");
        for edge in escalation_edges {
            let EscalationEdge {
                source,
                destination,
                reason_code,
                reason_text,
            } = edge;
            self.record(
                &mut report,
                merge_edge(&mut graph, &source, &destination, reason(reason_code, reason_text)),
            );
        }

        // 6. trust edges
        self.add_trust_edges(&deriver, &mut graph, &mut report);

        report.statistics = graph.statistics();
        info!(
            vertices = report.statistics.vertex_count,
            edges = report.statistics.edge_count,
            admins = report.statistics.admin_count,
            conditional_trust = report.conditional_trust_edges,
            "Assembled privilege graph"
        );
        (graph, report)
    }

    fn label_vendor(&self, node: &mut PrincipalNode) {
        if node.vendor_name.is_empty() {
            if let Some(vendor) = self.vendors.vendor_name(&node.account_id) {
                node.vendor_name = vendor.to_string();
            }
        }
    }

    fn add_trust_edges(
        &self,
        deriver: &TrustDeriver<'_>,
        graph: &mut PrivilegeGraph,
        report: &mut AssemblyReport,
    ) {
        let roles: Vec<PrincipalNode> = graph
            .vertices()
            .filter(|(_, n)| n.kind == PrincipalKind::Role && n.trust_policy.is_some())
            .map(|(_, n)| n.clone())
            .collect();

        let mut admins_by_account: FxHashMap<String, Vec<String>> = FxHashMap::default();
        for (_, node) in graph.vertices() {
            if node.is_admin.is_true() && node.kind != PrincipalKind::ExternalAccount {
                admins_by_account
                    .entry(node.account_id.clone())
                    .or_default()
                    .push(node.arn.clone());
            }
        }

        for role in &roles {
            for edge in deriver.trust_edges(role) {
                if edge.conditional {
                    report.conditional_trust_edges += 1;
                }
                if let Some(account_id) = &edge.account_root {
                    // Admins of a trusted account can always exercise root trust
                    for admin in admins_by_account.get(account_id).into_iter().flatten() {
                        if admin == &role.arn {
                            continue;
                        }
                        let text = format!(
                            "{} is an admin of account {}, which {} trusts via {}",
                            admin, account_id, role.arn, edge.reason_code
                        );
                        self.record(
                            report,
                            merge_edge(graph, admin, &role.arn, reason(edge.reason_code.clone(), text)),
                        );
                    }
                }
                self.record(
                    report,
                    merge_edge(
                        graph,
                        &edge.source,
                        &edge.destination,
                        reason(edge.reason_code, edge.reason_text),
                    ),
                );
            }
        }
    }

    fn record(&self, report: &mut AssemblyReport, outcome: GraphResult<EdgeOutcome>) {
        match outcome {
            Ok(EdgeOutcome::Created) => report.edges_created += 1,
            Ok(EdgeOutcome::Merged) => report.edges_merged += 1,
            Err(e) => {
                debug!("Edge not created: {}", e);
                report.edges_skipped += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProfileTarget;
    use crate::graph::Tristate;
    use crate::trust::TrustPolicy;
    use crate::vendor::VendorMap;
    use serde_json::json;

    const USER: &str = "arn:aws:iam::111111111111:user/dev";
    const ADMIN: &str = "arn:aws:iam::111111111111:role/Admin";

    #[test]
    fn test_merge_edge_accumulates_reasons() {
        let mut graph = PrivilegeGraph::new();
        graph.add_vertex(PrincipalNode::from_arn(USER)).unwrap();
        graph.add_vertex(PrincipalNode::from_arn(ADMIN)).unwrap();

        let first = merge_edge(&mut graph, USER, ADMIN, reason("sts:AssumeRole", "trust")).unwrap();
        let second =
            merge_edge(&mut graph, USER, ADMIN, reason("iam:PutRolePolicy", "privesc")).unwrap();
        let again = merge_edge(&mut graph, USER, ADMIN, reason("sts:AssumeRole", "other")).unwrap();

        assert_eq!(first, EdgeOutcome::Created);
        assert_eq!(second, EdgeOutcome::Merged);
        assert_eq!(again, EdgeOutcome::Merged);
        assert_eq!(graph.edge_count(), 1);

        let edge = graph.edge(USER, ADMIN).unwrap();
        assert!(edge.has_reason("sts:AssumeRole"));
        assert!(edge.has_reason("iam:PutRolePolicy"));
        assert_eq!(edge.reasons["sts:AssumeRole"], "trust; other");
    }

    #[test]
    fn test_merge_edge_missing_endpoint() {
        let mut graph = PrivilegeGraph::new();
        graph.add_vertex(PrincipalNode::from_arn(USER)).unwrap();
        assert!(matches!(
            merge_edge(&mut graph, USER, ADMIN, reason("x", "y")),
            Err(GraphError::VertexNotFound(_))
        ));
    }

    #[test]
    fn test_account_root_trust_fans_out_to_admins() {
        let vendors = VendorMap::new();
        let policy = TrustPolicy::from_value(&json!({
            "Statement": [{
                "Effect": "Allow",
                "Principal": {"AWS": "arn:aws:iam::222222222222:root"},
                "Action": "sts:AssumeRole"
            }]
        }))
        .unwrap();

        let target_role = PrincipalNode::from_arn("arn:aws:iam::111111111111:role/CrossAccount")
            .with_admin(false)
            .with_trust_policy(policy);
        let other_admin = PrincipalNode::from_arn("arn:aws:iam::222222222222:role/OrgAdmin")
            .with_admin(true);

        let mut first = AccountContribution::new(ProfileTarget::new("a", "111111111111"));
        first.nodes.push(target_role);
        let mut second = AccountContribution::new(ProfileTarget::new("b", "222222222222"));
        second.nodes.push(other_admin);

        let mut ledger = AccountLedger::new();
        ledger.register_supplied(&first.target);
        ledger.register_supplied(&second.target);

        let (graph, report) = GraphAssembler::new(&vendors).assemble(vec![first, second], &mut ledger);

        assert!(graph
            .edge("arn:aws:iam::222222222222:root", "arn:aws:iam::111111111111:role/CrossAccount")
            .is_ok());
        let fan_out = graph
            .edge("arn:aws:iam::222222222222:role/OrgAdmin", "arn:aws:iam::111111111111:role/CrossAccount")
            .unwrap();
        assert!(fan_out.has_reason("sts:AssumeRole"));
        assert!(report.discovered_accounts.is_empty());
        assert_eq!(report.edges_created, 2);
    }

    #[test]
    fn test_discovered_account_risk_is_unknown() {
        let vendors = VendorMap::new();
        let mut contribution = AccountContribution::new(ProfileTarget::new("a", "111111111111"));
        contribution.nodes.push(
            PrincipalNode::from_arn("arn:aws:iam::333333333333:role/Remote").with_admin(false),
        );

        let mut ledger = AccountLedger::new();
        ledger.register_supplied(&contribution.target);
        let (graph, report) = GraphAssembler::new(&vendors).assemble(vec![contribution], &mut ledger);

        assert_eq!(report.discovered_accounts, vec!["333333333333".to_string()]);
        let remote = graph.vertex("arn:aws:iam::333333333333:role/Remote").unwrap();
        assert_eq!(remote.is_admin, Tristate::Unknown);
    }
}
