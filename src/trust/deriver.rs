//! Trust-policy edge derivation
//!
//! Turns each principal named by an `Allow` + assume-type statement of a role's
//! trust policy into a [`PrincipalNode`] and a [`TrustEdge`] into the role.
//! Conditions never suppress an edge; they are reported in the reason text.

use super::policy::{PrincipalRef, TrustStatement};
use crate::graph::{arn, PrincipalKind, PrincipalNode};
use crate::vendor::VendorLookup;

/// An edge derived from a trust policy, keyed by ARN
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustEdge {
    pub source: String,
    pub destination: String,
    pub reason_code: String,
    pub reason_text: String,
    /// The granting statement carried conditions
    pub conditional: bool,
    /// Set when the trusted principal is an account root
    pub account_root: Option<String>,
}

pub struct TrustDeriver<'a> {
    vendors: &'a dyn VendorLookup,
}

impl<'a> TrustDeriver<'a> {
    pub fn new(vendors: &'a dyn VendorLookup) -> Self {
        TrustDeriver { vendors }
    }

    /// Node for a single principal reference
    pub fn resolve(&self, principal: &PrincipalRef) -> PrincipalNode {
        match principal {
            PrincipalRef::Any => PrincipalNode::any_principal(),
            PrincipalRef::Aws(value) => {
                let mut node = PrincipalNode::from_arn(value);
                if let Some(vendor) = self.vendors.vendor_name(&node.account_id) {
                    node.vendor_name = vendor.to_string();
                }
                node
            }
            PrincipalRef::Service(service) => {
                PrincipalNode::new(service.clone(), PrincipalKind::Service).with_name(service.clone())
            }
            PrincipalRef::Federated(provider) => {
                let mut node = if arn::Arn::parse(provider).is_some() {
                    PrincipalNode::from_arn(provider)
                } else {
                    PrincipalNode::new(provider.clone(), PrincipalKind::Federated)
                        .with_name(provider.clone())
                };
                node.kind = PrincipalKind::Federated;
                node
            }
            PrincipalRef::CanonicalUser(id) => {
                PrincipalNode::new(id.clone(), PrincipalKind::Unknown).with_name(id.clone())
            }
        }
    }

    /// Every principal trusted by the role, to be merged before vertex insertion
    pub fn principal_nodes(&self, role: &PrincipalNode) -> Vec<PrincipalNode> {
        let Some(policy) = &role.trust_policy else {
            return Vec::new();
        };
        policy
            .assume_statements()
            .flat_map(|statement| statement.principals.iter())
            .map(|principal| self.resolve(principal))
            .collect()
    }

    /// One edge per trusted principal and assume action
    pub fn trust_edges(&self, role: &PrincipalNode) -> Vec<TrustEdge> {
        let Some(policy) = &role.trust_policy else {
            return Vec::new();
        };

        let mut edges = Vec::new();
        for statement in policy.assume_statements() {
            let Some(action) = statement.assume_action() else {
                continue;
            };
            for principal in &statement.principals {
                let node = self.resolve(principal);
                let account_root = (node.kind == PrincipalKind::ExternalAccount)
                    .then(|| node.account_id.clone())
                    .filter(|id| !id.is_empty());

                edges.push(TrustEdge {
                    reason_text: describe(&node, role, action, statement),
                    source: node.arn,
                    destination: role.arn.clone(),
                    reason_code: action.to_string(),
                    conditional: statement.is_conditional(),
                    account_root,
                });
            }
        }
        edges
    }
}

fn describe(source: &PrincipalNode, role: &PrincipalNode, action: &str, statement: &TrustStatement) -> String {
    let mut text = if source.is_any_principal() {
        format!(
            "Trust policy of {} allows ANY principal to call {}",
            role.arn, action
        )
    } else {
        format!("{} can assume {} via {}", source.arn, role.arn, action)
    };
    if source.is_vendor() {
        text.push_str(&format!(" [vendor: {}]", source.vendor_name));
    }
    if let Some(summary) = statement.condition_summary() {
        text.push_str(&format!(" (conditions: {})", summary));
    }
    text
}
