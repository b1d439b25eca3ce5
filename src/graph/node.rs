//! Principal vertices and partial-record merging
//!
//! The same principal is usually observed several times: once by the local
//! escalation provider, once by the identity listing and again every time it
//! appears in somebody's trust policy. Each observation is a partial
//! [`PrincipalNode`]; [`merge_nodes`] folds them into one record per ARN before
//! anything is inserted into the graph.

use super::arn;
use super::types::{PrincipalKind, Tristate};
use crate::trust::TrustPolicy;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// ARN used for the trust-policy wildcard principal
pub const ANY_PRINCIPAL_ARN: &str = "*";

/// One identity or external entity
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PrincipalNode {
    /// Unique key within the graph
    pub arn: String,

    #[serde(rename = "type")]
    pub kind: PrincipalKind,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub account_id: String,

    /// Set when the account is a known non-customer (vendor/AWS-owned) account
    #[serde(default)]
    pub vendor_name: String,

    #[serde(default)]
    pub is_admin: Tristate,

    #[serde(default)]
    pub can_privesc_to_admin: Tristate,

    /// Trust policy document, roles only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_policy: Option<TrustPolicy>,
}

impl PrincipalNode {
    /// Create a node with an explicit kind and nothing else filled in
    pub fn new(arn: impl Into<String>, kind: PrincipalKind) -> Self {
        PrincipalNode {
            arn: arn.into(),
            kind,
            ..Default::default()
        }
    }

    /// Create a node with kind, name and account inferred from the ARN
    pub fn from_arn(value: &str) -> Self {
        let normalized = arn::normalize_principal_arn(value);
        let kind = arn::kind_from_arn(&normalized);
        let name = arn::name_from_arn(&normalized);
        let account_id = arn::account_id_from_arn(&normalized)
            .unwrap_or_default()
            .to_string();
        PrincipalNode {
            arn: normalized,
            kind,
            name,
            account_id,
            ..Default::default()
        }
    }

    /// The distinguished "any principal" node for wildcard trust
    pub fn any_principal() -> Self {
        PrincipalNode {
            arn: ANY_PRINCIPAL_ARN.to_string(),
            kind: PrincipalKind::AnyPrincipal,
            name: "Any principal".to_string(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = account_id.into();
        self
    }

    pub fn with_vendor(mut self, vendor_name: impl Into<String>) -> Self {
        self.vendor_name = vendor_name.into();
        self
    }

    pub fn with_admin(mut self, is_admin: impl Into<Tristate>) -> Self {
        self.is_admin = is_admin.into();
        self
    }

    pub fn with_privesc(mut self, can_privesc: impl Into<Tristate>) -> Self {
        self.can_privesc_to_admin = can_privesc.into();
        self
    }

    pub fn with_trust_policy(mut self, policy: TrustPolicy) -> Self {
        self.trust_policy = Some(policy);
        self
    }

    pub fn is_vendor(&self) -> bool {
        !self.vendor_name.is_empty()
    }

    pub fn is_any_principal(&self) -> bool {
        self.kind == PrincipalKind::AnyPrincipal
    }

    /// Fold another observation of the same ARN into this one.
    ///
    /// Empty text fields and `Unknown` kind take the other side's value; risk
    /// fields go through [`Tristate::merge`].
    pub fn absorb(&mut self, other: PrincipalNode) {
        debug_assert_eq!(self.arn, other.arn);

        if self.kind == PrincipalKind::Unknown {
            self.kind = other.kind;
        }
        if self.name.is_empty() {
            self.name = other.name;
        }
        if self.account_id.is_empty() {
            self.account_id = other.account_id;
        }
        if self.vendor_name.is_empty() {
            self.vendor_name = other.vendor_name;
        }
        self.is_admin = self.is_admin.merge(other.is_admin);
        self.can_privesc_to_admin = self.can_privesc_to_admin.merge(other.can_privesc_to_admin);
        if self.trust_policy.is_none() {
            self.trust_policy = other.trust_policy;
        }
    }
}

/// Merge partial records into exactly one node per distinct ARN.
///
/// Output is sorted by ARN so that the membership and order of the result does
/// not depend on input order.
pub fn merge_nodes(nodes: impl IntoIterator<Item = PrincipalNode>) -> Vec<PrincipalNode> {
    let mut merged: IndexMap<String, PrincipalNode> = IndexMap::new();

    for node in nodes {
        match merged.get_mut(&node.arn) {
            Some(existing) => existing.absorb(node),
            None => {
                merged.insert(node.arn.clone(), node);
            }
        }
    }

    merged.sort_keys();
    merged.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLE: &str = "arn:aws:iam::111111111111:role/Deploy";

    #[test]
    fn test_from_arn_fills_identity_fields() {
        let node = PrincipalNode::from_arn(ROLE);
        assert_eq!(node.kind, PrincipalKind::Role);
        assert_eq!(node.name, "Deploy");
        assert_eq!(node.account_id, "111111111111");
        assert_eq!(node.is_admin, Tristate::Unknown);

        let root = PrincipalNode::from_arn("333333333333");
        assert_eq!(root.arn, "arn:aws:iam::333333333333:root");
        assert_eq!(root.kind, PrincipalKind::ExternalAccount);
    }

    #[test]
    fn test_merge_unions_fields() {
        let from_listing = PrincipalNode::new(ROLE, PrincipalKind::Role).with_name("Deploy");
        let from_trust = PrincipalNode::new(ROLE, PrincipalKind::Unknown)
            .with_account("111111111111")
            .with_admin(false);

        let merged = merge_nodes(vec![from_listing, from_trust]);
        assert_eq!(merged.len(), 1);

        let node = &merged[0];
        assert_eq!(node.kind, PrincipalKind::Role);
        assert_eq!(node.name, "Deploy");
        assert_eq!(node.account_id, "111111111111");
        assert_eq!(node.is_admin, Tristate::False);
    }

    #[test]
    fn test_merge_conflicting_booleans_prefers_risk() {
        let a = PrincipalNode::new(ROLE, PrincipalKind::Role).with_admin(false).with_privesc(true);
        let b = PrincipalNode::new(ROLE, PrincipalKind::Role).with_admin(true).with_privesc(false);

        let forward = merge_nodes(vec![a.clone(), b.clone()]);
        let backward = merge_nodes(vec![b, a]);

        assert_eq!(forward[0].is_admin, Tristate::True);
        assert_eq!(forward[0].can_privesc_to_admin, Tristate::True);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_merge_vendor_is_order_independent() {
        let bare = PrincipalNode::from_arn("arn:aws:iam::127311923021:root");
        let vendor = PrincipalNode::from_arn("arn:aws:iam::127311923021:root").with_vendor("AWS ELB");

        let one = merge_nodes(vec![bare.clone(), vendor.clone()]);
        let two = merge_nodes(vec![vendor, bare]);
        assert_eq!(one[0].vendor_name, "AWS ELB");
        assert_eq!(one, two);
    }

    #[test]
    fn test_merge_output_sorted_by_arn() {
        let merged = merge_nodes(vec![
            PrincipalNode::from_arn("arn:aws:iam::111111111111:user/zed"),
            PrincipalNode::from_arn("arn:aws:iam::111111111111:user/amy"),
            PrincipalNode::from_arn("arn:aws:iam::111111111111:user/zed"),
        ]);
        let arns: Vec<_> = merged.iter().map(|n| n.arn.as_str()).collect();
        assert_eq!(
            arns,
            vec!["arn:aws:iam::111111111111:user/amy", "arn:aws:iam::111111111111:user/zed"]
        );
    }
}
