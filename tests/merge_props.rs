use cape::graph::{merge_nodes, PrincipalKind, PrincipalNode, Tristate};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn tristate() -> impl Strategy<Value = Tristate> {
    prop_oneof![
        Just(Tristate::True),
        Just(Tristate::False),
        Just(Tristate::Unknown)
    ]
}

/// Partial observation of one of eight principals. Name and vendor, when
/// present, are consistent per ARN; admin flags may conflict.
fn partial() -> impl Strategy<Value = PrincipalNode> {
    (0u8..8, any::<bool>(), any::<bool>(), tristate(), tristate()).prop_map(
        |(idx, named, vendor, admin, privesc)| {
            let arn = format!("arn:aws:iam::{:012}:role/r{}", idx % 3, idx);
            let mut node = PrincipalNode::new(arn, PrincipalKind::Role)
                .with_admin(admin)
                .with_privesc(privesc);
            if named {
                node.name = format!("r{}", idx);
            }
            if vendor && idx % 2 == 0 {
                node.vendor_name = format!("vendor-{}", idx);
            }
            node
        },
    )
}

proptest! {
    #[test]
    fn merge_keeps_one_node_per_arn(nodes in prop::collection::vec(partial(), 0..40)) {
        let distinct: BTreeSet<String> = nodes.iter().map(|n| n.arn.clone()).collect();
        let merged = merge_nodes(nodes);

        prop_assert_eq!(merged.len(), distinct.len());
        let arns: BTreeSet<String> = merged.iter().map(|n| n.arn.clone()).collect();
        prop_assert_eq!(arns, distinct);
    }

    #[test]
    fn merge_is_order_independent(nodes in prop::collection::vec(partial(), 0..40)) {
        let mut reversed = nodes.clone();
        reversed.reverse();

        let forward = merge_nodes(nodes);
        let backward = merge_nodes(reversed);
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn merge_prefers_higher_risk(nodes in prop::collection::vec(partial(), 1..40)) {
        let merged = merge_nodes(nodes.clone());
        for node in &merged {
            let seen: Vec<Tristate> = nodes
                .iter()
                .filter(|n| n.arn == node.arn)
                .map(|n| n.is_admin)
                .collect();
            let expected = if seen.contains(&Tristate::True) {
                Tristate::True
            } else if seen.contains(&Tristate::False) {
                Tristate::False
            } else {
                Tristate::Unknown
            };
            prop_assert_eq!(node.is_admin, expected);
        }
    }
}
