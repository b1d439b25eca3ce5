//! CAPE: cross-account privilege-graph engine
//!
//! Merges per-account IAM identities and precomputed local escalation edges
//! from many accounts into one directed graph, derives cross-account edges
//! from role trust policies, and answers "who can reach an admin, and how?".
//!
//! # Pipeline
//!
//! - [`collect`]: one task per supplied profile gathers nodes and edges
//! - [`assemble`]: merge nodes once, insert, drop ignored principals, add
//!   escalation and trust edges
//! - [`algo`]: reachability into admin principals with per-hop reasons
//! - [`publish`]: per-profile JSON result files
//!
//! The [`ledger::AccountLedger`] travels through every stage and records which
//! accounts were analyzed, discovered, or failed.
//!
//! ## Example Usage
//!
//! ```rust
//! use cape::graph::{reason, PrincipalNode, PrivilegeGraph};
//! use cape::algo::find_admin_paths;
//!
//! let mut graph = PrivilegeGraph::new();
//! graph.add_vertex(PrincipalNode::from_arn("arn:aws:iam::111111111111:user/dev").with_admin(false)).unwrap();
//! graph.add_vertex(PrincipalNode::from_arn("arn:aws:iam::111111111111:role/Admin").with_admin(true)).unwrap();
//! graph
//!     .add_edge(
//!         "arn:aws:iam::111111111111:user/dev",
//!         "arn:aws:iam::111111111111:role/Admin",
//!         reason("sts:AssumeRole", "dev can assume Admin"),
//!     )
//!     .unwrap();
//!
//! let paths = find_admin_paths(&graph, true);
//! assert_eq!(paths.len(), 1);
//! assert_eq!(paths[0].destination, "arn:aws:iam::111111111111:role/Admin");
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod assemble;
pub mod collect;
pub mod config;
pub mod error;
pub mod graph;
pub mod ledger;
pub mod provider;
pub mod publish;
pub mod runner;
pub mod trust;
pub mod vendor;

// Re-export main types for convenience
pub use graph::{
    merge_nodes, Edge, EscalationEdge, GraphError, GraphResult, GraphStatistics, PrincipalKind,
    PrincipalNode, PrivilegeGraph, Reasons, Tristate, VertexId,
};

pub use algo::{find_admin_paths, inbound_paths, shortest_path, PathHop, PrivescPath};

pub use assemble::{merge_edge, AssemblyReport, EdgeOutcome, GraphAssembler};

pub use collect::{AccountContribution, CollectFailure, CollectStage, Collector};

pub use config::{CapeConfig, ConfigError, ProfileTarget};

pub use error::{CapeError, CapeResult};

pub use ledger::{AccountLedger, AccountRecord, AccountSource};

pub use provider::{
    EscalationData, EscalationProvider, FileIdentityProvider, IdentityListing, IdentityProvider,
    PmapperProvider, ProviderError, ProviderResult,
};

pub use publish::{
    load_report, locate_reports, result_file_path, CapeReport, LocatedReports, PublishError,
    ResultPublisher, ADMIN_ONLY_FILE, ALL_TARGETS_FILE,
};

pub use runner::{CapeRunner, RunOutcome};

pub use trust::{PolicyError, TrustDeriver, TrustEdge, TrustPolicy};

pub use vendor::{VendorLookup, VendorMap};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
        assert_eq!(ver, env!("CARGO_PKG_VERSION"));
    }
}
