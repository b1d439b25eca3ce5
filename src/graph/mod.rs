//! Privilege graph data model
//!
//! - Principal vertices keyed by ARN, write-once after insertion
//! - Directed edges, unique per ordered pair, carrying accumulated reasons
//! - Merge of partial principal records before insertion

pub mod arn;
pub mod edge;
pub mod node;
pub mod store;
pub mod types;

// Re-export main types
pub use edge::{reason, Edge, EscalationEdge, Reasons};
pub use node::{merge_nodes, PrincipalNode, ANY_PRINCIPAL_ARN};
pub use store::{GraphError, GraphResult, GraphStatistics, PrivilegeGraph};
pub use types::{PrincipalKind, Tristate, VertexId};
