//! Trust policies and the edges they imply

pub mod deriver;
pub mod policy;

pub use deriver::{TrustDeriver, TrustEdge};
pub use policy::{
    ConditionClause, Effect, PolicyError, PolicyResult, PrincipalRef, TrustPolicy, TrustStatement,
};
