//! Core type definitions for the privilege graph

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a vertex, assigned on insertion and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct VertexId(pub u64);

impl VertexId {
    pub fn new(id: u64) -> Self {
        VertexId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VertexId({})", self.0)
    }
}

impl From<u64> for VertexId {
    fn from(id: u64) -> Self {
        VertexId(id)
    }
}

/// What kind of principal a vertex represents
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, PartialOrd, Ord,
)]
pub enum PrincipalKind {
    User,
    Role,
    ExternalAccount,
    Service,
    Federated,
    /// The `*` principal of a trust policy: anyone, in any account
    AnyPrincipal,
    #[default]
    Unknown,
}

impl PrincipalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalKind::User => "User",
            PrincipalKind::Role => "Role",
            PrincipalKind::ExternalAccount => "ExternalAccount",
            PrincipalKind::Service => "Service",
            PrincipalKind::Federated => "Federated",
            PrincipalKind::AnyPrincipal => "AnyPrincipal",
            PrincipalKind::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A risk answer that may be unavailable.
///
/// `Unknown` means local analysis for the owning account did not happen or
/// failed; it must never be read as `False`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tristate {
    True,
    False,
    #[default]
    Unknown,
}

impl Tristate {
    pub fn is_true(&self) -> bool {
        matches!(self, Tristate::True)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Tristate::True => Some(true),
            Tristate::False => Some(false),
            Tristate::Unknown => None,
        }
    }

    /// Combine two observations of the same fact.
    ///
    /// A concrete value beats `Unknown`; when two concrete values disagree the
    /// higher-risk `True` wins.
    pub fn merge(self, other: Tristate) -> Tristate {
        match (self, other) {
            (Tristate::True, _) | (_, Tristate::True) => Tristate::True,
            (Tristate::False, _) | (_, Tristate::False) => Tristate::False,
            _ => Tristate::Unknown,
        }
    }
}

impl From<bool> for Tristate {
    fn from(value: bool) -> Self {
        if value {
            Tristate::True
        } else {
            Tristate::False
        }
    }
}

impl From<Option<bool>> for Tristate {
    fn from(value: Option<bool>) -> Self {
        value.map(Tristate::from).unwrap_or_default()
    }
}

impl fmt::Display for Tristate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tristate::True => f.write_str("true"),
            Tristate::False => f.write_str("false"),
            Tristate::Unknown => f.write_str("unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_id() {
        let id = VertexId::new(42);
        assert_eq!(id.as_u64(), 42);
        assert_eq!(format!("{}", id), "VertexId(42)");

        let id2: VertexId = 100.into();
        assert_eq!(id2.as_u64(), 100);
        assert!(id < id2);
    }

    #[test]
    fn test_tristate_merge_prefers_known() {
        assert_eq!(Tristate::Unknown.merge(Tristate::False), Tristate::False);
        assert_eq!(Tristate::False.merge(Tristate::Unknown), Tristate::False);
        assert_eq!(Tristate::Unknown.merge(Tristate::Unknown), Tristate::Unknown);
    }

    #[test]
    fn test_tristate_merge_conflict_is_high_risk() {
        assert_eq!(Tristate::False.merge(Tristate::True), Tristate::True);
        assert_eq!(Tristate::True.merge(Tristate::False), Tristate::True);
    }

    #[test]
    fn test_tristate_serde_names() {
        let json = serde_json::to_string(&vec![Tristate::True, Tristate::False, Tristate::Unknown]).unwrap();
        assert_eq!(json, r#"["true","false","unknown"]"#);
        assert_eq!(Tristate::from(None), Tristate::Unknown);
        assert_eq!(Tristate::from(Some(false)).as_bool(), Some(false));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(PrincipalKind::ExternalAccount.to_string(), "ExternalAccount");
        assert_eq!(PrincipalKind::default(), PrincipalKind::Unknown);
    }
}
