//! Directed privilege edges
//!
//! `source -> target` means the source can assume, reach or escalate into the
//! target. A pair of vertices carries at most one [`Edge`]; every way the pair
//! was discovered is kept as a reason code in [`Edge::reasons`].

use super::types::VertexId;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Reason code (e.g. `sts:AssumeRole`, a technique id) -> human readable text
pub type Reasons = BTreeMap<String, String>;

const REASON_SEPARATOR: &str = "; ";

/// An edge stored in the [`PrivilegeGraph`](super::PrivilegeGraph)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: VertexId,
    pub target: VertexId,
    pub reasons: Reasons,
}

impl Edge {
    pub fn new(source: VertexId, target: VertexId, reasons: Reasons) -> Self {
        Edge {
            source,
            target,
            reasons,
        }
    }

    pub fn has_reason(&self, code: &str) -> bool {
        self.reasons.contains_key(code)
    }

    pub fn reason_codes(&self) -> impl Iterator<Item = &str> {
        self.reasons.keys().map(String::as_str)
    }

    /// Add a reason. A known code with a new explanation gets it appended
    /// after `; `, so no grant is hidden behind an earlier one. Returns
    /// whether the reasons changed.
    pub fn add_reason(&mut self, code: impl Into<String>, text: impl Into<String>) -> bool {
        let text = text.into();
        match self.reasons.entry(code.into()) {
            Entry::Vacant(slot) => {
                slot.insert(text);
                true
            }
            Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                if text.is_empty() || existing.split(REASON_SEPARATOR).any(|t| t == text) {
                    return false;
                }
                if !existing.is_empty() {
                    existing.push_str(REASON_SEPARATOR);
                }
                existing.push_str(&text);
                true
            }
        }
    }
}

/// An edge as delivered by a local escalation provider, keyed by ARN
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationEdge {
    pub source: String,
    pub destination: String,
    pub reason_code: String,
    pub reason_text: String,
}

impl EscalationEdge {
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<String>,
        reason_code: impl Into<String>,
        reason_text: impl Into<String>,
    ) -> Self {
        EscalationEdge {
            source: source.into(),
            destination: destination.into(),
            reason_code: reason_code.into(),
            reason_text: reason_text.into(),
        }
    }
}

/// Single-entry reason map
pub fn reason(code: impl Into<String>, text: impl Into<String>) -> Reasons {
    let mut reasons = Reasons::new();
    reasons.insert(code.into(), text.into());
    reasons
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_reason_appends_new_text() {
        let mut edge = Edge::new(
            VertexId::new(1),
            VertexId::new(2),
            reason("sts:AssumeRole", "trust policy"),
        );

        assert!(edge.add_reason("iam:PassRole", "pass role to lambda"));
        assert!(edge.add_reason("sts:AssumeRole", "something else"));
        assert!(!edge.add_reason("sts:AssumeRole", "trust policy"));
        assert!(!edge.add_reason("sts:AssumeRole", "something else"));
        assert!(!edge.add_reason("iam:PassRole", ""));

        assert_eq!(edge.reasons["sts:AssumeRole"], "trust policy; something else");
        assert_eq!(edge.reason_codes().collect::<Vec<_>>(), vec!["iam:PassRole", "sts:AssumeRole"]);
        assert!(edge.has_reason("iam:PassRole"));
    }
}
