//! Trust policy documents
//!
//! Parses the assume-role policy attached to a role into a normalized form.
//! A statement that cannot be understood is skipped with a warning; only a
//! document without any statement list is rejected as a whole.

use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Trust policy is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Trust policy is not valid UTF-8 after URL decoding: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("Trust policy has no Statement")]
    MissingStatement,

    #[error("Malformed statement: {0}")]
    InvalidStatement(String),

    #[error("Unsupported statement element: {0}")]
    Unsupported(&'static str),
}

pub type PolicyResult<T> = Result<T, PolicyError>;

/// Actions that let a principal obtain a role's credentials
const ASSUME_ACTIONS: &[&str] = &[
    "sts:AssumeRole",
    "sts:AssumeRoleWithSAML",
    "sts:AssumeRoleWithWebIdentity",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// One entry of a statement's `Principal` element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum PrincipalRef {
    /// `"Principal": "*"` or `{"AWS": "*"}`
    Any,
    Aws(String),
    Service(String),
    Federated(String),
    CanonicalUser(String),
}

/// `operator key` with its values, e.g. `StringEquals sts:ExternalId`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionClause {
    pub operator: String,
    pub key: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustStatement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub effect: Effect,
    pub principals: Vec<PrincipalRef>,
    pub actions: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<ConditionClause>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrustPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub statements: Vec<TrustStatement>,
}

impl TrustPolicy {
    /// Parse a document given either as JSON text or as URL-encoded JSON text
    /// (the raw form returned by the IAM API).
    pub fn parse(document: &str) -> PolicyResult<Self> {
        let trimmed = document.trim();
        let decoded;
        let text = if trimmed.starts_with('{') {
            trimmed
        } else {
            decoded = percent_decode_str(trimmed).decode_utf8()?;
            &*decoded
        };
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> PolicyResult<Self> {
        // Some exporters nest the document as a JSON string
        if let Value::String(inner) = value {
            return Self::parse(inner);
        }

        let version = value
            .get("Version")
            .and_then(Value::as_str)
            .map(str::to_string);

        let raw_statements = match value.get("Statement") {
            Some(Value::Array(items)) => items.iter().collect::<Vec<_>>(),
            Some(item @ Value::Object(_)) => vec![item],
            _ => return Err(PolicyError::MissingStatement),
        };

        let mut statements = Vec::with_capacity(raw_statements.len());
        for (idx, raw) in raw_statements.into_iter().enumerate() {
            match TrustStatement::from_value(raw) {
                Ok(statement) => statements.push(statement),
                Err(e) => warn!(statement = idx, "Skipping trust policy statement: {}", e),
            }
        }

        Ok(TrustPolicy {
            version,
            statements,
        })
    }

    /// Allow statements that grant an assume-type action
    pub fn assume_statements(&self) -> impl Iterator<Item = &TrustStatement> {
        self.statements
            .iter()
            .filter(|s| s.effect == Effect::Allow && s.assume_action().is_some())
    }
}

impl TrustStatement {
    pub fn from_value(value: &Value) -> PolicyResult<Self> {
        if !value.is_object() {
            return Err(PolicyError::InvalidStatement("statement is not an object".into()));
        }
        if value.get("NotPrincipal").is_some() {
            return Err(PolicyError::Unsupported("NotPrincipal"));
        }
        if value.get("NotAction").is_some() {
            return Err(PolicyError::Unsupported("NotAction"));
        }

        let effect = match value.get("Effect").and_then(Value::as_str) {
            Some(e) if e.eq_ignore_ascii_case("allow") => Effect::Allow,
            Some(e) if e.eq_ignore_ascii_case("deny") => Effect::Deny,
            Some(other) => return Err(PolicyError::InvalidStatement(format!("Effect {other}"))),
            None => return Err(PolicyError::InvalidStatement("missing Effect".into())),
        };

        let principals = parse_principals(
            value
                .get("Principal")
                .ok_or_else(|| PolicyError::InvalidStatement("missing Principal".into()))?,
        )?;

        let actions = string_list(
            value
                .get("Action")
                .ok_or_else(|| PolicyError::InvalidStatement("missing Action".into()))?,
        )
        .ok_or_else(|| PolicyError::InvalidStatement("Action must be a string or list".into()))?;

        let conditions = match value.get("Condition") {
            Some(cond) => parse_conditions(cond)?,
            None => Vec::new(),
        };

        Ok(TrustStatement {
            sid: value.get("Sid").and_then(Value::as_str).map(str::to_string),
            effect,
            principals,
            actions,
            conditions,
        })
    }

    /// First assume-type action granted, in canonical spelling.
    ///
    /// Wildcards (`*`, `sts:*`, `sts:Assume*`) resolve to the first canonical
    /// action they match.
    pub fn assume_action(&self) -> Option<&'static str> {
        self.actions.iter().find_map(|action| {
            let re = action_pattern(action)?;
            ASSUME_ACTIONS
                .iter()
                .find(|canonical| re.is_match(canonical))
                .copied()
        })
    }

    pub fn is_conditional(&self) -> bool {
        !self.conditions.is_empty()
    }

    /// `StringEquals sts:ExternalId, ArnLike aws:SourceArn`
    pub fn condition_summary(&self) -> Option<String> {
        if self.conditions.is_empty() {
            return None;
        }
        Some(
            self.conditions
                .iter()
                .map(|c| format!("{} {}", c.operator, c.key))
                .collect::<Vec<_>>()
                .join(", "),
        )
    }
}

fn parse_principals(value: &Value) -> PolicyResult<Vec<PrincipalRef>> {
    match value {
        Value::String(s) if s == "*" => Ok(vec![PrincipalRef::Any]),
        Value::Object(map) => {
            let mut principals = Vec::new();
            for (kind, entries) in map {
                let entries = string_list(entries).ok_or_else(|| {
                    PolicyError::InvalidStatement(format!("Principal {kind} must be a string or list"))
                })?;
                for entry in entries {
                    let principal = match kind.as_str() {
                        "AWS" if entry == "*" => PrincipalRef::Any,
                        "AWS" => PrincipalRef::Aws(entry),
                        "Service" => PrincipalRef::Service(entry),
                        "Federated" => PrincipalRef::Federated(entry),
                        "CanonicalUser" => PrincipalRef::CanonicalUser(entry),
                        other => {
                            return Err(PolicyError::InvalidStatement(format!(
                                "unknown principal type {other}"
                            )))
                        }
                    };
                    if !principals.contains(&principal) {
                        principals.push(principal);
                    }
                }
            }
            Ok(principals)
        }
        _ => Err(PolicyError::InvalidStatement("unsupported Principal shape".into())),
    }
}

fn parse_conditions(value: &Value) -> PolicyResult<Vec<ConditionClause>> {
    let operators = value
        .as_object()
        .ok_or_else(|| PolicyError::InvalidStatement("Condition must be an object".into()))?;

    let mut clauses = Vec::new();
    for (operator, keys) in operators {
        let keys = keys.as_object().ok_or_else(|| {
            PolicyError::InvalidStatement(format!("Condition {operator} must be an object"))
        })?;
        for (key, values) in keys {
            clauses.push(ConditionClause {
                operator: operator.clone(),
                key: key.clone(),
                values: scalar_list(values),
            });
        }
    }
    Ok(clauses)
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(s) => Some(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => None,
    }
}

fn scalar_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().flat_map(scalar_list).collect(),
        Value::String(s) => vec![s.clone()],
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

/// Case-insensitive IAM action pattern with `*` and `?` wildcards
fn action_pattern(pattern: &str) -> Option<Regex> {
    let body = regex::escape(pattern)
        .replace(r"\*", ".*")
        .replace(r"\?", ".");
    match Regex::new(&format!("(?i)^{body}$")) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(pattern, "Ignoring unusable action pattern: {}", e);
            None
        }
    }
}
