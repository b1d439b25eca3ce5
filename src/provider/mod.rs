//! Collaborator contracts
//!
//! The core never talks to a cloud API. Per-account data arrives through the
//! traits below; file-backed implementations read exported data from disk.

pub mod identity;
pub mod ignore;
pub mod pmapper;

pub use identity::FileIdentityProvider;
pub use ignore::{load_ignore_list, parse_ignore_list};
pub use pmapper::PmapperProvider;

use crate::config::ProfileTarget;
use crate::graph::{EscalationEdge, PrincipalNode};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by data providers
#[derive(Error, Debug)]
pub enum ProviderError {
    /// A remote (or exported) operation failed, tagged with where it failed
    #[error("{service}:{operation} failed: {cause}")]
    Operation {
        service: String,
        operation: String,
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{what} not found at {path:?}")]
    NotFound { what: String, path: PathBuf },

    #[error("Failed to parse {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type ProviderResult<T> = Result<T, ProviderError>;

impl ProviderError {
    pub fn operation(
        service: impl Into<String>,
        operation: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ProviderError::Operation {
            service: service.into(),
            operation: operation.into(),
            cause: Box::new(cause),
        }
    }

    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            ProviderError::NotFound {
                what: "file".to_string(),
                path: path.to_path_buf(),
            }
        } else {
            ProviderError::Io {
                path: path.to_path_buf(),
                source: err,
            }
        }
    }

    /// `(service, operation)` for tagged failures
    pub fn failed_call(&self) -> Option<(&str, &str)> {
        match self {
            ProviderError::Operation {
                service, operation, ..
            } => Some((service.as_str(), operation.as_str())),
            _ => None,
        }
    }
}

/// Output of the local escalation-relation provider for one account
#[derive(Debug, Clone, Default)]
pub struct EscalationData {
    pub nodes: Vec<PrincipalNode>,
    pub edges: Vec<EscalationEdge>,
}

/// Roles and users of one account; roles carry their trust policy
#[derive(Debug, Clone, Default)]
pub struct IdentityListing {
    pub roles: Vec<PrincipalNode>,
    pub users: Vec<PrincipalNode>,
}

impl IdentityListing {
    pub fn into_nodes(self) -> impl Iterator<Item = PrincipalNode> {
        self.roles.into_iter().chain(self.users)
    }
}

/// Per-account precomputed escalation relation
#[async_trait]
pub trait EscalationProvider: Send + Sync {
    async fn escalation_data(&self, target: &ProfileTarget) -> ProviderResult<EscalationData>;
}

/// Per-account IAM role and user listing
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn list_identities(&self, target: &ProfileTarget) -> ProviderResult<IdentityListing>;
}
