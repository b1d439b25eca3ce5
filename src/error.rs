//! Top-level error type

use crate::config::ConfigError;
use crate::graph::GraphError;
use crate::provider::ProviderError;
use crate::publish::PublishError;
use crate::trust::PolicyError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CapeError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Trust policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// Raised only when running without local data is disabled
    #[error("No local escalation data for profile {profile} (account {account_id})")]
    LocalDataUnavailable { profile: String, account_id: String },
}

pub type CapeResult<T> = Result<T, CapeError>;
