//! Result files
//!
//! One JSON file per supplied profile and query mode at
//!
//! ```text
//! <output_dir>/cape-output/aws/<profile>-<account_id>/json/<file>
//! ```
//!
//! The location is a pure function of the output directory, the profile and
//! the mode, so a viewer given the same profile list finds the same files.

use crate::algo::{inbound_paths, PrivescPath};
use crate::config::ProfileTarget;
use crate::ledger::AccountRecord;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const ADMIN_ONLY_FILE: &str = "inbound-privesc-paths-admin-targets-only.json";
pub const ALL_TARGETS_FILE: &str = "inbound-privesc-paths-all-targets.json";

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid result file {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type PublishResult<T> = Result<T, PublishError>;

pub fn result_file_name(admin_only: bool) -> &'static str {
    if admin_only {
        ADMIN_ONLY_FILE
    } else {
        ALL_TARGETS_FILE
    }
}

/// Directory holding a profile's result files
pub fn output_location(output_dir: &Path, target: &ProfileTarget) -> PathBuf {
    output_dir
        .join("cape-output")
        .join("aws")
        .join(format!("{}-{}", target.profile, target.account_id))
        .join("json")
}

pub fn result_file_path(output_dir: &Path, target: &ProfileTarget, admin_only: bool) -> PathBuf {
    output_location(output_dir, target).join(result_file_name(admin_only))
}

/// Contents of one result file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapeReport {
    pub version: String,
    /// RFC 3339
    pub generated_at: String,
    pub profile: String,
    pub account_id: String,
    pub admin_only: bool,
    pub accounts: Vec<AccountRecord>,
    pub paths: Vec<PrivescPath>,
}

pub struct ResultPublisher {
    output_dir: PathBuf,
}

impl ResultPublisher {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        ResultPublisher {
            output_dir: output_dir.into(),
        }
    }

    /// Write one file per target holding every account record and the paths
    /// that end in the target's account. Returns the written paths.
    pub async fn publish(
        &self,
        targets: &[ProfileTarget],
        accounts: &[AccountRecord],
        paths: &[PrivescPath],
        admin_only: bool,
    ) -> PublishResult<Vec<PathBuf>> {
        let generated_at = Utc::now().to_rfc3339();
        let mut written = Vec::with_capacity(targets.len());

        for target in targets {
            let report = CapeReport {
                version: crate::VERSION.to_string(),
                generated_at: generated_at.clone(),
                profile: target.profile.clone(),
                account_id: target.account_id.clone(),
                admin_only,
                accounts: accounts.to_vec(),
                paths: inbound_paths(paths, &target.account_id),
            };
            let path = result_file_path(&self.output_dir, target, admin_only);
            write_report(&path, &report).await?;
            info!(
                profile = %target.profile,
                paths = report.paths.len(),
                "Wrote {}",
                path.display()
            );
            written.push(path);
        }
        Ok(written)
    }
}

async fn write_report(path: &Path, report: &CapeReport) -> PublishResult<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await.map_err(|source| PublishError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    let body = serde_json::to_string_pretty(report).map_err(|source| PublishError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    tokio::fs::write(path, body).await.map_err(|source| PublishError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub async fn load_report(path: impl AsRef<Path>) -> PublishResult<CapeReport> {
    let path = path.as_ref();
    let body = tokio::fs::read_to_string(path).await.map_err(|source| PublishError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&body).map_err(|source| PublishError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Result files for a profile set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocatedReports {
    pub found: Vec<PathBuf>,
    pub missing: Vec<ProfileTarget>,
}

pub fn locate_reports(output_dir: &Path, targets: &[ProfileTarget], admin_only: bool) -> LocatedReports {
    let mut located = LocatedReports::default();
    for target in targets {
        let path = result_file_path(output_dir, target, admin_only);
        if path.is_file() {
            located.found.push(path);
        } else {
            located.missing.push(target.clone());
        }
    }
    located
}
