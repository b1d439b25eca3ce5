//! Invocation configuration
//!
//! Loaded from YAML; every field has a default so a partial file is valid.
//!
//! ```yaml
//! output_dir: ./out
//! pmapper_data_path: ~/.local/share/principalmapper
//! identity_data_path: ./iam
//! vendor_accounts_file: ./known-accounts.yaml
//! ignore_list: ./ignore.txt
//! admin_only: true
//! continue_without_local_data: true
//! profiles:
//!   - profile: prod
//!     account_id: "111111111111"
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid profile target '{0}', expected NAME=ACCOUNT_ID")]
    InvalidTarget(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// One explicitly supplied profile and the account it analyzes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProfileTarget {
    pub profile: String,
    pub account_id: String,
}

impl ProfileTarget {
    pub fn new(profile: impl Into<String>, account_id: impl Into<String>) -> Self {
        ProfileTarget {
            profile: profile.into(),
            account_id: account_id.into(),
        }
    }
}

impl FromStr for ProfileTarget {
    type Err = ConfigError;

    /// `prod=111111111111`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (profile, account_id) = s
            .split_once('=')
            .map(|(p, a)| (p.trim(), a.trim()))
            .filter(|(p, a)| !p.is_empty() && !a.is_empty())
            .ok_or_else(|| ConfigError::InvalidTarget(s.to_string()))?;
        Ok(ProfileTarget::new(profile, account_id))
    }
}

impl fmt::Display for ProfileTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.profile, self.account_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapeConfig {
    /// Root under which `cape-output/` is written
    pub output_dir: PathBuf,
    /// principal-mapper storage root (`<path>/<account>/graph/*.json`)
    pub pmapper_data_path: PathBuf,
    /// Exported IAM listings (`<path>/<account>/{roles,users}.json`)
    pub identity_data_path: PathBuf,
    pub vendor_accounts_file: Option<PathBuf>,
    pub ignore_list: Option<PathBuf>,
    pub admin_only: bool,
    /// Keep going when an account has no local escalation data
    pub continue_without_local_data: bool,
    pub profiles: Vec<ProfileTarget>,
}

impl Default for CapeConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            pmapper_data_path: PathBuf::from("pmapper"),
            identity_data_path: PathBuf::from("iam"),
            vendor_accounts_file: None,
            ignore_list: None,
            admin_only: false,
            continue_without_local_data: true,
            profiles: Vec::new(),
        }
    }
}

impl CapeConfig {
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }
}
