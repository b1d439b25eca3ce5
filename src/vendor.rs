//! Known non-customer account lookup
//!
//! Trust policies frequently name accounts owned by AWS itself or by SaaS
//! vendors. Those are labelled rather than treated as customer accounts that
//! were merely not analyzed.

use crate::provider::{ProviderError, ProviderResult};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Resolves an account id to a vendor label
pub trait VendorLookup: Send + Sync {
    fn vendor_name(&self, account_id: &str) -> Option<&str>;

    fn is_vendor(&self, account_id: &str) -> bool {
        self.vendor_name(account_id).is_some()
    }
}

/// Well-known AWS-owned service accounts
const KNOWN_AWS_ACCOUNTS: &[(&str, &str)] = &[
    ("127311923021", "AWS Elastic Load Balancing (us-east-1)"),
    ("033677994240", "AWS Elastic Load Balancing (us-east-2)"),
    ("027434742980", "AWS Elastic Load Balancing (us-west-1)"),
    ("797873946194", "AWS Elastic Load Balancing (us-west-2)"),
    ("156460612806", "AWS Elastic Load Balancing (eu-west-1)"),
    ("054676820928", "AWS Elastic Load Balancing (eu-central-1)"),
    ("582318560864", "AWS Elastic Load Balancing (ap-northeast-1)"),
    ("114774131450", "AWS Elastic Load Balancing (ap-southeast-1)"),
];

/// One entry of the public known-accounts list
#[derive(Debug, Deserialize)]
struct KnownAccountEntry {
    name: String,
    #[serde(default)]
    accounts: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct VendorMap {
    accounts: FxHashMap<String, String>,
}

impl VendorMap {
    /// Empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Map seeded with the built-in AWS service accounts
    pub fn with_known_accounts() -> Self {
        let mut map = Self::new();
        for (account, name) in KNOWN_AWS_ACCOUNTS {
            map.insert(*account, *name);
        }
        map
    }

    pub fn insert(&mut self, account_id: impl Into<String>, name: impl Into<String>) {
        self.accounts.insert(account_id.into(), name.into());
    }

    /// Add entries from a known-accounts YAML list:
    ///
    /// ```yaml
    /// - name: Example Vendor
    ///   source: https://example.com/docs
    ///   accounts: ['999999999999']
    ///   type: aws
    /// ```
    pub fn extend_from_yaml(&mut self, yaml: &str) -> Result<usize, serde_yaml::Error> {
        let entries: Vec<KnownAccountEntry> = serde_yaml::from_str(yaml)?;
        let mut added = 0;
        for entry in entries {
            for account in entry.accounts {
                self.accounts.insert(account.trim().to_string(), entry.name.clone());
                added += 1;
            }
        }
        Ok(added)
    }

    pub async fn load_file(&mut self, path: impl AsRef<Path>) -> ProviderResult<usize> {
        let path = path.as_ref();
        let yaml = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ProviderError::from_io(path, e))?;
        let added = self
            .extend_from_yaml(&yaml)
            .map_err(|e| ProviderError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        debug!("Loaded {} vendor accounts from {:?}", added, path);
        Ok(added)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl VendorLookup for VendorMap {
    fn vendor_name(&self, account_id: &str) -> Option<&str> {
        if account_id.is_empty() {
            return None;
        }
        self.accounts.get(account_id).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_known_accounts() {
        let map = VendorMap::with_known_accounts();
        assert!(map.is_vendor("127311923021"));
        assert!(!map.is_vendor("111111111111"));
        assert!(!map.is_vendor(""));
    }

    #[test]
    fn test_extend_from_yaml() {
        let mut map = VendorMap::new();
        let added = map
            .extend_from_yaml(
                "- name: Example Vendor\n  source: https://example.com\n  accounts: ['999999999999', '888888888888']\n  type: aws\n- name: No Accounts\n",
            )
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(map.vendor_name("888888888888"), Some("Example Vendor"));
    }

    #[tokio::test]
    async fn test_load_file_errors() {
        let mut map = VendorMap::new();
        assert!(matches!(
            map.load_file("/definitely/not/here.yaml").await,
            Err(ProviderError::NotFound { .. })
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not: [a list").unwrap();
        assert!(matches!(map.load_file(file.path()).await, Err(ProviderError::Parse { .. })));
    }
}
