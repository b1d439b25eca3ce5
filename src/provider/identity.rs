//! File-backed IAM listings
//!
//! Reads the JSON emitted by `aws iam list-roles` and `aws iam list-users`,
//! stored per account:
//!
//! ```text
//! <base>/<account_id>/roles.json   {"Roles": [{"RoleName", "Arn", "AssumeRolePolicyDocument"}]}
//! <base>/<account_id>/users.json   {"Users": [{"UserName", "Arn"}]}
//! ```

use super::{IdentityListing, IdentityProvider, ProviderError, ProviderResult};
use crate::config::ProfileTarget;
use crate::graph::{PrincipalKind, PrincipalNode};
use crate::trust::TrustPolicy;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct RoleListing {
    #[serde(rename = "Roles", default)]
    roles: Vec<RawRole>,
}

#[derive(Debug, Deserialize)]
struct RawRole {
    #[serde(rename = "RoleName")]
    name: String,
    #[serde(rename = "Arn")]
    arn: String,
    #[serde(rename = "AssumeRolePolicyDocument", default)]
    trust_policy: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct UserListing {
    #[serde(rename = "Users", default)]
    users: Vec<RawUser>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    #[serde(rename = "UserName")]
    name: String,
    #[serde(rename = "Arn")]
    arn: String,
}

/// Identity provider reading exported IAM listings
#[derive(Debug, Clone)]
pub struct FileIdentityProvider {
    base_path: PathBuf,
}

impl FileIdentityProvider {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        FileIdentityProvider {
            base_path: base_path.into(),
        }
    }

    pub fn account_dir(&self, account_id: &str) -> PathBuf {
        self.base_path.join(account_id)
    }

    pub async fn roles(&self, account_id: &str) -> ProviderResult<Vec<PrincipalNode>> {
        let path = self.account_dir(account_id).join("roles.json");
        let listing: RoleListing = read_listing(&path, "ListRoles").await?;

        let roles = listing
            .roles
            .into_iter()
            .map(|raw| {
                let mut node = PrincipalNode::from_arn(&raw.arn).with_name(raw.name);
                node.kind = PrincipalKind::Role;
                if let Some(doc) = raw.trust_policy.as_ref().filter(|d| !d.is_null()) {
                    match TrustPolicy::from_value(doc) {
                        Ok(policy) => node.trust_policy = Some(policy),
                        Err(e) => warn!(arn = %node.arn, "Unreadable trust policy: {}", e),
                    }
                }
                node
            })
            .collect::<Vec<_>>();
        debug!(account_id, "Listed {} roles", roles.len());
        Ok(roles)
    }

    pub async fn users(&self, account_id: &str) -> ProviderResult<Vec<PrincipalNode>> {
        let path = self.account_dir(account_id).join("users.json");
        let listing: UserListing = read_listing(&path, "ListUsers").await?;

        let users = listing
            .users
            .into_iter()
            .map(|raw| {
                let mut node = PrincipalNode::from_arn(&raw.arn).with_name(raw.name);
                node.kind = PrincipalKind::User;
                node
            })
            .collect::<Vec<_>>();
        debug!(account_id, "Listed {} users", users.len());
        Ok(users)
    }
}

#[async_trait]
impl IdentityProvider for FileIdentityProvider {
    async fn list_identities(&self, target: &ProfileTarget) -> ProviderResult<IdentityListing> {
        let roles = self.roles(&target.account_id).await?;
        let users = self.users(&target.account_id).await?;
        Ok(IdentityListing { roles, users })
    }
}

/// Failures are tagged with the IAM call the file stands in for
async fn read_listing<T: serde::de::DeserializeOwned>(
    path: &Path,
    operation: &str,
) -> ProviderResult<T> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ProviderError::operation("iam", operation, e))?;
    serde_json::from_str(&text).map_err(|e| ProviderError::operation("iam", operation, e))
}
