//! ARN helpers
//!
//! Only the IAM/STS shapes that appear as principals are interpreted; anything
//! else is carried through untouched as an opaque key.

use super::types::PrincipalKind;

/// A borrowed view over the six colon-separated ARN fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arn<'a> {
    pub partition: &'a str,
    pub service: &'a str,
    pub region: &'a str,
    pub account_id: &'a str,
    pub resource: &'a str,
}

impl<'a> Arn<'a> {
    pub fn parse(value: &'a str) -> Option<Self> {
        let mut parts = value.splitn(6, ':');
        if parts.next()? != "arn" {
            return None;
        }
        let partition = parts.next()?;
        let service = parts.next()?;
        let region = parts.next()?;
        let account_id = parts.next()?;
        let resource = parts.next()?;
        if partition.is_empty() || service.is_empty() || resource.is_empty() {
            return None;
        }
        Some(Arn {
            partition,
            service,
            region,
            account_id,
            resource,
        })
    }

    pub fn is_account_root(&self) -> bool {
        self.service == "iam" && self.resource == "root"
    }
}

/// True for a bare 12-digit AWS account id
pub fn is_account_id(value: &str) -> bool {
    value.len() == 12 && value.bytes().all(|b| b.is_ascii_digit())
}

pub fn account_root_arn(account_id: &str) -> String {
    format!("arn:aws:iam::{}:root", account_id)
}

/// Canonical ARN for a principal reference.
///
/// Bare account ids become the account root ARN and STS assumed-role session
/// ARNs collapse onto the role they were issued for.
pub fn normalize_principal_arn(value: &str) -> String {
    let value = value.trim();
    if is_account_id(value) {
        return account_root_arn(value);
    }
    if let Some(arn) = Arn::parse(value) {
        if arn.service == "sts" {
            if let Some(rest) = arn.resource.strip_prefix("assumed-role/") {
                let role = rest.split('/').next().unwrap_or(rest);
                return format!("arn:{}:iam::{}:role/{}", arn.partition, arn.account_id, role);
            }
        }
    }
    value.to_string()
}

/// Account id embedded in an ARN, if any
pub fn account_id_from_arn(value: &str) -> Option<&str> {
    if is_account_id(value) {
        return Some(value);
    }
    Arn::parse(value)
        .map(|arn| arn.account_id)
        .filter(|id| !id.is_empty())
}

pub fn kind_from_arn(value: &str) -> PrincipalKind {
    if value == "*" {
        return PrincipalKind::AnyPrincipal;
    }
    if is_account_id(value) {
        return PrincipalKind::ExternalAccount;
    }
    let Some(arn) = Arn::parse(value) else {
        return PrincipalKind::Unknown;
    };
    match arn.service {
        "iam" if arn.resource == "root" => PrincipalKind::ExternalAccount,
        "iam" if arn.resource.starts_with("user/") => PrincipalKind::User,
        "iam" if arn.resource.starts_with("role/") => PrincipalKind::Role,
        "iam" if arn.resource.starts_with("saml-provider/")
            || arn.resource.starts_with("oidc-provider/") =>
        {
            PrincipalKind::Federated
        }
        "sts" if arn.resource.starts_with("assumed-role/") => PrincipalKind::Role,
        _ => PrincipalKind::Unknown,
    }
}

/// Short display name: the last path segment of the resource, or the account id
/// for an account root.
pub fn name_from_arn(value: &str) -> String {
    match Arn::parse(value) {
        Some(arn) if arn.is_account_root() => arn.account_id.to_string(),
        Some(arn) => arn
            .resource
            .rsplit('/')
            .next()
            .unwrap_or(arn.resource)
            .to_string(),
        None => value.to_string(),
    }
}
