//! Account ledger
//!
//! One record per account id touched by an invocation, whether it was
//! supplied as a profile or only discovered through a trust reference. The
//! ledger is passed explicitly through collection and assembly.

use crate::config::ProfileTarget;
use crate::graph::Tristate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// How an account came to be in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountSource {
    /// Supplied explicitly as a profile
    User,
    /// Only referenced by another account's data
    #[serde(alias = "cloudfox")]
    Discovered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub account_id: String,
    /// Empty for discovered accounts
    #[serde(default)]
    pub profile: String,
    pub analyzed_successfully: bool,
    #[serde(default)]
    pub admin_only_analysis: bool,
    pub source: AccountSource,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl AccountRecord {
    fn discovered(account_id: &str) -> Self {
        AccountRecord {
            account_id: account_id.to_string(),
            profile: String::new(),
            analyzed_successfully: false,
            admin_only_analysis: false,
            source: AccountSource::Discovered,
            notes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AccountLedger {
    records: BTreeMap<String, AccountRecord>,
}

impl AccountLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a supplied profile as analyzed. A previously discovered record
    /// for the same account is upgraded in place.
    pub fn register_supplied(&mut self, target: &ProfileTarget) {
        let record = self
            .records
            .entry(target.account_id.clone())
            .or_insert_with(|| AccountRecord::discovered(&target.account_id));
        if record.source == AccountSource::Discovered {
            record.analyzed_successfully = true;
        }
        record.source = AccountSource::User;
        record.profile = target.profile.clone();
    }

    /// Add a discovered account unless the id is already known.
    /// Returns whether a record was created.
    pub fn note_discovered(&mut self, account_id: &str) -> bool {
        if account_id.is_empty() || self.records.contains_key(account_id) {
            return false;
        }
        debug!(account_id, "Discovered account through trust reference");
        self.records
            .insert(account_id.to_string(), AccountRecord::discovered(account_id));
        true
    }

    /// Flag the account as lacking full data; profile and source are kept
    pub fn mark_unsuccessful(&mut self, account_id: &str, note: impl Into<String>) {
        let note = note.into();
        warn!(account_id, "Account data incomplete: {}", note);
        let record = self
            .records
            .entry(account_id.to_string())
            .or_insert_with(|| AccountRecord::discovered(account_id));
        record.analyzed_successfully = false;
        record.notes.push(note);
    }

    pub fn get(&self, account_id: &str) -> Option<&AccountRecord> {
        self.records.get(account_id)
    }

    pub fn contains(&self, account_id: &str) -> bool {
        self.records.contains_key(account_id)
    }

    /// Accounts without a record (vendors, service principals) count as analyzed
    pub fn is_analyzed(&self, account_id: &str) -> bool {
        self.records
            .get(account_id)
            .map_or(true, |r| r.analyzed_successfully)
    }

    /// Risk value as it may be reported: `false` from an account without full
    /// data reads as `unknown`.
    pub fn risk_view(&self, account_id: &str, value: Tristate) -> Tristate {
        if value == Tristate::False && !self.is_analyzed(account_id) {
            Tristate::Unknown
        } else {
            value
        }
    }

    pub fn incomplete_accounts(&self) -> Vec<&AccountRecord> {
        self.records
            .values()
            .filter(|r| !r.analyzed_successfully)
            .collect()
    }

    /// Records in account id order
    pub fn records(&self) -> impl Iterator<Item = &AccountRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records ready for publishing, stamped with the query mode
    pub fn snapshot(&self, admin_only: bool) -> Vec<AccountRecord> {
        self.records
            .values()
            .cloned()
            .map(|mut r| {
                r.admin_only_analysis = admin_only;
                r
            })
            .collect()
    }
}
