//! Concurrent per-account collection
//!
//! Each supplied profile is collected by its own task into its own
//! [`AccountContribution`]. Nothing shared is mutated until all tasks have
//! been joined; the ledger is only touched from the joining side.

use crate::config::ProfileTarget;
use crate::error::{CapeError, CapeResult};
use crate::graph::{EscalationEdge, PrincipalNode};
use crate::ledger::AccountLedger;
use crate::provider::{EscalationProvider, IdentityProvider};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Which part of an account's collection failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectStage {
    /// Local escalation relation (pmapper) import
    Escalation,
    /// IAM role/user listing
    Identity,
    /// The collection task itself panicked or was cancelled
    Task,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectFailure {
    pub stage: CollectStage,
    pub message: String,
}

impl fmt::Display for CollectFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self.stage {
            CollectStage::Escalation => "escalation data",
            CollectStage::Identity => "identity listing",
            CollectStage::Task => "collection task",
        };
        write!(f, "{}: {}", stage, self.message)
    }
}

/// Everything gathered for one supplied profile
#[derive(Debug, Clone)]
pub struct AccountContribution {
    pub target: ProfileTarget,
    pub nodes: Vec<PrincipalNode>,
    pub escalation_edges: Vec<EscalationEdge>,
    pub failures: Vec<CollectFailure>,
}

impl AccountContribution {
    pub fn new(target: ProfileTarget) -> Self {
        AccountContribution {
            target,
            nodes: Vec::new(),
            escalation_edges: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn missing_local_data(&self) -> bool {
        self.failures
            .iter()
            .any(|f| matches!(f.stage, CollectStage::Escalation | CollectStage::Task))
    }

    fn fail(&mut self, stage: CollectStage, message: impl Into<String>) {
        self.failures.push(CollectFailure {
            stage,
            message: message.into(),
        });
    }
}

pub struct Collector {
    escalation: Arc<dyn EscalationProvider>,
    identities: Arc<dyn IdentityProvider>,
    continue_without_local_data: bool,
}

impl Collector {
    pub fn new(
        escalation: Arc<dyn EscalationProvider>,
        identities: Arc<dyn IdentityProvider>,
    ) -> Self {
        Collector {
            escalation,
            identities,
            continue_without_local_data: true,
        }
    }

    pub fn continue_without_local_data(mut self, enabled: bool) -> Self {
        self.continue_without_local_data = enabled;
        self
    }

    /// Collect every target concurrently.
    ///
    /// Targets are registered in the ledger as supplied; any failure marks the
    /// account unsuccessful and the remaining accounts carry on. Returns
    /// [`CapeError::LocalDataUnavailable`] only when running without local
    /// escalation data has been disabled.
    pub async fn collect(
        &self,
        targets: &[ProfileTarget],
        ledger: &mut AccountLedger,
    ) -> CapeResult<Vec<AccountContribution>> {
        let mut handles = Vec::with_capacity(targets.len());
        for target in targets {
            ledger.register_supplied(target);
            let escalation = Arc::clone(&self.escalation);
            let identities = Arc::clone(&self.identities);
            let target = target.clone();
            handles.push(tokio::spawn(async move {
                collect_account(escalation.as_ref(), identities.as_ref(), target).await
            }));
        }

        let mut contributions = Vec::with_capacity(targets.len());
        let mut pending = targets.iter().zip(handles);
        while let Some((target, handle)) = pending.next() {
            let contribution = match handle.await {
                Ok(contribution) => contribution,
                Err(e) => {
                    let mut contribution = AccountContribution::new(target.clone());
                    contribution.fail(CollectStage::Task, e.to_string());
                    contribution
                }
            };

            if contribution.missing_local_data() && !self.continue_without_local_data {
                for (_, rest) in pending {
                    rest.abort();
                }
                return Err(CapeError::LocalDataUnavailable {
                    profile: target.profile.clone(),
                    account_id: target.account_id.clone(),
                });
            }

            for failure in &contribution.failures {
                ledger.mark_unsuccessful(&target.account_id, failure.to_string());
            }
            contributions.push(contribution);
        }
        Ok(contributions)
    }
}

async fn collect_account(
    escalation: &dyn EscalationProvider,
    identities: &dyn IdentityProvider,
    target: ProfileTarget,
) -> AccountContribution {
    let mut contribution = AccountContribution::new(target);
    let profile = contribution.target.profile.clone();
    let account_id = contribution.target.account_id.clone();

    info!(%profile, %account_id, "Importing local escalation data");
    match escalation.escalation_data(&contribution.target).await {
        Ok(data) => {
            info!(
                %profile,
                "Imported {} nodes and {} edges",
                data.nodes.len(),
                data.edges.len()
            );
            contribution.nodes.extend(data.nodes);
            contribution.escalation_edges.extend(data.edges);
        }
        Err(e) => {
            warn!(%profile, %account_id, "Local escalation data unavailable: {}", e);
            contribution.fail(CollectStage::Escalation, e.to_string());
        }
    }

    info!(%profile, %account_id, "Listing IAM roles and users");
    match identities.list_identities(&contribution.target).await {
        Ok(listing) => {
            info!(
                %profile,
                "Listed {} roles and {} users",
                listing.roles.len(),
                listing.users.len()
            );
            contribution.nodes.extend(listing.into_nodes());
        }
        Err(e) => {
            match e.failed_call() {
                Some((service, operation)) => {
                    warn!(%profile, service, operation, "Identity listing failed: {}", e)
                }
                None => warn!(%profile, "Identity listing failed: {}", e),
            }
            contribution.fail(CollectStage::Identity, e.to_string());
        }
    }

    contribution
}
