//! End-to-end invocation: collect, assemble, query, publish

use crate::algo::{find_admin_paths, PrivescPath};
use crate::assemble::{AssemblyReport, GraphAssembler};
use crate::collect::Collector;
use crate::config::CapeConfig;
use crate::error::CapeResult;
use crate::graph::PrivilegeGraph;
use crate::ledger::{AccountLedger, AccountRecord};
use crate::provider::{
    load_ignore_list, EscalationProvider, FileIdentityProvider, IdentityProvider, PmapperProvider,
};
use crate::publish::ResultPublisher;
use crate::vendor::VendorMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Everything produced by one run
#[derive(Debug)]
pub struct RunOutcome {
    pub graph: PrivilegeGraph,
    pub report: AssemblyReport,
    pub ledger: AccountLedger,
    /// Ledger records as published, stamped with the query mode
    pub accounts: Vec<AccountRecord>,
    pub paths: Vec<PrivescPath>,
    pub written: Vec<PathBuf>,
    /// Set when the ignore list could not be read; the run went on without it
    pub ignore_list_error: Option<String>,
}

pub struct CapeRunner {
    config: CapeConfig,
    vendors: VendorMap,
    escalation: Arc<dyn EscalationProvider>,
    identities: Arc<dyn IdentityProvider>,
}

impl CapeRunner {
    /// File-backed providers and vendor map as configured
    pub async fn from_config(config: CapeConfig) -> CapeResult<Self> {
        let mut vendors = VendorMap::with_known_accounts();
        if let Some(path) = &config.vendor_accounts_file {
            let added = vendors.load_file(path).await?;
            info!("Loaded {} known vendor accounts", added);
        }
        let escalation = Arc::new(PmapperProvider::new(&config.pmapper_data_path));
        let identities = Arc::new(FileIdentityProvider::new(&config.identity_data_path));
        Ok(Self::with_providers(config, escalation, identities).with_vendors(vendors))
    }

    pub fn with_providers(
        config: CapeConfig,
        escalation: Arc<dyn EscalationProvider>,
        identities: Arc<dyn IdentityProvider>,
    ) -> Self {
        CapeRunner {
            config,
            vendors: VendorMap::with_known_accounts(),
            escalation,
            identities,
        }
    }

    pub fn with_vendors(mut self, vendors: VendorMap) -> Self {
        self.vendors = vendors;
        self
    }

    pub fn config(&self) -> &CapeConfig {
        &self.config
    }

    pub async fn run(&self) -> CapeResult<RunOutcome> {
        let mut ledger = AccountLedger::new();

        let collector = Collector::new(Arc::clone(&self.escalation), Arc::clone(&self.identities))
            .continue_without_local_data(self.config.continue_without_local_data);
        let contributions = collector.collect(&self.config.profiles, &mut ledger).await?;

        let (ignore_list, ignore_list_error) = match &self.config.ignore_list {
            Some(path) => match load_ignore_list(path).await {
                Ok(arns) => (arns, None),
                Err(e) => {
                    warn!("Proceeding without ignore list: {}", e);
                    (Vec::new(), Some(e.to_string()))
                }
            },
            None => (Vec::new(), None),
        };

        let (graph, report) = GraphAssembler::new(&self.vendors)
            .with_ignore_list(ignore_list)
            .assemble(contributions, &mut ledger);

        let admin_only = self.config.admin_only;
        let paths = find_admin_paths(&graph, admin_only);
        info!(admin_only, "Found {} privilege escalation paths", paths.len());

        let accounts = ledger.snapshot(admin_only);
        let written = ResultPublisher::new(&self.config.output_dir)
            .publish(&self.config.profiles, &accounts, &paths, admin_only)
            .await?;

        for record in ledger.incomplete_accounts() {
            warn!(
                account_id = %record.account_id,
                profile = %record.profile,
                "Results for this account are incomplete"
            );
        }

        Ok(RunOutcome {
            graph,
            report,
            ledger,
            accounts,
            paths,
            written,
            ignore_list_error,
        })
    }
}
