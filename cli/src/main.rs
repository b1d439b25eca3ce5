//! CAPE CLI: build the cross-account privilege graph and publish paths
//!
//! Reads exported principal-mapper graphs and IAM listings from disk.

use anyhow::{bail, Context};
use cape::publish::locate_reports;
use cape::{load_report, shortest_path, CapeConfig, CapeRunner, ProfileTarget};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cape", version, about = "Cross-account privilege escalation graph")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct TargetArgs {
    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Profile to analyze as NAME=ACCOUNT_ID (repeatable)
    #[arg(long = "profile", value_name = "NAME=ACCOUNT_ID")]
    profiles: Vec<ProfileTarget>,

    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Only report paths into admin principals
    #[arg(long)]
    admin_only: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect, assemble, query and publish
    Run {
        #[command(flatten)]
        targets: TargetArgs,

        /// principal-mapper storage root
        #[arg(long)]
        pmapper_data: Option<PathBuf>,

        /// Exported IAM role/user listings root
        #[arg(long)]
        identity_data: Option<PathBuf>,

        /// Known vendor accounts YAML
        #[arg(long)]
        vendor_file: Option<PathBuf>,

        /// File of ARNs to exclude, one per line
        #[arg(long)]
        ignore_list: Option<PathBuf>,

        /// Fail instead of continuing when an account has no local escalation data
        #[arg(long)]
        abort_on_missing_local_data: bool,

        /// Also print the shortest path from this ARN (requires --to)
        #[arg(long, requires = "to")]
        from: Option<String>,

        #[arg(long, requires = "from")]
        to: Option<String>,
    },
    /// Print result file locations for a profile set
    Locate {
        #[command(flatten)]
        targets: TargetArgs,
    },
    /// Print a summary of a result file
    Show {
        #[arg(long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            targets,
            pmapper_data,
            identity_data,
            vendor_file,
            ignore_list,
            abort_on_missing_local_data,
            from,
            to,
        } => {
            let config = load_config(&targets).map(|mut config| {
                if let Some(path) = pmapper_data {
                    config.pmapper_data_path = path;
                }
                if let Some(path) = identity_data {
                    config.identity_data_path = path;
                }
                if vendor_file.is_some() {
                    config.vendor_accounts_file = vendor_file;
                }
                if ignore_list.is_some() {
                    config.ignore_list = ignore_list;
                }
                if abort_on_missing_local_data {
                    config.continue_without_local_data = false;
                }
                config
            });
            match config {
                Ok(config) => run(config, from.zip(to)).await,
                Err(e) => Err(e),
            }
        }
        Commands::Locate { targets } => load_config(&targets).and_then(|c| run_locate(&c)),
        Commands::Show { file } => run_show(&file).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Config file first, then command-line overrides
fn load_config(args: &TargetArgs) -> anyhow::Result<CapeConfig> {
    let mut config = match &args.config {
        Some(path) => CapeConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => CapeConfig::default(),
    };
    if !args.profiles.is_empty() {
        config.profiles = args.profiles.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if args.admin_only {
        config.admin_only = true;
    }
    if config.profiles.is_empty() {
        bail!("no profiles given; use --profile NAME=ACCOUNT_ID or a config file");
    }
    Ok(config)
}

async fn run(config: CapeConfig, query: Option<(String, String)>) -> anyhow::Result<()> {
    let runner = CapeRunner::from_config(config).await?;
    let outcome = runner.run().await?;

    let summary = json!({
        "statistics": outcome.report.statistics,
        "conditional_trust_edges": outcome.report.conditional_trust_edges,
        "paths": outcome.paths.len(),
        "discovered_accounts": outcome.report.discovered_accounts,
        "incomplete_accounts": outcome
            .ledger
            .incomplete_accounts()
            .iter()
            .map(|r| r.account_id.as_str())
            .collect::<Vec<_>>(),
        "ignore_list_error": outcome.ignore_list_error,
        "files": outcome.written,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some((from, to)) = query {
        match shortest_path(&outcome.graph, &from, &to) {
            Some(path) => println!("{}", serde_json::to_string_pretty(&path)?),
            None => println!("No path from {} to {}", from, to),
        }
    }

    let config = runner.config();
    let mut hint = String::from("cape locate");
    for target in &config.profiles {
        hint.push_str(&format!(" --profile {}", target));
    }
    if config.admin_only {
        hint.push_str(" --admin-only");
    }
    info!("View these results again with: {}", hint);
    Ok(())
}

fn run_locate(config: &CapeConfig) -> anyhow::Result<()> {
    let located = locate_reports(&config.output_dir, &config.profiles, config.admin_only);
    for path in &located.found {
        println!("{}", path.display());
    }
    for target in &located.missing {
        eprintln!("No results for {}", target);
    }
    if located.found.is_empty() {
        bail!("no result files found under {}", config.output_dir.display());
    }
    Ok(())
}

async fn run_show(file: &Path) -> anyhow::Result<()> {
    let report = load_report(file).await?;
    let incomplete: Vec<&str> = report
        .accounts
        .iter()
        .filter(|r| !r.analyzed_successfully)
        .map(|r| r.account_id.as_str())
        .collect();
    let summary = json!({
        "version": report.version,
        "generated_at": report.generated_at,
        "profile": report.profile,
        "account_id": report.account_id,
        "admin_only": report.admin_only,
        "accounts": report.accounts.len(),
        "incomplete_accounts": incomplete,
        "paths": report
            .paths
            .iter()
            .map(|p| json!({"source": p.source, "destination": p.destination, "hops": p.hop_count()}))
            .collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
