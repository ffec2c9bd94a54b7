//! CLI harness for exercising BNS operations against JSON fixtures
//!
//! This tool allows:
//! - Deriving notification addresses
//! - Resolving domains from a chain fixture
//! - Measuring planned payloads against the byte budget
//! - Planning and building domain transactions
//! - Validating and generating backup phrases

use anyhow::Context;
use bns_core::{
    build, generate_backup_phrase, plan_domain_update, stealth_scan_key, validate_backup_phrase,
    Action, Alias, BackupPolicy, BnsConfig, DomainState, PlannedChangeSet, TxBuilderDescriptor,
    WalletFunds,
};
use bns_name_resolution::{DomainSearch, MemoryProvider};
use bns_params::NetworkType;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "bns-harness")]
#[command(about = "Bitcoin name system testing harness", long_about = None)]
struct Cli {
    /// Configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Network override (mainnet, testnet, regtest)
    #[arg(short, long, global = true)]
    network: Option<NetworkType>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ActionArg {
    Claim,
    Transfer,
    Update,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the notification address of a domain
    Address {
        /// Domain name, e.g. satoshi.btc
        name: String,
    },

    /// Resolve a domain from a chain fixture
    Resolve {
        /// Domain name
        name: String,

        /// Chain fixture (JSON)
        #[arg(short, long)]
        fixture: PathBuf,
    },

    /// Measure planned changes against the payload budget
    Cost {
        /// Planned changes as `key value key value`
        changes: String,

        /// Action the changes are embedded with
        #[arg(short, long, value_enum, default_value = "update")]
        action: ActionArg,

        /// New owner, for transfers
        #[arg(long)]
        new_owner: Option<String>,
    },

    /// Plan and build the next domain transaction
    Plan {
        /// Domain name
        name: String,

        /// Chain fixture (JSON)
        #[arg(short, long)]
        fixture: PathBuf,

        /// Wallet address and coins (JSON)
        #[arg(short, long)]
        wallet: PathBuf,

        /// Planned changes as `key value key value`
        #[arg(long, default_value = "")]
        changes: String,

        /// Action to take
        #[arg(short, long, value_enum, default_value = "update")]
        action: ActionArg,

        /// New owner, for transfers
        #[arg(long)]
        new_owner: Option<String>,
    },

    /// Build a transaction from a descriptor
    Build {
        /// Builder descriptor (JSON)
        descriptor: PathBuf,
    },

    /// Validate or generate backup phrases
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },
}

#[derive(Subcommand)]
enum BackupCommands {
    /// Check a phrase with the configured policy
    Validate {
        /// Backup phrase
        phrase: String,

        /// Require BIP-39 words and checksum
        #[arg(long)]
        strict: bool,
    },

    /// Generate a fresh phrase
    Generate {
        /// Word count (12, 18 or 24)
        #[arg(short, long, default_value = "12")]
        words: u32,
    },

    /// Derive the stealth scan key buffer entry
    ScanKey {
        /// Backup phrase
        phrase: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => BnsConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => BnsConfig::default(),
    };
    if let Some(network) = cli.network {
        config.network = network;
    }

    match cli.command {
        Commands::Address { name } => run_address(&config, &name)?,
        Commands::Resolve { name, fixture } => run_resolve(&config, &name, &fixture).await?,
        Commands::Cost {
            changes,
            action,
            new_owner,
        } => run_cost(&changes, action, new_owner.as_deref())?,
        Commands::Plan {
            name,
            fixture,
            wallet,
            changes,
            action,
            new_owner,
        } => {
            run_plan(
                &config,
                &name,
                &fixture,
                &wallet,
                &changes,
                action,
                new_owner.as_deref(),
            )
            .await?
        }
        Commands::Build { descriptor } => run_build(&descriptor)?,
        Commands::Backup { command } => run_backup(&config, command)?,
    }

    Ok(())
}

fn action_for(action: ActionArg, new_owner: Option<&str>) -> anyhow::Result<Action> {
    Ok(match action {
        ActionArg::Claim => Action::claim(),
        ActionArg::Update => Action::update_forwards(),
        ActionArg::Transfer => {
            let new_owner = new_owner.context("--new-owner is required for transfers")?;
            Action::transfer(new_owner)
        }
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_address(config: &BnsConfig, name: &str) -> anyhow::Result<()> {
    let alias = Alias::parse(name)?;
    let address = alias.notification_address(config.network)?;
    info!("{} on {}", alias, config.network);
    println!("{}", address);
    Ok(())
}

async fn search(
    config: &BnsConfig,
    name: &str,
    fixture: &Path,
) -> anyhow::Result<Option<DomainState>> {
    let provider = MemoryProvider::load(fixture)
        .await
        .with_context(|| format!("loading fixture {}", fixture.display()))?;
    let search = DomainSearch::from_config(provider, config);

    match search.search(name).await {
        Ok(state) => Ok(Some(state)),
        Err(e) if e.is_unregistered() => {
            info!(
                "{} is not registered; notify {} to claim it",
                name,
                e.notification_address().unwrap_or_default()
            );
            Ok(None)
        }
        Err(e) => {
            if let Some(address) = e.notification_address() {
                warn!("Search failed for notification address {}", address);
            }
            Err(e.into())
        }
    }
}

async fn run_resolve(config: &BnsConfig, name: &str, fixture: &Path) -> anyhow::Result<()> {
    if let Some(state) = search(config, name, fixture).await? {
        info!(
            "{} owned by {} with {} forward(s)",
            state.alias,
            state.owner_address(),
            state.active_forwards.len()
        );
        print_json(&state)?;
    }
    Ok(())
}

fn run_cost(changes: &str, action: ActionArg, new_owner: Option<&str>) -> anyhow::Result<()> {
    let action = action_for(action, new_owner)?;
    let set = PlannedChangeSet::from_embed_string(changes)?;

    for change in set.explain(&action)? {
        info!(
            "{:<6} {:<40} {:>3} bytes {:?}",
            change.key, change.value, change.cost, change.kind
        );
    }

    let cost = set.cost(&action)?;
    let remaining = set.remaining(&action)?;
    if remaining < 0 {
        warn!("Too much by {} Bytes", set.over_budget_by(&action)?);
    }
    print_json(&serde_json::json!({
        "cost": cost,
        "remaining": remaining,
        "payload": String::from_utf8_lossy(&set.payload(&action)?.to_bytes()),
    }))
}

async fn run_plan(
    config: &BnsConfig,
    name: &str,
    fixture: &Path,
    wallet: &Path,
    changes: &str,
    action: ActionArg,
    new_owner: Option<&str>,
) -> anyhow::Result<()> {
    let action = action_for(action, new_owner)?;
    let changes = PlannedChangeSet::from_embed_string(changes)?;
    let wallet: WalletFunds = serde_json::from_str(
        &std::fs::read_to_string(wallet)
            .with_context(|| format!("reading wallet {}", wallet.display()))?,
    )?;

    let state = search(config, name, fixture).await?;
    let alias = Alias::parse(name)?;
    let descriptor = plan_domain_update(
        state.as_ref(),
        &alias,
        config.network,
        &changes,
        &action,
        &wallet,
        &config.builder,
    )?;

    let tx = build(&descriptor)?;
    info!(
        "Planned {:?} for {}: fee {} sats at {:.2} sat/vB",
        action.kind, alias, tx.fee, tx.effective_fee_rate
    );
    print_json(&serde_json::json!({
        "descriptor": descriptor,
        "transaction": tx,
    }))
}

fn run_build(path: &Path) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading descriptor {}", path.display()))?;
    let descriptor = TxBuilderDescriptor::from_json(&json)?;
    let tx = build(&descriptor)?;
    info!(
        "Built {} input(s), {} output(s), vsize {}",
        tx.inputs.len(),
        tx.outputs.len(),
        tx.size.vsize
    );
    print_json(&tx)
}

fn run_backup(config: &BnsConfig, command: BackupCommands) -> anyhow::Result<()> {
    match command {
        BackupCommands::Validate { phrase, strict } => {
            let policy = if strict {
                BackupPolicy::Strict
            } else {
                config.backup_policy
            };
            let normalized = validate_backup_phrase(&phrase, policy)
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            info!("Backup phrase is valid ({:?})", policy);
            println!("{}", normalized);
        }
        BackupCommands::Generate { words } => {
            println!("{}", generate_backup_phrase(Some(words))?);
        }
        BackupCommands::ScanKey { phrase } => {
            let entry = stealth_scan_key(&phrase, config.network)?;
            info!("Scan key {}", entry.short_display());
            println!("{} {}", entry.network, entry.display_address());
        }
    }
    Ok(())
}
