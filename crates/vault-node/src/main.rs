//! stakevault: the treasury node binary.
//!
//! Startup sequence:
//!   1. Load config (file, then CLI overrides)
//!   2. Open the state database and seed the treasury row if fresh
//!   3. Build the chain reader, payout wallet and notifier
//!   4. Start the public and admin JSON-RPC servers
//!   5. Run until Ctrl-C, then flush

mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use vault_chain::{ChainReader, PayoutWallet, RemoteSignerWallet};
use vault_engine::{DepositTarget, LogNotifier, Notifier, TreasuryService, WebhookNotifier};
use vault_rpc::{AdminRpcServer, RpcServer};
use vault_state::StateDb;

use crate::config::{expand_tilde, NodeConfig};

const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 10;

#[derive(Parser, Debug)]
#[command(
    name = "stakevault",
    version,
    about = "StakeVault node: weighted staking treasury over an EVM chain"
)]
struct Args {
    /// Path to the JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for the persistent state database.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Public JSON-RPC listen address.
    #[arg(long)]
    rpc_addr: Option<SocketAddr>,

    /// Admin JSON-RPC listen address.
    #[arg(long)]
    admin_rpc_addr: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,stakevault=debug,vault_chain=debug,vault_engine=debug")),
        )
        .init();

    let args = Args::parse();
    let mut cfg = NodeConfig::load(args.config.as_deref())?;
    if let Some(d) = args.data_dir {
        cfg.data_dir = d;
    }
    if let Some(a) = args.rpc_addr {
        cfg.rpc_addr = a;
    }
    if let Some(a) = args.admin_rpc_addr {
        cfg.admin_rpc_addr = a;
    }
    cfg.validate()?;
    info!("StakeVault node starting");

    // ── State database ────────────────────────────────────────────────────────
    let data_dir = expand_tilde(&cfg.data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;
    let db = Arc::new(StateDb::open(&data_dir).context("opening state database")?);

    // ── Chain access ──────────────────────────────────────────────────────────
    let chain = ChainReader::from_config(&cfg.chain).context("building chain reader")?;
    info!(endpoints = chain.endpoints().len(), "chain reader ready");

    let (payout, payout_timeout): (Option<Arc<dyn PayoutWallet>>, Duration) = match &cfg.payout {
        Some(p) => {
            let wallet = RemoteSignerWallet::new(chain.clone(), p, cfg.chain.tokens)
                .context("building payout wallet")?;
            info!(wallet = %wallet.address(), "instant payouts enabled");
            (Some(Arc::new(wallet) as Arc<dyn PayoutWallet>), Duration::from_secs(p.submit_timeout_secs))
        }
        None => {
            warn!("no payout wallet configured; every unstake will be queued");
            (None, Duration::ZERO)
        }
    };

    let notifier: Arc<dyn Notifier> = match &cfg.notify.webhook_url {
        Some(url) => {
            let timeout = Duration::from_secs(cfg.notify.timeout_secs.unwrap_or(DEFAULT_WEBHOOK_TIMEOUT_SECS));
            Arc::new(WebhookNotifier::new(url.clone(), timeout).context("building webhook notifier")?)
        }
        None => Arc::new(LogNotifier),
    };

    // ── Service ───────────────────────────────────────────────────────────────
    let service = Arc::new(TreasuryService::new(
        Arc::clone(&db),
        Arc::new(chain),
        DepositTarget { protocol_wallet: cfg.chain.protocol_wallet, tokens: cfg.chain.tokens },
        payout,
        payout_timeout,
        notifier,
    ));
    let treasury = service
        .seed_treasury(cfg.seed.weekly_rate, cfg.seed.reward_split_pct)
        .context("seeding treasury")?;
    info!(
        weekly_rate = treasury.weekly_rate,
        reward_split_pct = treasury.reward_split_pct,
        "treasury loaded"
    );

    let report = service.reconcile(false).context("checking ledger against treasury")?;
    if !report.in_sync() {
        warn!("treasury aggregate differs from ledger; run vaultAdmin_reconcile with repair=true");
    }

    // ── RPC servers ───────────────────────────────────────────────────────────
    let (_, rpc_handle) = RpcServer::new(Arc::clone(&service))
        .start(cfg.rpc_addr)
        .await
        .context("starting RPC server")?;
    let (_, admin_handle) = AdminRpcServer::new(Arc::clone(&service))
        .start(cfg.admin_rpc_addr)
        .await
        .context("starting admin RPC server")?;

    info!("node ready");
    tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;
    info!("shutting down");

    let _ = rpc_handle.stop();
    let _ = admin_handle.stop();
    rpc_handle.stopped().await;
    admin_handle.stopped().await;
    db.flush().context("flushing state database")?;
    Ok(())
}
