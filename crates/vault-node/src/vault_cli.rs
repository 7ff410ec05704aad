//! vault-cli
//!
//! Command-line client for a running StakeVault node.
//!
//! Usage:
//!   vault-cli fund      --wallet <0x..> --token <primary|secondary> --tx <0x..>
//!   vault-cli unstake   --wallet <0x..> --token <primary|secondary>
//!   vault-cli stakes    [--wallet <0x..>] [--token <..>]
//!   vault-cli stats
//!   vault-cli preview   [--weekly-rate <n>]
//!   vault-cli mark-returned        --wallet <0x..> --token <..> [--payout-tx <0x..>]   (admin)
//!   vault-cli set-config           [--weekly-rate <n>] [--reward-split-pct <n>]        (admin)
//!   vault-cli record-distribution  --distributed <n>                                   (admin)
//!   vault-cli reconcile            [--repair]                                          (admin)

use anyhow::Context;
use clap::{Parser, Subcommand};
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use serde::Serialize;

use vault_rpc::api::{VaultAdminApiClient, VaultApiClient};

#[derive(Parser, Debug)]
#[command(name = "vault-cli", version, about = "StakeVault command-line client")]
struct Args {
    /// Public node RPC endpoint.
    #[arg(long, global = true, default_value = "http://127.0.0.1:8645")]
    rpc: String,

    /// Admin node RPC endpoint.
    #[arg(long, global = true, default_value = "http://127.0.0.1:8646")]
    admin_rpc: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Credit an on-chain deposit to a wallet.
    Fund {
        #[arg(long)]
        wallet: String,
        #[arg(long)]
        token: String,
        /// Deposit transaction hash.
        #[arg(long)]
        tx: String,
    },

    /// Withdraw every active stake of one token.
    Unstake {
        #[arg(long)]
        wallet: String,
        #[arg(long)]
        token: String,
    },

    /// List active stakes.
    Stakes {
        #[arg(long)]
        wallet: Option<String>,
        #[arg(long)]
        token: Option<String>,
    },

    /// Treasury totals and recent contributions.
    Stats,

    /// Weighted distribution preview.
    Preview {
        #[arg(long)]
        weekly_rate: Option<f64>,
    },

    /// Complete queued withdrawals after paying them manually.
    MarkReturned {
        #[arg(long)]
        wallet: String,
        #[arg(long)]
        token: String,
        #[arg(long)]
        payout_tx: Option<String>,
    },

    /// Update the weekly rate and/or reward split.
    SetConfig {
        #[arg(long)]
        weekly_rate: Option<f64>,
        #[arg(long)]
        reward_split_pct: Option<f64>,
    },

    /// Record an off-system payout run.
    RecordDistribution {
        #[arg(long)]
        distributed: f64,
    },

    /// Compare ledger totals with the treasury aggregate.
    Reconcile {
        /// Overwrite the aggregate with ledger totals when they differ.
        #[arg(long, default_value_t = false)]
        repair: bool,
    },
}

fn client(url: &str) -> anyhow::Result<HttpClient> {
    HttpClientBuilder::default()
        .build(url)
        .with_context(|| format!("building RPC client for {url}"))
}

fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("warn,vault_cli=info")
        .init();

    let args = Args::parse();

    match args.command {
        Command::Fund { wallet, token, tx } => {
            let res = client(&args.rpc)?.fund(wallet, token, tx).await.context("vault_fund")?;
            print(&res)
        }
        Command::Unstake { wallet, token } => {
            let res = client(&args.rpc)?.unstake(wallet, token).await.context("vault_unstake")?;
            print(&res)
        }
        Command::Stakes { wallet, token } => {
            let res = client(&args.rpc)?.list_stakes(wallet, token).await.context("vault_listStakes")?;
            print(&res)
        }
        Command::Stats => {
            let res = client(&args.rpc)?.get_stats().await.context("vault_getStats")?;
            print(&res)
        }
        Command::Preview { weekly_rate } => {
            let res = client(&args.rpc)?
                .preview_distribution(weekly_rate)
                .await
                .context("vault_previewDistribution")?;
            print(&res)
        }
        Command::MarkReturned { wallet, token, payout_tx } => {
            let n = client(&args.admin_rpc)?
                .mark_returned(wallet, token, payout_tx)
                .await
                .context("vaultAdmin_markReturned")?;
            println!("{n} withdrawal(s) marked returned");
            Ok(())
        }
        Command::SetConfig { weekly_rate, reward_split_pct } => {
            let res = client(&args.admin_rpc)?
                .set_config(weekly_rate, reward_split_pct)
                .await
                .context("vaultAdmin_setConfig")?;
            print(&res)
        }
        Command::RecordDistribution { distributed } => {
            let res = client(&args.admin_rpc)?
                .record_distribution(distributed)
                .await
                .context("vaultAdmin_recordDistribution")?;
            print(&res)
        }
        Command::Reconcile { repair } => {
            let res = client(&args.admin_rpc)?.reconcile(repair).await.context("vaultAdmin_reconcile")?;
            print(&res)
        }
    }
}
