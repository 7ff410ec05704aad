use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use jsonrpsee::core::{async_trait, RpcResult};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObject;
use tracing::info;

use vault_core::{Address, ConfigUpdate, Token, TxHash, VaultError};
use vault_engine::TreasuryService;

use crate::api::{VaultAdminApiServer, VaultApiServer};
use crate::types::{
    RpcContribution, RpcDistributionPreview, RpcFundResult, RpcReconcileReport, RpcStats,
    RpcTreasury, RpcUnstakeResult,
};

// ── Error mapping ────────────────────────────────────────────────────────────

pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
pub const NOT_FOUND: i32 = -32004;
pub const CONFLICT: i32 = -32009;
/// Retry later; nothing was written.
pub const TRANSIENT: i32 = -32010;

fn rpc_err(code: i32, msg: impl Into<String>, reason: &str) -> ErrorObject<'static> {
    ErrorObject::owned(code, msg.into(), Some(serde_json::json!({ "reason": reason })))
}

/// JSON-RPC error for a service error. `data.reason` carries the stable
/// machine-readable code.
pub fn vault_err(e: VaultError) -> ErrorObject<'static> {
    let code = match &e {
        VaultError::InvalidInput(_) | VaultError::InvalidConfig(_) | VaultError::Rejected(_) => INVALID_PARAMS,
        VaultError::DuplicateTransaction(_) | VaultError::StakeNotActive(_) => CONFLICT,
        VaultError::NoActiveStake { .. } => NOT_FOUND,
        VaultError::Unverifiable(_) | VaultError::Storage(_) => TRANSIENT,
        VaultError::Chain(_) | VaultError::Serialization(_) => INTERNAL_ERROR,
    };
    rpc_err(code, e.to_string(), e.code())
}

fn parse_wallet(s: &str) -> RpcResult<Address> {
    Address::parse(s).map_err(vault_err)
}

fn parse_token(s: &str) -> RpcResult<Token> {
    Token::from_str(s).map_err(vault_err)
}

fn parse_tx(s: &str) -> RpcResult<TxHash> {
    TxHash::parse(s).map_err(vault_err)
}

// ── Public server ────────────────────────────────────────────────────────────

/// The staker-facing RPC server.
pub struct RpcServer {
    service: Arc<TreasuryService>,
}

impl RpcServer {
    pub fn new(service: Arc<TreasuryService>) -> Self {
        Self { service }
    }

    /// Start the JSON-RPC server on `addr`. Returns the bound address and a
    /// handle to stop it.
    pub async fn start(self, addr: SocketAddr) -> anyhow::Result<(SocketAddr, ServerHandle)> {
        let server = Server::builder().build(addr).await?;
        let bound = server.local_addr()?;
        let handle = server.start(self.into_rpc());
        info!(addr = %bound, "RPC server started");
        Ok((bound, handle))
    }
}

#[async_trait]
impl VaultApiServer for RpcServer {
    async fn fund(&self, wallet: String, token: String, tx_hash: String) -> RpcResult<RpcFundResult> {
        let wallet = parse_wallet(&wallet)?;
        let token = parse_token(&token)?;
        let tx_hash = parse_tx(&tx_hash)?;
        match self.service.fund(wallet, token, tx_hash).await {
            Ok(c) => Ok(RpcFundResult::accepted(&c)),
            Err(VaultError::Rejected(reason)) => Ok(RpcFundResult::rejected(reason.message(), reason.code())),
            Err(e) => Err(vault_err(e)),
        }
    }

    async fn unstake(&self, wallet: String, token: String) -> RpcResult<RpcUnstakeResult> {
        let wallet = parse_wallet(&wallet)?;
        let token = parse_token(&token)?;
        let outcome = self.service.unstake(wallet, token).await.map_err(vault_err)?;
        Ok(RpcUnstakeResult::from(&outcome))
    }

    async fn list_stakes(&self, wallet: Option<String>, token: Option<String>) -> RpcResult<Vec<RpcContribution>> {
        let wallet = wallet.as_deref().map(parse_wallet).transpose()?;
        let token = token.as_deref().map(parse_token).transpose()?;
        let rows = self.service.list_stakes(wallet, token).map_err(vault_err)?;
        Ok(rows.iter().map(RpcContribution::from).collect())
    }

    async fn get_stats(&self) -> RpcResult<RpcStats> {
        let stats = self.service.stats().map_err(vault_err)?;
        Ok(RpcStats {
            treasury: RpcTreasury::from(&stats.treasury),
            recent: stats.recent.iter().map(RpcContribution::from).collect(),
        })
    }

    async fn preview_distribution(&self, weekly_rate: Option<f64>) -> RpcResult<RpcDistributionPreview> {
        let preview = self.service.preview_distribution(weekly_rate).map_err(vault_err)?;
        Ok(RpcDistributionPreview::from(&preview))
    }
}

// ── Admin server ─────────────────────────────────────────────────────────────

/// Administrator RPC server; bind it to a private interface.
pub struct AdminRpcServer {
    service: Arc<TreasuryService>,
}

impl AdminRpcServer {
    pub fn new(service: Arc<TreasuryService>) -> Self {
        Self { service }
    }

    pub async fn start(self, addr: SocketAddr) -> anyhow::Result<(SocketAddr, ServerHandle)> {
        let server = Server::builder().build(addr).await?;
        let bound = server.local_addr()?;
        let handle = server.start(self.into_rpc());
        info!(addr = %bound, "admin RPC server started");
        Ok((bound, handle))
    }
}

#[async_trait]
impl VaultAdminApiServer for AdminRpcServer {
    async fn mark_returned(&self, wallet: String, token: String, payout_tx: Option<String>) -> RpcResult<usize> {
        let wallet = parse_wallet(&wallet)?;
        let token = parse_token(&token)?;
        let payout_tx = payout_tx.as_deref().map(parse_tx).transpose()?;
        self.service.mark_returned(wallet, token, payout_tx).map_err(vault_err)
    }

    async fn set_config(&self, weekly_rate: Option<f64>, reward_split_pct: Option<f64>) -> RpcResult<RpcTreasury> {
        let row = self
            .service
            .set_config(ConfigUpdate { weekly_rate, reward_split_pct })
            .map_err(vault_err)?;
        Ok(RpcTreasury::from(&row))
    }

    async fn record_distribution(&self, distributed: f64) -> RpcResult<RpcTreasury> {
        let row = self.service.record_distribution(distributed).map_err(vault_err)?;
        Ok(RpcTreasury::from(&row))
    }

    async fn reconcile(&self, repair: bool) -> RpcResult<RpcReconcileReport> {
        let report = self.service.reconcile(repair).map_err(vault_err)?;
        Ok(RpcReconcileReport::from(&report))
    }
}
