use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;

use crate::types::{
    RpcContribution, RpcDistributionPreview, RpcFundResult, RpcReconcileReport, RpcStats,
    RpcTreasury, RpcUnstakeResult,
};

/// Staker-facing JSON-RPC 2.0 API.
///
/// All method names are prefixed with "vault_" via `namespace = "vault"`.
/// Wallets are `0x` + 40 hex, transaction hashes `0x` + 64 hex, tokens
/// `"primary"` or `"secondary"` (case-insensitive).
#[rpc(server, client, namespace = "vault")]
pub trait VaultApi {
    /// Verify `tx_hash` as a transfer of `token` to the protocol wallet and
    /// credit it to `wallet`. Retrying after an `unverifiable` error is safe.
    #[method(name = "fund")]
    async fn fund(&self, wallet: String, token: String, tx_hash: String) -> RpcResult<RpcFundResult>;

    /// Withdraw every active `token` stake of `wallet`: instant when the
    /// payout wallet can cover it, queued otherwise.
    #[method(name = "unstake")]
    async fn unstake(&self, wallet: String, token: String) -> RpcResult<RpcUnstakeResult>;

    /// Active stakes, optionally filtered by wallet and/or token. Oldest first.
    #[method(name = "listStakes")]
    async fn list_stakes(&self, wallet: Option<String>, token: Option<String>) -> RpcResult<Vec<RpcContribution>>;

    /// Treasury totals and the 20 most recent contributions.
    #[method(name = "getStats")]
    async fn get_stats(&self) -> RpcResult<RpcStats>;

    /// Weighted share table over the active set. `weekly_rate` defaults to
    /// the configured rate.
    #[method(name = "previewDistribution")]
    async fn preview_distribution(&self, weekly_rate: Option<f64>) -> RpcResult<RpcDistributionPreview>;
}

/// Administrator API. Never expose this listener publicly.
#[rpc(server, client, namespace = "vaultAdmin")]
pub trait VaultAdminApi {
    /// Complete queued withdrawals after an out-of-band payout. Returns the
    /// number of stakes completed (0 on a repeat call).
    #[method(name = "markReturned")]
    async fn mark_returned(&self, wallet: String, token: String, payout_tx: Option<String>) -> RpcResult<usize>;

    #[method(name = "setConfig")]
    async fn set_config(&self, weekly_rate: Option<f64>, reward_split_pct: Option<f64>) -> RpcResult<RpcTreasury>;

    /// Stamp an off-system payout run of `distributed` tokens.
    #[method(name = "recordDistribution")]
    async fn record_distribution(&self, distributed: f64) -> RpcResult<RpcTreasury>;

    #[method(name = "reconcile")]
    async fn reconcile(&self, repair: bool) -> RpcResult<RpcReconcileReport>;
}
