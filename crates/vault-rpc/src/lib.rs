//! vault-rpc
//!
//! JSON-RPC 2.0 binding of the treasury service.
//!
//! Public namespace "vault" (staker-facing):
//!   vault_fund                 credit a verified on-chain deposit
//!   vault_unstake              withdraw all active stakes of one token
//!   vault_listStakes           active stakes, optionally filtered
//!   vault_getStats             treasury row and recent contributions
//!   vault_previewDistribution  weighted share table
//!
//! Admin namespace "vaultAdmin" (served on its own listener):
//!   vaultAdmin_markReturned        complete queued withdrawals
//!   vaultAdmin_setConfig           weekly rate / reward split
//!   vaultAdmin_recordDistribution  audit stamp for a payout run
//!   vaultAdmin_reconcile           ledger vs aggregate check / repair

pub mod api;
pub mod server;
pub mod types;

pub use server::{AdminRpcServer, RpcServer};
pub use types::{
    RpcContribution, RpcDistributionPreview, RpcFundResult, RpcReconcileReport, RpcShare, RpcStats,
    RpcTreasury, RpcUnstakeResult,
};
