use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Token;

/// Why a deposit receipt failed verification. Permanent for that tx hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    TxFailedOrMissing,
    NoMatchingTransfer,
    WrongRecipient,
    ZeroAmount,
    AmountOutOfRange,
}

impl RejectReason {
    /// Stable machine-readable reason string.
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::TxFailedOrMissing => "tx_failed_or_missing",
            RejectReason::NoMatchingTransfer => "no_matching_transfer",
            RejectReason::WrongRecipient => "wrong_recipient",
            RejectReason::ZeroAmount => "zero_amount",
            RejectReason::AmountOutOfRange => "amount_out_of_range",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            RejectReason::TxFailedOrMissing => "transaction failed or not found",
            RejectReason::NoMatchingTransfer => "no matching token transfer found",
            RejectReason::WrongRecipient => "transfer was not sent to the protocol wallet",
            RejectReason::ZeroAmount => "transfer amount is zero",
            RejectReason::AmountOutOfRange => "transfer amount exceeds supported range",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Error)]
pub enum VaultError {
    // ── Deposit errors ───────────────────────────────────────────────────────
    #[error("transaction cannot be verified right now: {0}")]
    Unverifiable(String),

    #[error("{0}")]
    Rejected(RejectReason),

    #[error("transaction has already been recorded: {0}")]
    DuplicateTransaction(String),

    // ── Withdrawal errors ────────────────────────────────────────────────────
    #[error("no active {token} stake for wallet {wallet}")]
    NoActiveStake { wallet: String, token: Token },

    #[error("contribution {0} is not active")]
    StakeNotActive(u64),

    // ── Admin / input errors ─────────────────────────────────────────────────
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // ── Infrastructure ───────────────────────────────────────────────────────
    #[error("chain error: {0}")]
    Chain(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl VaultError {
    /// Stable machine-readable reason string for callers.
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::Unverifiable(_) => "unverifiable",
            VaultError::Rejected(_) => "rejected",
            VaultError::DuplicateTransaction(_) => "duplicate_transaction",
            VaultError::NoActiveStake { .. } => "no_active_stake",
            VaultError::StakeNotActive(_) => "stake_not_active",
            VaultError::InvalidConfig(_) => "invalid_config",
            VaultError::InvalidInput(_) => "invalid_input",
            VaultError::Chain(_) => "chain_error",
            VaultError::Serialization(_) => "serialization_error",
            VaultError::Storage(_) => "storage_error",
        }
    }

    /// True when the caller should retry the same request later.
    pub fn is_transient(&self) -> bool {
        matches!(self, VaultError::Unverifiable(_) | VaultError::Storage(_))
    }
}
