use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};
use vault_core::{Address, Balance, Token, TxHash, VaultError};

use crate::abi::{encode_transfer, to_quantity};
use crate::config::{PayoutConfig, TokenContracts};
use crate::reader::ChainReader;

/// Why an instant payout did not happen. Never reaches a caller: the
/// withdrawal path turns every variant into a queued withdrawal.
#[derive(Debug, Error)]
pub enum PayoutError {
    #[error("no payout wallet configured")]
    NotConfigured,

    #[error("payout wallet holds {have} base units, {need} needed")]
    InsufficientBalance { need: Balance, have: Balance },

    #[error("balance query failed: {0}")]
    BalanceUnavailable(String),

    #[error("transfer submission failed: {0}")]
    Submission(String),

    #[error("payout transaction {0} reverted")]
    Reverted(String),

    #[error("payout not confirmed within {0}s")]
    Timeout(u64),
}

/// A custodial hot wallet able to send staked tokens back to stakers.
#[async_trait]
pub trait PayoutWallet: Send + Sync {
    fn address(&self) -> Address;

    /// On-chain balance of `token` held by the payout wallet.
    async fn balance(&self, token: Token) -> Result<Balance, PayoutError>;

    /// Send `amount` of `token` to `to` and wait for successful inclusion.
    /// Implementations may wait indefinitely; callers bound the wait.
    async fn transfer(&self, token: Token, to: Address, amount: Balance) -> Result<TxHash, PayoutError>;
}

/// Payout wallet whose key lives in an external signer that accepts
/// `eth_sendTransaction` for the payout address. Balances and inclusion are
/// read through the ordinary chain reader.
pub struct RemoteSignerWallet {
    chain: ChainReader,
    signer: ChainReader,
    wallet: Address,
    tokens: TokenContracts,
    poll_interval: Duration,
}

impl RemoteSignerWallet {
    pub fn new(
        chain: ChainReader,
        config: &PayoutConfig,
        tokens: TokenContracts,
    ) -> Result<Self, VaultError> {
        let signer = ChainReader::new(
            vec![config.signer_url.clone()],
            Duration::from_secs(config.submit_timeout_secs),
        )?;
        Ok(Self {
            chain,
            signer,
            wallet: config.payout_wallet,
            tokens,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        })
    }
}

#[async_trait]
impl PayoutWallet for RemoteSignerWallet {
    fn address(&self) -> Address {
        self.wallet
    }

    async fn balance(&self, token: Token) -> Result<Balance, PayoutError> {
        self.chain
            .erc20_balance(&self.tokens.for_token(token), &self.wallet)
            .await
            .map_err(|e| PayoutError::BalanceUnavailable(e.to_string()))
    }

    async fn transfer(&self, token: Token, to: Address, amount: Balance) -> Result<TxHash, PayoutError> {
        let contract = self.tokens.for_token(token);
        let raw: String = self
            .signer
            .request(
                "eth_sendTransaction",
                serde_json::json!([{
                    "from": self.wallet.to_hex(),
                    "to": contract.to_hex(),
                    "value": to_quantity(0),
                    "data": encode_transfer(&to, amount),
                }]),
            )
            .await
            .map_err(|e| PayoutError::Submission(e.to_string()))?;
        let hash = TxHash::parse(&raw).map_err(|e| PayoutError::Submission(e.to_string()))?;
        info!(tx = %hash, %to, %token, amount, "payout submitted");

        loop {
            match self.chain.get_receipt(&hash).await {
                Ok(Some(receipt)) if receipt.succeeded() => return Ok(hash),
                Ok(Some(_)) => return Err(PayoutError::Reverted(hash.to_hex())),
                Ok(None) => debug!(tx = %hash, "payout pending"),
                Err(e) => debug!(tx = %hash, error = %e, "payout receipt unavailable"),
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
