use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use vault_core::{Address, Balance, TxHash, VaultError};

use crate::abi::{decode_uint, encode_balance_of};
use crate::config::ChainConfig;
use crate::receipt::Receipt;

/// Anything that can look up a transaction receipt by hash.
///
/// Same contract as [`ChainReader::get_receipt`]: `Ok(None)` is a definitive
/// "no such successful transaction", `Err` is "could not find out".
#[async_trait]
pub trait ReceiptSource: Send + Sync {
    async fn get_receipt(&self, tx_hash: &TxHash) -> Result<Option<Receipt>, VaultError>;
}

/// JSON-RPC 2.0 reader over a list of interchangeable endpoints.
///
/// Every call makes one ordered pass: a 429, a transport error, an RPC error
/// object or a result that does not decode moves on to the next endpoint.
/// The first well-formed result wins. When the pass is exhausted the call
/// fails with `VaultError::Unverifiable`, which callers treat as "try again
/// later" and never as "the transaction does not exist".
#[derive(Clone)]
pub struct ChainReader {
    endpoints: Vec<String>,
    client: reqwest::Client,
}

impl ChainReader {
    pub fn new(endpoints: Vec<String>, request_timeout: Duration) -> Result<Self, VaultError> {
        if endpoints.is_empty() {
            return Err(VaultError::InvalidConfig("chain reader needs at least one endpoint".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| VaultError::Chain(format!("building http client: {e}")))?;
        Ok(Self { endpoints, client })
    }

    pub fn from_config(config: &ChainConfig) -> Result<Self, VaultError> {
        Self::new(
            config.rpc_endpoints.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Call `method` and decode its `result` as `T`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, VaultError> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        for url in &self.endpoints {
            let resp = match self.client.post(url).json(&body).send().await {
                Ok(r) => r,
                Err(e) => {
                    warn!(endpoint = %url, method, error = %e, "rpc endpoint unreachable");
                    continue;
                }
            };

            let status = resp.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                debug!(endpoint = %url, method, "rpc endpoint rate limited");
                continue;
            }
            if !status.is_success() {
                warn!(endpoint = %url, method, %status, "rpc endpoint returned http error");
                continue;
            }

            let json: serde_json::Value = match resp.json().await {
                Ok(j) => j,
                Err(e) => {
                    warn!(endpoint = %url, method, error = %e, "rpc response is not json");
                    continue;
                }
            };

            if let Some(err) = json.get("error") {
                warn!(endpoint = %url, method, error = %err, "rpc error response");
                continue;
            }
            let Some(result) = json.get("result") else {
                warn!(endpoint = %url, method, "rpc response has no result");
                continue;
            };

            match serde_json::from_value::<T>(result.clone()) {
                Ok(value) => {
                    debug!(endpoint = %url, method, "rpc call succeeded");
                    return Ok(value);
                }
                Err(e) => {
                    warn!(endpoint = %url, method, error = %e, "rpc result is malformed");
                    continue;
                }
            }
        }

        Err(VaultError::Unverifiable(format!(
            "all {} rpc endpoints failed for {method}",
            self.endpoints.len()
        )))
    }

    /// `Ok(None)` means an endpoint answered that it knows no receipt for
    /// this hash (unknown or still pending). `Err(Unverifiable)` means no
    /// endpoint answered at all.
    pub async fn get_receipt(&self, tx_hash: &TxHash) -> Result<Option<Receipt>, VaultError> {
        self.request(
            "eth_getTransactionReceipt",
            serde_json::json!([tx_hash.to_hex()]),
        )
        .await
    }

    /// ERC-20 `balanceOf(holder)` at the latest block.
    pub async fn erc20_balance(&self, token: &Address, holder: &Address) -> Result<Balance, VaultError> {
        let raw: String = self
            .request(
                "eth_call",
                serde_json::json!([
                    { "to": token.to_hex(), "data": encode_balance_of(holder) },
                    "latest"
                ]),
            )
            .await?;
        decode_uint(&raw).ok_or_else(|| VaultError::Chain(format!("undecodable balance: {raw}")))
    }
}

#[async_trait]
impl ReceiptSource for ChainReader {
    async fn get_receipt(&self, tx_hash: &TxHash) -> Result<Option<Receipt>, VaultError> {
        ChainReader::get_receipt(self, tx_hash).await
    }
}
