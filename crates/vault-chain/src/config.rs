use serde::{Deserialize, Serialize};
use vault_core::{Address, Token, VaultError};

/// Contract addresses of the two stakeable tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenContracts {
    pub primary: Address,
    pub secondary: Address,
}

impl TokenContracts {
    pub fn for_token(&self, token: Token) -> Address {
        match token {
            Token::Primary => self.primary,
            Token::Secondary => self.secondary,
        }
    }
}

/// Where and how to read the chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Interchangeable read-only JSON-RPC endpoints, tried in order.
    pub rpc_endpoints: Vec<String>,
    /// Wallet every deposit must be sent to.
    pub protocol_wallet: Address,
    pub tokens: TokenContracts,
    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_endpoints: vec![
                "https://mainnet.base.org".into(),
                "https://base.llamarpc.com".into(),
                "https://base.drpc.org".into(),
            ],
            protocol_wallet: Address::from_bytes([
                0x91, 0xb5, 0xc0, 0xd0, 0x78, 0x59, 0xcf, 0xea, 0xfe, 0xb6, 0x7d, 0x96, 0x94,
                0x12, 0x1c, 0xd7, 0x41, 0xf0, 0x49, 0xbd,
            ]),
            tokens: TokenContracts {
                primary: Address::from_bytes([
                    0xa1, 0xf7, 0x24, 0x59, 0xdf, 0xa1, 0x0b, 0xad, 0x20, 0x0a, 0xc1, 0x60, 0xec,
                    0xd7, 0x8c, 0x6b, 0x77, 0xa7, 0x47, 0xbe,
                ]),
                // No sensible default; must come from the config file.
                secondary: Address::ZERO,
            },
            request_timeout_secs: 10,
        }
    }
}

impl ChainConfig {
    pub fn validate(&self) -> Result<(), VaultError> {
        if self.rpc_endpoints.is_empty() {
            return Err(VaultError::InvalidConfig("at least one rpc endpoint is required".into()));
        }
        if self.protocol_wallet.is_zero() {
            return Err(VaultError::InvalidConfig("protocol_wallet is not set".into()));
        }
        for token in Token::ALL {
            if self.tokens.for_token(token).is_zero() {
                return Err(VaultError::InvalidConfig(format!("{token} token contract is not set")));
            }
        }
        if self.tokens.primary == self.tokens.secondary {
            return Err(VaultError::InvalidConfig(
                "primary and secondary token contracts must differ".into(),
            ));
        }
        Ok(())
    }
}

/// Custodial payout wallet settings. When absent every unstake is queued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutConfig {
    /// JSON-RPC endpoint of the signer holding the payout key
    /// (accepts `eth_sendTransaction` from `payout_wallet`).
    pub signer_url: String,
    pub payout_wallet: Address,
    /// Upper bound for submit + inclusion; past it the unstake is queued.
    #[serde(default = "default_submit_timeout_secs")]
    pub submit_timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_submit_timeout_secs() -> u64 {
    120
}

fn default_poll_interval_ms() -> u64 {
    2_000
}
