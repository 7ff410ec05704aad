use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use vault_chain::{ChainConfig, PayoutConfig};

/// Node configuration file (JSON). Every field is optional; missing fields
/// take the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub data_dir: PathBuf,
    /// Staker-facing JSON-RPC listener.
    pub rpc_addr: SocketAddr,
    /// Admin JSON-RPC listener. Keep it on loopback or a private network.
    pub admin_rpc_addr: SocketAddr,
    pub chain: ChainConfig,
    /// Without a payout wallet every unstake is queued for manual payout.
    pub payout: Option<PayoutConfig>,
    pub notify: NotifyConfig,
    pub seed: SeedConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("~/.stakevault/data"),
            rpc_addr: SocketAddr::from(([127, 0, 0, 1], 8645)),
            admin_rpc_addr: SocketAddr::from(([127, 0, 0, 1], 8646)),
            chain: ChainConfig::default(),
            payout: None,
            notify: NotifyConfig::default(),
            seed: SeedConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// POST target for unstake notifications. Logged only when unset.
    pub webhook_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Treasury values written once, when the store has no treasury row yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub weekly_rate: f64,
    pub reward_split_pct: f64,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self { weekly_rate: 0.0, reward_split_pct: 50.0 }
    }
}

impl NodeConfig {
    /// Read `path`, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(p) = path else {
            return Ok(Self::default());
        };
        let json = std::fs::read_to_string(p)
            .with_context(|| format!("reading config from {}", p.display()))?;
        serde_json::from_str(&json).with_context(|| format!("parsing config {}", p.display()))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.chain.validate().context("invalid chain config")?;
        if self.rpc_addr == self.admin_rpc_addr {
            anyhow::bail!("rpc_addr and admin_rpc_addr must differ");
        }
        if let Some(p) = &self.payout {
            if p.payout_wallet.is_zero() {
                anyhow::bail!("payout.payout_wallet is not set");
            }
            if p.submit_timeout_secs == 0 {
                anyhow::bail!("payout.submit_timeout_secs must be positive");
            }
        }
        Ok(())
    }
}

/// Expand a leading `~` to the user's home directory (`HOME` or `USERPROFILE`).
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{
        "data_dir": "/var/lib/stakevault",
        "rpc_addr": "0.0.0.0:9000",
        "chain": {
            "protocol_wallet": "0x91b5c0d07859cfeafeb67d9694121cd741f049bd",
            "tokens": {
                "primary": "0xa1f72459dfa10bad200ac160ecd78c6b77a747be",
                "secondary": "0x00000000000000000000000000000000000000c2"
            }
        },
        "payout": {
            "signer_url": "http://127.0.0.1:8555",
            "payout_wallet": "0x00000000000000000000000000000000000000fe"
        },
        "notify": { "webhook_url": "https://hooks.example.org/vault" },
        "seed": { "weekly_rate": 1000.0 }
    }"#;

    #[test]
    fn full_file_parses_with_defaults_filled() {
        let cfg: NodeConfig = serde_json::from_str(FULL).unwrap();
        assert_eq!(cfg.rpc_addr.port(), 9000);
        assert_eq!(cfg.admin_rpc_addr, NodeConfig::default().admin_rpc_addr);
        assert_eq!(cfg.chain.rpc_endpoints.len(), 3);
        let payout = cfg.payout.as_ref().unwrap();
        assert_eq!(payout.submit_timeout_secs, 120);
        assert_eq!(cfg.seed.weekly_rate, 1000.0);
        assert_eq!(cfg.seed.reward_split_pct, 50.0);
        cfg.validate().unwrap();
    }

    #[test]
    fn defaults_need_a_secondary_token() {
        assert!(NodeConfig::default().validate().is_err());
    }

    #[test]
    fn shared_listener_is_rejected() {
        let mut cfg: NodeConfig = serde_json::from_str(FULL).unwrap();
        cfg.admin_rpc_addr = cfg.rpc_addr;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn tilde_expands_to_home() {
        std::env::set_var("HOME", "/home/vault");
        assert_eq!(expand_tilde(Path::new("~/data")), PathBuf::from("/home/vault/data"));
        assert_eq!(expand_tilde(Path::new("/abs")), PathBuf::from("/abs"));
    }
}
