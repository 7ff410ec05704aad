use serde::{Deserialize, Serialize};
use vault_core::{format_units, Contribution, Token, TreasuryAggregate};
use vault_distribution::{DistributionPreview, WalletShare};
use vault_engine::UnstakeOutcome;
use vault_state::ReconcileReport;

/// JSON-serializable contribution. Base-unit amounts are u128 as string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcContribution {
    pub id: u64,
    pub wallet: String,
    pub token: String,
    pub amount: String,
    /// Whole tokens, exact decimal.
    pub amount_tokens: String,
    pub tx_hash: String,
    pub active: bool,
    pub created_at: i64,
    pub unstaked_at: Option<i64>,
    pub withdrawal_status: String,
    pub withdrawal_tx: Option<String>,
}

impl From<&Contribution> for RpcContribution {
    fn from(c: &Contribution) -> Self {
        Self {
            id: c.id,
            wallet: c.wallet.to_hex(),
            token: c.token.to_string(),
            amount: c.amount.to_string(),
            amount_tokens: format_units(c.amount),
            tx_hash: c.tx_hash.to_hex(),
            active: c.active,
            created_at: c.created_at,
            unstaked_at: c.unstaked_at,
            withdrawal_status: c.withdrawal_status.as_str().to_string(),
            withdrawal_tx: c.withdrawal_tx.map(|t| t.to_hex()),
        }
    }
}

/// Treasury row returned by `vault_getStats` and the admin writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcTreasury {
    pub total_staked_primary: String,
    pub total_staked_secondary: String,
    pub total_staked_primary_tokens: String,
    pub total_staked_secondary_tokens: String,
    pub total_distributed: f64,
    pub distribution_count: u64,
    pub last_distribution_at: Option<i64>,
    pub weekly_rate: f64,
    pub reward_split_pct: f64,
    pub updated_at: i64,
}

impl From<&TreasuryAggregate> for RpcTreasury {
    fn from(t: &TreasuryAggregate) -> Self {
        let primary = t.total_staked.get(Token::Primary);
        let secondary = t.total_staked.get(Token::Secondary);
        Self {
            total_staked_primary: primary.to_string(),
            total_staked_secondary: secondary.to_string(),
            total_staked_primary_tokens: format_units(primary),
            total_staked_secondary_tokens: format_units(secondary),
            total_distributed: t.total_distributed,
            distribution_count: t.distribution_count,
            last_distribution_at: t.last_distribution_at,
            weekly_rate: t.weekly_rate,
            reward_split_pct: t.reward_split_pct,
            updated_at: t.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcStats {
    pub treasury: RpcTreasury,
    /// Newest first.
    pub recent: Vec<RpcContribution>,
}

/// Outcome of `vault_fund`. A failed verification rule is a normal answer
/// (`accepted: false` with the rule), not a JSON-RPC error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcFundResult {
    pub accepted: bool,
    pub amount: Option<String>,
    pub amount_tokens: Option<String>,
    pub contribution: Option<RpcContribution>,
    /// Human-readable rejection reason.
    pub reason: Option<String>,
    /// Stable rejection code, e.g. `wrong_recipient`.
    pub reason_code: Option<String>,
}

impl RpcFundResult {
    pub fn accepted(c: &Contribution) -> Self {
        Self {
            accepted: true,
            amount: Some(c.amount.to_string()),
            amount_tokens: Some(format_units(c.amount)),
            contribution: Some(c.into()),
            reason: None,
            reason_code: None,
        }
    }

    pub fn rejected(reason: &str, code: &str) -> Self {
        Self {
            accepted: false,
            amount: None,
            amount_tokens: None,
            contribution: None,
            reason: Some(reason.to_string()),
            reason_code: Some(code.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcUnstakeResult {
    pub instant: bool,
    pub amount: String,
    pub amount_tokens: String,
    /// Set when `instant`.
    pub payout_tx: Option<String>,
    /// Why the withdrawal was queued. Set when not `instant`.
    pub queued_reason: Option<String>,
}

impl From<&UnstakeOutcome> for RpcUnstakeResult {
    fn from(o: &UnstakeOutcome) -> Self {
        let amount = o.amount();
        let (payout_tx, queued_reason) = match o {
            UnstakeOutcome::Instant { payout_tx, .. } => (Some(payout_tx.to_hex()), None),
            UnstakeOutcome::Queued { reason, .. } => (None, Some(reason.clone())),
        };
        Self {
            instant: o.is_instant(),
            amount: amount.to_string(),
            amount_tokens: format_units(amount),
            payout_tx,
            queued_reason,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcShare {
    pub wallet: String,
    pub token: String,
    pub staked: String,
    pub staked_tokens: String,
    pub staked_days: f64,
    pub weight: f64,
    pub share_pct: f64,
    pub share_amount: f64,
}

impl From<&WalletShare> for RpcShare {
    fn from(s: &WalletShare) -> Self {
        Self {
            wallet: s.wallet.to_hex(),
            token: s.token.to_string(),
            staked: s.staked.to_string(),
            staked_tokens: format_units(s.staked),
            staked_days: s.staked_days,
            weight: s.weight,
            share_pct: s.share_pct,
            share_amount: s.share_amount,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcDistributionPreview {
    pub weekly_rate: f64,
    pub total_weighted_days: f64,
    pub per_wallet: Vec<RpcShare>,
}

impl From<&DistributionPreview> for RpcDistributionPreview {
    fn from(p: &DistributionPreview) -> Self {
        Self {
            weekly_rate: p.weekly_rate,
            total_weighted_days: p.total_weighted_days,
            per_wallet: p.per_wallet.iter().map(RpcShare::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcReconcileReport {
    pub in_sync: bool,
    pub repaired: bool,
    pub ledger_primary: String,
    pub ledger_secondary: String,
    pub aggregate_primary: String,
    pub aggregate_secondary: String,
    /// `aggregate - ledger`, i128 as string.
    pub drift_primary: String,
    pub drift_secondary: String,
}

impl From<&ReconcileReport> for RpcReconcileReport {
    fn from(r: &ReconcileReport) -> Self {
        Self {
            in_sync: r.in_sync(),
            repaired: r.repaired,
            ledger_primary: r.ledger.primary.to_string(),
            ledger_secondary: r.ledger.secondary.to_string(),
            aggregate_primary: r.aggregate.primary.to_string(),
            aggregate_secondary: r.aggregate.secondary.to_string(),
            drift_primary: r.drift(Token::Primary).to_string(),
            drift_secondary: r.drift(Token::Secondary).to_string(),
        }
    }
}
