use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use vault_chain::{PayoutWallet, ReceiptSource};
use vault_core::constants::RECENT_CONTRIBUTIONS_LIMIT;
use vault_core::{
    Address, ConfigUpdate, Contribution, Timestamp, Token, TreasuryAggregate, TxHash, VaultError,
};
use vault_distribution::{compute_shares, DistributionPreview};
use vault_state::{ContributionFilter, ContributionLedger, ReconcileReport, StateDb, TreasuryStore};

use crate::deposit::{DepositFlow, DepositTarget};
use crate::notify::Notifier;
use crate::withdrawal::{UnstakeOutcome, WithdrawalEngine};

/// Source of "now" in unix seconds.
pub type Clock = Arc<dyn Fn() -> Timestamp + Send + Sync>;

/// Public treasury view: the aggregate row plus the latest contributions.
#[derive(Debug, Clone, Serialize)]
pub struct TreasuryStats {
    pub treasury: TreasuryAggregate,
    /// Newest first.
    pub recent: Vec<Contribution>,
}

/// Every operation the treasury exposes, over one store.
pub struct TreasuryService {
    ledger: Arc<ContributionLedger>,
    treasury: TreasuryStore,
    deposits: DepositFlow,
    withdrawals: WithdrawalEngine,
    clock: Clock,
}

impl TreasuryService {
    pub fn new(
        db: Arc<StateDb>,
        chain: Arc<dyn ReceiptSource>,
        target: DepositTarget,
        payout: Option<Arc<dyn PayoutWallet>>,
        payout_timeout: Duration,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let ledger = Arc::new(ContributionLedger::new(Arc::clone(&db)));
        Self {
            treasury: TreasuryStore::new(db),
            deposits: DepositFlow::new(Arc::clone(&ledger), chain, target),
            withdrawals: WithdrawalEngine::new(Arc::clone(&ledger), payout, payout_timeout, notifier),
            ledger,
            clock: Arc::new(vault_core::now),
        }
    }

    /// Replace the wall clock, e.g. to preview at a fixed time.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> Timestamp {
        (self.clock)()
    }

    // ── Staker operations ────────────────────────────────────────────────────

    pub async fn fund(&self, wallet: Address, token: Token, tx_hash: TxHash) -> Result<Contribution, VaultError> {
        self.deposits.fund(wallet, token, tx_hash, self.now()).await
    }

    pub async fn unstake(&self, wallet: Address, token: Token) -> Result<UnstakeOutcome, VaultError> {
        self.withdrawals.unstake(wallet, token, self.now()).await
    }

    pub fn list_stakes(&self, wallet: Option<Address>, token: Option<Token>) -> Result<Vec<Contribution>, VaultError> {
        self.ledger.list_active(ContributionFilter::new(wallet, token))
    }

    pub fn stats(&self) -> Result<TreasuryStats, VaultError> {
        Ok(TreasuryStats {
            treasury: self.treasury.get(self.now())?,
            recent: self.ledger.recent(RECENT_CONTRIBUTIONS_LIMIT)?,
        })
    }

    /// Shares of `weekly_rate` (the configured rate when `None`) over the
    /// current active set.
    pub fn preview_distribution(&self, weekly_rate: Option<f64>) -> Result<DistributionPreview, VaultError> {
        let now = self.now();
        let rate = match weekly_rate {
            Some(r) if r.is_finite() && r >= 0.0 => r,
            Some(r) => {
                return Err(VaultError::InvalidInput(format!(
                    "weekly_rate must be a non-negative number, got {r}"
                )))
            }
            None => self.treasury.get(now)?.weekly_rate,
        };
        let active = self.ledger.list_active(ContributionFilter::default())?;
        Ok(compute_shares(&active, rate, now))
    }

    // ── Admin operations ─────────────────────────────────────────────────────

    /// Complete queued withdrawals after an out-of-band payout. Returns the
    /// number of rows completed; 0 when there was nothing left to do.
    pub fn mark_returned(&self, wallet: Address, token: Token, payout_tx: Option<TxHash>) -> Result<usize, VaultError> {
        self.ledger.mark_returned(wallet, token, payout_tx)
    }

    pub fn set_config(&self, update: ConfigUpdate) -> Result<TreasuryAggregate, VaultError> {
        self.treasury.set_config(&update, self.now())
    }

    pub fn record_distribution(&self, distributed: f64) -> Result<TreasuryAggregate, VaultError> {
        self.treasury.record_distribution(distributed, self.now())
    }

    pub fn reconcile(&self, repair: bool) -> Result<ReconcileReport, VaultError> {
        self.treasury.reconcile(repair, self.now())
    }

    pub fn seed_treasury(&self, weekly_rate: f64, reward_split_pct: f64) -> Result<TreasuryAggregate, VaultError> {
        self.treasury.seed_if_missing(weekly_rate, reward_split_pct, self.now())
    }
}
