use std::collections::BTreeSet;
use std::sync::Arc;

use sled::Transactional;
use tracing::{info, warn};
use vault_core::{
    Address, Balance, Contribution, ContributionId, Timestamp, Token, TxHash, VaultError,
    WithdrawalStatus,
};

use crate::db::{
    abort, encode, map_tx_error, tx_decode, tx_encode, tx_load_treasury, tx_store_treasury,
    StateDb,
};

/// Optional wallet / token filter for ledger reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContributionFilter {
    pub wallet: Option<Address>,
    pub token: Option<Token>,
}

impl ContributionFilter {
    pub fn new(wallet: Option<Address>, token: Option<Token>) -> Self {
        Self { wallet, token }
    }

    pub fn matches(&self, c: &Contribution) -> bool {
        self.wallet.map_or(true, |w| c.wallet == w) && self.token.map_or(true, |t| c.token == t)
    }
}

/// The record of every accepted stake, keyed for idempotence by deposit
/// transaction hash.
pub struct ContributionLedger {
    db: Arc<StateDb>,
}

impl ContributionLedger {
    pub fn new(db: Arc<StateDb>) -> Self {
        Self { db }
    }

    /// Insert an active contribution and credit the treasury in one atomic
    /// step.
    ///
    /// The `tx_index` entry is created inside the same transaction, so two
    /// concurrent deposits of one hash serialize: exactly one commits, the
    /// other aborts with `DuplicateTransaction`.
    pub fn record_deposit(
        &self,
        wallet: Address,
        token: Token,
        tx_hash: TxHash,
        amount: Balance,
        now: Timestamp,
    ) -> Result<Contribution, VaultError> {
        if amount == 0 {
            return Err(VaultError::InvalidInput("deposit amount must be positive".into()));
        }
        let id = self.db.next_contribution_id()?;
        let row = Contribution::new(id, wallet, token, amount, tx_hash, now);
        let row_bytes = encode(&row)?;

        (&self.db.contributions, &self.db.tx_index, &self.db.treasury)
            .transaction(|(contributions, tx_index, treasury)| {
                if tx_index.get(tx_hash.as_bytes())?.is_some() {
                    return abort(VaultError::DuplicateTransaction(tx_hash.to_hex()));
                }
                tx_index.insert(&tx_hash.as_bytes()[..], &id.to_be_bytes()[..])?;
                contributions.insert(&id.to_be_bytes()[..], row_bytes.as_slice())?;

                let mut agg = tx_load_treasury(treasury, now)?;
                agg.increment(token, amount, now);
                tx_store_treasury(treasury, &agg)?;
                Ok(())
            })
            .map_err(map_tx_error)?;

        info!(id, %wallet, %token, %tx_hash, amount, "contribution recorded");
        Ok(row)
    }

    /// Active contributions matching `filter`, oldest first.
    pub fn list_active(&self, filter: ContributionFilter) -> Result<Vec<Contribution>, VaultError> {
        self.list(filter, |c| c.active)
    }

    /// Closed contributions still waiting for a manual payout.
    pub fn list_awaiting_payout(&self, filter: ContributionFilter) -> Result<Vec<Contribution>, VaultError> {
        self.list(filter, Contribution::awaiting_payout)
    }

    /// Most recent `limit` contributions in any state, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<Contribution>, VaultError> {
        self.db.iter_contributions().rev().take(limit).collect()
    }

    pub fn get_by_tx(&self, tx_hash: &TxHash) -> Result<Option<Contribution>, VaultError> {
        self.db.contribution_by_tx(tx_hash)
    }

    pub fn contains_tx(&self, tx_hash: &TxHash) -> Result<bool, VaultError> {
        self.db.tx_recorded(tx_hash)
    }

    fn list(
        &self,
        filter: ContributionFilter,
        keep: impl Fn(&Contribution) -> bool,
    ) -> Result<Vec<Contribution>, VaultError> {
        let mut out = Vec::new();
        for item in self.db.iter_contributions() {
            let c = item?;
            if keep(&c) && filter.matches(&c) {
                out.push(c);
            }
        }
        Ok(out)
    }

    /// Close a batch of active contributions and debit the treasury by their
    /// amounts, all or nothing. Any id that is unknown or already closed
    /// aborts the whole batch with `StakeNotActive`.
    pub fn close_stakes(
        &self,
        ids: &[ContributionId],
        status: WithdrawalStatus,
        withdrawal_tx: Option<TxHash>,
        now: Timestamp,
    ) -> Result<usize, VaultError> {
        if status == WithdrawalStatus::None {
            return Err(VaultError::InvalidInput("closed stakes need a withdrawal status".into()));
        }
        let ids: BTreeSet<ContributionId> = ids.iter().copied().collect();
        if ids.is_empty() {
            return Ok(0);
        }

        let shortfalls = (&self.db.contributions, &self.db.treasury)
            .transaction(|(contributions, treasury)| {
                let mut agg = tx_load_treasury(treasury, now)?;
                let mut shortfalls = Vec::new();
                for id in &ids {
                    let key = id.to_be_bytes();
                    let Some(bytes) = contributions.get(key)? else {
                        return abort(VaultError::StakeNotActive(*id));
                    };
                    let mut row: Contribution = tx_decode(&bytes)?;
                    if !row.active {
                        return abort(VaultError::StakeNotActive(*id));
                    }
                    row.close(status, withdrawal_tx, now);
                    contributions.insert(&key[..], tx_encode(&row)?)?;
                    if let Some(short) = agg.decrement(row.token, row.amount, now) {
                        shortfalls.push((row.token, short));
                    }
                }
                tx_store_treasury(treasury, &agg)?;
                Ok(shortfalls)
            })
            .map_err(map_tx_error)?;

        for (token, short) in shortfalls {
            warn!(%token, shortfall = short, "treasury total_staked clamped at zero; ledger and aggregate diverged");
        }
        info!(count = ids.len(), status = status.as_str(), "stakes closed");
        Ok(ids.len())
    }

    /// Move queued withdrawals (`requested`) to `completed`. Rows in any
    /// other state are skipped, so repeating a call is a no-op. Returns the
    /// number of rows transitioned.
    pub fn complete_withdrawals(
        &self,
        ids: &[ContributionId],
        payout_tx: Option<TxHash>,
    ) -> Result<usize, VaultError> {
        let ids: BTreeSet<ContributionId> = ids.iter().copied().collect();
        if ids.is_empty() {
            return Ok(0);
        }
        self.db
            .contributions
            .transaction(|contributions| {
                let mut done = 0usize;
                for id in &ids {
                    let key = id.to_be_bytes();
                    let Some(bytes) = contributions.get(key)? else { continue };
                    let mut row: Contribution = tx_decode(&bytes)?;
                    if !row.awaiting_payout() {
                        continue;
                    }
                    row.withdrawal_status = WithdrawalStatus::Completed;
                    if payout_tx.is_some() {
                        row.withdrawal_tx = payout_tx;
                    }
                    contributions.insert(&key[..], tx_encode(&row)?)?;
                    done += 1;
                }
                Ok(done)
            })
            .map_err(map_tx_error)
    }

    /// Admin completion of queued withdrawals for `wallet` / `token` after
    /// funds were sent out of band. Idempotent: a second call returns 0.
    pub fn mark_returned(
        &self,
        wallet: Address,
        token: Token,
        payout_tx: Option<TxHash>,
    ) -> Result<usize, VaultError> {
        let pending: Vec<ContributionId> = self
            .list_awaiting_payout(ContributionFilter::new(Some(wallet), Some(token)))?
            .into_iter()
            .map(|c| c.id)
            .collect();
        let done = self.complete_withdrawals(&pending, payout_tx)?;
        if done > 0 {
            info!(%wallet, %token, count = done, "queued withdrawals marked returned");
        }
        Ok(done)
    }
}
