use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use vault_core::{Balance, ConfigUpdate, Timestamp, Token, TokenTotals, TreasuryAggregate, VaultError};

use crate::db::{abort, map_tx_error, tx_load_treasury, tx_store_treasury, StateDb, TREASURY_KEY};

/// Ledger totals against the stored aggregate, per token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Sum of active contribution amounts.
    pub ledger: TokenTotals,
    /// `total_staked` as stored before any repair.
    pub aggregate: TokenTotals,
    pub repaired: bool,
}

impl ReconcileReport {
    pub fn in_sync(&self) -> bool {
        self.ledger == self.aggregate
    }

    /// Signed difference `aggregate - ledger` for `token`.
    pub fn drift(&self, token: Token) -> i128 {
        let a = i128::try_from(self.aggregate.get(token)).unwrap_or(i128::MAX);
        let l = i128::try_from(self.ledger.get(token)).unwrap_or(i128::MAX);
        a.saturating_sub(l)
    }
}

const RECONCILE_ATTEMPTS: usize = 3;

/// The single treasury row: running stake totals, reward configuration and
/// distribution audit stamps.
pub struct TreasuryStore {
    db: Arc<StateDb>,
}

impl TreasuryStore {
    pub fn new(db: Arc<StateDb>) -> Self {
        Self { db }
    }

    /// Create the row on first start. An existing row is left untouched.
    pub fn seed_if_missing(
        &self,
        weekly_rate: f64,
        reward_split_pct: f64,
        now: Timestamp,
    ) -> Result<TreasuryAggregate, VaultError> {
        ConfigUpdate { weekly_rate: Some(weekly_rate), reward_split_pct: Some(reward_split_pct) }
            .validate()?;
        let (row, created) = self
            .db
            .treasury
            .transaction(|tree| {
                if tree.get(TREASURY_KEY)?.is_some() {
                    return Ok((tx_load_treasury(tree, now)?, false));
                }
                let row = TreasuryAggregate::seed(weekly_rate, reward_split_pct, now);
                tx_store_treasury(tree, &row)?;
                Ok((row, true))
            })
            .map_err(map_tx_error)?;
        if created {
            info!(weekly_rate, reward_split_pct, "treasury seeded");
        }
        Ok(row)
    }

    /// Current row; an unseeded store reads as an empty, zero-rate row.
    pub fn get(&self, now: Timestamp) -> Result<TreasuryAggregate, VaultError> {
        Ok(self
            .db
            .get_treasury()?
            .unwrap_or_else(|| TreasuryAggregate::seed(0.0, 0.0, now)))
    }

    pub fn increment(&self, token: Token, amount: Balance, now: Timestamp) -> Result<TreasuryAggregate, VaultError> {
        let (row, ()) = self.update(now, |row| {
            row.increment(token, amount, now);
            Ok(())
        })?;
        Ok(row)
    }

    /// Decrement `total_staked`, flooring at zero. A clamp is logged: it means
    /// the aggregate had drifted below the ledger.
    pub fn decrement(&self, token: Token, amount: Balance, now: Timestamp) -> Result<TreasuryAggregate, VaultError> {
        let (row, shortfall) = self.update(now, |row| Ok(row.decrement(token, amount, now)))?;
        if let Some(short) = shortfall {
            warn!(%token, shortfall = short, "treasury total_staked clamped at zero");
        }
        Ok(row)
    }

    pub fn set_config(&self, update: &ConfigUpdate, now: Timestamp) -> Result<TreasuryAggregate, VaultError> {
        update.validate()?;
        let (row, ()) = self.update(now, |row| row.apply_config(update, now))?;
        info!(weekly_rate = row.weekly_rate, reward_split_pct = row.reward_split_pct, "treasury config updated");
        Ok(row)
    }

    pub fn record_distribution(&self, distributed: f64, now: Timestamp) -> Result<TreasuryAggregate, VaultError> {
        let (row, ()) = self.update(now, |row| row.record_distribution(distributed, now))?;
        info!(
            distributed,
            count = row.distribution_count,
            total = row.total_distributed,
            "distribution recorded"
        );
        Ok(row)
    }

    /// Recompute per-token totals from active contributions and compare them
    /// with the stored aggregate. With `repair`, overwrite `total_staked` with
    /// the ledger totals.
    ///
    /// A repair only commits if the aggregate is unchanged since the scan
    /// started; a concurrent deposit or unstake triggers a rescan.
    pub fn reconcile(&self, repair: bool, now: Timestamp) -> Result<ReconcileReport, VaultError> {
        for _ in 0..RECONCILE_ATTEMPTS {
            let before = self.get(now)?.total_staked;
            let ledger = self.ledger_totals()?;
            let mut report = ReconcileReport { ledger, aggregate: before, repaired: false };
            if report.in_sync() || !repair {
                if !report.in_sync() {
                    warn!(
                        primary_drift = report.drift(Token::Primary),
                        secondary_drift = report.drift(Token::Secondary),
                        "treasury aggregate drifted from ledger"
                    );
                }
                return Ok(report);
            }

            let committed = self
                .db
                .treasury
                .transaction(|tree| {
                    let mut row = tx_load_treasury(tree, now)?;
                    if row.total_staked != before {
                        return Ok(false);
                    }
                    row.total_staked = ledger;
                    row.updated_at = now;
                    tx_store_treasury(tree, &row)?;
                    Ok(true)
                })
                .map_err(map_tx_error)?;
            if committed {
                report.repaired = true;
                warn!(
                    primary_drift = report.drift(Token::Primary),
                    secondary_drift = report.drift(Token::Secondary),
                    "treasury aggregate repaired from ledger"
                );
                return Ok(report);
            }
        }
        Err(VaultError::Storage(
            "treasury kept changing during reconcile; retry later".into(),
        ))
    }

    fn ledger_totals(&self) -> Result<TokenTotals, VaultError> {
        let mut totals = TokenTotals::default();
        for item in self.db.iter_contributions() {
            let c = item?;
            if c.active {
                let slot = totals.get_mut(c.token);
                *slot = slot.saturating_add(c.amount);
            }
        }
        Ok(totals)
    }

    fn update<R>(
        &self,
        now: Timestamp,
        f: impl Fn(&mut TreasuryAggregate) -> Result<R, VaultError>,
    ) -> Result<(TreasuryAggregate, R), VaultError> {
        self.db
            .treasury
            .transaction(|tree| {
                let mut row = tx_load_treasury(tree, now)?;
                let out = match f(&mut row) {
                    Ok(out) => out,
                    Err(e) => return abort(e),
                };
                tx_store_treasury(tree, &row)?;
                Ok((row, out))
            })
            .map_err(map_tx_error)
    }
}
