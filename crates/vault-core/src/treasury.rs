use serde::{Deserialize, Serialize};

use crate::constants::{REWARD_SPLIT_PCT_MAX, REWARD_SPLIT_PCT_MIN};
use crate::error::VaultError;
use crate::types::{Balance, Timestamp, Token};

/// Per-token running balances.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTotals {
    pub primary: Balance,
    pub secondary: Balance,
}

impl TokenTotals {
    pub fn get(&self, token: Token) -> Balance {
        match token {
            Token::Primary => self.primary,
            Token::Secondary => self.secondary,
        }
    }

    pub fn get_mut(&mut self, token: Token) -> &mut Balance {
        match token {
            Token::Primary => &mut self.primary,
            Token::Secondary => &mut self.secondary,
        }
    }
}

/// The single treasury row.
///
/// `total_staked` tracks the ledger: it is only moved by increments and
/// decrements paired 1:1 with contribution inserts and closes. The audit
/// counters only move forward, on an explicit admin distribution stamp.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreasuryAggregate {
    pub total_staked: TokenTotals,
    /// Whole tokens paid out across all recorded distribution runs.
    pub total_distributed: f64,
    pub distribution_count: u64,
    pub last_distribution_at: Option<Timestamp>,
    /// Reward pool size for the current period, in whole tokens.
    pub weekly_rate: f64,
    /// Share of upstream revenue routed into the pool, 0–100.
    pub reward_split_pct: f64,
    pub updated_at: Timestamp,
}

impl TreasuryAggregate {
    pub fn seed(weekly_rate: f64, reward_split_pct: f64, now: Timestamp) -> Self {
        Self {
            total_staked: TokenTotals::default(),
            total_distributed: 0.0,
            distribution_count: 0,
            last_distribution_at: None,
            weekly_rate,
            reward_split_pct,
            updated_at: now,
        }
    }

    pub fn increment(&mut self, token: Token, amount: Balance, now: Timestamp) {
        let slot = self.total_staked.get_mut(token);
        *slot = slot.saturating_add(amount);
        self.updated_at = now;
    }

    /// Subtract `amount`, flooring at zero. Returns the shortfall when the
    /// decrement would have underflowed, which means the ledger and the
    /// aggregate had already diverged.
    pub fn decrement(&mut self, token: Token, amount: Balance, now: Timestamp) -> Option<Balance> {
        let slot = self.total_staked.get_mut(token);
        let shortfall = amount.checked_sub(*slot).filter(|s| *s > 0);
        *slot = slot.saturating_sub(amount);
        self.updated_at = now;
        shortfall
    }

    pub fn apply_config(&mut self, update: &ConfigUpdate, now: Timestamp) -> Result<(), VaultError> {
        update.validate()?;
        if let Some(rate) = update.weekly_rate {
            self.weekly_rate = rate;
        }
        if let Some(pct) = update.reward_split_pct {
            self.reward_split_pct = pct;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Audit stamp for an off-system payout run. Moves no funds.
    pub fn record_distribution(&mut self, distributed: f64, now: Timestamp) -> Result<(), VaultError> {
        if !distributed.is_finite() || distributed < 0.0 {
            return Err(VaultError::InvalidConfig(format!(
                "distributed amount must be a non-negative number, got {distributed}"
            )));
        }
        self.total_distributed += distributed;
        self.distribution_count += 1;
        self.last_distribution_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}

/// Partial admin update of the treasury configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    pub weekly_rate: Option<f64>,
    pub reward_split_pct: Option<f64>,
}

impl ConfigUpdate {
    pub fn validate(&self) -> Result<(), VaultError> {
        if let Some(rate) = self.weekly_rate {
            if !rate.is_finite() || rate < 0.0 {
                return Err(VaultError::InvalidConfig(format!(
                    "weekly_rate must be a non-negative number, got {rate}"
                )));
            }
        }
        if let Some(pct) = self.reward_split_pct {
            if !pct.is_finite() || !(REWARD_SPLIT_PCT_MIN..=REWARD_SPLIT_PCT_MAX).contains(&pct) {
                return Err(VaultError::InvalidConfig(format!(
                    "reward_split_pct must be within 0–100, got {pct}"
                )));
            }
        }
        Ok(())
    }
}
