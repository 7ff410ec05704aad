use serde::{Deserialize, Serialize};

use crate::types::{Address, Balance, ContributionId, Timestamp, Token, TxHash};

/// Payout state of a closed stake. `None` while the stake is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    None,
    /// Owed to the staker; waiting for an admin to fund and send it.
    Requested,
    /// Paid out, either instantly or marked returned by an admin.
    Completed,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::None => "none",
            WithdrawalStatus::Requested => "requested",
            WithdrawalStatus::Completed => "completed",
        }
    }
}

/// One accepted stake. Inserted active; closed exactly once by an unstake and
/// never reactivated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub id: ContributionId,
    pub wallet: Address,
    pub token: Token,
    /// Base units as verified on chain. Immutable after insert.
    pub amount: Balance,
    /// Deposit transaction hash; globally unique across the ledger.
    pub tx_hash: TxHash,
    pub active: bool,
    /// Time the deposit was accepted, not the block time.
    pub created_at: Timestamp,
    pub unstaked_at: Option<Timestamp>,
    pub withdrawal_status: WithdrawalStatus,
    pub withdrawal_tx: Option<TxHash>,
}

impl Contribution {
    pub fn new(
        id: ContributionId,
        wallet: Address,
        token: Token,
        amount: Balance,
        tx_hash: TxHash,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            wallet,
            token,
            amount,
            tx_hash,
            active: true,
            created_at,
            unstaked_at: None,
            withdrawal_status: WithdrawalStatus::None,
            withdrawal_tx: None,
        }
    }

    /// Close an active stake. Callers must have checked `active`.
    pub fn close(&mut self, status: WithdrawalStatus, withdrawal_tx: Option<TxHash>, now: Timestamp) {
        self.active = false;
        self.unstaked_at = Some(now);
        self.withdrawal_status = status;
        self.withdrawal_tx = withdrawal_tx;
    }

    /// Whether this row is a queued withdrawal awaiting manual payout.
    pub fn awaiting_payout(&self) -> bool {
        !self.active && self.withdrawal_status == WithdrawalStatus::Requested
    }

    /// Age in fractional days at `now`. Never negative.
    pub fn age_days(&self, now: Timestamp) -> f64 {
        let secs = (now - self.created_at).max(0);
        secs as f64 / crate::constants::SECS_PER_DAY as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(created_at: Timestamp) -> Contribution {
        Contribution::new(
            7,
            Address::from_bytes([0xaa; 20]),
            Token::Primary,
            1_000,
            TxHash::from_bytes([1u8; 32]),
            created_at,
        )
    }

    #[test]
    fn close_stamps_terminal_fields() {
        let mut c = sample(0);
        c.close(WithdrawalStatus::Requested, None, 500);
        assert!(!c.active);
        assert_eq!(c.unstaked_at, Some(500));
        assert!(c.awaiting_payout());
    }

    #[test]
    fn age_is_clamped_at_zero() {
        let c = sample(1_000);
        assert_eq!(c.age_days(0), 0.0);
        assert_eq!(c.age_days(1_000 + 2 * 86_400), 2.0);
    }

    #[test]
    fn bincode_round_trip_keeps_amount() {
        let c = sample(42);
        let bytes = bincode::serialize(&c).unwrap();
        let back: Contribution = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, c);
    }
}
